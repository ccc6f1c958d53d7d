//! Length section - checks the full password length against the bounds.

use super::SectionResult;
use crate::evaluator::RejectReason;
use crate::policy::PolicyConfig;

/// Checks the password length against `min_length` and `max_length`.
///
/// The whole password is measured, regardless of the inspection limit.
pub fn length_section(policy: &PolicyConfig, password: &str) -> SectionResult {
    let len = password.chars().count();

    if let Some(min) = policy.min_length.filter(|&min| len < min) {
        return Err(RejectReason::TooShort(min));
    }
    if let Some(max) = policy.max_length.filter(|&max| len > max) {
        return Err(RejectReason::TooLong(max));
    }
    Ok(())
}
