//! Character variety section - checks the per-class minimums.

use super::{CharCounts, SectionResult};
use crate::evaluator::RejectReason;
use crate::policy::PolicyConfig;

/// Checks the scanned counts against every enabled minimum.
///
/// Minimums are checked in a fixed order: uppercase, lowercase, numeric,
/// special, alpha, non-alpha.
pub fn character_variety_section(policy: &PolicyConfig, counts: &CharCounts) -> SectionResult {
    let checks: [(Option<usize>, usize, fn(usize) -> RejectReason); 6] = [
        (policy.min_upper, counts.upper, RejectReason::TooFewUpper),
        (policy.min_lower, counts.lower, RejectReason::TooFewLower),
        (policy.min_numeric, counts.numeric, RejectReason::TooFewNumeric),
        (policy.min_special, counts.special, RejectReason::TooFewSpecial),
        (policy.min_alpha, counts.alpha(), RejectReason::TooFewAlpha),
        (policy.min_non_alpha, counts.non_alpha(), RejectReason::TooFewNonAlpha),
    ];

    for (min, count, reason) in checks {
        if let Some(min) = min.filter(|&min| count < min) {
            return Err(reason(min));
        }
    }
    Ok(())
}
