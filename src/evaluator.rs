//! Password policy evaluator - main evaluation logic.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::policy::PolicyConfig;
use crate::sections::{
    SectionResult, character_variety_section, length_section, scan_section,
};

/// The first rule a rejected password failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No password line was received.
    Missing,
    /// Empty password in permissive mode.
    Empty,
    TooShort(usize),
    TooLong(usize),
    /// A run of identical characters exceeded the allowed repeats.
    RepeatedRun(usize),
    TooFewUpper(usize),
    TooFewLower(usize),
    TooFewNumeric(usize),
    TooFewSpecial(usize),
    TooFewAlpha(usize),
    TooFewNonAlpha(usize),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Missing => write!(f, "no password supplied"),
            RejectReason::Empty => write!(f, "password is empty"),
            RejectReason::TooShort(min) => write!(f, "password must be at least {} characters", min),
            RejectReason::TooLong(max) => write!(f, "password must be at most {} characters", max),
            RejectReason::RepeatedRun(max) => {
                write!(f, "more than {} consecutive identical characters", max)
            }
            RejectReason::TooFewUpper(min) => write!(f, "fewer than {} uppercase letters", min),
            RejectReason::TooFewLower(min) => write!(f, "fewer than {} lowercase letters", min),
            RejectReason::TooFewNumeric(min) => write!(f, "fewer than {} digits", min),
            RejectReason::TooFewSpecial(min) => write!(f, "fewer than {} special characters", min),
            RejectReason::TooFewAlpha(min) => write!(f, "fewer than {} letters", min),
            RejectReason::TooFewNonAlpha(min) => {
                write!(f, "fewer than {} digits or special characters", min)
            }
        }
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl From<SectionResult> for Verdict {
    fn from(result: SectionResult) -> Self {
        match result {
            Ok(()) => Verdict::Accept,
            Err(reason) => Verdict::Reject(reason),
        }
    }
}

/// Evaluates a password against the policy.
///
/// # Arguments
/// * `policy` - The loaded policy thresholds
/// * `password` - The candidate, `None` if the caller never sent one
///
/// # Returns
/// `Verdict::Accept`, or the reason of the first failed rule.
pub fn evaluate_password(policy: &PolicyConfig, password: Option<&SecretString>) -> Verdict {
    let Some(password) = password else {
        return Verdict::Reject(RejectReason::Missing);
    };
    let pwd = password.expose_secret();

    if !policy.loaded {
        return if pwd.is_empty() {
            Verdict::Reject(RejectReason::Empty)
        } else {
            Verdict::Accept
        };
    }

    // Orchestrator: length, then scan (fails fast on repeats), then minimums
    let sections = || -> SectionResult {
        length_section(policy, pwd)?;
        let counts = scan_section(policy, pwd)?;
        character_variety_section(policy, &counts)
    };

    sections().into()
}

/// Returns `true` if the password satisfies the policy.
pub fn check_password(policy: &PolicyConfig, password: Option<&SecretString>) -> bool {
    evaluate_password(policy, password).is_accept()
}
