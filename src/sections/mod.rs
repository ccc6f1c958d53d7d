//! Password policy sections
//!
//! Each section checks one group of rules. Sections run in order and the
//! first rejection ends the evaluation.

mod length;
mod scan;
mod variety;

pub use length::length_section;
pub use scan::{CharCounts, scan_section};
pub use variety::character_variety_section;

use crate::evaluator::RejectReason;

/// Result type for section evaluation functions.
/// - `Ok(_)` - Section passed
/// - `Err(reason)` - Password rejected, remaining sections are skipped
pub type SectionResult<T = ()> = Result<T, RejectReason>;
