//! Scan section - classifies characters and detects repeated runs in one pass.

use super::SectionResult;
use crate::evaluator::RejectReason;
use crate::policy::PolicyConfig;

/// Character class of a single password character. Every character falls in
/// exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Upper,
    Lower,
    Numeric,
    Special,
}

impl CharClass {
    /// Cased letters count as upper or lower and decimal digits as numeric.
    /// Everything else is special, including caseless letters, letter-like
    /// symbols such as `Ⓐ` and non-decimal numerals such as `²` or `Ⅻ`.
    pub fn of(ch: char) -> Self {
        if is_cased_letter(ch) && ch.is_uppercase() && !ch.to_lowercase().eq([ch]) {
            CharClass::Upper
        } else if is_cased_letter(ch) && ch.is_lowercase() && !ch.to_uppercase().eq([ch]) {
            CharClass::Lower
        } else if is_decimal_digit(ch) {
            CharClass::Numeric
        } else {
            CharClass::Special
        }
    }
}

fn is_cased_letter(ch: char) -> bool {
    ch.is_alphabetic() && !ch.is_numeric() && !is_letterlike_symbol(ch)
}

// Symbols and marks that carry the alphabetic and case properties
// without being letters.
fn is_letterlike_symbol(ch: char) -> bool {
    matches!(
        ch,
        '\u{0345}'
            | '\u{24B6}'..='\u{24E9}'
            | '\u{1F130}'..='\u{1F149}'
            | '\u{1F150}'..='\u{1F169}'
            | '\u{1F170}'..='\u{1F189}'
    )
}

// First code point of each run of ten decimal digits in the BMP.
const DECIMAL_ZEROS: [u32; 37] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10,
];

fn is_decimal_digit(ch: char) -> bool {
    let code = u32::from(ch);
    ch.is_numeric()
        && DECIMAL_ZEROS
            .iter()
            .any(|&zero| (zero..zero + 10).contains(&code))
}

/// Per-class character counts of the inspected window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CharCounts {
    pub upper: usize,
    pub lower: usize,
    pub numeric: usize,
    pub special: usize,
}

impl CharCounts {
    fn record(&mut self, class: CharClass) {
        match class {
            CharClass::Upper => self.upper += 1,
            CharClass::Lower => self.lower += 1,
            CharClass::Numeric => self.numeric += 1,
            CharClass::Special => self.special += 1,
        }
    }

    pub fn alpha(&self) -> usize {
        self.upper + self.lower
    }

    pub fn non_alpha(&self) -> usize {
        self.numeric + self.special
    }
}

/// Scans the first `inspection_limit` characters of the password.
///
/// Stops at the first run of identical characters longer than
/// `max_repeats`.
///
/// # Returns
/// - `Ok(counts)` if no run is too long
/// - `Err(RejectReason::RepeatedRun)` otherwise
pub fn scan_section(policy: &PolicyConfig, password: &str) -> SectionResult<CharCounts> {
    let window = password
        .chars()
        .take(policy.inspection_limit.unwrap_or(usize::MAX));

    let mut counts = CharCounts::default();
    let mut prev: Option<char> = None;
    let mut run = 0usize;

    for ch in window {
        counts.record(CharClass::of(ch));

        run = if prev == Some(ch) { run + 1 } else { 1 };
        prev = Some(ch);

        if let Some(max) = policy.max_repeats.filter(|&max| run > max) {
            return Err(RejectReason::RepeatedRun(max));
        }
    }

    Ok(counts)
}
