//! Policy configuration module
//!
//! Holds the thresholds the rule engine checks passwords against and loads
//! them from a `key=value` rules file.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const KEY_MIN_UPPER: &str = "min.uppercase";
pub const KEY_MIN_LOWER: &str = "min.lowercase";
pub const KEY_MAX_REPEATS: &str = "max.consecutive-repeats";
pub const KEY_MAX_LENGTH: &str = "max.length";
pub const KEY_MIN_LENGTH: &str = "min.length";
pub const KEY_MIN_ALPHA: &str = "min.alpha";
pub const KEY_MIN_NON_ALPHA: &str = "min.non-alpha";
pub const KEY_MIN_NUMERIC: &str = "min.numeric";
pub const KEY_MIN_SPECIAL: &str = "min.special";
pub const KEY_INSPECTION_LIMIT: &str = "inspection.limit";

const MIN_LENGTH: usize = 8;
const MIN_UPPER: usize = 1;
const MIN_LOWER: usize = 1;
const MIN_NUMERIC: usize = 1;
const MIN_SPECIAL: usize = 1;
// Sums of the compiled component defaults, never of overridden values.
const MIN_ALPHA: usize = MIN_UPPER + MIN_LOWER;
const MIN_NON_ALPHA: usize = MIN_NUMERIC + MIN_SPECIAL;
const MAX_REPEATS: usize = 2;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A rules line that could not be applied. The offending key keeps its
/// previous value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineFault {
    #[error("line {line}: missing '=' separator")]
    MissingSeparator { line: usize },
    #[error("line {line}: value {value:?} for {key} is not an integer")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
}

/// Password policy thresholds.
///
/// Every threshold is `None` when disabled. A configured value of zero or
/// below disables the rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_upper: Option<usize>,
    pub min_lower: Option<usize>,
    pub min_alpha: Option<usize>,
    pub min_numeric: Option<usize>,
    pub min_special: Option<usize>,
    pub min_non_alpha: Option<usize>,
    pub max_repeats: Option<usize>,
    /// Prefix length scanned for character classes and repeats.
    pub inspection_limit: Option<usize>,
    /// `false` when no rules file was found. The engine then only requires a
    /// non-empty password.
    pub loaded: bool,
}

impl Default for PolicyConfig {
    /// Compiled-in defaults, as if a rules file with no recognized keys had
    /// been loaded.
    fn default() -> Self {
        Self {
            min_length: Some(MIN_LENGTH),
            max_length: None,
            min_upper: Some(MIN_UPPER),
            min_lower: Some(MIN_LOWER),
            min_alpha: Some(MIN_ALPHA),
            min_numeric: Some(MIN_NUMERIC),
            min_special: Some(MIN_SPECIAL),
            min_non_alpha: Some(MIN_NON_ALPHA),
            max_repeats: Some(MAX_REPEATS),
            inspection_limit: None,
            loaded: true,
        }
    }
}

impl PolicyConfig {
    /// Configuration used when no rules file exists.
    pub fn permissive() -> Self {
        Self {
            loaded: false,
            ..Self::default()
        }
    }

    /// Loads the policy from a rules file.
    ///
    /// A missing file is not an error: the returned policy is permissive.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Read`] if the file exists but cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RulesError> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Rules file {} not found, running in permissive mode",
                    path.display()
                );
                return Ok(Self::permissive());
            }
            Err(source) => {
                tracing::error!("Failed to read rules file {}: {}", path.display(), source);
                return Err(RulesError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = Self::from_str_source(&content);
        tracing::info!("Password rules loaded from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parses rules text. Faulty lines are logged and skipped.
    pub fn from_str_source(content: &str) -> Self {
        let (config, faults) = Self::parse(content);
        for fault in &faults {
            tracing::warn!("Skipping rules entry: {}", fault);
        }
        config
    }

    /// Parses rules text, returning the faults alongside the resulting
    /// configuration.
    pub fn parse(content: &str) -> (Self, Vec<LineFault>) {
        let mut config = Self::default();
        let mut faults = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                faults.push(LineFault::MissingSeparator { line: line_no });
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let Some(slot) = config.field_mut(key) else {
                tracing::debug!("Ignoring unknown rules key {:?} on line {}", key, line_no);
                continue;
            };

            match value.parse::<i64>() {
                Ok(v) => *slot = threshold(v),
                Err(_) => faults.push(LineFault::InvalidValue {
                    line: line_no,
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            }
        }

        (config, faults)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<usize>> {
        let slot = match key {
            KEY_MIN_UPPER => &mut self.min_upper,
            KEY_MIN_LOWER => &mut self.min_lower,
            KEY_MAX_REPEATS => &mut self.max_repeats,
            KEY_MAX_LENGTH => &mut self.max_length,
            KEY_MIN_LENGTH => &mut self.min_length,
            KEY_MIN_ALPHA => &mut self.min_alpha,
            KEY_MIN_NON_ALPHA => &mut self.min_non_alpha,
            KEY_MIN_NUMERIC => &mut self.min_numeric,
            KEY_MIN_SPECIAL => &mut self.min_special,
            KEY_INSPECTION_LIMIT => &mut self.inspection_limit,
            _ => return None,
        };
        Some(slot)
    }
}

fn threshold(value: i64) -> Option<usize> {
    if value > 0 {
        usize::try_from(value).ok()
    } else {
        None
    }
}
