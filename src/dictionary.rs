//! Banned-password dictionary module
//!
//! The request server only needs a membership test, expressed by the
//! [`Dictionary`] trait. [`WordList`] is the file-backed implementation the
//! daemon ships with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Membership test against a banned-password corpus.
///
/// Implementations are shared across connection workers and must tolerate
/// concurrent lookups.
pub trait Dictionary: Send + Sync {
    /// Returns `true` if the password is banned.
    fn contains(&self, password: &str) -> bool;
}

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Dictionary file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to read dictionary file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Dictionary file is empty")]
    EmptyFile,
}

/// Case-insensitive set of banned passwords.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    /// Loads a word list, one password per line.
    ///
    /// Entries are trimmed and lowercased; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File does not exist
    /// - File cannot be read
    /// - File is empty
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DictionaryError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::error!("Dictionary initialization FAILED: FileNotFound {}", path.display());
            return Err(DictionaryError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;

        if content.trim().is_empty() {
            tracing::error!("Dictionary initialization FAILED: Empty file {}", path.display());
            return Err(DictionaryError::EmptyFile);
        }

        let list = Self::from_words(content.lines());
        tracing::info!("Dictionary initialized: {} passwords from {:?}", list.len(), path);

        Ok(list)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn contains(&self, password: &str) -> bool {
        self.words.contains(&password.to_lowercase())
    }
}

/// Dictionary that bans nothing, for hosts running without a word list.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDictionary;

impl Dictionary for EmptyDictionary {
    fn contains(&self, _password: &str) -> bool {
        false
    }
}
