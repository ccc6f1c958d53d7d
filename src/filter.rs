//! Two-stage password filter: local policy, then dictionary lookup.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::dictionary::Dictionary;
use crate::evaluator::{Verdict, evaluate_password};
use crate::policy::PolicyConfig;

/// Shared, read-only filter handed to every connection worker.
#[derive(Clone)]
pub struct PasswordFilter {
    policy: Arc<PolicyConfig>,
    dictionary: Arc<dyn Dictionary>,
}

impl PasswordFilter {
    pub fn new(policy: Arc<PolicyConfig>, dictionary: Arc<dyn Dictionary>) -> Self {
        Self { policy, dictionary }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Returns `true` if the password passes the policy and is not banned.
    ///
    /// The dictionary is only consulted after the policy accepts.
    pub fn test(&self, password: Option<&SecretString>) -> bool {
        if let Verdict::Reject(reason) = evaluate_password(&self.policy, password) {
            tracing::debug!("Password rejected by policy: {}", reason);
            return false;
        }

        let Some(password) = password else {
            return false;
        };

        if self.dictionary.contains(password.expose_secret()) {
            tracing::debug!("Password rejected: found in dictionary");
            return false;
        }
        true
    }
}
