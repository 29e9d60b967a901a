use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Password strength check consulted before credentials reach a provider.
pub trait PasswordPolicy: Send + Sync {
    fn check(&self, password: &str) -> Result<(), PasswordPolicyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("password does not meet the required policy: {}", describe(.failures))]
pub struct PasswordPolicyError {
    pub failures: Vec<PasswordRule>,
}

fn describe(failures: &[PasswordRule]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rule-based policy.
///
/// When `enforce` is false the policy is advisory: every password passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordRules {
    /// Whether weak passwords are rejected.
    pub enforce: bool,
    /// Minimum length in characters.
    pub min_length: u16,
    /// Maximum length in characters; 0 disables the limit.
    pub max_length: u16,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    /// At least one non-alphanumeric character.
    pub require_special: bool,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            enforce: true,
            min_length: 8,
            max_length: 128,
            require_uppercase: false,
            require_lowercase: false,
            require_number: false,
            require_special: false,
        }
    }
}

impl PasswordRules {
    /// Evaluate a password returning every failed rule.
    pub fn failures(&self, password: &str) -> Vec<PasswordRule> {
        let mut failures = Vec::new();

        if !self.enforce {
            return failures;
        }

        let length = password.chars().count();
        if length < self.min_length as usize {
            failures.push(PasswordRule::MinLength(self.min_length));
        }
        if self.max_length > 0 && length > self.max_length as usize {
            failures.push(PasswordRule::MaxLength(self.max_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            failures.push(PasswordRule::Uppercase);
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            failures.push(PasswordRule::Lowercase);
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            failures.push(PasswordRule::Number);
        }
        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            failures.push(PasswordRule::Special);
        }

        failures
    }
}

impl PasswordPolicy for PasswordRules {
    fn check(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let failures = self.failures(password);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PasswordPolicyError { failures })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength(u16),
    MaxLength(u16),
    Uppercase,
    Lowercase,
    Number,
    Special,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(len) => write!(f, "minimum length of {} characters", len),
            Self::MaxLength(len) => write!(f, "maximum length of {} characters", len),
            Self::Uppercase => write!(f, "at least one uppercase letter"),
            Self::Lowercase => write!(f, "at least one lowercase letter"),
            Self::Number => write!(f, "at least one number"),
            Self::Special => write!(f, "at least one special character"),
        }
    }
}
