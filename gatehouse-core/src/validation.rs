//! Syntax checks for user-supplied account fields.
//!
//! Every check is pure and deterministic. Callers validate fields in a fixed
//! order and stop at the first failure.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const PRINTABLE_UNICODE_PATTERN: &str = r"^[\pL\pM\pN\pP\pS\s]{1,100}$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9+._~!#$%&'*/=?^{|}-]+@[a-zA-Z0-9.-]+\.[a-zA-Z0-9-]+$";
const USERNAME_AND_GROUP_PATTERN: &str = r"^[a-zA-Z0-9\-_,]{1,100}$";

static PRINTABLE_UNICODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(PRINTABLE_UNICODE_PATTERN).expect("printable unicode pattern compiles")
});
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));
static USERNAME_AND_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(USERNAME_AND_GROUP_PATTERN).expect("username and group pattern compiles")
});

/// Field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "username must only contain letters, numbers, hyphens, commas \
         and underscores or be a valid email"
    )]
    Username,

    #[error("display name must be 1 to 100 printable characters or a valid email")]
    DisplayName,

    #[error("email address is not valid")]
    Email,

    #[error("groups must only contain letters, numbers, hyphens, commas and underscores")]
    Group,
}

impl ValidationError {
    /// Stable machine-readable code returned to API clients.
    pub fn code(self) -> &'static str {
        match self {
            Self::Username => "username_wrong_format",
            Self::DisplayName => "display_name_wrong_format",
            Self::Email => "email_wrong_format",
            Self::Group => "groups_wrong_format",
        }
    }
}

pub fn is_valid_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

pub fn validate_email(input: &str) -> Result<(), ValidationError> {
    if is_valid_email(input) {
        Ok(())
    } else {
        Err(ValidationError::Email)
    }
}

/// Usernames containing `@` must be valid emails; all others are limited to
/// letters, digits, `-`, `_` and `,`.
pub fn validate_username(input: &str) -> Result<(), ValidationError> {
    let valid = if input.contains('@') {
        is_valid_email(input)
    } else {
        USERNAME_AND_GROUP.is_match(input)
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::Username)
    }
}

/// Display names containing `@` must be valid emails; all others are 1-100
/// characters of letters, marks, numbers, punctuation, symbols or whitespace.
pub fn validate_display_name(input: &str) -> Result<(), ValidationError> {
    let valid = if input.contains('@') {
        is_valid_email(input)
    } else {
        PRINTABLE_UNICODE.is_match(input)
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::DisplayName)
    }
}

pub fn validate_group(input: &str) -> Result<(), ValidationError> {
    if USERNAME_AND_GROUP.is_match(input) {
        Ok(())
    } else {
        Err(ValidationError::Group)
    }
}

/// Validate groups in order, returning the first offending name.
pub fn first_invalid_group(groups: &[String]) -> Option<&str> {
    groups
        .iter()
        .map(String::as_str)
        .find(|group| validate_group(group).is_err())
}
