use thiserror::Error;

use crate::gate::AuthorizationError;
use crate::orchestrator::UpdateError;
use crate::provider::ProviderError;
use crate::user_info::UserInfoError;
use crate::validation::ValidationError;

/// Client error with a stable machine-readable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    RequiredFieldsMissing,
    Field(ValidationError),
    PasswordWeak,
    PasswordIncorrect,
    InvalidRequest,
}

impl Rejection {
    pub fn code(self) -> &'static str {
        match self {
            Self::RequiredFieldsMissing => "required_fields_missing",
            Self::Field(err) => err.code(),
            Self::PasswordWeak => "password_weak",
            Self::PasswordIncorrect => "password_incorrect",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl From<ValidationError> for Rejection {
    fn from(err: ValidationError) -> Self {
        Self::Field(err)
    }
}

/// Outcome of a failed lifecycle workflow.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("request rejected: {}", .0.code())]
    Rejected(Rejection),

    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    #[error("{operation} failed: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    UserInfo(#[from] UserInfoError),
}

impl AdminError {
    pub fn backend(operation: &'static str, source: ProviderError) -> Self {
        Self::Backend { operation, source }
    }
}

impl From<Rejection> for AdminError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<ValidationError> for AdminError {
    fn from(err: ValidationError) -> Self {
        Self::Rejected(Rejection::Field(err))
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
