use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use gatehouse_core::api_types::ApiResponse;
use gatehouse_core::{AdminError, AuthorizationError, OPERATION_FAILED, Rejection};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// 400 carrying a stable field code.
    pub fn rejected(rejection: Rejection) -> Self {
        Self::bad_request(rejection.code())
    }

    /// Opaque 500; the cause is expected to be logged already.
    pub fn operation_failed() -> Self {
        Self::internal(OPERATION_FAILED)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.message));

        (self.status, body).into_response()
    }
}

impl From<AuthorizationError> for AppError {
    fn from(_: AuthorizationError) -> Self {
        Self::forbidden(OPERATION_FAILED)
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Rejected(rejection) => Self::rejected(rejection),
            AdminError::Unauthorized(err) => err.into(),
            AdminError::Backend { .. } | AdminError::Update(_) | AdminError::UserInfo(_) => {
                Self::operation_failed()
            }
        }
    }
}
