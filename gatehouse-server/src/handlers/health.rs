use axum::{Json, extract::State};
use tracing::error;

use gatehouse_core::api_types::ApiResponse;

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

/// `GET /api/health`: 503 when the identity backend fails its check.
pub async fn health(State(state): State<AppState>) -> AppResult<Json<ApiResponse<()>>> {
    state.provider().startup_check().await.map_err(|err| {
        error!(error = %err, "identity backend health check failed");
        AppError::unavailable("identity backend unavailable")
    })?;

    Ok(Json(ApiResponse::ok()))
}
