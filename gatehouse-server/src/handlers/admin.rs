//! Admin-only user lifecycle endpoints.
//!
//! Each handler runs the admin gate before touching the body, then hands the
//! parsed request to [`UserAdministration`](gatehouse_core::UserAdministration).

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};

use gatehouse_core::api_types::{
    AdminConfigResponse, ApiResponse, CreateUserRequest, DeleteUserRequest, ModifyUserRequest,
};
use gatehouse_core::gate::{self, Administrator};
use gatehouse_core::orchestrator::ChangedField;
use gatehouse_core::user_info::UserInfo;

use super::{current_session, parse_body};
use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    operation: &str,
) -> AppResult<Administrator> {
    let session = current_session(state, headers).await;
    Ok(state.admin.authorize(session, operation).await?)
}

/// `PUT /api/admin/user`
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin = authorize(&state, &headers, "add user").await?;
    let request: CreateUserRequest = parse_body(&body)?;

    state.admin.create_user(&admin, request).await?;

    Ok(Json(ApiResponse::ok()))
}

/// `POST /api/admin/user`
pub async fn modify_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Vec<ChangedField>>>> {
    let admin = authorize(&state, &headers, "modify user").await?;
    let request: ModifyUserRequest = parse_body(&body)?;

    let changed = state.admin.modify_user(&admin, request).await?;

    Ok(Json(ApiResponse::success(changed)))
}

/// `DELETE /api/admin/user`
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<()>>> {
    let admin = authorize(&state, &headers, "delete user").await?;
    let request: DeleteUserRequest = parse_body(&body)?;

    state.admin.delete_user(&admin, request).await?;

    Ok(Json(ApiResponse::ok()))
}

/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<Vec<UserInfo>>>> {
    let admin = authorize(&state, &headers, "list users").await?;
    let users = state.admin.list_users(&admin).await?;

    Ok(Json(ApiResponse::success(users)))
}

/// `GET /api/admin/config`
///
/// Readable by any authenticated user, also while administration is
/// disabled, so clients can decide whether to show admin features.
pub async fn admin_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<AdminConfigResponse>>> {
    let session = current_session(&state, &headers).await;
    gate::require_authenticated(session, "read admin config")?;

    Ok(Json(ApiResponse::success(AdminConfigResponse::from(
        state.admin.config(),
    ))))
}
