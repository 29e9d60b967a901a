use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use gatehouse_core::api_types::{
    ApiResponse, ChangePasswordRequest, FirstFactorRequest, SessionTokenResponse,
};
use gatehouse_core::gate;
use gatehouse_core::provider::ProviderError;
use gatehouse_core::session::{AuthenticationLevel, UserSession};

use super::{SESSION_COOKIE, current_session, parse_body, session_token};
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

const AUTHENTICATION_FAILED: &str = "Authentication failed. Check your credentials.";

/// `POST /api/firstfactor`
pub async fn first_factor(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let request: FirstFactorRequest = parse_body(&body)?;
    if request.username.is_empty() || request.password.is_empty() {
        return Err(AppError::unauthorized(AUTHENTICATION_FAILED));
    }

    let provider = state.provider();

    match provider
        .check_user_password(&request.username, &request.password)
        .await
    {
        Ok(true) => {}
        Ok(false) | Err(ProviderError::UserNotFound) => {
            warn!(username = %request.username, "unsuccessful first factor authentication");
            return Err(AppError::unauthorized(AUTHENTICATION_FAILED));
        }
        Err(err) => {
            error!(username = %request.username, error = %err, "unable to check password");
            return Err(AppError::operation_failed());
        }
    }

    let details = provider.get_details(&request.username).await.map_err(|err| {
        error!(username = %request.username, error = %err, "unable to load user details");
        AppError::operation_failed()
    })?;

    let token = state
        .sessions()
        .create(UserSession::for_user(&details, AuthenticationLevel::OneFactor))
        .await
        .map_err(|err| {
            error!(username = %details.username, error = %err, "unable to open session");
            AppError::operation_failed()
        })?;

    if let Err(err) = state
        .user_info()
        .record_login(&details.username, "one_factor")
        .await
    {
        warn!(username = %details.username, error = %err, "unable to record login");
    }

    info!(username = %details.username, "first factor authentication succeeded");

    let cookie = HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .map_err(|_| AppError::operation_failed())?;

    let body = Json(ApiResponse::success(SessionTokenResponse {
        token,
        username: details.username,
        display_name: details.display_name,
    }));

    Ok(([(header::SET_COOKIE, cookie)], body).into_response())
}

/// `POST /api/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<()>>> {
    if let Some(token) = session_token(&headers) {
        state.sessions().remove(&token).await.map_err(|err| {
            error!(error = %err, "unable to remove session");
            AppError::operation_failed()
        })?;
    }

    Ok(Json(ApiResponse::ok()))
}

/// `POST /api/user/password`
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<()>>> {
    let session = current_session(&state, &headers).await;
    let session = gate::require_authenticated(session, "change password")?;
    let request: ChangePasswordRequest = parse_body(&body)?;

    state.admin.change_password(&session, request).await?;

    Ok(Json(ApiResponse::ok()))
}
