pub mod admin;
pub mod auth;
pub mod health;

use axum::http::{HeaderMap, header};
use serde::de::DeserializeOwned;
use tracing::debug;

use gatehouse_core::Rejection;
use gatehouse_core::session::{SessionError, UserSession};

use crate::infra::app_state::AppState;
use crate::infra::errors::AppError;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "gatehouse_session";

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

/// Resolve the caller's session; requests without a token are anonymous.
pub async fn current_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserSession, SessionError> {
    let token = session_token(headers);
    state.sessions().load(token.as_deref()).await
}

/// Parse a JSON body after authorization has succeeded.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "unable to parse request body");
        AppError::rejected(Rejection::InvalidRequest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; gatehouse_session=xyz"),
        );

        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn malformed_body_is_invalid_request() {
        let err = parse_body::<serde_json::Value>(b"{not json").unwrap_err();
        assert_eq!(err.message, "invalid_request");
    }
}
