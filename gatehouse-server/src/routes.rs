use axum::{
    Router,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, auth, health};
use crate::infra::app_state::AppState;

/// Every API route, without state or middleware.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/firstfactor", post(auth::first_factor))
        .route("/api/logout", post(auth::logout))
        .route("/api/user/password", post(auth::change_password))
        .route("/api/admin/config", get(admin::admin_config))
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/user",
            put(admin::create_user)
                .post(admin::modify_user)
                .delete(admin::delete_user),
        )
}

/// Application with state and request tracing applied.
pub fn create_app(state: AppState) -> Router {
    create_api_router()
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
