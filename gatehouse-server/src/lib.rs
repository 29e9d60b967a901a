//! # Gatehouse Server
//!
//! HTTP surface for the Gatehouse user lifecycle core: the admin user API,
//! first-factor login, self-service password change and a health check.
//!
//! Configuration is resolved by [`infra::config::ConfigLoader`] and the
//! router is assembled by [`routes::create_app`].

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
