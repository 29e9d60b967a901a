//! # Gatehouse Core
//!
//! Administrative user-lifecycle layer for a multi-user authentication
//! server. It sits between the HTTP admin API and a pluggable identity
//! backend and decides which backend calls are made, in which order and
//! after which checks.
//!
//! ## Architecture
//!
//! - [`provider`]: the backend contract plus in-memory and YAML file backends
//! - [`validation`]: username, display name, email and group syntax checks
//! - [`gate`]: the admin-privilege check guarding every mutating operation
//! - [`orchestrator`]: diff-and-apply updates issuing only necessary calls
//! - [`admin`]: create, modify, delete and password-change workflows
//! - [`session`], [`user_info`], [`notification`]: collaborators the
//!   workflows consult
//!
//! ## Example
//!
//! ```no_run
//! use gatehouse_core::{
//!     crypto::{CredentialHasher, HashingCost},
//!     provider::{MemoryUserProvider, UserProvider},
//!     user::NewUserOptions,
//! };
//!
//! async fn seed() -> Result<(), Box<dyn std::error::Error>> {
//!     let hasher = CredentialHasher::new("server-pepper", HashingCost::default())?;
//!     let provider = MemoryUserProvider::new(hasher);
//!
//!     provider
//!         .add_user(
//!             "alice",
//!             "Alice",
//!             "correct horse battery staple",
//!             NewUserOptions::new().with_email("alice@example.com"),
//!         )
//!         .await?;
//!
//!     let details = provider.get_details("alice").await?;
//!     assert_eq!(details.primary_email(), Some("alice@example.com"));
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod api_types;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod notification;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod session;
pub mod user;
pub mod user_info;
pub mod validation;

pub use admin::UserAdministration;
pub use error::{AdminError, AdminResult, Rejection};
pub use gate::{AdminConfig, Administrator, AuthorizationError, OPERATION_FAILED};
pub use provider::{ProviderError, ProviderResult, UserProvider};
pub use user::{ModifyUserOptions, NewUserOptions, UserDetails};
