//! Backend-agnostic identity storage contract.
//!
//! Every method expects inputs that were already validated by the caller;
//! implementations only enforce storage-level semantics (existence,
//! uniqueness, credential checks).

use async_trait::async_trait;
use thiserror::Error;

use crate::crypto::CredentialHasher;
use crate::user::{ModifyUserOptions, NewUserOptions, UserDetails};

pub mod database;
pub mod file;
pub mod memory;

pub use file::FileUserProvider;
pub use memory::MemoryUserProvider;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure reported by a provider. The message is meant for server logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("password hashing error: {0}")]
    Hashing(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability set every identity backend implements.
///
/// The single-field setters and `change_password` have default
/// implementations built on [`update_user`](Self::update_user),
/// [`check_user_password`](Self::check_user_password) and
/// [`update_password`](Self::update_password); backends may override them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Verify the backend is usable. Called once before serving requests.
    async fn startup_check(&self) -> ProviderResult<()>;

    async fn add_user(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
        options: NewUserOptions,
    ) -> ProviderResult<()>;

    /// Apply a sparse patch to an existing user.
    async fn update_user(&self, username: &str, patch: ModifyUserOptions) -> ProviderResult<()>;

    async fn delete_user(&self, username: &str) -> ProviderResult<()>;

    /// Returns `Ok(false)` on mismatch; disabled and unknown users are errors.
    async fn check_user_password(&self, username: &str, password: &str) -> ProviderResult<bool>;

    /// Returns [`ProviderError::UserNotFound`] for absent *and* disabled users.
    async fn get_details(&self, username: &str) -> ProviderResult<UserDetails>;

    async fn update_password(&self, username: &str, new_password: &str) -> ProviderResult<()>;

    /// Change a password after verifying the old one. Stored credentials are
    /// untouched when the old password does not match.
    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> ProviderResult<()> {
        if !self.check_user_password(username, old_password).await? {
            return Err(ProviderError::IncorrectPassword);
        }

        self.update_password(username, new_password).await
    }

    async fn change_display_name(
        &self,
        username: &str,
        new_display_name: &str,
    ) -> ProviderResult<()> {
        self.update_user(username, ModifyUserOptions::new().display_name(new_display_name))
            .await
    }

    async fn change_email(&self, username: &str, new_email: &str) -> ProviderResult<()> {
        self.update_user(username, ModifyUserOptions::new().email(new_email))
            .await
    }

    async fn change_groups(&self, username: &str, new_groups: &[String]) -> ProviderResult<()> {
        self.update_user(username, ModifyUserOptions::new().groups(new_groups.to_vec()))
            .await
    }

    /// Every stored user, disabled ones included.
    async fn list_users(&self) -> ProviderResult<Vec<UserDetails>>;
}

pub(crate) async fn hash(hasher: &CredentialHasher, password: &str) -> ProviderResult<String> {
    hasher
        .hash(password)
        .await
        .map_err(|err| ProviderError::Hashing(err.to_string()))
}

pub(crate) async fn verify(
    hasher: &CredentialHasher,
    password: &str,
    stored: &str,
) -> ProviderResult<bool> {
    hasher
        .verify(password, stored)
        .await
        .map_err(|err| ProviderError::Hashing(err.to_string()))
}
