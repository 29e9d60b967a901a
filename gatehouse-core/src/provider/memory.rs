use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::database::{StoredUser, UserDatabase};
use super::{ProviderResult, UserProvider, hash, verify};
use crate::crypto::CredentialHasher;
use crate::user::{ModifyUserOptions, NewUserOptions, UserDetails};

/// Provider keeping every account in process memory.
///
/// Nothing survives a restart; intended for development setups and tests.
#[derive(Debug)]
pub struct MemoryUserProvider {
    database: RwLock<UserDatabase>,
    hasher: CredentialHasher,
}

impl MemoryUserProvider {
    pub fn new(hasher: CredentialHasher) -> Self {
        Self::with_database(hasher, UserDatabase::new())
    }

    pub fn with_database(hasher: CredentialHasher, database: UserDatabase) -> Self {
        Self {
            database: RwLock::new(database),
            hasher,
        }
    }

    /// Insert a fully specified account, optionally disabled.
    pub async fn seed_user(
        &self,
        details: UserDetails,
        password: &str,
        disabled: bool,
    ) -> ProviderResult<()> {
        let password = hash(&self.hasher, password).await?;
        self.database.write().await.insert(
            &details.username,
            StoredUser {
                display_name: details.display_name,
                password,
                emails: details.emails,
                groups: details.groups,
                disabled,
            },
        )
    }

    pub async fn set_disabled(&self, username: &str, disabled: bool) -> ProviderResult<()> {
        self.database.write().await.get_mut(username)?.disabled = disabled;
        Ok(())
    }

    /// Stored PHC hash, for assertions on credential changes.
    pub async fn password_hash(&self, username: &str) -> ProviderResult<String> {
        Ok(self.database.read().await.get(username)?.password.clone())
    }
}

#[async_trait]
impl UserProvider for MemoryUserProvider {
    async fn startup_check(&self) -> ProviderResult<()> {
        let count = self.database.read().await.users.len();
        debug!(users = count, "memory user provider ready");
        Ok(())
    }

    async fn add_user(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
        options: NewUserOptions,
    ) -> ProviderResult<()> {
        let password = hash(&self.hasher, password).await?;
        self.database.write().await.insert(
            username,
            StoredUser {
                display_name: display_name.to_string(),
                password,
                emails: options.email.into_iter().collect(),
                groups: options.groups.unwrap_or_default(),
                disabled: false,
            },
        )
    }

    async fn update_user(&self, username: &str, patch: ModifyUserOptions) -> ProviderResult<()> {
        let password = match patch.password.as_deref() {
            Some(password) => Some(hash(&self.hasher, password).await?),
            None => None,
        };

        let mut database = self.database.write().await;
        database.apply(username, &patch)?;
        if let Some(password) = password {
            database.get_mut(username)?.password = password;
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> ProviderResult<()> {
        self.database.write().await.remove(username).map(|_| ())
    }

    async fn check_user_password(&self, username: &str, password: &str) -> ProviderResult<bool> {
        let stored = self.database.read().await.active(username)?.password.clone();
        verify(&self.hasher, password, &stored).await
    }

    async fn get_details(&self, username: &str) -> ProviderResult<UserDetails> {
        self.database.read().await.details(username)
    }

    async fn update_password(&self, username: &str, new_password: &str) -> ProviderResult<()> {
        let password = hash(&self.hasher, new_password).await?;
        self.database.write().await.get_mut(username)?.password = password;
        Ok(())
    }

    async fn list_users(&self) -> ProviderResult<Vec<UserDetails>> {
        Ok(self.database.read().await.list())
    }
}
