use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::database::{StoredUser, UserDatabase};
use super::{ProviderError, ProviderResult, UserProvider, hash, verify};
use crate::crypto::CredentialHasher;
use crate::user::{ModifyUserOptions, NewUserOptions, UserDetails};

/// Provider backed by a YAML users database on disk.
///
/// The file is read once when the provider is opened (and again by
/// [`startup_check`](UserProvider::startup_check)); every mutation is applied
/// to a copy, written to a temporary file next to the database and renamed
/// over it before the in-memory state is swapped.
#[derive(Debug)]
pub struct FileUserProvider {
    path: PathBuf,
    database: Mutex<UserDatabase>,
    hasher: CredentialHasher,
}

impl FileUserProvider {
    pub async fn open(
        path: impl Into<PathBuf>,
        hasher: CredentialHasher,
    ) -> ProviderResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ProviderError::Storage("users database path is empty".to_string()));
        }

        let database = match tokio::fs::read_to_string(&path).await {
            Ok(content) => UserDatabase::from_yaml(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "users database does not exist yet");
                UserDatabase::new()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            database: Mutex::new(database),
            hasher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate<F>(&self, change: F) -> ProviderResult<()>
    where
        F: FnOnce(&mut UserDatabase) -> ProviderResult<()>,
    {
        let mut database = self.database.lock().await;
        let mut next = database.clone();
        change(&mut next)?;
        persist(&self.path, &next).await?;
        *database = next;
        Ok(())
    }
}

/// Replace the database file through a synced temporary file in the same
/// directory. The temporary file is removed if any step fails or the task is
/// dropped before the rename.
async fn persist(path: &Path, database: &UserDatabase) -> ProviderResult<()> {
    let content = database.to_yaml()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(|err| ProviderError::Storage(format!("users database write aborted: {err}")))??;

    debug!(path = %path.display(), users = database.users.len(), "users database written");
    Ok(())
}

#[async_trait]
impl UserProvider for FileUserProvider {
    async fn startup_check(&self) -> ProviderResult<()> {
        let mut database = self.database.lock().await;

        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                *database = UserDatabase::from_yaml(&content)?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                persist(&self.path, &database).await?;
                info!(path = %self.path.display(), "created empty users database");
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            path = %self.path.display(),
            users = database.users.len(),
            "file user provider ready"
        );
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
        let user = StoredUser {
            display_name: display_name.to_string(),
            password,
            emails: options.email.into_iter().collect(),
            groups: options.groups.unwrap_or_default(),
            disabled: false,
        };

        self.mutate(|database| database.insert(username, user)).await
    }

    async fn update_user(&self, username: &str, patch: ModifyUserOptions) -> ProviderResult<()> {
        let password = match patch.password.as_deref() {
            Some(password) => Some(hash(&self.hasher, password).await?),
            None => None,
        };

        self.mutate(|database| {
            database.apply(username, &patch)?;
            if let Some(password) = password {
                database.get_mut(username)?.password = password;
            }
            Ok(())
        })
        .await
    }

    async fn delete_user(&self, username: &str) -> ProviderResult<()> {
        self.mutate(|database| database.remove(username).map(|_| ()))
            .await
    }

    async fn check_user_password(&self, username: &str, password: &str) -> ProviderResult<bool> {
        let stored = self.database.lock().await.active(username)?.password.clone();
        verify(&self.hasher, password, &stored).await
    }

    async fn get_details(&self, username: &str) -> ProviderResult<UserDetails> {
        self.database.lock().await.details(username)
    }

    async fn update_password(&self, username: &str, new_password: &str) -> ProviderResult<()> {
        let password = hash(&self.hasher, new_password).await?;
        self.mutate(|database| {
            database.get_mut(username)?.password = password;
            Ok(())
        })
        .await
    }

    async fn list_users(&self) -> ProviderResult<Vec<UserDetails>> {
        Ok(self.database.lock().await.list())
    }
}
