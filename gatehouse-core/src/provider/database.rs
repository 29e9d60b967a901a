//! In-process user table shared by the bundled providers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ProviderError, ProviderResult};
use crate::user::{ModifyUserOptions, UserDetails};

/// One stored account. `password` holds a PHC hash string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(rename = "displayname")]
    pub display_name: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StoredUser {
    fn details(&self, username: &str) -> UserDetails {
        UserDetails {
            username: username.to_string(),
            display_name: self.display_name.clone(),
            emails: self.emails.clone(),
            groups: self.groups.clone(),
        }
    }
}

/// Users keyed by username, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDatabase {
    #[serde(default)]
    pub users: BTreeMap<String, StoredUser>,
}

impl UserDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> ProviderResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|err| {
            ProviderError::Storage(format!("failed to parse users database: {err}"))
        })
    }

    pub fn to_yaml(&self) -> ProviderResult<String> {
        serde_yaml::to_string(self).map_err(|err| {
            ProviderError::Storage(format!("failed to serialize users database: {err}"))
        })
    }

    pub fn insert(&mut self, username: &str, user: StoredUser) -> ProviderResult<()> {
        if self.users.contains_key(username) {
            return Err(ProviderError::UserAlreadyExists);
        }

        self.users.insert(username.to_string(), user);
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> ProviderResult<StoredUser> {
        self.users
            .remove(username)
            .ok_or(ProviderError::UserNotFound)
    }

    /// Details for an enabled user.
    pub fn details(&self, username: &str) -> ProviderResult<UserDetails> {
        match self.users.get(username) {
            Some(user) if !user.disabled => Ok(user.details(username)),
            _ => Err(ProviderError::UserNotFound),
        }
    }

    /// Stored record for an enabled user.
    pub fn active(&self, username: &str) -> ProviderResult<&StoredUser> {
        self.users
            .get(username)
            .filter(|user| !user.disabled)
            .ok_or(ProviderError::UserNotFound)
    }

    /// Stored record regardless of the disabled flag.
    pub fn get(&self, username: &str) -> ProviderResult<&StoredUser> {
        self.users.get(username).ok_or(ProviderError::UserNotFound)
    }

    pub fn get_mut(&mut self, username: &str) -> ProviderResult<&mut StoredUser> {
        self.users
            .get_mut(username)
            .ok_or(ProviderError::UserNotFound)
    }

    pub fn list(&self) -> Vec<UserDetails> {
        self.users
            .iter()
            .map(|(username, user)| user.details(username))
            .collect()
    }

    /// Apply every non-password field of `patch`. The caller hashes and
    /// stores `patch.password` itself.
    pub fn apply(&mut self, username: &str, patch: &ModifyUserOptions) -> ProviderResult<()> {
        let user = self.get_mut(username)?;

        if let Some(display_name) = &patch.display_name {
            user.display_name = display_name.clone();
        }

        if let Some(email) = &patch.email {
            match user.emails.first_mut() {
                Some(primary) => *primary = email.clone(),
                None => user.emails.push(email.clone()),
            }
        }

        if let Some(groups) = &patch.groups {
            user.groups = groups.clone();
        }

        for group in &patch.add_groups {
            if !user.groups.contains(group) {
                user.groups.push(group.clone());
            }
        }

        if !patch.remove_groups.is_empty() {
            user.groups.retain(|group| !patch.remove_groups.contains(group));
        }

        Ok(())
    }
}
