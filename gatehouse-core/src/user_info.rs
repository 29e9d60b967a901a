//! Per-user bookkeeping kept outside the identity backend.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::UserDetails;

/// Listing entry combining backend attributes with locally tracked state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logged_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: String,
}

impl UserInfo {
    fn from_details(details: &UserDetails) -> Self {
        Self {
            username: details.username.clone(),
            display_name: details.display_name.clone(),
            emails: details.emails.clone(),
            groups: details.groups.clone(),
            ..Self::default()
        }
    }
}

/// Refresh `info` from `users` and append users that have no info entry.
///
/// Entries matching a backend user take its display name, emails and groups;
/// entries without a backend counterpart are kept as they are. Synthesized
/// entries follow the backend order.
pub fn merge_user_info_and_details(
    mut info: Vec<UserInfo>,
    users: &[UserDetails],
) -> Vec<UserInfo> {
    let by_username: HashMap<&str, &UserDetails> = users
        .iter()
        .map(|user| (user.username.as_str(), user))
        .collect();
    let mut seen = HashSet::new();

    for entry in &mut info {
        if let Some(details) = by_username.get(entry.username.as_str()) {
            entry.display_name = details.display_name.clone();
            entry.emails = details.emails.clone();
            entry.groups = details.groups.clone();
            seen.insert(details.username.as_str());
        }
    }

    for user in users {
        if !seen.contains(user.username.as_str()) {
            info.push(UserInfo::from_details(user));
        }
    }

    info
}

#[derive(Debug, Error)]
pub enum UserInfoError {
    #[error("user info store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserInfoStore: Send + Sync {
    async fn list(&self) -> Result<Vec<UserInfo>, UserInfoError>;

    async fn record_login(&self, username: &str, method: &str) -> Result<(), UserInfoError>;

    async fn forget(&self, username: &str) -> Result<(), UserInfoError>;
}

/// Process-local user info, keyed by username.
#[derive(Debug, Default)]
pub struct MemoryUserInfoStore {
    entries: DashMap<String, UserInfo>,
}

impl MemoryUserInfoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserInfoStore for MemoryUserInfoStore {
    async fn list(&self) -> Result<Vec<UserInfo>, UserInfoError> {
        let mut entries: Vec<UserInfo> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(entries)
    }

    async fn record_login(&self, username: &str, method: &str) -> Result<(), UserInfoError> {
        let mut entry = self
            .entries
            .entry(username.to_string())
            .or_insert_with(|| UserInfo {
                username: username.to_string(),
                ..UserInfo::default()
            });
        entry.last_logged_in = Some(Utc::now());
        entry.method = method.to_string();
        Ok(())
    }

    async fn forget(&self, username: &str) -> Result<(), UserInfoError> {
        self.entries.remove(username);
        Ok(())
    }
}
