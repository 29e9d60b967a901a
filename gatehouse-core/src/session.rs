//! Session lookup used by the authorization gate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::user::UserDetails;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationLevel {
    #[default]
    NotAuthenticated,
    OneFactor,
    TwoFactor,
}

/// Identity attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub groups: Vec<String>,
    pub authentication_level: AuthenticationLevel,
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store when the session is opened; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated session built from freshly loaded user details.
    pub fn for_user(details: &UserDetails, level: AuthenticationLevel) -> Self {
        Self {
            username: details.username.clone(),
            display_name: details.display_name.clone(),
            emails: details.emails.clone(),
            groups: details.groups.clone(),
            authentication_level: level,
            created_at: Some(Utc::now()),
            expires_at: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
            || self.authentication_level == AuthenticationLevel::NotAuthenticated
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Replace the identity attributes with current backend values.
    pub fn refresh_from(&mut self, details: &UserDetails) {
        self.display_name = details.display_name.clone();
        self.emails = details.emails.clone();
        self.groups = details.groups.clone();
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|candidate| candidate == group)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for opaque session tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session bound to `token`. Missing or unknown tokens resolve to an
    /// anonymous session; only store failures are errors.
    async fn load(&self, token: Option<&str>) -> Result<UserSession, SessionError>;

    /// Persist a session and return the token identifying it.
    async fn create(&self, session: UserSession) -> Result<String, SessionError>;

    async fn remove(&self, token: &str) -> Result<(), SessionError>;

    /// Drop every session belonging to `username`, returning how many were
    /// removed.
    async fn revoke_user(&self, username: &str) -> Result<usize, SessionError>;
}

/// Lifetime of sessions opened by [`MemorySessionStore::new`].
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Process-local session store. Expired sessions are evicted when looked up
/// and swept whenever a new session is opened.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<String, UserSession>,
    ttl: Option<TimeDelta>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: TimeDelta::from_std(ttl).ok(),
        }
    }

    fn sweep(&self, now: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            debug!(swept, "expired sessions removed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: Option<&str>) -> Result<UserSession, SessionError> {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Ok(UserSession::anonymous());
        };

        let now = Utc::now();
        let expired = self
            .sessions
            .remove_if(token, |_, session| session.is_expired_at(now));
        if let Some((_, session)) = expired {
            debug!(username = %session.username, "session expired");
            return Ok(UserSession::anonymous());
        }

        Ok(self
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(UserSession::anonymous))
    }

    async fn create(&self, mut session: UserSession) -> Result<String, SessionError> {
        let now = Utc::now();
        self.sweep(now);

        session.created_at = Some(now);
        session.expires_at = self.ttl.and_then(|ttl| now.checked_add_signed(ttl));

        let token = Uuid::new_v4().simple().to_string();
        debug!(username = %session.username, expires_at = ?session.expires_at, "session opened");
        self.sessions.insert(token.clone(), session);
        Ok(token)
    }

    async fn remove(&self, token: &str) -> Result<(), SessionError> {
        if let Some((_, session)) = self.sessions.remove(token) {
            debug!(username = %session.username, "session closed");
        }
        Ok(())
    }

    async fn revoke_user(&self, username: &str) -> Result<usize, SessionError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.username != username);
        let revoked = before.saturating_sub(self.sessions.len());
        if revoked > 0 {
            debug!(username, revoked, "sessions revoked");
        }
        Ok(revoked)
    }
}
