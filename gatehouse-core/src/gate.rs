//! Admin-privilege check shared by every mutating endpoint.
//!
//! Callers only ever see one opaque failure; the concrete reason is logged
//! here and carried in [`AuthorizationError`] for tests and diagnostics.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::provider::{ProviderError, UserProvider};
use crate::session::{SessionError, UserSession};

/// Message returned to clients for every authorization failure.
pub const OPERATION_FAILED: &str = "Operation failed.";

/// Administration settings consumed by the gate and the admin workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    pub admin_group: String,
    pub allow_admins_to_add_admins: bool,
    /// Notify users about account changes made by an administrator.
    pub notify_users: bool,
    /// Escalate backend failures on create and delete to internal errors.
    pub strict_backend_errors: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_group: "admins".to_string(),
            allow_admins_to_add_admins: false,
            notify_users: false,
            strict_backend_errors: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("unable to retrieve session: {0}")]
    SessionUnavailable(#[source] SessionError),

    #[error("user is anonymous")]
    Anonymous,

    #[error("user '{username}' is not a member of the '{group}' group")]
    NotAdmin { username: String, group: String },

    #[error("administration is disabled")]
    AdministrationDisabled,

    #[error("user '{username}' may not grant the '{group}' group")]
    Escalation { username: String, group: String },

    #[error("user '{username}' no longer exists or is disabled")]
    AccountGone { username: String },

    #[error("unable to confirm membership of '{username}': {source}")]
    MembershipUnconfirmed {
        username: String,
        #[source]
        source: ProviderError,
    },
}

/// Proof that the current session passed the admin gate.
///
/// Only [`authorize_admin`] constructs it, so workflows that take one cannot
/// be reached without the check.
#[derive(Debug, Clone)]
pub struct Administrator {
    session: UserSession,
}

impl Administrator {
    pub fn username(&self) -> &str {
        &self.session.username
    }

    pub fn session(&self) -> &UserSession {
        &self.session
    }

    #[cfg(test)]
    pub(crate) fn for_tests(session: UserSession) -> Self {
        Self { session }
    }
}

/// Default membership test: the session's groups contain `group`.
pub fn is_member(session: &UserSession, group: &str) -> bool {
    session.is_member_of(group)
}

/// Require a retrievable, non-anonymous session.
pub fn require_authenticated(
    session: Result<UserSession, SessionError>,
    operation: &str,
) -> Result<UserSession, AuthorizationError> {
    let session = match session {
        Ok(session) => session,
        Err(err) => {
            error!(operation, error = %err, "error retrieving session");
            return Err(AuthorizationError::SessionUnavailable(err));
        }
    };

    if session.is_anonymous() {
        warn!(operation, "rejected anonymous user");
        return Err(AuthorizationError::Anonymous);
    }

    Ok(session)
}

/// Run the gate: administration enabled, session present, not anonymous and
/// a member of the configured admin group. Stops at the first failed check.
pub fn authorize_admin<F>(
    session: Result<UserSession, SessionError>,
    config: &AdminConfig,
    operation: &str,
    is_admin: F,
) -> Result<Administrator, AuthorizationError>
where
    F: Fn(&UserSession, &str) -> bool,
{
    if !config.enabled {
        warn!(operation, "administration is disabled");
        return Err(AuthorizationError::AdministrationDisabled);
    }

    let session = require_authenticated(session, operation)?;

    if !is_admin(&session, &config.admin_group) {
        warn!(
            operation,
            username = %session.username,
            group = %config.admin_group,
            "user is not an administrator"
        );
        return Err(AuthorizationError::NotAdmin {
            username: session.username,
            group: config.admin_group.clone(),
        });
    }

    Ok(Administrator { session })
}

/// Re-check an [`Administrator`] against the backend.
///
/// Sessions copy the user's groups at login, so a deleted, disabled or
/// demoted administrator is only caught here. On success the session carries
/// the backend's current attributes.
pub async fn confirm_admin(
    admin: Administrator,
    provider: &dyn UserProvider,
    config: &AdminConfig,
    operation: &str,
) -> Result<Administrator, AuthorizationError> {
    let Administrator { mut session } = admin;

    let details = match provider.get_details(&session.username).await {
        Ok(details) => details,
        Err(ProviderError::UserNotFound) => {
            warn!(
                operation,
                username = %session.username,
                "administrator no longer exists or is disabled"
            );
            return Err(AuthorizationError::AccountGone {
                username: session.username,
            });
        }
        Err(err) => {
            error!(
                operation,
                username = %session.username,
                error = %err,
                "unable to confirm administrator"
            );
            return Err(AuthorizationError::MembershipUnconfirmed {
                username: session.username,
                source: err,
            });
        }
    };

    if !details.is_member_of(&config.admin_group) {
        warn!(
            operation,
            username = %session.username,
            group = %config.admin_group,
            "administrator was removed from the admin group"
        );
        return Err(AuthorizationError::NotAdmin {
            username: session.username,
            group: config.admin_group.clone(),
        });
    }

    session.refresh_from(&details);
    Ok(Administrator { session })
}
