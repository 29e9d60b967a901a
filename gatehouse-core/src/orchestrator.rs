//! Diff-and-apply update of a user's editable attributes.
//!
//! The current details are fetched once, compared field by field against the
//! requested state, and only differing fields become backend calls. Calls are
//! issued in the order display name, email, groups. There is no transaction:
//! the first failure stops the sequence and earlier changes stay applied.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::provider::{ProviderError, UserProvider};
use crate::user::UserDetails;

/// Target values for the editable attributes of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedState {
    pub display_name: String,
    pub email: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    DisplayName,
    Email,
    Groups,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplayName => write!(f, "display name"),
            Self::Email => write!(f, "email"),
            Self::Groups => write!(f, "groups"),
        }
    }
}

/// One backend call the update needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange {
    DisplayName(String),
    Email(String),
    Groups(Vec<String>),
}

impl PlannedChange {
    pub fn field(&self) -> ChangedField {
        match self {
            Self::DisplayName(_) => ChangedField::DisplayName,
            Self::Email(_) => ChangedField::Email,
            Self::Groups(_) => ChangedField::Groups,
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to load user details: {0}")]
    Lookup(#[source] ProviderError),

    #[error("failed to change {field} (already applied: {applied:?}): {source}")]
    Apply {
        field: ChangedField,
        applied: Vec<ChangedField>,
        #[source]
        source: ProviderError,
    },
}

/// Compare `current` with `requested`.
///
/// Display names compare by value, the requested email against the primary
/// address (empty when the user has none) and groups as ordered sequences,
/// so a reordering counts as a change.
pub fn plan_changes(current: &UserDetails, requested: &RequestedState) -> Vec<PlannedChange> {
    let mut changes = Vec::new();

    if current.display_name != requested.display_name {
        changes.push(PlannedChange::DisplayName(requested.display_name.clone()));
    }

    if current.primary_email().unwrap_or_default() != requested.email {
        changes.push(PlannedChange::Email(requested.email.clone()));
    }

    if current.groups != requested.groups {
        changes.push(PlannedChange::Groups(requested.groups.clone()));
    }

    changes
}

/// Fetch the current details of `username` and plan the update.
pub async fn fetch_and_plan(
    provider: &dyn UserProvider,
    username: &str,
    requested: &RequestedState,
) -> Result<(UserDetails, Vec<PlannedChange>), UpdateError> {
    let current = provider
        .get_details(username)
        .await
        .map_err(UpdateError::Lookup)?;
    let changes = plan_changes(&current, requested);

    Ok((current, changes))
}

/// Issue one backend call per planned change, in order.
///
/// Returns the applied fields. On failure nothing is rolled back; the error
/// lists what was applied before the failing call.
pub async fn apply_changes(
    provider: &dyn UserProvider,
    username: &str,
    changes: &[PlannedChange],
) -> Result<Vec<ChangedField>, UpdateError> {
    let mut applied = Vec::with_capacity(changes.len());

    for change in changes {
        let result = match change {
            PlannedChange::DisplayName(display_name) => {
                provider.change_display_name(username, display_name).await
            }
            PlannedChange::Email(email) => provider.change_email(username, email).await,
            PlannedChange::Groups(groups) => provider.change_groups(username, groups).await,
        };

        if let Err(source) = result {
            return Err(UpdateError::Apply {
                field: change.field(),
                applied,
                source,
            });
        }

        debug!(username, field = %change.field(), "user attribute changed");
        applied.push(change.field());
    }

    Ok(applied)
}
