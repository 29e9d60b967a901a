use serde::{Deserialize, Serialize};
use std::fmt;

/// Attributes of a single account as reported by a [`UserProvider`].
///
/// The username is the identity key and never changes after creation. The
/// first entry of `emails` is the primary address used for notifications.
///
/// [`UserProvider`]: crate::provider::UserProvider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserDetails {
    /// Primary email address, if the user has any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    /// Mailbox strings (`Display Name <address>`) for every email, primary first.
    pub fn addresses(&self) -> Vec<Mailbox> {
        self.emails
            .iter()
            .map(|address| Mailbox {
                name: self.display_name.clone(),
                address: address.clone(),
            })
            .collect()
    }

    /// Whether the user is a member of `group`.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|candidate| candidate == group)
    }
}

/// Named email recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: String,
    pub address: String,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<{}>", self.address)
        } else {
            write!(f, "{} <{}>", self.name, self.address)
        }
    }
}

/// Optional attributes supplied when creating a user.
///
/// Backends that do not support an attribute are free to ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserOptions {
    pub email: Option<String>,
    pub groups: Option<Vec<String>>,
}

impl NewUserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = Some(groups);
        self
    }
}

/// Sparse patch applied by [`UserProvider::update_user`].
///
/// Only populated fields are meaningful. `add_groups` and `remove_groups`
/// are applied after `groups` when more than one is set.
///
/// [`UserProvider::update_user`]: crate::provider::UserProvider::update_user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyUserOptions {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub groups: Option<Vec<String>>,
    pub password: Option<String>,
    pub add_groups: Vec<String>,
    pub remove_groups: Vec<String>,
}

impl ModifyUserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn groups(mut self, groups: Vec<String>) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn add_group(mut self, group: impl Into<String>) -> Self {
        self.add_groups.push(group.into());
        self
    }

    pub fn remove_group(mut self, group: impl Into<String>) -> Self {
        self.remove_groups.push(group.into());
        self
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.groups.is_none()
            && self.password.is_none()
            && self.add_groups.is_empty()
            && self.remove_groups.is_empty()
    }
}
