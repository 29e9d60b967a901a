//! Account event notifications.
//!
//! Workflows decide when a user is told about a change; rendering and
//! transport belong to the [`Notifier`] implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::provider::{ProviderError, UserProvider};
use crate::user::Mailbox;

/// Event body handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventNotification {
    pub title: String,
    pub display_name: String,
    pub body: String,
    pub details: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl EventNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            display_name: String::new(),
            body: body.into(),
            details: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to look up user: {0}")]
    Lookup(#[from] ProviderError),

    #[error("no email address was found for user")]
    NoEmail,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &Mailbox,
        subject: &str,
        event: &EventNotification,
    ) -> Result<(), NotifyError>;
}

/// Notifier that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        recipient: &Mailbox,
        subject: &str,
        event: &EventNotification,
    ) -> Result<(), NotifyError> {
        info!(
            recipient = %recipient,
            subject,
            body = %event.body,
            details = ?event.details,
            "account notification"
        );
        Ok(())
    }
}

/// Look up `username` and send `event` to its primary address.
pub async fn dispatch_event(
    provider: &dyn UserProvider,
    notifier: &dyn Notifier,
    username: &str,
    mut event: EventNotification,
) -> Result<(), NotifyError> {
    let details = provider.get_details(username).await?;
    let addresses = details.addresses();
    let recipient = addresses.first().ok_or(NotifyError::NoEmail)?;

    event.display_name = details.display_name.clone();
    debug!(username, recipient = %recipient, "sending account event notification");

    notifier.send(recipient, &event.title, &event).await
}

/// Fire-and-forget [`dispatch_event`]; failures are logged.
pub fn spawn_dispatch(
    provider: Arc<dyn UserProvider>,
    notifier: Arc<dyn Notifier>,
    username: String,
    event: EventNotification,
) {
    tokio::spawn(async move {
        let result = dispatch_event(provider.as_ref(), notifier.as_ref(), &username, event).await;
        if let Err(err) = result {
            error!(
                username = %username,
                error = %err,
                "failed to notify user of an important event"
            );
        }
    });
}
