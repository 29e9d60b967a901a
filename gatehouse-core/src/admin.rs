//! Account lifecycle workflows.
//!
//! Every admin operation takes an [`Administrator`], so the authorization
//! gate has already run. Each workflow validates in a fixed order, stops at
//! the first failure and only then talks to the provider.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api_types::{
    ChangePasswordRequest, CreateUserRequest, DeleteUserRequest, ModifyUserRequest,
};
use crate::error::{AdminError, AdminResult, Rejection};
use crate::gate::{
    AdminConfig, Administrator, AuthorizationError, authorize_admin, confirm_admin, is_member,
};
use crate::notification::{EventNotification, Notifier, spawn_dispatch};
use crate::orchestrator::{ChangedField, PlannedChange, apply_changes, fetch_and_plan};
use crate::policy::PasswordPolicy;
use crate::provider::{ProviderError, UserProvider};
use crate::session::{SessionError, SessionStore, UserSession};
use crate::user::NewUserOptions;
use crate::user_info::{UserInfo, UserInfoStore, merge_user_info_and_details};
use crate::validation::{
    first_invalid_group, validate_display_name, validate_email, validate_username,
    ValidationError,
};

/// Orchestrates create, modify, delete and password changes against one
/// provider.
#[derive(Clone)]
pub struct UserAdministration {
    provider: Arc<dyn UserProvider>,
    policy: Arc<dyn PasswordPolicy>,
    notifier: Arc<dyn Notifier>,
    user_info: Arc<dyn UserInfoStore>,
    sessions: Arc<dyn SessionStore>,
    config: AdminConfig,
}

impl fmt::Debug for UserAdministration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAdministration")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UserAdministration {
    pub fn new(
        provider: Arc<dyn UserProvider>,
        policy: Arc<dyn PasswordPolicy>,
        notifier: Arc<dyn Notifier>,
        user_info: Arc<dyn UserInfoStore>,
        sessions: Arc<dyn SessionStore>,
        config: AdminConfig,
    ) -> Self {
        Self {
            provider,
            policy,
            notifier,
            user_info,
            sessions,
            config,
        }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn UserProvider> {
        &self.provider
    }

    pub fn user_info(&self) -> &Arc<dyn UserInfoStore> {
        &self.user_info
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Admin gate on the session, then confirmation against the backend.
    pub async fn authorize(
        &self,
        session: Result<UserSession, SessionError>,
        operation: &str,
    ) -> Result<Administrator, AuthorizationError> {
        let admin = authorize_admin(session, &self.config, operation, is_member)?;
        confirm_admin(admin, self.provider.as_ref(), &self.config, operation).await
    }

    /// Create an account.
    ///
    /// Order: required fields, username, display name, password policy,
    /// groups, admin escalation, then the optional email. An invalid email
    /// is logged and left out instead of failing the request.
    pub async fn create_user(
        &self,
        admin: &Administrator,
        request: CreateUserRequest,
    ) -> AdminResult<()> {
        if request.username.is_empty()
            || request.display_name.is_empty()
            || request.password.is_empty()
        {
            warn!("username, display name and password are required fields");
            return Err(Rejection::RequiredFieldsMissing.into());
        }

        if let Err(err) = validate_username(&request.username) {
            warn!(username = %request.username, "username is formatted incorrectly");
            return Err(err.into());
        }

        if let Err(err) = validate_display_name(&request.display_name) {
            warn!(display_name = %request.display_name, "display name is formatted incorrectly");
            return Err(err.into());
        }

        if let Err(err) = self.policy.check(&request.password) {
            warn!(username = %request.username, error = %err, "password rejected by policy");
            return Err(Rejection::PasswordWeak.into());
        }

        let mut options = NewUserOptions::new();

        if !request.groups.is_empty() {
            if let Some(group) = first_invalid_group(&request.groups) {
                warn!(group, "group is formatted incorrectly");
                return Err(ValidationError::Group.into());
            }
            self.guard_escalation(admin, &request.groups, &[])?;
            options = options.with_groups(request.groups.clone());
        }

        if !request.email.is_empty() {
            match validate_email(&request.email) {
                Ok(()) => options = options.with_email(request.email.clone()),
                Err(_) => warn!(
                    username = %request.username,
                    email = %request.email,
                    "email is not valid and was not stored"
                ),
            }
        }

        let has_email = options.email.is_some();

        if let Err(err) = self
            .provider
            .add_user(
                &request.username,
                &request.display_name,
                &request.password,
                options,
            )
            .await
        {
            error!(username = %request.username, error = %err, "unable to add user");
            return self.lenient("add user", err);
        }

        info!(
            username = %request.username,
            administrator = %admin.username(),
            "user was added"
        );

        if self.config.notify_users && has_email {
            self.notify(
                &request.username,
                EventNotification::new("Account Created", "An account was created for you.")
                    .with_detail("Created By", admin.username()),
            );
        }

        Ok(())
    }

    /// Bring a user's display name, email and groups to the requested state,
    /// issuing one provider call per changed field.
    pub async fn modify_user(
        &self,
        admin: &Administrator,
        request: ModifyUserRequest,
    ) -> AdminResult<Vec<ChangedField>> {
        if request.username.is_empty() {
            debug!("username is blank, user not changed");
            return Err(ValidationError::Username.into());
        }

        let requested = request.requested_state();
        let (current, changes) =
            fetch_and_plan(self.provider.as_ref(), &request.username, &requested)
                .await
                .inspect_err(|err| {
                    error!(
                        username = %request.username,
                        error = %err,
                        "error retrieving user details"
                    )
                })?;

        for change in &changes {
            match change {
                PlannedChange::DisplayName(display_name) => validate_display_name(display_name)?,
                PlannedChange::Email(email) => validate_email(email)?,
                PlannedChange::Groups(groups) => {
                    if let Some(group) = first_invalid_group(groups) {
                        warn!(group, "group is formatted incorrectly");
                        return Err(ValidationError::Group.into());
                    }
                    self.guard_escalation(admin, groups, &current.groups)?;
                }
            }
        }

        let applied = apply_changes(self.provider.as_ref(), &request.username, &changes)
            .await
            .inspect_err(|err| {
                error!(username = %request.username, error = %err, "error modifying user")
            })?;

        if applied.is_empty() {
            debug!(username = %request.username, "no changes requested");
            return Ok(applied);
        }

        if applied.contains(&ChangedField::Groups) {
            self.revoke_sessions(&request.username).await;
        }

        info!(
            username = %request.username,
            administrator = %admin.username(),
            changed = ?applied,
            "user modified by administrator"
        );

        if self.config.notify_users {
            let fields = applied
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.notify(
                &request.username,
                EventNotification::new("Account Updated", "Your account details were changed.")
                    .with_detail("Changed", fields)
                    .with_detail("Changed By", admin.username()),
            );
        }

        Ok(applied)
    }

    pub async fn delete_user(
        &self,
        admin: &Administrator,
        request: DeleteUserRequest,
    ) -> AdminResult<()> {
        if let Err(err) = validate_username(&request.username) {
            warn!(username = %request.username, "username is formatted incorrectly");
            return Err(err.into());
        }

        if let Err(err) = self.provider.delete_user(&request.username).await {
            error!(username = %request.username, error = %err, "unable to delete user");
            return self.lenient("delete user", err);
        }

        self.revoke_sessions(&request.username).await;

        if let Err(err) = self.user_info.forget(&request.username).await {
            warn!(username = %request.username, error = %err, "unable to forget user info");
        }

        info!(
            username = %request.username,
            administrator = %admin.username(),
            "user was deleted"
        );
        Ok(())
    }

    /// Every provider user merged with locally tracked info.
    pub async fn list_users(&self, _admin: &Administrator) -> AdminResult<Vec<UserInfo>> {
        let users = self
            .provider
            .list_users()
            .await
            .map_err(|err| AdminError::backend("list users", err))?;
        let info = self.user_info.list().await?;

        Ok(merge_user_info_and_details(info, &users))
    }

    /// Self-service password change for the session's own account.
    pub async fn change_password(
        &self,
        session: &UserSession,
        request: ChangePasswordRequest,
    ) -> AdminResult<()> {
        if request.old_password.is_empty() || request.new_password.is_empty() {
            return Err(Rejection::RequiredFieldsMissing.into());
        }

        if let Err(err) = self.policy.check(&request.new_password) {
            warn!(username = %session.username, error = %err, "password rejected by policy");
            return Err(Rejection::PasswordWeak.into());
        }

        match self
            .provider
            .change_password(&session.username, &request.old_password, &request.new_password)
            .await
        {
            Ok(()) => {}
            Err(ProviderError::IncorrectPassword) => {
                warn!(username = %session.username, "old password did not match");
                return Err(Rejection::PasswordIncorrect.into());
            }
            Err(err) => {
                error!(username = %session.username, error = %err, "unable to change password");
                return Err(AdminError::backend("change password", err));
            }
        }

        info!(username = %session.username, "password changed");
        self.notify(
            &session.username,
            EventNotification::new("Password Changed", "Your password was changed."),
        );

        Ok(())
    }

    fn guard_escalation(
        &self,
        admin: &Administrator,
        requested: &[String],
        current: &[String],
    ) -> Result<(), AuthorizationError> {
        let group = &self.config.admin_group;
        let grants_admin = requested.contains(group) && !current.contains(group);

        if grants_admin && !self.config.allow_admins_to_add_admins {
            warn!(
                administrator = %admin.username(),
                group = %group,
                "administrators are not allowed to add administrators"
            );
            return Err(AuthorizationError::Escalation {
                username: admin.username().to_string(),
                group: group.clone(),
            });
        }

        Ok(())
    }

    /// Sessions hold a copy of the user's groups; force a fresh login.
    async fn revoke_sessions(&self, username: &str) {
        match self.sessions.revoke_user(username).await {
            Ok(0) => {}
            Ok(revoked) => info!(username, revoked, "sessions revoked"),
            Err(err) => warn!(username, error = %err, "unable to revoke sessions"),
        }
    }

    fn lenient(&self, operation: &'static str, err: ProviderError) -> AdminResult<()> {
        if self.config.strict_backend_errors {
            Err(AdminError::backend(operation, err))
        } else {
            Ok(())
        }
    }

    fn notify(&self, username: &str, event: EventNotification) {
        spawn_dispatch(
            Arc::clone(&self.provider),
            Arc::clone(&self.notifier),
            username.to_string(),
            event,
        );
    }
}
