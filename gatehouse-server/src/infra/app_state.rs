use std::{fmt, sync::Arc};

use gatehouse_core::UserAdministration;
use gatehouse_core::notification::Notifier;
use gatehouse_core::provider::UserProvider;
use gatehouse_core::session::SessionStore;
use gatehouse_core::user_info::UserInfoStore;

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admin: UserAdministration,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Config,
        provider: Arc<dyn UserProvider>,
        sessions: Arc<dyn SessionStore>,
        user_info: Arc<dyn UserInfoStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let admin = UserAdministration::new(
            provider,
            Arc::new(config.password_policy.clone()),
            notifier,
            user_info,
            sessions,
            config.administration.clone(),
        );

        Self {
            config: Arc::new(config),
            admin,
        }
    }

    pub fn provider(&self) -> &Arc<dyn UserProvider> {
        self.admin.provider()
    }

    pub fn user_info(&self) -> &Arc<dyn UserInfoStore> {
        self.admin.user_info()
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        self.admin.sessions()
    }
}
