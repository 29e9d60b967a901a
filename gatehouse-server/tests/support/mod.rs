#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use serde_json::{Value, json};

use gatehouse_core::AdminConfig;
use gatehouse_core::crypto::{CredentialHasher, HashingCost};
use gatehouse_core::notification::TracingNotifier;
use gatehouse_core::policy::PasswordRules;
use gatehouse_core::provider::MemoryUserProvider;
use gatehouse_core::session::MemorySessionStore;
use gatehouse_core::user::UserDetails;
use gatehouse_core::user_info::MemoryUserInfoStore;
use gatehouse_server::{
    AppState,
    infra::config::{BackendConfig, Config, ConfigMetadata, CryptoConfig, ServerConfig},
    routes::create_app,
};

pub const PASSWORD: &str = "Password#123";

pub struct TestApp {
    pub server: TestServer,
    pub provider: Arc<MemoryUserProvider>,
    pub user_info: Arc<MemoryUserInfoStore>,
}

pub fn admin_enabled() -> AdminConfig {
    AdminConfig {
        enabled: true,
        ..AdminConfig::default()
    }
}

pub fn test_config(administration: AdminConfig) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_filter: "warn".into(),
            session_lifetime_secs: 3600,
        },
        administration,
        authentication_backend: BackendConfig::Memory,
        password_policy: PasswordRules::default(),
        crypto: CryptoConfig {
            password_pepper: "test-pepper".into(),
            hashing: HashingCost::minimal(),
        },
        metadata: ConfigMetadata {
            config_path: Some(PathBuf::from("gatehouse.toml")),
            env_file_loaded: false,
        },
    }
}

fn details(username: &str, display_name: &str, emails: &[&str], groups: &[&str]) -> UserDetails {
    UserDetails {
        username: username.into(),
        display_name: display_name.into(),
        emails: emails.iter().map(|e| e.to_string()).collect(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

/// App with `root` (admin), `john` (developer) and `alice` seeded.
pub async fn build_test_app(administration: AdminConfig) -> Result<TestApp> {
    let hasher = CredentialHasher::new("test-pepper", HashingCost::minimal())?;
    let provider = Arc::new(MemoryUserProvider::new(hasher));

    provider
        .seed_user(details("root", "Root", &["root@x.com"], &["admins"]), PASSWORD, false)
        .await?;
    provider
        .seed_user(details("john", "John", &["john@x.com"], &["dev"]), PASSWORD, false)
        .await?;
    provider
        .seed_user(
            details("alice", "A", &["a@x.com"], &["g1", "g2"]),
            PASSWORD,
            false,
        )
        .await?;

    let user_info = Arc::new(MemoryUserInfoStore::new());
    let state = AppState::new(
        test_config(administration),
        provider.clone(),
        Arc::new(MemorySessionStore::new()),
        user_info.clone(),
        Arc::new(TracingNotifier),
    );

    let server = TestServer::new(create_app(state)).map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        provider,
        user_info,
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let response = server
        .post("/api/firstfactor")
        .json(&json!({ "username": username, "password": password }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing session token"))
}
