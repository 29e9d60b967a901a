use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use gatehouse_core::policy::PasswordRules;

use super::models::BackendKind;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub administration: FileAdministrationConfig,
    #[serde(default)]
    pub authentication_backend: FileBackendConfig,
    pub password_policy: Option<PasswordRules>,
    #[serde(default)]
    pub crypto: FileCryptoConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_lifetime_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAdministrationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_admins_to_add_admins: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_backend_errors: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<BackendKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCryptoConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_kib: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub log_filter: Option<String>,
    pub session_lifetime_secs: Option<u64>,
    pub admin_enabled: Option<bool>,
    pub admin_group: Option<String>,
    pub allow_admins_to_add_admins: Option<bool>,
    pub notify_users: Option<bool>,
    pub strict_backend_errors: Option<bool>,
    /// Raw value, validated by the loader.
    pub backend: Option<String>,
    pub users_file: Option<PathBuf>,
    pub password_pepper: Option<String>,
    pub argon2_memory_kib: Option<u32>,
    pub argon2_iterations: Option<u32>,
    pub argon2_parallelism: Option<u32>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("GATEHOUSE_CONFIG").ok().map(PathBuf::from),
            server_host: std::env::var("GATEHOUSE_HOST").ok(),
            server_port: parse_var("GATEHOUSE_PORT"),
            log_filter: std::env::var("GATEHOUSE_LOG").ok(),
            session_lifetime_secs: parse_var("GATEHOUSE_SESSION_LIFETIME_SECS"),
            admin_enabled: parse_bool_var("GATEHOUSE_ADMIN_ENABLED"),
            admin_group: std::env::var("GATEHOUSE_ADMIN_GROUP").ok(),
            allow_admins_to_add_admins: parse_bool_var("GATEHOUSE_ALLOW_ADMINS_TO_ADD_ADMINS"),
            notify_users: parse_bool_var("GATEHOUSE_NOTIFY_USERS"),
            strict_backend_errors: parse_bool_var("GATEHOUSE_STRICT_BACKEND_ERRORS"),
            backend: std::env::var("GATEHOUSE_BACKEND").ok(),
            users_file: std::env::var("GATEHOUSE_USERS_FILE").ok().map(PathBuf::from),
            password_pepper: std::env::var("GATEHOUSE_PASSWORD_PEPPER").ok(),
            argon2_memory_kib: parse_var("GATEHOUSE_ARGON2_MEMORY_KIB"),
            argon2_iterations: parse_var("GATEHOUSE_ARGON2_ITERATIONS"),
            argon2_parallelism: parse_var("GATEHOUSE_ARGON2_PARALLELISM"),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn crypto_cost_keys_are_read() {
        let file: FileConfig =
            toml::from_str("[crypto]\nmemory_kib = 19456\niterations = 2\n").unwrap();
        assert_eq!(file.crypto.memory_kib, Some(19456));
        assert_eq!(file.crypto.iterations, Some(2));
        assert!(file.crypto.parallelism.is_none());
    }

    #[test]
    fn file_sections_are_optional() {
        let file: FileConfig = toml::from_str("[server]\nport = 9092\n").unwrap();
        assert_eq!(file.server.port, Some(9092));
        assert!(file.administration.enabled.is_none());
        assert!(file.password_policy.is_none());
    }
}
