use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;

use gatehouse_core::AdminConfig;
use gatehouse_core::crypto::HashingCost;
use gatehouse_core::session::DEFAULT_SESSION_TTL;

use super::{
    models::{
        BackendConfig, BackendKind, Config, ConfigMetadata, ConfigWarnings, CryptoConfig,
        ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
};

/// Placeholder pepper used when none is configured.
pub const DEFAULT_PASSWORD_PEPPER: &str = "gatehouse-insecure-default-pepper";

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("gatehouse.toml"),
        PathBuf::from("config/gatehouse.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?,
            None => dotenvy::dotenv()
                .map(|_| true)
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?,
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) =
            self.compose_config(file_config, env_config, config_path, env_file_loaded)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(explicit) = &self.options.config_path {
            (Some(explicit.clone()), true)
        } else if let Some(from_env) = &env_config.config_path {
            (Some(from_env.clone()), true)
        } else {
            let default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
            (default, false)
        };

        let Some(path) = path else {
            return Ok((None, None));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
            path: path.clone(),
            source: err,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No gatehouse.toml detected; falling back to environment variables",
                "Create gatehouse.toml or point GATEHOUSE_CONFIG at a configuration file",
            );
        }

        let FileConfig {
            server: file_server,
            administration: file_admin,
            authentication_backend: file_backend,
            password_policy: file_policy,
            crypto: file_crypto,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .or(file_server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.server_port.or(file_server.port).unwrap_or(9091),
            log_filter: env
                .log_filter
                .or(file_server.log_filter)
                .unwrap_or_else(|| "info,tower_http=warn".to_string()),
            session_lifetime_secs: env
                .session_lifetime_secs
                .or(file_server.session_lifetime_secs)
                .unwrap_or(DEFAULT_SESSION_TTL.as_secs()),
        };

        let defaults = AdminConfig::default();
        let administration = AdminConfig {
            enabled: env
                .admin_enabled
                .or(file_admin.enabled)
                .unwrap_or(defaults.enabled),
            admin_group: env
                .admin_group
                .or(file_admin.admin_group)
                .unwrap_or(defaults.admin_group),
            allow_admins_to_add_admins: env
                .allow_admins_to_add_admins
                .or(file_admin.allow_admins_to_add_admins)
                .unwrap_or(defaults.allow_admins_to_add_admins),
            notify_users: env
                .notify_users
                .or(file_admin.notify_users)
                .unwrap_or(defaults.notify_users),
            strict_backend_errors: env
                .strict_backend_errors
                .or(file_admin.strict_backend_errors)
                .unwrap_or(defaults.strict_backend_errors),
        };

        let kind = match env.backend {
            Some(raw) => BackendKind::parse(&raw).ok_or(ConfigLoadError::InvalidValue {
                key: "GATEHOUSE_BACKEND",
                value: raw,
            })?,
            None => file_backend.kind.unwrap_or(BackendKind::File),
        };
        let authentication_backend = match kind {
            BackendKind::File => BackendConfig::File {
                path: env
                    .users_file
                    .or(file_backend.path)
                    .unwrap_or_else(|| PathBuf::from("users_database.yml")),
            },
            BackendKind::Memory => BackendConfig::Memory,
        };

        let default_cost = HashingCost::default();
        let crypto = CryptoConfig {
            password_pepper: env
                .password_pepper
                .or(file_crypto.password_pepper)
                .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
            hashing: HashingCost {
                memory_kib: env
                    .argon2_memory_kib
                    .or(file_crypto.memory_kib)
                    .unwrap_or(default_cost.memory_kib),
                iterations: env
                    .argon2_iterations
                    .or(file_crypto.iterations)
                    .unwrap_or(default_cost.iterations),
                parallelism: env
                    .argon2_parallelism
                    .or(file_crypto.parallelism)
                    .unwrap_or(default_cost.parallelism),
            },
        };

        let config = Config {
            server,
            administration,
            authentication_backend,
            password_policy: file_policy.unwrap_or_default(),
            crypto,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        warnings_for(&config, &mut warnings)?;

        Ok((config, warnings))
    }
}

/// Posture checks run after composition. Fatal problems are errors, the
/// rest become warnings.
fn warnings_for(config: &Config, warnings: &mut ConfigWarnings) -> Result<(), ConfigLoadError> {
    if config.crypto.password_pepper.is_empty() {
        return Err(ConfigLoadError::InvalidValue {
            key: "crypto.password_pepper",
            value: String::new(),
        });
    }

    if config.server.session_lifetime_secs == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key: "server.session_lifetime_secs",
            value: "0".to_string(),
        });
    }

    if config.administration.admin_group.trim().is_empty() {
        return Err(ConfigLoadError::InvalidValue {
            key: "administration.admin_group",
            value: config.administration.admin_group.clone(),
        });
    }

    if config.crypto.password_pepper == DEFAULT_PASSWORD_PEPPER {
        warnings.push_with_hint(
            "Using the built-in password pepper",
            "Set crypto.password_pepper or GATEHOUSE_PASSWORD_PEPPER",
        );
    }

    if config.crypto.hashing.is_weaker_than(&HashingCost::default()) {
        warnings.push_with_hint(
            format!(
                "Argon2 cost below the recommended default (m={} KiB, t={})",
                config.crypto.hashing.memory_kib, config.crypto.hashing.iterations
            ),
            "Raise crypto.memory_kib and crypto.iterations outside of development",
        );
    }

    if config.authentication_backend == BackendConfig::Memory {
        warnings.push("Memory authentication backend selected; accounts are lost on restart");
    }

    if !config.administration.enabled {
        warnings.push("Administration is disabled; admin endpoints will reject every request");
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
