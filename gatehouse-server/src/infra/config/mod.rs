pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    BackendConfig, BackendKind, Config, ConfigMetadata, ConfigWarning, ConfigWarnings,
    CryptoConfig, ServerConfig,
};
