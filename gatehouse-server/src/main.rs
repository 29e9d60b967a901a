//! # Gatehouse Server
//!
//! Admin user-lifecycle API in front of a pluggable identity backend.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use gatehouse_core::crypto::CredentialHasher;
use gatehouse_core::notification::TracingNotifier;
use gatehouse_core::provider::{FileUserProvider, MemoryUserProvider, UserProvider};
use gatehouse_core::session::MemorySessionStore;
use gatehouse_core::user_info::MemoryUserInfoStore;
use gatehouse_server::{
    AppState,
    infra::{
        config::{BackendConfig, Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions},
        logging,
    },
    routes,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "gatehouse-server")]
#[command(about = "User lifecycle administration API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an Argon2id hash for the users database using the configured pepper
    HashPassword {
        /// Password to hash
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ConfigLoad { config, warnings } = load_config(&cli.serve)?;

    logging::init_tracing(&config.server.log_filter);
    logging::log_config_load(&config.metadata, &warnings);

    match cli.command {
        Some(Command::HashPassword { password }) => {
            let hasher = build_hasher(&config)?;
            let hash = hasher
                .hash(&password)
                .await
                .context("failed to hash password")?;
            println!("{hash}");
            Ok(())
        }
        None => run_server(config).await,
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ConfigLoad> {
    let mut load = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    if let Some(host) = &args.host {
        load.config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        load.config.server.port = port;
    }

    Ok(load)
}

fn build_hasher(config: &Config) -> anyhow::Result<CredentialHasher> {
    CredentialHasher::new(&config.crypto.password_pepper, config.crypto.hashing)
        .context("failed to initialise password hasher")
}

async fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn UserProvider>> {
    let hasher = build_hasher(config)?;

    let provider: Arc<dyn UserProvider> = match &config.authentication_backend {
        BackendConfig::File { path } => Arc::new(
            FileUserProvider::open(path.clone(), hasher)
                .await
                .with_context(|| format!("failed to open users database {}", path.display()))?,
        ),
        BackendConfig::Memory => Arc::new(MemoryUserProvider::new(hasher)),
    };

    provider
        .startup_check()
        .await
        .context("identity backend startup check failed")?;

    Ok(provider)
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let provider = build_provider(&config).await?;

    let bind = (config.server.host.clone(), config.server.port);
    let sessions = MemorySessionStore::with_ttl(Duration::from_secs(
        config.server.session_lifetime_secs,
    ));

    let state = AppState::new(
        config,
        provider,
        Arc::new(sessions),
        Arc::new(MemoryUserInfoStore::new()),
        Arc::new(TracingNotifier),
    );
    info!(
        admin_enabled = state.admin.config().enabled,
        admin_group = %state.admin.config().admin_group,
        "administration settings"
    );

    let app = routes::create_app(state);

    let listener = tokio::net::TcpListener::bind((bind.0.as_str(), bind.1))
        .await
        .with_context(|| format!("failed to bind {}:{}", bind.0, bind.1))?;
    let addr: SocketAddr = listener.local_addr().context("listener has no local address")?;
    info!("Gatehouse listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
