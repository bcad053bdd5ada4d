//! cli
//!
//! Process entry point: flags, configuration, logging, then the server.
//!
//! # Startup
//!
//! 1. Parse flags
//! 2. Initialize tracing (`RUST_LOG` wins, else `--debug`, else `info`)
//! 3. Load configuration and apply flag overrides
//! 4. Build the session and apply any initial repository path
//! 5. Bind and serve until a shutdown signal
//!
//! An invalid initial repository path or bind address stops startup.

pub mod args;

pub use args::Cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::server;
use crate::session::{RepositorySession, SessionSettings};

/// Run the service.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(source) = &config.source {
        tracing::info!(path = %source.display(), "loaded configuration");
    }
    apply_overrides(&mut config, &cli);

    let settings = SessionSettings::from_settings(&config.settings)?;
    let session = Arc::new(RepositorySession::new(settings));

    if let Some(path) = &config.settings.repository.path {
        session
            .set_repository_path(path)
            .with_context(|| format!("cannot use repository '{}'", path.display()))?;
    }

    let addr = config.settings.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    server::serve(listener, session, &config.settings.server)
        .await
        .context("server terminated abnormally")?;

    tracing::info!("shut down");
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.settings.server.bind = bind.clone();
    }
    if let Some(repo) = &cli.repo {
        config.settings.repository.path = Some(repo.clone());
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (e.g. in tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
