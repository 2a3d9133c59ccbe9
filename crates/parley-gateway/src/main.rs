//! # parley
//!
//! Relay server binary: loads settings, starts logging and metrics, serves
//! the relay until ctrl-c, then drains live sessions.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parley_server::config::session_config;
use parley_server::{ParleyServer, ServerConfig, WsDialer};
use parley_settings::ParleySettings;

/// Realtime conversation relay.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Realtime conversation relay")]
struct Cli {
    /// Host to bind (overrides settings and `HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.parley/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(parley_settings::settings_path)
    }

    /// Apply command-line overrides on top of file and env layers.
    fn apply(&self, settings: &mut ParleySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.settings_path();
    let mut settings = parley_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);

    parley_core::logging::init_subscriber(&settings.logging.level, settings.logging.format);
    settings.validate().context("Invalid settings")?;

    let metrics = parley_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from_settings(&settings.server);
    let dialer = Arc::new(WsDialer::new(&settings.upstream));
    tracing::info!(
        name = parley_core::constants::NAME,
        version = parley_core::constants::VERSION,
        endpoint = dialer.endpoint(),
        write_timeout_secs = config.write_timeout.as_secs(),
        queue_capacity = config.queue_capacity,
        "starting relay"
    );

    let server = ParleyServer::new(config, session_config(&settings.session), dialer)
        .with_metrics(metrics);
    let (addr, server_task) = server
        .listen()
        .await
        .context("Failed to bind listener")?;
    tracing::info!(%addr, "relay ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown_gracefully(server_task).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
