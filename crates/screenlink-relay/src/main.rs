//! screenlink relay: entry point.
//!
//! Brokers WebRTC session setup between hosts and viewers and relays viewer
//! input to hosts over WebSocket.
//!
//! # Usage
//!
//! ```text
//! screenlink-relay [OPTIONS]
//!
//! Options:
//!   --bind <IP>                 Listener address       [default: 0.0.0.0]
//!   --port <PORT>               Listener port          [default: 8765]
//!   --config <PATH>             Optional TOML config file
//!   --outbound-capacity <N>     Per-endpoint send queue length
//!   --surface-width <PX>        Fallback surface width
//!   --surface-height <PX>       Fallback surface height
//!   --dry-run                   Record actuator calls to the log
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable            | Description              |
//! |---------------------|--------------------------|
//! | `SCREENLINK_BIND`   | Listener address         |
//! | `SCREENLINK_PORT`   | Listener port            |
//! | `SCREENLINK_CONFIG` | Config file path         |
//! | `RUST_LOG`          | `tracing` filter         |
//!
//! CLI values override the config file, which overrides built-in defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use screenlink_relay::application::InputActuator;
use screenlink_relay::domain::RelayConfig;
use screenlink_relay::infrastructure::{run_server, NoopActuator, RecordingActuator};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// screenlink signaling and control relay.
#[derive(Debug, Parser)]
#[command(
    name = "screenlink-relay",
    about = "Signaling and input relay for screenlink hosts and viewers",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket listener to.
    #[arg(long, env = "SCREENLINK_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "SCREENLINK_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file.  Every key in it is optional.
    #[arg(long, env = "SCREENLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Messages queued per endpoint before further ones are dropped.
    #[arg(long)]
    outbound_capacity: Option<usize>,

    /// Surface width used when the actuator reports none.
    #[arg(long)]
    surface_width: Option<u32>,

    /// Surface height used when the actuator reports none.
    #[arg(long)]
    surface_height: Option<u32>,

    /// Log actuator calls instead of discarding them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

impl Cli {
    /// Builds the [`RelayConfig`]: defaults, then the config file, then CLI
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or `--bind` is
    /// not an IP address.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(bind) = &self.bind {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
            config.bind_addr = SocketAddr::new(ip, config.bind_addr.port());
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(capacity) = self.outbound_capacity {
            config.outbound_capacity = capacity.max(1);
        }
        if let Some(width) = self.surface_width {
            config.fallback_surface.0 = width;
        }
        if let Some(height) = self.surface_height {
            config.fallback_surface.1 = height;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let config = cli.into_relay_config()?;

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("screenlink relay starting on {}", config.bind_addr);

    let actuator: Arc<dyn InputActuator> = if dry_run {
        Arc::new(RecordingActuator::new(config.fallback_surface))
    } else {
        Arc::new(NoopActuator::new(config.fallback_surface))
    };

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received; stopping");
        running_clone.store(false, Ordering::Relaxed);
    });

    run_server(config, actuator, running).await?;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
