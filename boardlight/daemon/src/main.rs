//! Boardlight Daemon - Match-State Display Server
//!
//! Long-running device process: listens on a fixed TCP address for state
//! tokens from the match server and drives the display animator. The
//! hardware drivers are out of scope here; this binary ships a logging
//! effector so the daemon runs headless.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:4321)
//! boardlight-daemon
//!
//! # Custom bind address
//! boardlight-daemon --bind 0.0.0.0:4321
//!
//! # With config file
//! boardlight-daemon --config /etc/boardlight/display.toml
//!
//! # Verbose logging
//! RUST_LOG=debug boardlight-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: graceful shutdown (active animation is
//!   cancelled with the configured grace period)

mod effector;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use boardlight_core::{Animator, CancelToken, DisplayConfig, StateListener, StateStore};

use effector::LogEffector;

/// Boardlight daemon - receives match state over TCP and animates the display
#[derive(Parser, Debug)]
#[command(name = "boardlight-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TCP address to listen on (overrides the config file)
    #[arg(short = 'b', long, env = "BOARDLIGHT_BIND", value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "BOARDLIGHT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "BOARDLIGHT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "boardlight_daemon={level},boardlight_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Spawn the SIGTERM/SIGINT handler that cancels the shutdown token.
fn spawn_signal_handler(shutdown: CancelToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
            _ = sigint.recv() => info!("received SIGINT, initiating shutdown"),
        }
        shutdown.cancel();
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("boardlight daemon starting");
    info!("version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => {
            info!(config_path = ?path, "loading config file");
            DisplayConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => DisplayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let store = StateStore::new();
    let shutdown = CancelToken::new();
    spawn_signal_handler(shutdown.clone())?;

    // Bind failure is the only fatal startup error.
    let listener = StateListener::bind(config.bind_addr, Arc::clone(&store), shutdown.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?
        .with_read_timeout(config.read_timeout())
        .with_max_pending(config.max_pending_bytes)
        .with_reaccept(config.reaccept);

    let animator = Animator::new(
        store,
        Arc::new(LogEffector::default()),
        config.schedule_table(),
        shutdown.clone(),
    )
    .with_timing(config.poll_interval(), config.grace_period())
    .with_default_visual(config.default_state);

    // The two activities share nothing but the store and the shutdown
    // token; run both to completion.
    tokio::join!(listener.run(), animator.run());

    info!("boardlight daemon stopped cleanly");
    Ok(())
}
