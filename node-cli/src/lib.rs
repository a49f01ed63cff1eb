//! Fleet node daemon entrypoint: component wiring, staggered ticker startup,
//! and signal handling. The binary at `src/main.rs` is a thin shell around
//! [`build`] and [`run`] so integration tests can drive a fully-wired node
//! without going through `std::process`.

mod wiring;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tokio::time::interval;
use tracing::info;

use node_serve::AppState;

pub use wiring::{build, BuildError, WiredNode};

/// Staggered initial delays so subsystems don't all stampede at boot.
const SCHEDULER_INITIAL_DELAY: Duration = Duration::from_secs(10);
const KNOWLEDGE_SYNC_INITIAL_DELAY: Duration = Duration::from_secs(15);
const MEMORY_CLEANUP_INITIAL_DELAY: Duration = Duration::from_secs(20);
const EVENT_HOOKS_INITIAL_DELAY: Duration = Duration::from_secs(25);

#[derive(Debug, Parser)]
#[command(name = "fleet-node", about = "Fleet node daemon: mesh agent with scheduler, event hooks, and knowledge-sync")]
pub struct Cli {
    /// Application directory name under the per-user config dir.
    #[arg(long, default_value = "fleet-node", env = "NODE_APP_NAME")]
    pub app_name: String,

    /// Override the config/state directory entirely (tests, containers with a
    /// non-XDG layout).
    #[arg(long, env = "NODE_CONFIG_DIR")]
    pub config_dir: Option<std::path::PathBuf>,

    /// Run every ticker exactly once, then exit. Used by integration tests and
    /// operators smoke-testing a fresh config.
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("build node: {0}")]
    Build(#[from] BuildError),
    #[error("serve: {0}")]
    Serve(#[from] std::io::Error),
}

/// Runs every background ticker for one tick (used by `--once` and by tests that
/// want deterministic single-pass behavior instead of racing real timers).
pub async fn run_once(node: &WiredNode) {
    node.state.scheduler.tick().await;
    node.state.knowledge_sync.tick().await;
    node.state.memory.cleanup_expired().await;
    node.state.events.tick().await;
}

/// Spawns the four independent background tickers. Returns their join handles so `run` can abort them on
/// shutdown.
fn spawn_tickers(state: Arc<AppState>) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(SCHEDULER_INITIAL_DELAY).await;
            let mut tick = interval(Duration::from_secs(30));
            loop {
                tick.tick().await;
                if state.lifecycle.is_draining() {
                    break;
                }
                state.scheduler.tick().await;
            }
        }));
    }

    {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(KNOWLEDGE_SYNC_INITIAL_DELAY).await;
            let mut tick = interval(Duration::from_secs(state.knowledge_sync_interval_secs.max(1)));
            loop {
                tick.tick().await;
                if state.lifecycle.is_draining() {
                    break;
                }
                state.knowledge_sync.tick().await;
            }
        }));
    }

    {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(MEMORY_CLEANUP_INITIAL_DELAY).await;
            let mut tick = interval(Duration::from_secs(state.memory_cleanup_interval_secs.max(1)));
            loop {
                tick.tick().await;
                if state.lifecycle.is_draining() {
                    break;
                }
                let result = state.memory.cleanup_expired().await;
                if result.local_expired > 0 || result.shared_expired > 0 {
                    info!(
                        local_expired = result.local_expired,
                        shared_expired = result.shared_expired,
                        total_remaining = result.total_remaining,
                        "memory TTL cleanup"
                    );
                }
            }
        }));
    }

    {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(EVENT_HOOKS_INITIAL_DELAY).await;
            let mut tick = interval(Duration::from_secs(state.event_check_interval_secs.max(1)));
            loop {
                tick.tick().await;
                if state.lifecycle.is_draining() {
                    break;
                }
                state.events.tick().await;
            }
        }));
    }

    handles
}

/// Waits for SIGINT (and SIGTERM on unix), logging which one fired.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}

/// Runs the fully-wired node to completion: starts the HTTP(S) listener and every
/// background ticker, and drains cleanly when `shutdown` resolves.
pub async fn run(node: WiredNode, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), RunError> {
    let WiredNode { state, listen_addr, tls } = node;

    let ticker_handles = spawn_tickers(state.clone());

    let serve_state = state.clone();
    node_serve::run_serve(&listen_addr, tls, serve_state, shutdown).await?;

    for handle in ticker_handles {
        handle.abort();
    }

    Ok(())
}
