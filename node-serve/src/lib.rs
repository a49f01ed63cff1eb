//! Fleet node HTTP(S)/mTLS endpoint.
//!
//! **Public API**: [`run_serve`].

mod app;
mod auth;
mod error;
pub mod handlers;
pub mod lifecycle;
mod tls;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tracing::info;

pub use app::AppState;
pub use tls::{resolve as resolve_tls, ListenerTls};

/// Binds and serves the node's HTTP surface on `addr`, in whichever TLS tier
/// `tls` resolved to. Runs until `shutdown`
/// completes, then drains in-flight connections before returning.
pub async fn run_serve(
    addr: &str,
    tls: ListenerTls,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid listen address {addr}: {e}")))?;

    let app: Router = app::router(state.clone()).fallback(error::fallback);

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(5)));
    });

    state.lifecycle.mark_serving();

    match tls {
        ListenerTls::Plaintext => {
            info!(%addr, "listening (plaintext HTTP)");
            axum_server::bind(socket_addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        ListenerTls::Tls(config) => {
            info!(%addr, "listening (TLS)");
            axum_server::bind_rustls(socket_addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    state.lifecycle.mark_exited();
    Ok(())
}
