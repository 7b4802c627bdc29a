//! Dev servers
//!
//! Two HTTP listeners run side by side during development: the static
//! server for the source tree and the LiveReload server browsers keep a
//! WebSocket open to.

pub mod livereload;
pub mod static_files;

pub use livereload::{livereload_router, LiveReload, PROTOCOL_7};
pub use static_files::{inject_snippet, snippet, static_router};

use axum::Router;
use std::io;
use thiserror::Error;
use tokio::net::TcpListener;

/// Error raised by the dev servers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Address could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Server stopped with an IO error
    #[error("Server error: {0}")]
    Serve(#[from] io::Error),
}

/// Bind a listener on `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr).await.map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `router` on `listener` until the process ends.
pub async fn serve(listener: TcpListener, router: Router, name: &'static str) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!("{} listening on {}", name, addr);
    axum::serve(listener, router).await?;
    Ok(())
}
