// SPDX-License-Identifier: MIT

//! Transport and process wiring for the task director: the
//! worker-facing WebSocket listener, the administrative query
//! listener, and the glue that turns director decisions into socket
//! writes.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod admin;
mod config;
mod connection;
mod error;
mod state;

pub use config::ServerConfig;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

/// Run the director process: bind the worker listener (and, if
/// configured, the admin listener) and serve forever. Returns only on
/// a bind or accept-level error.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let state = AppState::new();

    let worker_addr = SocketAddr::new(config.bind, config.port);
    let worker_listener =
        TcpListener::bind(worker_addr).await.map_err(|source| ServerError::Bind { addr: worker_addr, source })?;
    tracing::info!(addr = %worker_addr, "worker listener bound");

    if let Some(admin_port) = config.admin {
        let admin_addr = SocketAddr::new(config.bind, admin_port);
        let admin_listener =
            TcpListener::bind(admin_addr).await.map_err(|source| ServerError::Bind { addr: admin_addr, source })?;
        tracing::info!(addr = %admin_addr, "admin listener bound");

        let admin_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = admin::accept_loop(admin_listener, admin_state).await {
                tracing::error!(error = %e, "admin listener stopped");
            }
        });
    }

    connection::accept_loop(worker_listener, state).await
}
