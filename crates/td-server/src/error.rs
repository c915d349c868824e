// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, #[source] source: std::io::Error },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}
