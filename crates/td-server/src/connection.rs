// SPDX-License-Identifier: MIT

//! Per-connection handling: the worker-facing WebSocket accept loop,
//! frame decoding, and applying the director's resulting outbound
//! actions back onto the connection table.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use td_core::EndpointId;
use td_director::Outbound;
use td_wire::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::ServerError;
use crate::state::AppState;

/// Accept worker connections forever, spawning a task per connection.
/// Only returns on a listener-level error.
pub async fn accept_loop(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    loop {
        let (stream, addr) = listener.accept().await.map_err(ServerError::Accept)?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            handle_connection(stream, addr, state).await;
        });
    }
}

/// The opaque tenant path segments a worker connects under
/// (`/api/<a>/<b>/`). The director never uses these for matching —
/// see the path-metadata note in the design docs.
#[derive(Debug, Clone, Default)]
struct ConnectionPath {
    segments: Vec<String>,
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) {
    let mut path = ConnectionPath::default();
    let callback = |request: &Request, response: Response| {
        path.segments = request
            .uri()
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(response)
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let endpoint = EndpointId::generate();
    tracing::info!(%endpoint, %addr, path = ?path.segments, "worker connected");

    let (mut sink, mut stream) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    state.register(endpoint.clone(), tx);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let should_stop = frame.is_close();
            if sink.send(frame).await.is_err() {
                break;
            }
            if should_stop {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let actions = handle_frame(&state, &endpoint, text.as_bytes());
                apply_outbound(&state, actions);
            }
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                tracing::debug!(%endpoint, error = %e, "read error, treating as disconnect");
                break;
            }
            _ => {} // Ping/Pong/Binary — ignore
        }
    }

    tracing::info!(%endpoint, "worker disconnected");
    state.unregister(&endpoint);
    let actions = state.director.on_detach(&endpoint);
    apply_outbound(&state, actions);

    writer.abort();
}

/// Decode and dispatch one inbound frame. A malformed frame or a
/// director-only message type sent by a worker is a protocol error
/// that is logged and dropped — it does not end the connection (only
/// a duplicate `INIT`, handled inside the director, does that).
fn handle_frame(state: &AppState, endpoint: &EndpointId, bytes: &[u8]) -> Vec<Outbound> {
    let message = match td_wire::decode(bytes) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(%endpoint, error = %e, "malformed frame, dropping");
            return Vec::new();
        }
    };

    match message {
        Message::Init { schema_id, total_steps, cache_id, complex_patchset, repo_state } => {
            state.director.on_init(endpoint.clone(), &schema_id, total_steps, &cache_id, complex_patchset, repo_state)
        }
        Message::StepComplete { schema_id, step, success } => {
            state.director.on_step_complete(endpoint, &schema_id, step, success)
        }
        Message::BuildInstruction { .. } | Message::SchemaComplete { .. } => {
            tracing::warn!(%endpoint, "worker sent a director-only message type, dropping");
            Vec::new()
        }
    }
}

fn apply_outbound(state: &AppState, actions: Vec<Outbound>) {
    for action in actions {
        match action {
            Outbound::Send { endpoint, message } => match frame(&message) {
                Some(frame) => state.send_to(&endpoint, frame),
                None => tracing::error!(%endpoint, ?message, "failed to encode outgoing message"),
            },
            Outbound::Close { endpoint } => state.close(&endpoint),
        }
    }
}

fn frame(message: &Message) -> Option<WsMessage> {
    match serde_json::to_string(message) {
        Ok(text) => Some(WsMessage::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "message serialization failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
