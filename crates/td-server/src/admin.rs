// SPDX-License-Identifier: MIT

//! Administrative query channel: a line-delimited JSON request/response
//! protocol, separate from the worker-facing WebSocket port, for
//! operational queries that have nothing to do with build dispatch.

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AdminRequest {
    #[serde(rename = "get.total.running.schema.instances.msg")]
    GetTotalRunningSchemaInstances,
}

pub async fn accept_loop(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    loop {
        let (stream, addr) = listener.accept().await.map_err(ServerError::Accept)?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &state).await {
                tracing::debug!(%addr, error = %e, "admin connection closed");
            }
        });
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, state: &AppState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let response = match serde_json::from_str::<AdminRequest>(&line) {
            Ok(AdminRequest::GetTotalRunningSchemaInstances) => {
                serde_json::json!({ "total_running_schema_instances": state.director.running_instance_count() })
            }
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let mut payload = serde_json::to_vec(&response).unwrap_or_default();
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
