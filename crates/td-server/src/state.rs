// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use td_core::EndpointId;
use td_director::Director;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Everything shared between connection tasks: the director and a
/// table routing an `EndpointId` to the channel that feeds its
/// writer task. Outbound actions frequently target an endpoint other
/// than the one that triggered them (a freed step redispatched to a
/// peer), so every connection needs a way to reach any other.
pub struct AppState {
    pub director: Arc<Director>,
    connections: Mutex<HashMap<EndpointId, mpsc::UnboundedSender<WsMessage>>>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { director: Arc::new(Director::new()), connections: Mutex::new(HashMap::new()) })
    }

    pub fn register(&self, endpoint: EndpointId, sender: mpsc::UnboundedSender<WsMessage>) {
        self.connections.lock().insert(endpoint, sender);
    }

    pub fn unregister(&self, endpoint: &EndpointId) {
        self.connections.lock().remove(endpoint);
    }

    /// Send a frame to `endpoint`, if it's still connected. Silently
    /// drops the send if the endpoint disconnected between the
    /// director deciding to message it and this call running — the
    /// disconnect itself will already have produced its own
    /// `on_detach` handling.
    pub fn send_to(&self, endpoint: &EndpointId, frame: WsMessage) {
        let sender = self.connections.lock().get(endpoint).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(frame);
        }
    }

    pub fn close(&self, endpoint: &EndpointId) {
        self.send_to(endpoint, WsMessage::Close(None));
    }
}
