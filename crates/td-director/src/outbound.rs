// SPDX-License-Identifier: MIT

use td_core::EndpointId;
use td_wire::Message;

/// An action the transport layer must carry out on behalf of the
/// director. The director itself never touches a socket; every state
/// transition produces zero or more of these instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Write `message` to `endpoint`.
    Send { endpoint: EndpointId, message: Message },
    /// Close the connection to `endpoint`: it violated the protocol.
    Close { endpoint: EndpointId },
}

impl Outbound {
    pub fn send(endpoint: EndpointId, message: Message) -> Self {
        Self::Send { endpoint, message }
    }

    pub fn close(endpoint: EndpointId) -> Self {
        Self::Close { endpoint }
    }
}
