// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Flume-backed message channels between execution contexts.

use crate::envelope::{Envelope, MessageTarget};
use crate::transport::Transport;

/// A unidirectional message channel between two contexts.
///
/// Thin wrapper over an unbounded flume channel; the owner keeps the
/// receiver and hands out sender clones to the peer context.
#[derive(Debug)]
pub struct MessageChannel {
    sender: flume::Sender<Envelope>,
    receiver: flume::Receiver<Envelope>,
}

impl MessageChannel {
    /// Creates a new unbounded channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// A sender for the peer context.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<Envelope> {
        self.sender.clone()
    }

    /// The receiving end, owned by this context's event loop.
    #[must_use]
    pub fn receiver(&self) -> &flume::Receiver<Envelope> {
        &self.receiver
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The one physical transport of a context: channel senders toward its
/// two neighbors.
pub struct ChannelTransport {
    to_render: flume::Sender<Envelope>,
    to_container: flume::Sender<Envelope>,
}

impl ChannelTransport {
    /// Builds a transport from the two outbound senders.
    #[must_use]
    pub fn new(
        to_render: flume::Sender<Envelope>,
        to_container: flume::Sender<Envelope>,
    ) -> Self {
        Self {
            to_render,
            to_container,
        }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, envelope: Envelope) {
        let sender = match envelope.target {
            MessageTarget::Render => &self.to_render,
            MessageTarget::Container | MessageTarget::Service => &self.to_container,
        };
        if let Err(err) = sender.send(envelope) {
            log::error!("failed to send {}: peer disconnected", err.into_inner().kind);
        }
    }

    fn invoke(&self, envelope: Envelope) {
        if let Err(err) = self.to_container.send(envelope) {
            log::error!(
                "failed to invoke {}: container disconnected",
                err.into_inner().kind
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::types;
    use serde_json::json;

    #[test]
    fn send_routes_by_target() {
        let render = MessageChannel::new();
        let container = MessageChannel::new();
        let transport = ChannelTransport::new(render.sender(), container.sender());

        transport.send(Envelope::new(
            types::UPDATE_DATA,
            MessageTarget::Render,
            json!({ "bridgeId": "b1" }),
        ));
        transport.invoke(Envelope::new(
            types::INVOKE_API,
            MessageTarget::Container,
            json!({ "bridgeId": "b1" }),
        ));

        assert_eq!(render.receiver().try_recv().unwrap().kind, types::UPDATE_DATA);
        assert_eq!(
            container.receiver().try_recv().unwrap().kind,
            types::INVOKE_API
        );
        assert!(render.receiver().is_empty());
    }

    #[test]
    fn send_to_dead_peer_is_not_fatal() {
        let render = MessageChannel::new();
        let container = MessageChannel::new();
        let transport = ChannelTransport::new(render.sender(), container.sender());
        drop(container);

        // Logged, not panicked.
        transport.invoke(Envelope::new(
            types::INVOKE_API,
            MessageTarget::Container,
            json!({}),
        ));
    }
}
