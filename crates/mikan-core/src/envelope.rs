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

//! The message envelope exchanged between execution contexts.
//!
//! Every cross-context message is an [`Envelope`]: a type tag, the
//! destination context, and a JSON body. The body carries a `bridgeId`
//! scoping the message to one session; receivers drop envelopes whose
//! bridge id they do not host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The execution context an envelope is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTarget {
    /// The logic context hosting page/component instances.
    Service,
    /// The view-rendering context.
    Render,
    /// The native container orchestrating both.
    Container,
}

/// A serialized cross-context message.
///
/// Envelopes are fire-and-forget and ordered per sender only; nothing in
/// the protocol may assume ordering across different senders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag, e.g. [`types::CREATE_INSTANCE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Destination context.
    pub target: MessageTarget,
    /// JSON payload; carries `bridgeId` plus message-specific fields.
    pub body: Value,
}

impl Envelope {
    /// Builds an envelope from a type tag, a target and a JSON body.
    pub fn new(kind: impl Into<String>, target: MessageTarget, body: Value) -> Self {
        Self {
            kind: kind.into(),
            target,
            body,
        }
    }

    /// The session scope declared by this envelope, if any.
    #[must_use]
    pub fn bridge_id(&self) -> Option<&str> {
        self.body.get("bridgeId").and_then(Value::as_str)
    }
}

/// Well-known envelope type tags.
///
/// The single-letter tags (`mC`, `mR`, `mU`, `t`, `u`) are kept short on
/// purpose: they appear on every instance create/update round trip.
pub mod types {
    /// Container asks the logic context to load a resource bundle.
    pub const LOAD_RESOURCE: &str = "loadResource";
    /// Logic context tells the container its bundle finished loading.
    pub const SERVICE_RESOURCE_LOADED: &str = "serviceResourceLoaded";
    /// Container confirms the surface is ready for the entry page.
    pub const RESOURCE_LOADED: &str = "resourceLoaded";
    /// Logic context hands the entry page to the render context.
    pub const FIRST_RENDER: &str = "firstRender";
    /// Create a page/component instance (`moduleCreated`).
    pub const CREATE_INSTANCE: &str = "mC";
    /// A module finished layout in the render context (`moduleReady`).
    pub const MODULE_READY: &str = "mR";
    /// A module left the render tree (`moduleUnmounted`).
    pub const MODULE_UNMOUNTED: &str = "mU";
    /// Data patch pushed from logic to render.
    pub const UPDATE_DATA: &str = "u";
    /// View event routed to a logic-context method (`triggerEvent`).
    pub const TRIGGER_EVENT: &str = "t";
    /// Resolves a stored correlation callback.
    pub const TRIGGER_CALLBACK: &str = "triggerCallback";
    /// Page moved to the foreground.
    pub const PAGE_SHOW: &str = "pageShow";
    /// Page moved to the background.
    pub const PAGE_HIDE: &str = "pageHide";
    /// Page finished its first render.
    pub const PAGE_READY: &str = "pageReady";
    /// Page is being torn down.
    pub const PAGE_UNLOAD: &str = "pageUnload";
    /// Page scrolled.
    pub const PAGE_SCROLL: &str = "pageScroll";
    /// Page resized.
    pub const PAGE_RESIZE: &str = "pageResize";
    /// Route transition animation finished.
    pub const PAGE_ROUTE_DONE: &str = "pageRouteDone";
    /// App moved to the foreground.
    pub const APP_SHOW: &str = "appShow";
    /// App moved to the background.
    pub const APP_HIDE: &str = "appHide";
    /// A new window stack became visible.
    pub const STACK_SHOW: &str = "stackShow";
    /// A window stack went away.
    pub const STACK_HIDE: &str = "stackHide";
    /// Named API call toward the container or render context.
    pub const INVOKE_API: &str = "invokeAPI";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = Envelope::new(
            types::CREATE_INSTANCE,
            MessageTarget::Service,
            json!({ "bridgeId": "b1", "moduleId": "m1" }),
        );
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(text.contains("\"type\":\"mC\""));
        assert!(text.contains("\"target\":\"service\""));

        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind, types::CREATE_INSTANCE);
        assert_eq!(back.target, MessageTarget::Service);
        assert_eq!(back.bridge_id(), Some("b1"));
    }

    #[test]
    fn bridge_id_missing_is_none() {
        let envelope = Envelope::new(types::APP_SHOW, MessageTarget::Service, json!({}));
        assert_eq!(envelope.bridge_id(), None);
    }
}
