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

//! Test harness: a service wired to in-memory channels standing in for
//! the render context and the native container.

// Not every test file uses every helper.
#![allow(dead_code)]

use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::transport::{ChannelTransport, MessageChannel};
use mikan_service::Service;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared recording sink for hook/callback invocations.
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn record(log: &EventLog, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

pub struct Harness {
    pub service: Service,
    inbound: flume::Sender<Envelope>,
    render: MessageChannel,
    container: MessageChannel,
}

impl Harness {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let render = MessageChannel::new();
        let container = MessageChannel::new();
        let (inbound, rx) = flume::unbounded();
        let transport = ChannelTransport::new(render.sender(), container.sender());
        Self {
            service: Service::new(Box::new(transport), rx),
            inbound,
            render,
            container,
        }
    }

    /// Queues one envelope addressed to the service and drains the queue.
    pub fn send(&mut self, kind: &str, body: Value) {
        self.inbound
            .send(Envelope::new(kind, MessageTarget::Service, body))
            .expect("service inbound closed");
        self.service.pump();
    }

    /// Opens a session and mounts its page root in one go.
    pub fn load_page(&mut self, bridge: &str, path: &str, root_id: &str) {
        self.send(
            types::LOAD_RESOURCE,
            json!({ "bridgeId": bridge, "pagePath": path }),
        );
        self.send(types::RESOURCE_LOADED, json!({ "bridgeId": bridge }));
        self.mount(bridge, root_id, path, None);
    }

    /// Mounts an instance with no extra attributes.
    pub fn mount(&mut self, bridge: &str, id: &str, path: &str, parent: Option<&str>) {
        let mut body = json!({ "bridgeId": bridge, "moduleId": id, "path": path });
        if let Some(parent) = parent {
            body["parentId"] = json!(parent);
        }
        self.send(types::CREATE_INSTANCE, body);
    }

    /// Mounts an instance with the full mount payload.
    pub fn mount_with(&mut self, body: Value) {
        self.send(types::CREATE_INSTANCE, body);
    }

    /// Fires a view event bound to `method` on `id`.
    pub fn trigger(&mut self, bridge: &str, id: &str, method: &str) {
        self.send(
            types::TRIGGER_EVENT,
            json!({ "bridgeId": bridge, "moduleId": id, "eventName": method }),
        );
    }

    /// Everything the render context received so far.
    pub fn drain_render(&self) -> Vec<Envelope> {
        self.render.receiver().try_iter().collect()
    }

    /// Everything the container received so far.
    pub fn drain_container(&self) -> Vec<Envelope> {
        self.container.receiver().try_iter().collect()
    }
}
