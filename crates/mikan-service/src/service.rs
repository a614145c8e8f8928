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

//! The logic-context service: envelope intake and dispatch.
//!
//! One [`Service`] per logic context. It owns every session, the module
//! registry, the page router, the app singleton and the correlation
//! callbacks, and processes inbound envelopes one at a time to
//! completion. Missing sessions or instances are logged and dropped:
//! cross-context races make them expected, never fatal.

use crate::api::ApiRegistry;
use crate::app::AppInstance;
use crate::blueprint::{ModuleRegistry, ResourceBundle};
use crate::engine::{data, lifecycle};
use crate::error::ServiceError;
use crate::instance::NodeInfo;
use crate::scope::{ServiceCallbackFn, SessionScope};
use crate::session::{PageRouter, Session};
use mikan_core::callback::CallbackRegistry;
use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::{BridgeId, CallbackId, InstanceId, StackId, Transport};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// The stack used when a load message names none.
const DEFAULT_STACK: &str = "main";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadResourceBody {
    bridge_id: BridgeId,
    page_path: String,
    #[serde(default)]
    query: Value,
    #[serde(default)]
    stack_id: Option<StackId>,
    #[serde(default)]
    app_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeBody {
    bridge_id: BridgeId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MountBody {
    bridge_id: BridgeId,
    module_id: InstanceId,
    path: String,
    #[serde(default)]
    parent_id: Option<InstanceId>,
    #[serde(default)]
    node_info: NodeInfo,
    #[serde(default)]
    event_attrs: HashMap<String, String>,
    #[serde(default)]
    prop_bindings: Vec<(String, String)>,
    #[serde(default)]
    props: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleBody {
    bridge_id: BridgeId,
    module_id: InstanceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchBody {
    bridge_id: BridgeId,
    module_id: InstanceId,
    data: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventBody {
    bridge_id: BridgeId,
    module_id: InstanceId,
    event_name: String,
    #[serde(default)]
    event: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PagePayloadBody {
    bridge_id: BridgeId,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackBody {
    stack_id: StackId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackBody {
    bridge_id: BridgeId,
    callback_id: CallbackId,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppVisibilityBody {
    #[serde(default)]
    bridge_id: Option<BridgeId>,
    #[serde(default)]
    options: Value,
}

/// The logic context runtime.
pub struct Service {
    transport: Box<dyn Transport>,
    inbound: flume::Receiver<Envelope>,
    modules: ModuleRegistry,
    bundles: HashMap<String, Box<dyn ResourceBundle>>,
    loaded_roots: HashSet<String>,
    sessions: HashMap<BridgeId, Session>,
    router: PageRouter,
    app: Option<AppInstance>,
    callbacks: CallbackRegistry<ServiceCallbackFn>,
    api: ApiRegistry,
}

impl Service {
    /// A service over one outbound transport and one inbound queue.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, inbound: flume::Receiver<Envelope>) -> Self {
        Self {
            transport,
            inbound,
            modules: ModuleRegistry::new(),
            bundles: HashMap::new(),
            loaded_roots: HashSet::new(),
            sessions: HashMap::new(),
            router: PageRouter::new(),
            app: None,
            callbacks: CallbackRegistry::new(),
            api: ApiRegistry::with_builtins(),
        }
    }

    /// Registers a compiled bundle under its root (`"app"` for the main
    /// package, a path prefix for subpackages). Installed lazily on the
    /// first `loadResource` that needs it.
    pub fn register_bundle<B>(&mut self, root: impl Into<String>, bundle: B)
    where
        B: ResourceBundle + 'static,
    {
        self.bundles.insert(root.into(), Box::new(bundle));
    }

    /// Direct access to the module registry (hosts and tests register
    /// modules here without going through a bundle).
    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    /// Direct access to the known-API map.
    pub fn api_mut(&mut self) -> &mut ApiRegistry {
        &mut self.api
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Read access to one session, e.g. for host-side inspection.
    #[must_use]
    pub fn session(&self, bridge: &BridgeId) -> Option<&Session> {
        self.sessions.get(bridge)
    }

    /// Blocks on the inbound queue until every sender is gone.
    pub fn run(&mut self) {
        while let Ok(envelope) = self.inbound.recv() {
            self.dispatch(envelope);
        }
        log::info!("inbound channel closed; service stopping");
    }

    /// Drains every envelope currently queued, then returns.
    pub fn pump(&mut self) {
        while let Ok(envelope) = self.inbound.try_recv() {
            self.dispatch(envelope);
        }
    }

    /// Handles one envelope to completion. Errors are logged here; no
    /// failure crosses into the next message.
    pub fn dispatch(&mut self, envelope: Envelope) {
        let kind = envelope.kind.clone();
        if let Err(err) = self.handle(envelope) {
            log::warn!("dropping '{kind}': {err}");
        }
    }

    fn handle(&mut self, envelope: Envelope) -> Result<(), ServiceError> {
        if envelope.target != MessageTarget::Service {
            log::debug!("ignoring envelope for {:?}", envelope.target);
            return Ok(());
        }
        log::trace!("handling '{}'", envelope.kind);
        let body = envelope.body;
        match envelope.kind.as_str() {
            types::LOAD_RESOURCE => self.on_load_resource(parse(types::LOAD_RESOURCE, body)?),
            types::RESOURCE_LOADED => self.on_resource_loaded(parse(types::RESOURCE_LOADED, body)?),
            types::CREATE_INSTANCE => {
                let body: MountBody = parse(types::CREATE_INSTANCE, body)?;
                let args = lifecycle::MountArgs {
                    id: body.module_id,
                    path: body.path,
                    parent: body.parent_id,
                    node_info: body.node_info,
                    event_attrs: body.event_attrs,
                    prop_bindings: body.prop_bindings,
                    initial_props: body.props,
                };
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::create_instance(scope, args)
                })?
            }
            types::MODULE_READY => {
                let body: ModuleBody = parse(types::MODULE_READY, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::module_ready(scope, &body.module_id)
                })?
            }
            types::MODULE_UNMOUNTED => {
                let body: ModuleBody = parse(types::MODULE_UNMOUNTED, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::detach_instance(scope, &body.module_id)
                })?
            }
            types::UPDATE_DATA => {
                let body: PatchBody = parse(types::UPDATE_DATA, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    data::apply_remote_patch(scope, &body.module_id, body.data)
                })?
            }
            types::TRIGGER_EVENT => {
                let body: EventBody = parse(types::TRIGGER_EVENT, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::trigger_event(scope, &body.module_id, &body.event_name, body.event)
                })?
            }
            types::PAGE_SHOW => {
                let body: BridgeBody = parse(types::PAGE_SHOW, body)?;
                self.router.set_current(body.bridge_id.clone());
                self.with_session(&body.bridge_id, lifecycle::page_show)
            }
            types::PAGE_HIDE => {
                let body: BridgeBody = parse(types::PAGE_HIDE, body)?;
                self.with_session(&body.bridge_id, lifecycle::page_hide)
            }
            types::PAGE_READY => {
                let body: BridgeBody = parse(types::PAGE_READY, body)?;
                self.router.set_current(body.bridge_id.clone());
                self.with_session(&body.bridge_id, |scope| {
                    // The first layout also surfaces the page: show runs
                    // before ready.
                    lifecycle::page_show(scope);
                    let Some(root) = scope.session.root.clone() else {
                        return Ok(());
                    };
                    lifecycle::module_ready(scope, &root)
                })?
            }
            types::PAGE_UNLOAD => {
                let body: BridgeBody = parse(types::PAGE_UNLOAD, body)?;
                self.with_session(&body.bridge_id, lifecycle::page_unload)??;
                self.sessions.remove(&body.bridge_id);
                self.router.remove(&body.bridge_id);
                Ok(())
            }
            types::PAGE_SCROLL => {
                let body: PagePayloadBody = parse(types::PAGE_SCROLL, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::page_scroll(scope, body.payload)
                })
            }
            types::PAGE_RESIZE => {
                let body: PagePayloadBody = parse(types::PAGE_RESIZE, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    lifecycle::page_resize(scope, body.payload)
                })
            }
            types::PAGE_ROUTE_DONE => {
                let body: BridgeBody = parse(types::PAGE_ROUTE_DONE, body)?;
                self.router.set_current(body.bridge_id.clone());
                self.with_session(&body.bridge_id, lifecycle::page_route_done)
            }
            types::APP_SHOW => {
                let body: AppVisibilityBody = parse(types::APP_SHOW, body)?;
                self.on_app_visibility(body, true)
            }
            types::APP_HIDE => {
                let body: AppVisibilityBody = parse(types::APP_HIDE, body)?;
                self.on_app_visibility(body, false)
            }
            types::STACK_SHOW => {
                let body: StackBody = parse(types::STACK_SHOW, body)?;
                self.on_stack_visibility(&body.stack_id, true)
            }
            types::STACK_HIDE => {
                let body: StackBody = parse(types::STACK_HIDE, body)?;
                self.on_stack_visibility(&body.stack_id, false)
            }
            types::TRIGGER_CALLBACK => {
                let body: CallbackBody = parse(types::TRIGGER_CALLBACK, body)?;
                self.with_session(&body.bridge_id, |scope| {
                    match scope.callbacks.resolve(&body.callback_id) {
                        Some(callback) => callback(scope, body.args),
                        // Late resolution after a teardown; expected.
                        None => log::debug!("no callback '{}'", body.callback_id),
                    }
                })
            }
            other => {
                log::warn!("unknown message type '{other}'");
                Ok(())
            }
        }
    }

    fn on_load_resource(&mut self, body: LoadResourceBody) -> Result<(), ServiceError> {
        log::info!(
            "loadResource: bridge={} path={} app={:?}",
            body.bridge_id,
            body.page_path,
            body.app_id
        );
        self.ensure_bundles(&body.page_path);

        if !self.sessions.contains_key(&body.bridge_id) {
            self.sessions.insert(
                body.bridge_id.clone(),
                Session::new(body.bridge_id.clone(), body.page_path.clone(), body.query.clone()),
            );
            let stack = body
                .stack_id
                .clone()
                .unwrap_or_else(|| StackId::from(DEFAULT_STACK));
            self.router.push(&stack, body.bridge_id.clone());
        }

        if self.app.is_none() {
            if let Some(blueprint) = self.modules.app() {
                self.app = Some(AppInstance::new(blueprint.clone()));
            }
        }
        let launch_options = json!({ "path": body.page_path, "query": body.query });
        self.with_app(&body.bridge_id, |app, scope| {
            app.launch(scope, launch_options);
        })?;

        self.transport.invoke(Envelope::new(
            types::SERVICE_RESOURCE_LOADED,
            MessageTarget::Container,
            json!({ "bridgeId": body.bridge_id }),
        ));
        Ok(())
    }

    fn on_resource_loaded(&mut self, body: BridgeBody) -> Result<(), ServiceError> {
        let session = self
            .sessions
            .get(&body.bridge_id)
            .ok_or_else(|| ServiceError::SessionNotFound(body.bridge_id.to_string()))?;
        let path = session.module_path.clone();
        let query = session.query.clone();
        // Surface the miss now instead of on a later mount message.
        self.modules.require(&path)?;
        self.transport.send(Envelope::new(
            types::FIRST_RENDER,
            MessageTarget::Render,
            json!({
                "bridgeId": body.bridge_id,
                "pagePath": path,
                "query": query,
                "propsMap": self.modules.collect_wire_props(&path),
            }),
        ));
        Ok(())
    }

    fn on_app_visibility(
        &mut self,
        body: AppVisibilityBody,
        show: bool,
    ) -> Result<(), ServiceError> {
        let bridge = body
            .bridge_id
            .or_else(|| self.router.current().cloned())
            .ok_or_else(|| ServiceError::SessionNotFound("<no current session>".into()))?;
        self.with_app(&bridge, |app, scope| {
            if show {
                app.show(scope, body.options);
            } else {
                app.hide(scope);
            }
        })
    }

    fn on_stack_visibility(&mut self, stack: &StackId, show: bool) -> Result<(), ServiceError> {
        let Some(bridge) = self.router.top(stack).cloned() else {
            log::debug!("stack '{stack}' has no pages");
            return Ok(());
        };
        if show {
            self.router.set_current(bridge.clone());
        }
        self.with_session(&bridge, |scope| {
            if show {
                lifecycle::page_show(scope);
            } else {
                lifecycle::page_hide(scope);
            }
        })
    }

    /// Installs the main bundle and any subpackage bundle whose root
    /// prefixes the page path. Each bundle installs once.
    fn ensure_bundles(&mut self, page_path: &str) {
        let mut roots: Vec<String> = Vec::new();
        if self.bundles.contains_key("app") {
            roots.push("app".to_string());
        }
        roots.extend(
            self.bundles
                .keys()
                .filter(|root| root.as_str() != "app" && page_path.starts_with(root.as_str()))
                .cloned(),
        );
        for root in roots {
            if !self.loaded_roots.insert(root.clone()) {
                continue;
            }
            log::debug!("installing bundle '{root}'");
            if let Some(bundle) = self.bundles.get(&root) {
                bundle.install(&mut self.modules);
            }
        }
    }

    /// Builds a scope over one session and runs `f` inside it.
    fn with_session<R>(
        &mut self,
        bridge: &BridgeId,
        f: impl FnOnce(&mut SessionScope<'_>) -> R,
    ) -> Result<R, ServiceError> {
        let session = self
            .sessions
            .get_mut(bridge)
            .ok_or_else(|| ServiceError::SessionNotFound(bridge.to_string()))?;
        let mut scope = SessionScope {
            session,
            modules: &self.modules,
            transport: self.transport.as_ref(),
            callbacks: &mut self.callbacks,
            api: &self.api,
        };
        Ok(f(&mut scope))
    }

    /// Like [`Service::with_session`], with the app singleton alongside.
    fn with_app(
        &mut self,
        bridge: &BridgeId,
        f: impl FnOnce(&mut AppInstance, &mut SessionScope<'_>),
    ) -> Result<(), ServiceError> {
        let Some(app) = self.app.as_mut() else {
            return Ok(());
        };
        let session = self
            .sessions
            .get_mut(bridge)
            .ok_or_else(|| ServiceError::SessionNotFound(bridge.to_string()))?;
        let mut scope = SessionScope {
            session,
            modules: &self.modules,
            transport: self.transport.as_ref(),
            callbacks: &mut self.callbacks,
            api: &self.api,
        };
        f(app, &mut scope);
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(kind: &str, body: Value) -> Result<T, ServiceError> {
    serde_json::from_value(body).map_err(|source| ServiceError::MalformedMessage {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mikan_core::transport::{ChannelTransport, MessageChannel};

    fn service() -> (Service, flume::Sender<Envelope>, MessageChannel, MessageChannel) {
        let render = MessageChannel::new();
        let container = MessageChannel::new();
        let (tx, rx) = flume::unbounded();
        let transport = ChannelTransport::new(render.sender(), container.sender());
        (Service::new(Box::new(transport), rx), tx, render, container)
    }

    #[test]
    fn unknown_message_type_is_dropped() {
        let (mut service, tx, _render, _container) = service();
        tx.send(Envelope::new(
            "noSuchThing",
            MessageTarget::Service,
            json!({}),
        ))
        .unwrap();
        service.pump();
        assert_eq!(service.session_count(), 0);
    }

    #[test]
    fn missing_session_is_logged_not_fatal() {
        let (mut service, tx, _render, _container) = service();
        tx.send(Envelope::new(
            types::PAGE_SHOW,
            MessageTarget::Service,
            json!({ "bridgeId": "ghost" }),
        ))
        .unwrap();
        service.pump();
        assert_eq!(service.session_count(), 0);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let body = json!({ "bridgeId": 42 });
        let Err(err) = parse::<BridgeBody>(types::PAGE_SHOW, body) else {
            panic!("expected a decode error");
        };
        assert!(matches!(err, ServiceError::MalformedMessage { .. }));
    }
}
