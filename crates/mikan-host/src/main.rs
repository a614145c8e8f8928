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

//! Scripted demo host.
//!
//! Stands in for the native container and the render context at the same
//! time: it registers a small counter mini-program as a resource bundle,
//! then replays the message sequence a real webview session would
//! produce and prints everything the logic context sends back.

use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::transport::{ChannelTransport, MessageChannel};
use mikan_service::blueprint::{ComponentSpec, ExtraInfo, ModuleRegistry, PageSpec, PropertySpec};
use mikan_service::app::AppSpec;
use mikan_service::Service;
use mikan_core::property::PropertyTag;
use serde_json::{json, Value};

fn install_demo(registry: &mut ModuleRegistry) {
    registry.register_app(
        AppSpec::new()
            .global_data(json!({ "appName": "counter-demo" }))
            .on_launch(|_, options| {
                log::info!("app onLaunch: {options}");
                Ok(())
            })
            .on_show(|_, _| {
                log::info!("app onShow");
                Ok(())
            }),
    );

    registry.register_page(
        PageSpec::new()
            .data(json!({ "count": 0, "_clicks": 0 }))
            .on_load(|_, _, query| {
                log::info!("page onLoad: {query}");
                Ok(())
            })
            .on_ready(|_, _| {
                log::info!("page onReady");
                Ok(())
            })
            .method("increment", |scope, id, _| {
                let count = scope
                    .session
                    .require(id)?
                    .data
                    .get("count")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let patch = match json!({ "count": count + 1, "_clicks": count + 1 }) {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                };
                scope.set_data(id, patch)?;
                Ok(None)
            }),
        ExtraInfo::page("pages/index/index"),
    );

    registry.register_component(
        ComponentSpec::new()
            .property(
                "count",
                PropertySpec::new(PropertyTag::Number, json!(0)).observer("onCount"),
            )
            .method("onCount", |_, _, event| {
                log::info!("badge observed count: {} <- {}", event["newVal"], event["oldVal"]);
                Ok(None)
            }),
        ExtraInfo::component("components/counter-badge"),
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let render = MessageChannel::new();
    let container = MessageChannel::new();
    let (inbound, rx) = flume::unbounded();
    let transport = ChannelTransport::new(render.sender(), container.sender());

    let mut service = Service::new(Box::new(transport), rx);
    service.register_bundle("app", install_demo);

    let send = |kind: &str, body: Value| -> anyhow::Result<()> {
        inbound.send(Envelope::new(kind, MessageTarget::Service, body))?;
        Ok(())
    };

    // The container opens a webview and asks for the page's resources.
    send(
        types::LOAD_RESOURCE,
        json!({ "bridgeId": "bridge-1", "pagePath": "pages/index/index", "query": { "from": "demo" } }),
    )?;
    // The render context reports its resources ready.
    send(types::RESOURCE_LOADED, json!({ "bridgeId": "bridge-1" }))?;
    // The view mounts the page root and a bound badge component.
    send(
        types::CREATE_INSTANCE,
        json!({ "bridgeId": "bridge-1", "moduleId": "page-1", "path": "pages/index/index" }),
    )?;
    send(
        types::CREATE_INSTANCE,
        json!({
            "bridgeId": "bridge-1",
            "moduleId": "badge-1",
            "path": "components/counter-badge",
            "parentId": "page-1",
            "propBindings": [["count", "count"]],
        }),
    )?;
    send(
        types::MODULE_READY,
        json!({ "bridgeId": "bridge-1", "moduleId": "page-1" }),
    )?;
    send(types::PAGE_SHOW, json!({ "bridgeId": "bridge-1" }))?;
    // Two taps on the increment button.
    for _ in 0..2 {
        send(
            types::TRIGGER_EVENT,
            json!({ "bridgeId": "bridge-1", "moduleId": "page-1", "eventName": "increment" }),
        )?;
    }
    send(types::PAGE_UNLOAD, json!({ "bridgeId": "bridge-1" }))?;

    service.pump();

    for envelope in render.receiver().try_iter() {
        log::info!("-> render: {} {}", envelope.kind, envelope.body);
    }
    for envelope in container.receiver().try_iter() {
        log::info!("-> container: {} {}", envelope.kind, envelope.body);
    }
    log::info!("sessions left: {}", service.session_count());

    Ok(())
}
