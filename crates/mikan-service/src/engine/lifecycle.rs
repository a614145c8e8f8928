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

//! The lifecycle engine: mount, readiness, teardown, page visibility.
//!
//! States per instance: `created → attached → ready → detached`, with
//! `detached` terminal. For the page root, `created`/`attached` run
//! before `onLoad`; `ready` follows the render context's first layout.
//! Teardown unlinks every relation edge before any `detached` hook runs.

use super::{data, relations, run_contained, run_hooks};
use crate::blueprint::LifetimeStage;
use crate::error::ServiceError;
use crate::instance::{Instance, InstanceStatus, NodeInfo, PropBinding};
use crate::scope::SessionScope;
use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::InstanceId;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Everything the view supplies when it mounts an instance.
pub struct MountArgs {
    /// The new instance's id.
    pub id: InstanceId,
    /// Module path to instantiate.
    pub path: String,
    /// Parent instance; `None` for the page root.
    pub parent: Option<InstanceId>,
    /// Node id/classes/dataset from the template.
    pub node_info: NodeInfo,
    /// Event binding → method name.
    pub event_attrs: HashMap<String, String>,
    /// Property name → binding expression, for parent-driven sync.
    pub prop_bindings: Vec<(String, String)>,
    /// Property values the view already evaluated at mount time.
    pub initial_props: Map<String, Value>,
}

/// Mounts an instance: seeds its data, registers it, runs `created` and
/// `attached`, links relations, and fires `onLoad` for the page root,
/// then ships the resulting data snapshot to the render context.
/// Idempotent per instance id.
pub fn create_instance(scope: &mut SessionScope<'_>, args: MountArgs) -> Result<(), ServiceError> {
    if scope.session.get(&args.id).is_some() {
        log::debug!("instance '{}' already mounted; ignoring", args.id);
        return Ok(());
    }
    let blueprint = scope.modules.require(&args.path)?;
    let bridge_id = scope.session.bridge_id.clone();

    let mut instance = Instance::new(args.id.clone(), blueprint.clone(), bridge_id);
    for (name, prop) in &blueprint.properties {
        if !instance.data.contains_key(name) {
            instance.data.insert(name.clone(), prop.default.clone());
        }
    }
    for (name, value) in args.initial_props {
        instance.data.insert(name, value);
    }
    instance.node_info = args.node_info;
    instance.event_attrs = args.event_attrs;
    instance.prop_bindings = args
        .prop_bindings
        .into_iter()
        .map(|(target, expression)| PropBinding::new(target, expression))
        .collect();
    instance.parent = args.parent.clone();

    if let Some(parent_id) = &args.parent {
        match scope.session.get_mut(parent_id) {
            Some(parent) => parent.children.push(args.id.clone()),
            // Mount messages are ordered per sender, so a missing parent
            // means it already detached; mount the orphan anyway.
            None => log::warn!("parent '{parent_id}' of '{}' is gone", args.id),
        }
    }

    let is_root = blueprint.is_page_like() && scope.session.root.is_none();
    scope.session.insert(instance);
    if is_root {
        scope.session.root = Some(args.id.clone());
    }

    run_hooks(scope, &args.id, &blueprint.stage_hooks(LifetimeStage::Created));
    if let Some(instance) = scope.session.get_mut(&args.id) {
        instance.status = InstanceStatus::Attached;
    }
    run_hooks(scope, &args.id, &blueprint.stage_hooks(LifetimeStage::Attached));
    relations::link_on_attach(scope, &args.id);

    if is_root {
        if let Some(on_load) = blueprint.page_hooks.on_load.clone() {
            let query = scope.session.query.clone();
            let result = on_load(scope, &args.id, query);
            run_contained(scope, &args.id, result);
        }
    }

    // The view resolves this envelope by the module id it just mounted;
    // the snapshot carries everything the hooks wrote so far.
    if let Some(instance) = scope.session.get(&args.id) {
        scope.transport.send(Envelope::new(
            args.id.as_str(),
            MessageTarget::Render,
            json!({
                "bridgeId": instance.bridge_id,
                "path": instance.blueprint.path,
                "data": Value::Object(data::filter_private(&instance.data)),
            }),
        ));
    }
    Ok(())
}

/// Marks an instance ready after the render context's first layout and
/// runs its `ready` hooks (plus `onReady` for the page root). Idempotent.
pub fn module_ready(scope: &mut SessionScope<'_>, id: &InstanceId) -> Result<(), ServiceError> {
    let instance = scope.session.require_mut(id)?;
    if instance.status != InstanceStatus::Attached {
        return Ok(());
    }
    instance.status = InstanceStatus::Ready;
    let blueprint = instance.blueprint.clone();

    run_hooks(scope, id, &blueprint.stage_hooks(LifetimeStage::Ready));
    if scope.session.root.as_ref() == Some(id) {
        if let Some(on_ready) = blueprint.page_hooks.on_ready.clone() {
            let result = on_ready(scope, id);
            run_contained(scope, id, result);
        }
    }
    Ok(())
}

/// Detaches an instance and its whole subtree, youngest first. For each
/// instance: relation edges are torn down (with `unlinked` on every
/// referencing side), then `detached` hooks run, then it is removed.
/// Idempotent.
pub fn detach_instance(scope: &mut SessionScope<'_>, id: &InstanceId) -> Result<(), ServiceError> {
    if scope.session.get(id).is_none() {
        log::debug!("instance '{id}' already detached; ignoring");
        return Ok(());
    }
    let mut subtree = scope.session.descendants_of(id);
    subtree.push(id.clone());
    subtree.reverse();

    for target in &subtree {
        let Some(instance) = scope.session.get_mut(target) else {
            continue;
        };
        if !instance.is_alive() {
            continue;
        }
        relations::unlink_all(scope, target);
        let blueprint = match scope.session.get(target) {
            Some(instance) => instance.blueprint.clone(),
            None => continue,
        };
        run_hooks(scope, target, &blueprint.stage_hooks(LifetimeStage::Detached));
        if let Some(instance) = scope.session.get_mut(target) {
            instance.status = InstanceStatus::Detached;
        }
        let parent = scope.session.get(target).and_then(|i| i.parent.clone());
        if let Some(parent_id) = parent {
            if let Some(parent) = scope.session.get_mut(&parent_id) {
                parent.children.retain(|child| child != target);
            }
        }
        scope.session.remove(target);
    }
    Ok(())
}

/// Runs the page root's `onShow` and fans visibility out to root-level
/// components; nested components hear about it through the recursive
/// propagation of their own `pageLifetimes`.
pub fn page_show(scope: &mut SessionScope<'_>) {
    page_visibility(scope, true);
}

/// The `onHide` counterpart of [`page_show`].
pub fn page_hide(scope: &mut SessionScope<'_>) {
    page_visibility(scope, false);
}

fn page_visibility(scope: &mut SessionScope<'_>, show: bool) {
    let Some(root) = scope.session.root.clone() else {
        return;
    };
    let Some(blueprint) = scope.session.get(&root).map(|i| i.blueprint.clone()) else {
        return;
    };
    let hook = if show {
        blueprint.page_hooks.on_show.clone()
    } else {
        blueprint.page_hooks.on_hide.clone()
    };
    if let Some(hook) = hook {
        let result = hook(scope, &root);
        run_contained(scope, &root, result);
    }
    for component in root_level_components(scope, &root) {
        propagate_visibility(scope, &component, show);
    }
}

fn propagate_visibility(scope: &mut SessionScope<'_>, id: &InstanceId, show: bool) {
    let Some(instance) = scope.session.get(id) else {
        return;
    };
    let blueprint = instance.blueprint.clone();
    let children = instance.children.clone();

    let own = if show {
        blueprint.page_lifetimes.show.clone()
    } else {
        blueprint.page_lifetimes.hide.clone()
    };
    let appended = if show {
        &blueprint.behavior_page_lifetimes.show
    } else {
        &blueprint.behavior_page_lifetimes.hide
    };
    run_hooks(scope, id, appended);
    if let Some(hook) = own {
        let result = hook(scope, id);
        run_contained(scope, id, result);
    }
    for child in children {
        propagate_visibility(scope, &child, show);
    }
}

/// Runs the page root's `onPageScroll`.
pub fn page_scroll(scope: &mut SessionScope<'_>, payload: Value) {
    let Some(root) = scope.session.root.clone() else {
        return;
    };
    let Some(hook) = scope
        .session
        .get(&root)
        .and_then(|i| i.blueprint.page_hooks.on_page_scroll.clone())
    else {
        return;
    };
    let result = hook(scope, &root, payload);
    run_contained(scope, &root, result);
}

/// Fans a viewport resize out to every component's `resize` lifetime.
pub fn page_resize(scope: &mut SessionScope<'_>, payload: Value) {
    for id in scope.session.ids_in_order().to_vec() {
        let Some(instance) = scope.session.get(&id) else {
            continue;
        };
        let blueprint = instance.blueprint.clone();
        for hook in blueprint.behavior_page_lifetimes.resize.clone() {
            let result = hook(scope, &id, payload.clone());
            run_contained(scope, &id, result);
        }
        if let Some(hook) = blueprint.page_lifetimes.resize.clone() {
            let result = hook(scope, &id, payload.clone());
            run_contained(scope, &id, result);
        }
    }
}

/// Fans the end of the route animation out to every component's
/// `routeDone` lifetime.
pub fn page_route_done(scope: &mut SessionScope<'_>) {
    for id in scope.session.ids_in_order().to_vec() {
        let Some(hook) = scope
            .session
            .get(&id)
            .and_then(|i| i.blueprint.page_lifetimes.route_done.clone())
        else {
            continue;
        };
        let result = hook(scope, &id);
        run_contained(scope, &id, result);
    }
}

/// Runs `onUnload` on the page root, then detaches the whole tree.
pub fn page_unload(scope: &mut SessionScope<'_>) -> Result<(), ServiceError> {
    let Some(root) = scope.session.root.clone() else {
        return Ok(());
    };
    if let Some(hook) = scope
        .session
        .get(&root)
        .and_then(|i| i.blueprint.page_hooks.on_unload.clone())
    {
        let result = hook(scope, &root);
        run_contained(scope, &root, result);
    }
    detach_instance(scope, &root)
}

/// Routes a view event to the bound method. An unknown binding or
/// method is logged and dropped; cross-context races make both expected.
pub fn trigger_event(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    event_name: &str,
    event: Value,
) -> Result<(), ServiceError> {
    let instance = scope.session.require(id)?;
    let method_name = instance
        .event_attrs
        .get(event_name)
        .cloned()
        .unwrap_or_else(|| event_name.to_string());
    let Some(method) = instance.blueprint.methods.get(&method_name).cloned() else {
        log::warn!(
            "{}",
            ServiceError::MethodNotFound {
                instance: id.to_string(),
                method: method_name,
            }
        );
        return Ok(());
    };
    let result = method(scope, id, event).map(|_| ());
    run_contained(scope, id, result);
    Ok(())
}

/// Sends a custom component event to the render context, which routes it
/// to whichever handler the template bound on this component's tag.
pub fn emit_event(scope: &mut SessionScope<'_>, id: &InstanceId, name: &str, detail: Value) {
    let Some(instance) = scope.session.get(id) else {
        log::debug!("triggerEvent from unknown instance '{id}'");
        return;
    };
    scope.transport.send(Envelope::new(
        types::TRIGGER_EVENT,
        MessageTarget::Render,
        json!({
            "bridgeId": instance.bridge_id,
            "moduleId": id,
            "eventName": name,
            "detail": detail,
        }),
    ));
}

fn root_level_components(scope: &SessionScope<'_>, root: &InstanceId) -> Vec<InstanceId> {
    scope
        .session
        .ids_in_order()
        .iter()
        .filter(|id| {
            scope.session.get(id).is_some_and(|instance| {
                instance.blueprint.is_component && instance.parent.as_ref() == Some(root)
            })
        })
        .cloned()
        .collect()
}
