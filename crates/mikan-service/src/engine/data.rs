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

//! The data engine: patch application, render sync, child bindings.
//!
//! `set_data` is synchronous: the patch lands in the instance's data
//! before the call returns, the diff is pushed to the render context,
//! declared property bindings on direct children are recomputed, and
//! observer rules dispatch — all in one run-to-completion turn. Keys
//! starting with `_` or `$` stay logic-side and never cross to the view.

use super::observer;
use crate::error::ServiceError;
use crate::scope::SessionScope;
use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::path::{parse_path, set_path, top_level_key, PathSegment};
use mikan_core::InstanceId;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Applies a user-initiated patch: data, render push, child bindings,
/// observers. Buffered instead while a `group_set_data` closure runs.
pub fn set_data(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    patch: Map<String, Value>,
) -> Result<(), ServiceError> {
    apply_patch(scope, id, patch, true)
}

/// Buffers every `set_data` on `id` inside `f` into one patch, flushed
/// as a single render push when `f` returns. The flush happens even when
/// `f` fails; the failure is then routed to the instance's error hook.
pub fn group_set_data<F>(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    f: F,
) -> Result<(), ServiceError>
where
    F: FnOnce(&mut SessionScope<'_>, &InstanceId) -> anyhow::Result<()>,
{
    {
        let instance = scope.session.require_mut(id)?;
        if instance.pending_group.is_some() {
            // Re-entrant group: the outermost call owns the flush.
            let result = f(scope, id);
            if let Err(err) = result {
                super::report_instance_error(scope, id, &err);
            }
            return Ok(());
        }
        instance.pending_group = Some(Map::new());
    }

    let result = f(scope, id);

    // The closure may have detached the instance; the buffer goes with it.
    let pending = scope
        .session
        .get_mut(id)
        .and_then(|instance| instance.pending_group.take());
    if let Some(patch) = pending {
        if !patch.is_empty() {
            apply_patch(scope, id, patch, true)?;
        }
    }
    if let Err(err) = result {
        super::report_instance_error(scope, id, &err);
    }
    Ok(())
}

/// Applies a patch arriving from the render context (property pushes).
/// The render context already has these values, so nothing is echoed.
pub fn apply_remote_patch(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    patch: Map<String, Value>,
) -> Result<(), ServiceError> {
    apply_patch(scope, id, patch, false)
}

fn apply_patch(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    patch: Map<String, Value>,
    notify_render: bool,
) -> Result<(), ServiceError> {
    let bridge_id;
    let changed: Vec<(String, Option<Value>)>;
    {
        let instance = scope.session.require_mut(id)?;
        if !instance.is_alive() {
            log::debug!("dropping patch for detached instance '{id}'");
            return Ok(());
        }
        if notify_render {
            if let Some(buffer) = instance.pending_group.as_mut() {
                for (path, value) in patch {
                    buffer.insert(path, value);
                }
                return Ok(());
            }
        }
        bridge_id = instance.bridge_id.clone();

        let mut root = Value::Object(std::mem::take(&mut instance.data));
        let mut applied = Vec::with_capacity(patch.len());
        for (path, value) in &patch {
            let old = mikan_core::path::get_path(&root, path).cloned();
            match set_path(&mut root, path, value.clone()) {
                Ok(()) => applied.push((path.clone(), old)),
                // One bad key never poisons the rest of the patch.
                Err(err) => log::warn!("instance '{id}': patch key '{path}': {err}"),
            }
        }
        instance.data = match root {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        changed = applied;

        if notify_render {
            let visible = filter_private(&patch);
            if !visible.is_empty() {
                scope.transport.send(Envelope::new(
                    types::UPDATE_DATA,
                    MessageTarget::Render,
                    json!({
                        "bridgeId": bridge_id,
                        "moduleId": id,
                        "data": Value::Object(visible),
                    }),
                ));
            }
        }
    }
    if changed.is_empty() {
        return Ok(());
    }

    let changed_keys: BTreeSet<String> = changed
        .iter()
        .map(|(path, _)| top_level_key(path).to_string())
        .collect();
    run_property_observers(scope, id, &changed);
    sync_child_props(scope, id, &changed_keys);
    observer::dispatch(scope, id, &changed);
    Ok(())
}

/// Invokes the named observer method of each declared property whose
/// top-level key changed, with `{ newVal, oldVal }`.
fn run_property_observers(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    changed: &[(String, Option<Value>)],
) {
    let Some(instance) = scope.session.get(id) else {
        return;
    };
    let blueprint = instance.blueprint.clone();
    let mut seen = BTreeSet::new();
    for (path, old) in changed {
        let key = top_level_key(path);
        if !seen.insert(key.to_string()) {
            continue;
        }
        let Some(method_name) = blueprint
            .properties
            .get(key)
            .and_then(|prop| prop.observer.clone())
        else {
            continue;
        };
        let Some(method) = blueprint.methods.get(&method_name).cloned() else {
            log::warn!("instance '{id}': property observer '{method_name}' is not a method");
            continue;
        };
        let new_value = scope
            .session
            .get(id)
            .and_then(|inst| lookup(&inst.data, key).cloned())
            .unwrap_or(Value::Null);
        let event = json!({
            "newVal": new_value,
            "oldVal": old.clone().unwrap_or(Value::Null),
        });
        let result = method(scope, id, event).map(|_| ());
        super::run_contained(scope, id, result);
    }
}

/// Recomputes declared property bindings on direct children whose
/// expression depends on a changed key, so a synchronous read of the
/// child right after the parent's `set_data` sees the new value.
fn sync_child_props(scope: &mut SessionScope<'_>, id: &InstanceId, changed_keys: &BTreeSet<String>) {
    let Some(parent) = scope.session.get(id) else {
        return;
    };
    let children = parent.children.clone();
    for child_id in children {
        let Some(child) = scope.session.get(&child_id) else {
            continue;
        };
        let mut patch = Map::new();
        for binding in &child.prop_bindings {
            let Some(dependency) = &binding.dependency else {
                continue;
            };
            if !changed_keys.contains(dependency) {
                continue;
            }
            let value = scope
                .session
                .get(id)
                .and_then(|parent| lookup(&parent.data, &binding.expression).cloned())
                .unwrap_or(Value::Null);
            patch.insert(binding.target.clone(), value);
        }
        if !patch.is_empty() {
            // The render context recomputes the same binding itself.
            if let Err(err) = apply_patch(scope, &child_id, patch, false) {
                log::warn!("child prop sync to '{child_id}' failed: {err}");
            }
        }
    }
}

/// Reads a dot/bracket path rooted in a data map.
pub(crate) fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    let mut iter = segments.iter();
    let mut current = match iter.next()? {
        PathSegment::Key(key) => data.get(key.as_str())?,
        PathSegment::Index(_) => return None,
    };
    for segment in iter {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str())?,
            PathSegment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

/// Drops patch keys whose top-level key starts with `_` or `$`; those
/// are logic-side private state.
pub(crate) fn filter_private(patch: &Map<String, Value>) -> Map<String, Value> {
    patch
        .iter()
        .filter(|(path, _)| !top_level_key(path).starts_with(['_', '$']))
        .map(|(path, value)| (path.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_nested_paths() {
        let data = match json!({ "a": { "b": [1, 2] } }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(lookup(&data, "a.b[1]"), Some(&json!(2)));
        assert_eq!(lookup(&data, "a.c"), None);
        assert_eq!(lookup(&data, "missing"), None);
    }

    #[test]
    fn private_keys_stay_logic_side() {
        let patch = match json!({ "_cache.x": 1, "$ref": 3, "visible": 2 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let visible = filter_private(&patch);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains_key("visible"));
    }
}
