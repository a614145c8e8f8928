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

//! The instance engines: lifecycle, data/observer, relations, selector.
//!
//! Every engine is a set of free functions over a [`SessionScope`].
//! Nothing here holds state of its own; all state lives in the session
//! and its instances, which keeps the engines trivially re-entrant under
//! run-to-completion semantics.

pub mod data;
pub mod lifecycle;
pub mod observer;
pub mod relations;
pub mod selector;

pub use selector::Selected;

use crate::scope::{HookFn, SessionScope};
use mikan_core::InstanceId;

/// Routes a caught user-code failure to the instance's `error` hook, or
/// the log. No failure may cross the instance boundary.
pub fn report_instance_error(scope: &mut SessionScope<'_>, id: &InstanceId, err: &anyhow::Error) {
    let sink = scope
        .session
        .get(id)
        .and_then(|inst| inst.blueprint.lifetimes.error.clone());
    match sink {
        Some(sink) => sink(scope, id, err),
        None => log::error!("instance '{id}': uncaught error: {err:#}"),
    }
}

/// Runs one fallible user hook with instance-boundary containment.
pub fn run_contained(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    result: anyhow::Result<()>,
) {
    if let Err(err) = result {
        report_instance_error(scope, id, &err);
    }
}

/// Runs a list of lifecycle hooks in order; a failing hook never stops
/// the rest.
pub fn run_hooks(scope: &mut SessionScope<'_>, id: &InstanceId, hooks: &[HookFn]) {
    for hook in hooks {
        let result = hook(scope, id);
        run_contained(scope, id, result);
    }
}

impl SessionScope<'_> {
    /// Applies a data patch to an instance; see [`data::set_data`].
    pub fn set_data(
        &mut self,
        id: &InstanceId,
        patch: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), crate::ServiceError> {
        data::set_data(self, id, patch)
    }

    /// Buffers every `set_data` in `f` into one flush; see
    /// [`data::group_set_data`].
    pub fn group_set_data<F>(&mut self, id: &InstanceId, f: F) -> Result<(), crate::ServiceError>
    where
        F: FnOnce(&mut SessionScope<'_>, &InstanceId) -> anyhow::Result<()>,
    {
        data::group_set_data(self, id, f)
    }

    /// First matching descendant of `root`; see
    /// [`selector::select_component`].
    pub fn select_component(&mut self, root: &InstanceId, selector: &str) -> Option<Selected> {
        selector::select_component(self, root, selector)
    }

    /// All matching descendants of `root`.
    pub fn select_all_components(&mut self, root: &InstanceId, selector: &str) -> Vec<Selected> {
        selector::select_all_components(self, root, selector)
    }

    /// The component instance owning `id` (its nearest component
    /// ancestor), if any.
    #[must_use]
    pub fn select_owner_component(&self, id: &InstanceId) -> Option<InstanceId> {
        selector::select_owner_component(self, id)
    }

    /// Linked partners of one declared relation, in link order. The key
    /// may be relative (`./x`) to the instance's own module path.
    #[must_use]
    pub fn get_relation_nodes(&self, id: &InstanceId, key: &str) -> Vec<InstanceId> {
        relations::relation_nodes(self, id, key)
    }

    /// Emits a custom component event toward the render context, where
    /// the view routes it to whichever handler the template bound.
    pub fn trigger_event(&mut self, id: &InstanceId, name: &str, detail: serde_json::Value) {
        lifecycle::emit_event(self, id, name, detail);
    }

    /// Invokes a named platform API; see [`crate::api::ApiRegistry`].
    pub fn invoke_api<F>(&mut self, name: &str, params: serde_json::Value, success: Option<F>)
    where
        F: Fn(&mut SessionScope<'_>, serde_json::Value) + 'static,
    {
        crate::api::invoke(self, name, params, success)
    }
}
