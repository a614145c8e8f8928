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

//! Named platform APIs: a two-tier dispatch.
//!
//! Statically known operations live in an explicit map; anything else
//! goes through `invoke_remote`, a control call to the container with an
//! embedded correlation id resolved later by `triggerCallback`. There is
//! no implicit interception anywhere: one lookup, one branch.

use crate::scope::{ServiceCallbackFn, SessionScope};
use mikan_core::envelope::{types, Envelope, MessageTarget};
use mikan_core::{CallbackId, InstanceId};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// A statically known operation. It owns its whole dispatch: it may
/// answer synchronously through the correlation callback or forward an
/// envelope and leave the callback pending.
pub type ApiHandler =
    Rc<dyn Fn(&mut SessionScope<'_>, Value, Option<CallbackId>) -> anyhow::Result<()>>;

/// The map of statically known operations.
pub struct ApiRegistry {
    known: HashMap<String, ApiHandler>,
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ApiRegistry {
    /// An empty registry with no known operations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known: HashMap::new(),
        }
    }

    /// The standard registry: `selectorQuery` forwarded to the render
    /// context, which owns layout and node fields.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("selectorQuery", |scope, params, callback_id| {
            scope.transport.send(Envelope::new(
                types::INVOKE_API,
                MessageTarget::Render,
                json!({
                    "bridgeId": scope.session.bridge_id,
                    "name": "selectorQuery",
                    "params": params,
                    "callbackId": callback_id,
                }),
            ));
            Ok(())
        });
        registry
    }

    /// Registers a known operation.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut SessionScope<'_>, Value, Option<CallbackId>) -> anyhow::Result<()> + 'static,
    {
        self.known.insert(name.into(), Rc::new(handler));
    }

    /// Looks a known operation up.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ApiHandler> {
        self.known.get(name).cloned()
    }

    /// `true` when the operation is statically known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.known.contains_key(name)
    }
}

/// Invokes a named API: known operations dispatch locally, everything
/// else becomes a remote control call to the container.
pub fn invoke<F>(scope: &mut SessionScope<'_>, name: &str, params: Value, success: Option<F>)
where
    F: Fn(&mut SessionScope<'_>, Value) + 'static,
{
    let callback_id =
        success.map(|f| scope.callbacks.store(Rc::new(f) as Rc<ServiceCallbackFn>, false));
    match scope.api.get(name) {
        Some(handler) => {
            if let Err(err) = handler(scope, params, callback_id.clone()) {
                log::error!("api '{name}' failed: {err:#}");
                if let Some(id) = callback_id {
                    scope.callbacks.remove(&id);
                }
            }
        }
        None => invoke_remote(scope, name, params, callback_id),
    }
}

/// The explicit fallback for operations this context does not know: a
/// fire-and-forget control call to the container, correlated by id.
pub fn invoke_remote(
    scope: &mut SessionScope<'_>,
    name: &str,
    params: Value,
    callback_id: Option<CallbackId>,
) {
    scope.transport.invoke(Envelope::new(
        types::INVOKE_API,
        MessageTarget::Container,
        json!({
            "bridgeId": scope.session.bridge_id,
            "name": name,
            "params": params,
            "callbackId": callback_id,
        }),
    ));
}

/// One entry of a batched selector query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTask {
    /// Instance scoping the selector.
    pub module_id: InstanceId,
    /// The selector string.
    pub selector: String,
    /// First match only, or all matches.
    pub single: bool,
    /// Node fields the caller wants back.
    pub fields: Vec<String>,
}

/// Builder for the batched selector query protocol: tasks accumulate,
/// `exec` ships them in one message, and the response arrives as one
/// result array index-aligned to the tasks.
#[derive(Debug, Default)]
pub struct SelectorQuery {
    tasks: Vec<QueryTask>,
}

impl SelectorQuery {
    /// An empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a first-match task.
    #[must_use]
    pub fn select(mut self, module_id: InstanceId, selector: impl Into<String>) -> Self {
        self.tasks.push(QueryTask {
            module_id,
            selector: selector.into(),
            single: true,
            fields: Vec::new(),
        });
        self
    }

    /// Adds an all-matches task.
    #[must_use]
    pub fn select_all(mut self, module_id: InstanceId, selector: impl Into<String>) -> Self {
        self.tasks.push(QueryTask {
            module_id,
            selector: selector.into(),
            single: false,
            fields: Vec::new(),
        });
        self
    }

    /// Names the node fields the latest task should report.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(task) = self.tasks.last_mut() {
            task.fields = fields.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Ships the batch; `success` receives the index-aligned results.
    pub fn exec<F>(self, scope: &mut SessionScope<'_>, success: F)
    where
        F: Fn(&mut SessionScope<'_>, Value) + 'static,
    {
        if self.tasks.is_empty() {
            success(scope, Value::Array(Vec::new()));
            return;
        }
        let params = json!({ "tasks": self.tasks });
        invoke(scope, "selectorQuery", params, Some(success));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_selector_query() {
        let registry = ApiRegistry::with_builtins();
        assert!(registry.contains("selectorQuery"));
        assert!(!registry.contains("navigateTo"));
    }

    #[test]
    fn query_tasks_serialize_index_aligned() {
        let query = SelectorQuery::new()
            .select(InstanceId::from("m1"), "#header")
            .fields(["size"])
            .select_all(InstanceId::from("m1"), ".cell");
        let tasks = serde_json::to_value(&query.tasks).unwrap();
        assert_eq!(
            tasks,
            serde_json::json!([
                { "moduleId": "m1", "selector": "#header", "single": true, "fields": ["size"] },
                { "moduleId": "m1", "selector": ".cell", "single": false, "fields": [] },
            ])
        );
    }
}
