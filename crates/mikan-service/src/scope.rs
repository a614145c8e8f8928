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

//! The explicit per-call handle every engine operates on.
//!
//! Instead of reading a module-level registry keyed by session id, each
//! message-handling turn builds a [`SessionScope`] over the one session
//! the envelope addresses and threads it through every engine call and
//! every user callback. Multi-session behavior falls out of having two
//! scopes over two sessions; tests never need global setup.

use crate::api::ApiRegistry;
use crate::blueprint::ModuleRegistry;
use crate::session::Session;
use mikan_core::callback::CallbackRegistry;
use mikan_core::{InstanceId, Transport};
use serde_json::Value;
use std::rc::Rc;

/// A lifecycle hook bound to an instance: `created`, `attached`, …
///
/// Hooks receive the scope and their instance id rather than `&mut self`;
/// they look their instance up through the scope when they need it, which
/// keeps re-entrant engine calls (a hook calling `set_data`) borrow-safe.
pub type HookFn = Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId) -> anyhow::Result<()>>;

/// A hook that additionally receives a JSON payload (`onLoad` query,
/// scroll/resize events, …).
pub type EventHookFn = Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId, Value) -> anyhow::Result<()>>;

/// A user-declared method, addressable by name from view events.
pub type MethodFn =
    Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId, Value) -> anyhow::Result<Option<Value>>>;

/// A data observer callback; receives one positional argument per
/// matched key.
pub type ObserverFn = Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId, &[Value]) -> anyhow::Result<()>>;

/// A relation `linked`/`unlinked` callback: `(scope, self, other)`.
pub type RelationHookFn =
    Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId, &InstanceId) -> anyhow::Result<()>>;

/// The instance-level `error` hook. Infallible on purpose: there is no
/// further boundary to route a failure of the failure handler to.
pub type ErrorHookFn = Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId, &anyhow::Error)>;

/// A custom export: replaces the instance in selector results.
pub type ExportFn = Rc<dyn Fn(&mut SessionScope<'_>, &InstanceId) -> Value>;

/// A stored correlation callback resolved by `triggerCallback`.
pub type ServiceCallbackFn = dyn Fn(&mut SessionScope<'_>, Value);

/// Everything one message-handling turn may touch: the addressed session,
/// the shared module registry, the context's single transport, the
/// correlation callbacks and the API dispatch table.
pub struct SessionScope<'a> {
    /// The session the current envelope addresses.
    pub session: &'a mut Session,
    /// Shared, read-only blueprint registry.
    pub modules: &'a ModuleRegistry,
    /// The context's one physical transport.
    pub transport: &'a dyn Transport,
    /// Correlation callbacks awaiting `triggerCallback`.
    pub callbacks: &'a mut CallbackRegistry<ServiceCallbackFn>,
    /// Two-tier named-API dispatch.
    pub api: &'a ApiRegistry,
}
