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

//! Compiler-produced module blueprints.
//!
//! A [`ModuleBlueprint`] is the immutable description of a Page or
//! Component: initial data, declared properties, methods, lifecycle
//! hooks, observers and relations. It is produced once per distinct path
//! by the registration contract ([`PageSpec`]/[`ComponentSpec`] plus an
//! out-of-band [`ExtraInfo`]) and shared read-only by every instance via
//! `Rc`. Behavior composition runs at registration time, so instances
//! never consult behaviors directly.

mod behavior;
mod registry;

pub use behavior::{Behavior, BehaviorRef, BuiltinBehavior};
pub(crate) use behavior::{compose_component, compose_page};
pub use registry::{ModuleRegistry, ResourceBundle};

use crate::scope::{
    ErrorHookFn, EventHookFn, ExportFn, HookFn, MethodFn, ObserverFn, RelationHookFn,
};
use mikan_core::property::{PropertyTag, WireProperty};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Whether a blueprint was registered as a page or a component.
///
/// A component registered with `ExtraInfo { component: false, .. }` is a
/// page authored with the component constructor; it keeps `Component`
/// kind but behaves page-like in the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Registered through [`ModuleRegistry::register_page`].
    Page,
    /// Registered through [`ModuleRegistry::register_component`].
    Component,
}

/// A declared component property.
#[derive(Clone)]
pub struct PropertySpec {
    /// Accepted type tags; empty means untyped.
    pub types: Vec<PropertyTag>,
    /// Default value when the view supplies none.
    pub default: Value,
    /// Name of the method invoked when the property updates from the
    /// render context.
    pub observer: Option<String>,
}

impl PropertySpec {
    /// A property with one declared type and a default.
    #[must_use]
    pub fn new(tag: PropertyTag, default: Value) -> Self {
        Self {
            types: vec![tag],
            default,
            observer: None,
        }
    }

    /// An untyped property.
    #[must_use]
    pub fn untyped(default: Value) -> Self {
        Self {
            types: Vec::new(),
            default,
            observer: None,
        }
    }

    /// Accepts an additional type (`optionalTypes`).
    #[must_use]
    pub fn optional_type(mut self, tag: PropertyTag) -> Self {
        self.types.push(tag);
        self
    }

    /// Names the method run when the property updates.
    #[must_use]
    pub fn observer(mut self, method: impl Into<String>) -> Self {
        self.observer = Some(method.into());
        self
    }
}

/// The typed role of a relation, from the declaring side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The partner is this instance's direct parent.
    Parent,
    /// The partner is a direct child.
    Child,
    /// The partner is anywhere up the parent chain.
    Ancestor,
    /// The partner is anywhere below this instance.
    Descendant,
}

/// What the partner of a relation is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    /// The partner's module path (already resolved absolute).
    Path(String),
    /// Any partner whose blueprint carries this behavior id.
    Behavior(String),
}

/// A relation as declared on a spec or behavior, keyed by its relative
/// target path (or an arbitrary name when `target` is a behavior id).
#[derive(Clone)]
pub struct RelationDecl {
    /// Declared kind.
    pub kind: RelationKind,
    /// Behavior id to match instead of the key path.
    pub target: Option<String>,
    /// Fired once per partner when the edge is established.
    pub linked: Option<RelationHookFn>,
    /// Fired once per partner when the edge is removed.
    pub unlinked: Option<RelationHookFn>,
}

impl RelationDecl {
    /// A relation of the given kind matching the declaration key path.
    #[must_use]
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            target: None,
            linked: None,
            unlinked: None,
        }
    }

    /// Match partners by behavior id instead of module path.
    #[must_use]
    pub fn target_behavior(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    /// Sets the `linked` callback.
    #[must_use]
    pub fn linked<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, &mikan_core::InstanceId) -> anyhow::Result<()>
            + 'static,
    {
        self.linked = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the `unlinked` callback.
    #[must_use]
    pub fn unlinked<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, &mikan_core::InstanceId) -> anyhow::Result<()>
            + 'static,
    {
        self.unlinked = Some(std::rc::Rc::new(f));
        self
    }
}

/// A composed relation inside a blueprint, with its target resolved.
#[derive(Clone)]
pub struct RelationSpec {
    /// Declared kind.
    pub kind: RelationKind,
    /// Resolved match target.
    pub target: RelationTarget,
    /// Fired when an edge is established.
    pub linked: Option<RelationHookFn>,
    /// Fired when an edge is removed.
    pub unlinked: Option<RelationHookFn>,
}

/// The component lifecycle hooks a module (not its behaviors) declares.
#[derive(Clone, Default)]
pub struct ComponentLifetimes {
    /// Instance created.
    pub created: Option<HookFn>,
    /// Instance entered the page tree.
    pub attached: Option<HookFn>,
    /// Render-context layout finished.
    pub ready: Option<HookFn>,
    /// Instance left the page tree. Terminal.
    pub detached: Option<HookFn>,
    /// Receives every caught user-code error of this instance.
    pub error: Option<ErrorHookFn>,
}

/// Page-level hooks (pages and component-constructor pages).
#[derive(Clone, Default)]
pub struct PageHooks {
    /// Page created; receives the open query.
    pub on_load: Option<EventHookFn>,
    /// Page moved to the foreground.
    pub on_show: Option<HookFn>,
    /// Page moved to the background.
    pub on_hide: Option<HookFn>,
    /// First render finished.
    pub on_ready: Option<HookFn>,
    /// Page is being torn down.
    pub on_unload: Option<HookFn>,
    /// Page scrolled; receives `{ scrollTop }`.
    pub on_page_scroll: Option<EventHookFn>,
}

/// A component's hooks into its host page's lifecycle.
#[derive(Clone, Default)]
pub struct PageLifetimes {
    /// Host page shown.
    pub show: Option<HookFn>,
    /// Host page hidden.
    pub hide: Option<HookFn>,
    /// Host page resized; receives the new size.
    pub resize: Option<EventHookFn>,
    /// Host page's route animation finished.
    pub route_done: Option<HookFn>,
}

/// Lifecycle hooks contributed by behaviors, in merge order.
#[derive(Clone, Default)]
pub struct BehaviorLifetimes {
    /// Appended `created` hooks.
    pub created: Vec<HookFn>,
    /// Appended `attached` hooks.
    pub attached: Vec<HookFn>,
    /// Appended `ready` hooks.
    pub ready: Vec<HookFn>,
    /// Appended `detached` hooks.
    pub detached: Vec<HookFn>,
}

/// Page-lifetime hooks contributed by behaviors, in merge order.
#[derive(Clone, Default)]
pub struct BehaviorPageLifetimes {
    /// Appended `show` hooks.
    pub show: Vec<HookFn>,
    /// Appended `hide` hooks.
    pub hide: Vec<HookFn>,
    /// Appended `resize` hooks.
    pub resize: Vec<EventHookFn>,
}

/// A lifecycle stage whose hooks can be enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeStage {
    /// `created`
    Created,
    /// `attached`
    Attached,
    /// `ready`
    Ready,
    /// `detached`
    Detached,
}

/// One observer rule: a key pattern plus its callbacks in merge order.
#[derive(Clone)]
pub struct ObserverRule {
    /// The declared pattern (`a`, `a, b`, `a.**`, `arr[12]`, `**`).
    pub pattern: String,
    /// Behavior callbacks first, the module's own last.
    pub callbacks: Vec<ObserverFn>,
}

/// Out-of-band registration info injected by the compiler.
#[derive(Debug, Clone, Default)]
pub struct ExtraInfo {
    /// Module path, unique per blueprint.
    pub path: String,
    /// `true` for a real custom component, `false` for a
    /// component-constructor page.
    pub component: bool,
    /// Child component name → module path.
    pub using_components: BTreeMap<String, String>,
}

impl ExtraInfo {
    /// Info for a page module.
    #[must_use]
    pub fn page(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component: false,
            using_components: BTreeMap::new(),
        }
    }

    /// Info for a component module.
    #[must_use]
    pub fn component(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component: true,
            using_components: BTreeMap::new(),
        }
    }

    /// Declares a child component.
    #[must_use]
    pub fn using(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.using_components.insert(name.into(), path.into());
        self
    }
}

/// The immutable, composed description of a Page or Component.
pub struct ModuleBlueprint {
    /// Module path (registration key).
    pub path: String,
    /// Page or component registration.
    pub kind: ModuleKind,
    /// `true` only for real custom components.
    pub is_component: bool,
    /// Child component name → path.
    pub using_components: BTreeMap<String, String>,
    /// Initial data after behavior composition.
    pub data: Map<String, Value>,
    /// Declared properties after composition.
    pub properties: BTreeMap<String, PropertySpec>,
    /// Declared external classes.
    pub external_classes: Vec<String>,
    /// Name → method after composition.
    pub methods: HashMap<String, MethodFn>,
    /// The module's own lifecycle hooks.
    pub lifetimes: ComponentLifetimes,
    /// Hooks appended by behaviors.
    pub behavior_lifetimes: BehaviorLifetimes,
    /// Page-level hooks.
    pub page_hooks: PageHooks,
    /// The module's own page-lifetime hooks.
    pub page_lifetimes: PageLifetimes,
    /// Page-lifetime hooks appended by behaviors.
    pub behavior_page_lifetimes: BehaviorPageLifetimes,
    /// Observer rules, behavior rules before own rules.
    pub observers: Vec<ObserverRule>,
    /// Relations keyed by resolved target path or behavior-relation name.
    pub relations: BTreeMap<String, RelationSpec>,
    /// Custom export, substituted for the instance in selector results.
    pub export: Option<ExportFn>,
    /// Set by the `mikan://component-export` built-in behavior.
    pub exports_component: bool,
    /// Every behavior id reachable from this module (named custom
    /// behaviors and built-ins), for relation/`has_behavior` matching.
    pub behavior_ids: BTreeSet<String>,
}

impl ModuleBlueprint {
    /// `true` when this blueprint behaves like a page.
    #[must_use]
    pub fn is_page_like(&self) -> bool {
        !self.is_component
    }

    /// All hooks of one lifecycle stage: behavior hooks in merge order,
    /// the module's own hook last.
    #[must_use]
    pub fn stage_hooks(&self, stage: LifetimeStage) -> Vec<HookFn> {
        let (appended, own) = match stage {
            LifetimeStage::Created => (&self.behavior_lifetimes.created, &self.lifetimes.created),
            LifetimeStage::Attached => (&self.behavior_lifetimes.attached, &self.lifetimes.attached),
            LifetimeStage::Ready => (&self.behavior_lifetimes.ready, &self.lifetimes.ready),
            LifetimeStage::Detached => (&self.behavior_lifetimes.detached, &self.lifetimes.detached),
        };
        let mut hooks: Vec<HookFn> = appended.clone();
        if let Some(own) = own {
            hooks.push(own.clone());
        }
        hooks
    }

    /// Recursively checks whether this module carries a behavior id.
    #[must_use]
    pub fn has_behavior(&self, id: &str) -> bool {
        self.behavior_ids.contains(id)
    }

    /// The wire form of the declared properties, as shipped inside
    /// `firstRender` initial props: type tags, defaults, and external
    /// classes flagged `cls`.
    #[must_use]
    pub fn wire_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        for (name, spec) in &self.properties {
            let wire = WireProperty {
                types: spec.types.clone(),
                default: if spec.default.is_null() {
                    None
                } else {
                    Some(spec.default.clone())
                },
                cls: false,
            };
            if let Ok(value) = serde_json::to_value(&wire) {
                props.insert(name.clone(), value);
            }
        }
        for class in &self.external_classes {
            if let Ok(value) = serde_json::to_value(WireProperty::external_class()) {
                props.insert(class.clone(), value);
            }
        }
        props
    }
}

/// Resolves a relative module path (`./x`, `../x`) against the declaring
/// module's own path. Pure string-segment resolution; absolute targets
/// pass through untouched.
#[must_use]
pub fn resolve_module_path(base_module: &str, target: &str) -> String {
    if !target.starts_with('.') {
        return target.to_string();
    }
    let mut parts: Vec<&str> = base_module.split('/').collect();
    // Drop the module's own name; resolution is against its directory.
    parts.pop();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Builder for a page module, mirroring the `Page(spec)` registration
/// call emitted by the compiler.
#[derive(Default)]
pub struct PageSpec {
    pub(crate) data: Map<String, Value>,
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) page_hooks: PageHooks,
}

impl PageSpec {
    /// An empty page spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial data object.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        } else {
            log::warn!("page data must be an object; ignoring");
        }
        self
    }

    /// Declares a named method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<Option<Value>>
            + 'static,
    {
        self.methods.insert(name.into(), std::rc::Rc::new(f));
        self
    }

    /// Sets `onLoad`.
    #[must_use]
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<()>
            + 'static,
    {
        self.page_hooks.on_load = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onShow`.
    #[must_use]
    pub fn on_show<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_hooks.on_show = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onHide`.
    #[must_use]
    pub fn on_hide<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_hooks.on_hide = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onReady`.
    #[must_use]
    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_hooks.on_ready = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onUnload`.
    #[must_use]
    pub fn on_unload<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_hooks.on_unload = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onPageScroll`.
    #[must_use]
    pub fn on_page_scroll<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<()>
            + 'static,
    {
        self.page_hooks.on_page_scroll = Some(std::rc::Rc::new(f));
        self
    }
}

/// Builder for a component module, mirroring the `Component(spec)`
/// registration call.
#[derive(Default)]
pub struct ComponentSpec {
    pub(crate) data: Map<String, Value>,
    pub(crate) properties: BTreeMap<String, PropertySpec>,
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) observers: Vec<(String, ObserverFn)>,
    pub(crate) behaviors: Vec<BehaviorRef>,
    pub(crate) relations: BTreeMap<String, RelationDecl>,
    pub(crate) lifetimes: ComponentLifetimes,
    pub(crate) page_lifetimes: PageLifetimes,
    pub(crate) page_hooks: PageHooks,
    pub(crate) export: Option<ExportFn>,
    pub(crate) external_classes: Vec<String>,
}

impl ComponentSpec {
    /// An empty component spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial data object.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        } else {
            log::warn!("component data must be an object; ignoring");
        }
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Declares a named method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<Option<Value>>
            + 'static,
    {
        self.methods.insert(name.into(), std::rc::Rc::new(f));
        self
    }

    /// Declares an observer rule.
    #[must_use]
    pub fn observer<F>(mut self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, &[Value]) -> anyhow::Result<()>
            + 'static,
    {
        self.observers.push((pattern.into(), std::rc::Rc::new(f)));
        self
    }

    /// Mixes in a behavior.
    #[must_use]
    pub fn behavior(mut self, behavior: std::rc::Rc<Behavior>) -> Self {
        self.behaviors.push(BehaviorRef::Custom(behavior));
        self
    }

    /// Mixes in a built-in behavior by reserved id.
    #[must_use]
    pub fn builtin_behavior(mut self, id: impl Into<String>) -> Self {
        self.behaviors.push(BehaviorRef::Builtin(id.into()));
        self
    }

    /// Declares a relation under its target key.
    #[must_use]
    pub fn relation(mut self, key: impl Into<String>, decl: RelationDecl) -> Self {
        self.relations.insert(key.into(), decl);
        self
    }

    /// Sets the `created` hook.
    #[must_use]
    pub fn created<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.lifetimes.created = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the `attached` hook.
    #[must_use]
    pub fn attached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.lifetimes.attached = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the `ready` hook.
    #[must_use]
    pub fn ready<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.lifetimes.ready = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the `detached` hook.
    #[must_use]
    pub fn detached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.lifetimes.detached = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the `error` hook, the sink for caught user-code failures.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, &anyhow::Error) + 'static,
    {
        self.lifetimes.error = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the host page `show` lifetime.
    #[must_use]
    pub fn page_show<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_lifetimes.show = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the host page `hide` lifetime.
    #[must_use]
    pub fn page_hide<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_lifetimes.hide = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the host page `resize` lifetime.
    #[must_use]
    pub fn page_resize<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<()>
            + 'static,
    {
        self.page_lifetimes.resize = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets `onLoad` for component-constructor pages.
    #[must_use]
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<()>
            + 'static,
    {
        self.page_hooks.on_load = Some(std::rc::Rc::new(f));
        self
    }

    /// Sets the custom export returned by selectors instead of the
    /// instance. Requires the `mikan://component-export` behavior to
    /// take effect.
    #[must_use]
    pub fn export<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> Value + 'static,
    {
        self.export = Some(std::rc::Rc::new(f));
        self
    }

    /// Declares an external class.
    #[must_use]
    pub fn external_class(mut self, name: impl Into<String>) -> Self {
        self.external_classes.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_module_paths() {
        assert_eq!(
            resolve_module_path("pages/index/index", "./item"),
            "pages/index/item"
        );
        assert_eq!(
            resolve_module_path("pages/index/index", "../shared/cell"),
            "pages/shared/cell"
        );
        assert_eq!(resolve_module_path("c1", "./sibling"), "sibling");
        assert_eq!(
            resolve_module_path("pages/index/index", "components/tag"),
            "components/tag"
        );
    }
}
