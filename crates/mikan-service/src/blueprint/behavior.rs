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

//! Behavior mixins and registration-time composition.
//!
//! Behaviors are merged into a flat [`ModuleBlueprint`] once, when the
//! module registers. Merge rules: the module's own data/properties/
//! methods/relations always win; among behaviors a later one overrides an
//! earlier one; lifecycle hooks and observers are appended, never
//! replaced, with the module's own contribution running last. A behavior
//! instance (one `Rc`) reachable twice through nesting merges once.

use super::{
    BehaviorLifetimes, BehaviorPageLifetimes, ComponentSpec, ExtraInfo, ModuleBlueprint,
    ModuleKind, ObserverRule, PageSpec, PropertySpec, RelationDecl, RelationSpec, RelationTarget,
    resolve_module_path,
};
use crate::scope::{ExportFn, HookFn, MethodFn, ObserverFn};
use mikan_core::property::PropertyTag;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// A reusable mixin of data, properties, methods, observers, relations
/// and lifecycle hooks. Behaviors nest; nested behaviors merge before
/// the behavior that includes them.
#[derive(Default)]
pub struct Behavior {
    /// Optional id, matchable by behavior-targeted relations and
    /// [`ModuleBlueprint::has_behavior`].
    pub id: Option<String>,
    pub(crate) data: Map<String, Value>,
    pub(crate) properties: BTreeMap<String, PropertySpec>,
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) observers: Vec<(String, ObserverFn)>,
    pub(crate) behaviors: Vec<BehaviorRef>,
    pub(crate) relations: BTreeMap<String, RelationDecl>,
    pub(crate) created: Option<HookFn>,
    pub(crate) attached: Option<HookFn>,
    pub(crate) ready: Option<HookFn>,
    pub(crate) detached: Option<HookFn>,
    pub(crate) page_show: Option<HookFn>,
    pub(crate) page_hide: Option<HookFn>,
    pub(crate) export: Option<ExportFn>,
}

impl Behavior {
    /// An empty behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives the behavior an id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets contributed data.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        } else {
            log::warn!("behavior data must be an object; ignoring");
        }
        self
    }

    /// Contributes a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Contributes a method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, Value) -> anyhow::Result<Option<Value>>
            + 'static,
    {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    /// Contributes an observer rule.
    #[must_use]
    pub fn observer<F>(mut self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId, &[Value]) -> anyhow::Result<()>
            + 'static,
    {
        self.observers.push((pattern.into(), Rc::new(f)));
        self
    }

    /// Nests another behavior.
    #[must_use]
    pub fn behavior(mut self, behavior: Rc<Behavior>) -> Self {
        self.behaviors.push(BehaviorRef::Custom(behavior));
        self
    }

    /// Nests a built-in behavior by reserved id.
    #[must_use]
    pub fn builtin_behavior(mut self, id: impl Into<String>) -> Self {
        self.behaviors.push(BehaviorRef::Builtin(id.into()));
        self
    }

    /// Contributes a relation.
    #[must_use]
    pub fn relation(mut self, key: impl Into<String>, decl: RelationDecl) -> Self {
        self.relations.insert(key.into(), decl);
        self
    }

    /// Contributes a `created` hook.
    #[must_use]
    pub fn created<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.created = Some(Rc::new(f));
        self
    }

    /// Contributes an `attached` hook.
    #[must_use]
    pub fn attached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.attached = Some(Rc::new(f));
        self
    }

    /// Contributes a `ready` hook.
    #[must_use]
    pub fn ready<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.ready = Some(Rc::new(f));
        self
    }

    /// Contributes a `detached` hook.
    #[must_use]
    pub fn detached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.detached = Some(Rc::new(f));
        self
    }

    /// Contributes a host-page `show` hook.
    #[must_use]
    pub fn page_show<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_show = Some(Rc::new(f));
        self
    }

    /// Contributes a host-page `hide` hook.
    #[must_use]
    pub fn page_hide<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> anyhow::Result<()> + 'static,
    {
        self.page_hide = Some(Rc::new(f));
        self
    }

    /// Contributes a custom export. The last behavior's export wins
    /// unless the module declares its own.
    #[must_use]
    pub fn export<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut crate::SessionScope<'_>, &mikan_core::InstanceId) -> Value + 'static,
    {
        self.export = Some(Rc::new(f));
        self
    }
}

/// A behavior reference as it appears in a spec's `behaviors` list.
#[derive(Clone)]
pub enum BehaviorRef {
    /// A user-defined behavior, shared by `Rc`.
    Custom(Rc<Behavior>),
    /// A reserved built-in id (`mikan://…`).
    Builtin(String),
}

/// The reserved built-in behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinBehavior {
    /// Lets the module's `export` replace it in selector results.
    ComponentExport,
    /// Injects `name`/`value` form properties.
    FormField,
    /// Marker for form submit/reset buttons.
    FormFieldButton,
}

impl BuiltinBehavior {
    /// Id of `ComponentExport`.
    pub const COMPONENT_EXPORT: &'static str = "mikan://component-export";
    /// Id of `FormField`.
    pub const FORM_FIELD: &'static str = "mikan://form-field";
    /// Id of `FormFieldButton`.
    pub const FORM_FIELD_BUTTON: &'static str = "mikan://form-field-button";

    /// Parses a reserved id; `None` for anything unrecognized.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            Self::COMPONENT_EXPORT => Some(Self::ComponentExport),
            Self::FORM_FIELD => Some(Self::FormField),
            Self::FORM_FIELD_BUTTON => Some(Self::FormFieldButton),
            _ => None,
        }
    }
}

/// Working state of one composition run.
struct Draft {
    data: Map<String, Value>,
    properties: BTreeMap<String, PropertySpec>,
    methods: HashMap<String, MethodFn>,
    relations: BTreeMap<String, RelationDecl>,
    behavior_lifetimes: BehaviorLifetimes,
    behavior_page_lifetimes: BehaviorPageLifetimes,
    observers: Vec<ObserverRule>,
    behavior_export: Option<ExportFn>,
    exports_component: bool,
    behavior_ids: BTreeSet<String>,
    // Keys declared directly on the module; behaviors never override these.
    own_data: BTreeSet<String>,
    own_properties: BTreeSet<String>,
    own_methods: BTreeSet<String>,
    own_relations: BTreeSet<String>,
    visited: HashSet<*const Behavior>,
}

impl Draft {
    fn merge(&mut self, behavior: &BehaviorRef) {
        match behavior {
            BehaviorRef::Builtin(id) => self.merge_builtin(id),
            BehaviorRef::Custom(rc) => {
                if !self.visited.insert(Rc::as_ptr(rc)) {
                    return;
                }
                // Nested behaviors first, so the including behavior wins.
                for nested in &rc.behaviors {
                    self.merge(nested);
                }
                self.merge_custom(rc);
            }
        }
    }

    fn merge_builtin(&mut self, id: &str) {
        let Some(builtin) = BuiltinBehavior::parse(id) else {
            log::warn!("ignoring unknown built-in behavior '{id}'");
            return;
        };
        self.behavior_ids.insert(id.to_string());
        match builtin {
            BuiltinBehavior::ComponentExport => self.exports_component = true,
            BuiltinBehavior::FormField => {
                if !self.own_properties.contains("name") {
                    self.properties.insert(
                        "name".to_string(),
                        PropertySpec::new(PropertyTag::String, Value::String(String::new())),
                    );
                }
                if !self.own_properties.contains("value") {
                    self.properties
                        .insert("value".to_string(), PropertySpec::untyped(Value::Null));
                }
            }
            // Pure marker; matched by the form machinery in the view.
            BuiltinBehavior::FormFieldButton => {}
        }
    }

    fn merge_custom(&mut self, behavior: &Behavior) {
        if let Some(id) = &behavior.id {
            self.behavior_ids.insert(id.clone());
        }
        for (key, value) in &behavior.data {
            let keep_existing = self.own_data.contains(key);
            match self.data.get_mut(key) {
                Some(slot) => deep_merge(slot, value, keep_existing),
                None => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
        for (name, spec) in &behavior.properties {
            if !self.own_properties.contains(name) {
                self.properties.insert(name.clone(), spec.clone());
            }
        }
        for (name, method) in &behavior.methods {
            if !self.own_methods.contains(name) {
                self.methods.insert(name.clone(), method.clone());
            }
        }
        for (key, decl) in &behavior.relations {
            if !self.own_relations.contains(key) {
                self.relations.insert(key.clone(), decl.clone());
            }
        }
        let lt = &mut self.behavior_lifetimes;
        lt.created.extend(behavior.created.clone());
        lt.attached.extend(behavior.attached.clone());
        lt.ready.extend(behavior.ready.clone());
        lt.detached.extend(behavior.detached.clone());
        let plt = &mut self.behavior_page_lifetimes;
        plt.show.extend(behavior.page_show.clone());
        plt.hide.extend(behavior.page_hide.clone());
        for (pattern, callback) in &behavior.observers {
            self.push_observer(pattern, callback.clone());
        }
        if let Some(export) = &behavior.export {
            self.behavior_export = Some(export.clone());
        }
    }

    fn push_observer(&mut self, pattern: &str, callback: ObserverFn) {
        match self.observers.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.callbacks.push(callback),
            None => self.observers.push(ObserverRule {
                pattern: pattern.to_string(),
                callbacks: vec![callback],
            }),
        }
    }
}

/// Recursive object merge; `keep_existing` makes the current value win
/// at every depth (used for keys the module itself declares).
fn deep_merge(into: &mut Value, from: &Value, keep_existing: bool) {
    match (into, from) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(key) {
                    Some(slot) => deep_merge(slot, value, keep_existing),
                    None => {
                        dst.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => {
            if !keep_existing {
                *slot = value.clone();
            }
        }
    }
}

/// Composes a component spec and its behaviors into a blueprint.
pub(crate) fn compose_component(spec: ComponentSpec, extra: ExtraInfo) -> ModuleBlueprint {
    let mut draft = Draft {
        own_data: spec.data.keys().cloned().collect(),
        own_properties: spec.properties.keys().cloned().collect(),
        own_methods: spec.methods.keys().cloned().collect(),
        own_relations: spec.relations.keys().cloned().collect(),
        data: spec.data,
        properties: spec.properties,
        methods: spec.methods,
        relations: spec.relations,
        behavior_lifetimes: BehaviorLifetimes::default(),
        behavior_page_lifetimes: BehaviorPageLifetimes::default(),
        observers: Vec::new(),
        behavior_export: None,
        exports_component: false,
        behavior_ids: BTreeSet::new(),
        visited: HashSet::new(),
    };
    for behavior in &spec.behaviors {
        draft.merge(behavior);
    }
    // The module's own observers fire after every behavior's.
    for (pattern, callback) in spec.observers {
        draft.push_observer(&pattern, callback);
    }

    let mut relations = BTreeMap::new();
    for (key, decl) in draft.relations {
        let (resolved_key, target) = match &decl.target {
            Some(behavior_id) => (key, RelationTarget::Behavior(behavior_id.clone())),
            None => {
                let path = resolve_module_path(&extra.path, &key);
                (path.clone(), RelationTarget::Path(path))
            }
        };
        relations.insert(
            resolved_key,
            RelationSpec {
                kind: decl.kind,
                target,
                linked: decl.linked,
                unlinked: decl.unlinked,
            },
        );
    }

    ModuleBlueprint {
        path: extra.path,
        kind: ModuleKind::Component,
        is_component: extra.component,
        using_components: extra.using_components,
        data: draft.data,
        properties: draft.properties,
        external_classes: spec.external_classes,
        methods: draft.methods,
        lifetimes: spec.lifetimes,
        behavior_lifetimes: draft.behavior_lifetimes,
        page_hooks: spec.page_hooks,
        page_lifetimes: spec.page_lifetimes,
        behavior_page_lifetimes: draft.behavior_page_lifetimes,
        observers: draft.observers,
        relations,
        export: spec.export.or(draft.behavior_export),
        exports_component: draft.exports_component,
        behavior_ids: draft.behavior_ids,
    }
}

/// Composes a page spec into a blueprint. Pages carry no behaviors,
/// properties or relations.
pub(crate) fn compose_page(spec: PageSpec, extra: ExtraInfo) -> ModuleBlueprint {
    ModuleBlueprint {
        path: extra.path,
        kind: ModuleKind::Page,
        is_component: false,
        using_components: extra.using_components,
        data: spec.data,
        properties: BTreeMap::new(),
        external_classes: Vec::new(),
        methods: spec.methods,
        lifetimes: super::ComponentLifetimes::default(),
        behavior_lifetimes: BehaviorLifetimes::default(),
        page_hooks: spec.page_hooks,
        page_lifetimes: super::PageLifetimes::default(),
        behavior_page_lifetimes: BehaviorPageLifetimes::default(),
        observers: Vec::new(),
        relations: BTreeMap::new(),
        export: None,
        exports_component: false,
        behavior_ids: BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_method() -> MethodFn {
        Rc::new(|_, _, _| Ok(None))
    }

    #[test]
    fn own_data_wins_over_behaviors() {
        let b = Rc::new(
            Behavior::new().data(json!({ "count": 10, "shared": { "a": 1, "b": 2 } })),
        );
        let spec = ComponentSpec::new()
            .data(json!({ "count": 1, "shared": { "a": 99 } }))
            .behavior(b);
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.data["count"], json!(1));
        // Deep merge keeps the module's leaf and fills the gap.
        assert_eq!(bp.data["shared"], json!({ "a": 99, "b": 2 }));
    }

    #[test]
    fn later_behavior_overrides_earlier() {
        let first = Rc::new(Behavior::new().data(json!({ "x": "first" })));
        let second = Rc::new(Behavior::new().data(json!({ "x": "second" })));
        let spec = ComponentSpec::new().behavior(first).behavior(second);
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.data["x"], json!("second"));
    }

    #[test]
    fn including_behavior_overrides_nested() {
        let inner = Rc::new(Behavior::new().data(json!({ "x": "inner", "y": "inner" })));
        let outer = Rc::new(Behavior::new().data(json!({ "x": "outer" })).behavior(inner));
        let spec = ComponentSpec::new().behavior(outer);
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.data["x"], json!("outer"));
        assert_eq!(bp.data["y"], json!("inner"));
    }

    #[test]
    fn shared_behavior_merges_once() {
        let shared = Rc::new(Behavior::new().created(|_, _| Ok(())));
        let wrapper = Rc::new(Behavior::new().behavior(shared.clone()));
        let spec = ComponentSpec::new().behavior(shared).behavior(wrapper);
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.behavior_lifetimes.created.len(), 1);
    }

    #[test]
    fn observers_append_per_pattern() {
        let b1 = Rc::new(Behavior::new().observer("count", |_, _, _| Ok(())));
        let b2 = Rc::new(Behavior::new().observer("count", |_, _, _| Ok(())));
        let spec = ComponentSpec::new()
            .behavior(b1)
            .behavior(b2)
            .observer("count", |_, _, _| Ok(()))
            .observer("other", |_, _, _| Ok(()));
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.observers.len(), 2);
        assert_eq!(bp.observers[0].pattern, "count");
        assert_eq!(bp.observers[0].callbacks.len(), 3);
        assert_eq!(bp.observers[1].callbacks.len(), 1);
    }

    #[test]
    fn form_field_injects_missing_properties() {
        let spec = ComponentSpec::new()
            .property("name", PropertySpec::new(PropertyTag::String, json!("own")))
            .builtin_behavior(BuiltinBehavior::FORM_FIELD);
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert_eq!(bp.properties["name"].default, json!("own"));
        assert!(bp.properties.contains_key("value"));
        assert!(bp.has_behavior(BuiltinBehavior::FORM_FIELD));
    }

    #[test]
    fn unknown_builtin_is_ignored() {
        let spec = ComponentSpec::new()
            .builtin_behavior("mikan://no-such-thing")
            .method("tap", |_, _, _| Ok(None));
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert!(!bp.has_behavior("mikan://no-such-thing"));
        assert!(bp.methods.contains_key("tap"));
    }

    #[test]
    fn behavior_methods_fill_gaps_only() {
        let b = Rc::new(
            Behavior::new()
                .method("shared", |_, _, _| Ok(Some(json!("behavior"))))
                .method("extra", |_, _, _| Ok(None)),
        );
        let mut spec = ComponentSpec::new().behavior(b);
        spec.methods.insert("shared".to_string(), noop_method());
        let bp = compose_component(spec, ExtraInfo::component("c"));
        assert!(bp.methods.contains_key("extra"));
        assert!(bp.methods.contains_key("shared"));
    }

    #[test]
    fn relation_keys_resolve_against_module_path() {
        let spec = ComponentSpec::new()
            .relation("./row", RelationDecl::new(crate::blueprint::RelationKind::Child))
            .relation(
                "named",
                RelationDecl::new(crate::blueprint::RelationKind::Ancestor)
                    .target_behavior("mikan://form-field"),
            );
        let bp = compose_component(spec, ExtraInfo::component("pages/form/form"));
        assert!(matches!(
            &bp.relations["pages/form/row"].target,
            RelationTarget::Path(p) if p == "pages/form/row"
        ));
        assert!(matches!(
            &bp.relations["named"].target,
            RelationTarget::Behavior(id) if id == "mikan://form-field"
        ));
    }
}
