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

//! The shared blueprint registry and the bundle installation contract.

use super::{compose_component, compose_page};
use super::{ComponentSpec, ExtraInfo, ModuleBlueprint, PageSpec};
use crate::app::{AppBlueprint, AppSpec};
use crate::error::ServiceError;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A compiled resource bundle: code that, when a root loads, registers
/// its app/page/component modules into the registry. The host provides
/// one per bundle root; it runs at most once.
pub trait ResourceBundle {
    /// Registers every module the bundle contains.
    fn install(&self, registry: &mut ModuleRegistry);
}

impl<F> ResourceBundle for F
where
    F: Fn(&mut ModuleRegistry),
{
    fn install(&self, registry: &mut ModuleRegistry) {
        self(registry)
    }
}

/// All registered module blueprints, keyed by module path, plus the app
/// blueprint. Shared read-only across every session; blueprints are
/// handed out as `Rc` so instances can hold them directly.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Rc<ModuleBlueprint>>,
    app: Option<Rc<AppBlueprint>>,
}

impl ModuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a page module. Re-registering a path replaces the
    /// previous blueprint.
    pub fn register_page(&mut self, spec: PageSpec, extra: ExtraInfo) {
        self.insert(Rc::new(compose_page(spec, extra)));
    }

    /// Registers a component module (behaviors composed here, once).
    pub fn register_component(&mut self, spec: ComponentSpec, extra: ExtraInfo) {
        self.insert(Rc::new(compose_component(spec, extra)));
    }

    /// Registers the application module.
    pub fn register_app(&mut self, spec: AppSpec) {
        if self.app.is_some() {
            log::warn!("app registered twice; replacing");
        }
        self.app = Some(Rc::new(AppBlueprint::from_spec(spec)));
    }

    fn insert(&mut self, blueprint: Rc<ModuleBlueprint>) {
        let path = blueprint.path.clone();
        if self.modules.insert(path.clone(), blueprint).is_some() {
            log::warn!("module '{path}' registered twice; replacing");
        }
    }

    /// Looks a blueprint up by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Rc<ModuleBlueprint>> {
        self.modules.get(path)
    }

    /// Looks a blueprint up, failing with [`ServiceError::ModuleNotFound`].
    pub fn require(&self, path: &str) -> Result<Rc<ModuleBlueprint>, ServiceError> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::ModuleNotFound(path.to_string()))
    }

    /// The app blueprint, if the app bundle has installed.
    #[must_use]
    pub fn app(&self) -> Option<&Rc<AppBlueprint>> {
        self.app.as_ref()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The declared-property wire map for a page and every component
    /// transitively reachable through `usingComponents`, keyed by module
    /// path. Shipped to the view inside the first-render payload so it
    /// can type-coerce and default attribute values.
    #[must_use]
    pub fn collect_wire_props(&self, root_path: &str) -> Map<String, Value> {
        let mut props = Map::new();
        let mut visited = HashSet::new();
        let mut pending = vec![root_path.to_string()];
        while let Some(path) = pending.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let Some(blueprint) = self.modules.get(&path) else {
                log::warn!("usingComponents references unregistered module '{path}'");
                continue;
            };
            let wire = blueprint.wire_properties();
            if !wire.is_empty() {
                props.insert(path.clone(), Value::Object(wire));
            }
            pending.extend(blueprint.using_components.values().cloned());
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::PropertySpec;
    use mikan_core::property::PropertyTag;
    use serde_json::json;

    #[test]
    fn require_reports_missing_modules() {
        let registry = ModuleRegistry::new();
        let Err(err) = registry.require("pages/none") else {
            panic!("expected a missing-module error");
        };
        assert!(matches!(err, ServiceError::ModuleNotFound(_)));
    }

    #[test]
    fn wire_props_walk_using_components_transitively() {
        let mut registry = ModuleRegistry::new();
        registry.register_page(
            PageSpec::new(),
            ExtraInfo::page("pages/index/index").using("list", "components/list"),
        );
        registry.register_component(
            ComponentSpec::new()
                .property("items", PropertySpec::new(PropertyTag::Array, json!([])))
                .external_class("item-class"),
            ExtraInfo::component("components/list").using("cell", "components/cell"),
        );
        registry.register_component(
            ComponentSpec::new()
                .property("label", PropertySpec::new(PropertyTag::String, json!("-"))),
            ExtraInfo::component("components/cell"),
        );

        let props = registry.collect_wire_props("pages/index/index");
        assert!(props.get("pages/index/index").is_none());
        assert_eq!(props["components/list"]["items"]["type"], json!(["a"]));
        assert_eq!(props["components/list"]["item-class"]["cls"], json!(true));
        assert_eq!(props["components/cell"]["label"]["default"], json!("-"));
    }

    #[test]
    fn reregistration_replaces() {
        let mut registry = ModuleRegistry::new();
        registry.register_page(
            PageSpec::new().data(json!({ "v": 1 })),
            ExtraInfo::page("p"),
        );
        registry.register_page(
            PageSpec::new().data(json!({ "v": 2 })),
            ExtraInfo::page("p"),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("p").unwrap().data["v"], json!(2));
    }
}
