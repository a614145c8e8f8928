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

//! Live page/component instances.
//!
//! An [`Instance`] is mutable per-mount state over an immutable shared
//! blueprint: its data object, its position in the session tree, its
//! established relation edges and the property bindings the view declared
//! on it. All mutation goes through the engines; the struct itself only
//! offers the small invariant-preserving helpers they share.

use crate::blueprint::ModuleBlueprint;
use mikan_core::path::{parse_path, top_level_key};
use mikan_core::{BridgeId, InstanceId};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// `created` ran; not yet in the tree.
    Created,
    /// In the tree; relations linked.
    Attached,
    /// The view finished its first layout.
    Ready,
    /// Removed. Terminal; the instance is unregistered right after.
    Detached,
}

/// View-side node attributes shipped in the mount message: id, classes
/// and `data-*` dataset, used by selector matching and event targets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeInfo {
    /// The node's `id` attribute.
    pub id: String,
    /// Space-separated class attribute.
    pub class: String,
    /// Collected `data-*` attributes.
    pub dataset: Map<String, Value>,
}

impl NodeInfo {
    /// Iterates the node's classes.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class.split_whitespace()
    }
}

/// One property binding the view declared on a component tag, evaluated
/// against the parent's data whenever the parent updates.
#[derive(Debug, Clone)]
pub struct PropBinding {
    /// The child property being bound.
    pub target: String,
    /// The binding expression as written in the template.
    pub expression: String,
    /// The parent data key the binding depends on, when the expression
    /// is a plain data path. Complex expressions are evaluated by the
    /// render context instead and carry no dependency here.
    pub dependency: Option<String>,
}

impl PropBinding {
    /// Classifies the expression: a bare data path gets a dependency
    /// key, anything else is left to the view.
    #[must_use]
    pub fn new(target: impl Into<String>, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let simple = !expression.is_empty()
            && expression
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '[' | ']' | '_' | '$'))
            && parse_path(&expression).is_ok();
        let dependency = simple.then(|| top_level_key(&expression).to_string());
        Self {
            target: target.into(),
            expression,
            dependency,
        }
    }
}

/// A live instance of a page or component blueprint.
pub struct Instance {
    /// Stable id, referenced by both contexts.
    pub id: InstanceId,
    /// The shared immutable blueprint.
    pub blueprint: Rc<ModuleBlueprint>,
    /// The session this instance belongs to.
    pub bridge_id: BridgeId,
    /// Parent in the mounted tree; `None` for the page root.
    pub parent: Option<InstanceId>,
    /// Children in mount order.
    pub children: Vec<InstanceId>,
    /// Lifecycle position.
    pub status: InstanceStatus,
    /// The instance's current data (defaults, property values, patches).
    pub data: Map<String, Value>,
    /// View-side node attributes.
    pub node_info: NodeInfo,
    /// Property bindings declared on this instance's tag.
    pub prop_bindings: Vec<PropBinding>,
    /// View-declared event binding → method name.
    pub event_attrs: HashMap<String, String>,
    /// Established relation partners, keyed like the blueprint's
    /// relations, in link order.
    pub relations: BTreeMap<String, Vec<InstanceId>>,
    /// Buffered patch while a `groupSetData` closure runs.
    pub pending_group: Option<Map<String, Value>>,
}

impl Instance {
    /// A fresh instance over a blueprint, its data seeded from the
    /// blueprint's composed initial data.
    #[must_use]
    pub fn new(id: InstanceId, blueprint: Rc<ModuleBlueprint>, bridge_id: BridgeId) -> Self {
        let data = blueprint.data.clone();
        Self {
            id,
            blueprint,
            bridge_id,
            parent: None,
            children: Vec::new(),
            status: InstanceStatus::Created,
            data,
            node_info: NodeInfo::default(),
            prop_bindings: Vec::new(),
            event_attrs: HashMap::new(),
            relations: BTreeMap::new(),
            pending_group: None,
        }
    }

    /// `true` while the instance can still receive events and patches.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != InstanceStatus::Detached
    }

    /// Records a relation partner. Idempotent per `(key, partner)`;
    /// returns `true` when the edge is new.
    pub fn add_relation(&mut self, key: &str, partner: &InstanceId) -> bool {
        let edges = self.relations.entry(key.to_string()).or_default();
        if edges.contains(partner) {
            return false;
        }
        edges.push(partner.clone());
        true
    }

    /// Removes a relation partner; returns `true` when an edge existed.
    pub fn remove_relation(&mut self, key: &str, partner: &InstanceId) -> bool {
        let Some(edges) = self.relations.get_mut(key) else {
            return false;
        };
        let before = edges.len();
        edges.retain(|id| id != partner);
        let removed = edges.len() != before;
        if edges.is_empty() {
            self.relations.remove(key);
        }
        removed
    }

    /// The linked partners for one relation key, in link order.
    #[must_use]
    pub fn relation_partners(&self, key: &str) -> &[InstanceId] {
        self.relations.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_classifies_expressions() {
        assert_eq!(
            PropBinding::new("items", "list.visible").dependency.as_deref(),
            Some("list")
        );
        assert_eq!(
            PropBinding::new("row", "rows[3]").dependency.as_deref(),
            Some("rows")
        );
        assert_eq!(PropBinding::new("label", "a + b").dependency, None);
        assert_eq!(PropBinding::new("label", "").dependency, None);
    }

    #[test]
    fn relation_edges_are_idempotent() {
        let blueprint = Rc::new(crate::blueprint::compose_component(
            crate::blueprint::ComponentSpec::new(),
            crate::blueprint::ExtraInfo::component("c"),
        ));
        let mut inst = Instance::new(InstanceId::from("i1"), blueprint, BridgeId::from("b1"));
        let partner = InstanceId::from("i2");
        assert!(inst.add_relation("k", &partner));
        assert!(!inst.add_relation("k", &partner));
        assert_eq!(inst.relation_partners("k").len(), 1);
        assert!(inst.remove_relation("k", &partner));
        assert!(!inst.remove_relation("k", &partner));
        assert!(inst.relation_partners("k").is_empty());
    }
}
