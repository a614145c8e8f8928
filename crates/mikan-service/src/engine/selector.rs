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

//! The selector engine.
//!
//! Resolves CSS-like selectors against the true descendants of a root
//! instance: `#id`, `.class`, `[attr]`/`[attr=value]` over the node's
//! dataset, and a bare token against the blueprint's last path segment
//! or full path. Matches come back in creation order; an instance whose
//! blueprint declares the export capability is replaced by its export's
//! return value.

use crate::instance::Instance;
use crate::scope::SessionScope;
use mikan_core::InstanceId;
use serde_json::Value;

/// One selector result.
#[derive(Debug, Clone, PartialEq)]
pub enum Selected {
    /// The matched instance itself.
    Instance(InstanceId),
    /// The value of the matched instance's custom export.
    Export(Value),
}

impl Selected {
    /// The instance id, when the result was not substituted.
    #[must_use]
    pub fn instance(&self) -> Option<&InstanceId> {
        match self {
            Selected::Instance(id) => Some(id),
            Selected::Export(_) => None,
        }
    }
}

/// First matching descendant of `root`, in creation order, or `None`.
pub fn select_component(
    scope: &mut SessionScope<'_>,
    root: &InstanceId,
    selector: &str,
) -> Option<Selected> {
    let id = candidates(scope, root)
        .into_iter()
        .find(|id| instance_matches(scope, id, selector))?;
    Some(substitute(scope, id))
}

/// Every matching descendant of `root`, in creation order.
pub fn select_all_components(
    scope: &mut SessionScope<'_>,
    root: &InstanceId,
    selector: &str,
) -> Vec<Selected> {
    let matched: Vec<InstanceId> = candidates(scope, root)
        .into_iter()
        .filter(|id| instance_matches(scope, id, selector))
        .collect();
    matched
        .into_iter()
        .map(|id| substitute(scope, id))
        .collect()
}

/// The component instance owning `id`: its nearest ancestor that is a
/// custom component.
#[must_use]
pub fn select_owner_component(scope: &SessionScope<'_>, id: &InstanceId) -> Option<InstanceId> {
    let mut cursor = scope.session.get(id)?.parent.clone();
    while let Some(parent_id) = cursor {
        let parent = scope.session.get(&parent_id)?;
        if parent.blueprint.is_component {
            return Some(parent_id);
        }
        cursor = parent.parent.clone();
    }
    None
}

fn candidates(scope: &SessionScope<'_>, root: &InstanceId) -> Vec<InstanceId> {
    // True descendants only; arbitrary session members never match.
    scope.session.descendants_of(root)
}

fn substitute(scope: &mut SessionScope<'_>, id: InstanceId) -> Selected {
    let export = scope.session.get(&id).and_then(|instance| {
        (instance.blueprint.exports_component)
            .then(|| instance.blueprint.export.clone())
            .flatten()
    });
    match export {
        Some(export) => Selected::Export(export(scope, &id)),
        None => Selected::Instance(id),
    }
}

fn instance_matches(scope: &SessionScope<'_>, id: &InstanceId, selector: &str) -> bool {
    scope
        .session
        .get(id)
        .is_some_and(|instance| matches_selector(instance, selector))
}

/// The matching ladder for one instance against one selector token.
fn matches_selector(instance: &Instance, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        return instance.node_info.id == id;
    }
    if let Some(class) = selector.strip_prefix('.') {
        return instance.node_info.classes().any(|c| c == class);
    }
    if let Some(inner) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match inner.split_once('=') {
            Some((attr, value)) => {
                let value = value.trim_matches(|c| c == '"' || c == '\'');
                instance
                    .node_info
                    .dataset
                    .get(attr)
                    .is_some_and(|v| match v {
                        Value::String(s) => s == value,
                        other => other.to_string() == value,
                    })
            }
            None => instance.node_info.dataset.contains_key(inner),
        };
    }
    // Bare token: the blueprint's last path segment or its full path.
    let path = &instance.blueprint.path;
    let tag = path.rsplit('/').next().unwrap_or(path);
    selector == tag || selector == path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{compose_component, ComponentSpec, ExtraInfo};
    use crate::instance::NodeInfo;
    use mikan_core::BridgeId;
    use serde_json::json;
    use std::rc::Rc;

    fn instance_with(info: NodeInfo, path: &str) -> Instance {
        let blueprint = Rc::new(compose_component(
            ComponentSpec::new(),
            ExtraInfo::component(path),
        ));
        let mut instance = Instance::new(InstanceId::from("x"), blueprint, BridgeId::from("b"));
        instance.node_info = info;
        instance
    }

    #[test]
    fn ladder_covers_id_class_attr_and_tag() {
        let info: NodeInfo = serde_json::from_value(json!({
            "id": "main",
            "class": "cell highlighted",
            "dataset": { "role": "row", "index": 3 },
        }))
        .unwrap();
        let instance = instance_with(info, "components/list/cell");

        assert!(matches_selector(&instance, "#main"));
        assert!(!matches_selector(&instance, "#other"));
        assert!(matches_selector(&instance, ".highlighted"));
        assert!(!matches_selector(&instance, ".missing"));
        assert!(matches_selector(&instance, "[role]"));
        assert!(matches_selector(&instance, "[role=row]"));
        assert!(matches_selector(&instance, "[index=3]"));
        assert!(!matches_selector(&instance, "[role=cell]"));
        assert!(matches_selector(&instance, "cell"));
        assert!(matches_selector(&instance, "components/list/cell"));
        assert!(!matches_selector(&instance, "list"));
    }
}
