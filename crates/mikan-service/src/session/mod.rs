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

//! Per-bridge session state.
//!
//! A session is one page load: the instance tree mounted for one bridge
//! id. Lookups preserve creation order, which both relation linking and
//! selector first-match depend on.

mod router;

pub use router::PageRouter;

use crate::error::ServiceError;
use crate::instance::Instance;
use mikan_core::{BridgeId, InstanceId};
use serde_json::Value;
use std::collections::HashMap;

/// The instance tree of one page load.
pub struct Session {
    /// The bridge id scoping every message of this session.
    pub bridge_id: BridgeId,
    /// The loaded page's module path.
    pub module_path: String,
    /// The open query passed to `onLoad`.
    pub query: Value,
    /// The page-root instance, set when the root mounts.
    pub root: Option<InstanceId>,
    instances: HashMap<InstanceId, Instance>,
    // Creation order; first-match and link order are defined over it.
    order: Vec<InstanceId>,
}

impl Session {
    /// An empty session for one bridge.
    #[must_use]
    pub fn new(bridge_id: BridgeId, module_path: impl Into<String>, query: Value) -> Self {
        Self {
            bridge_id,
            module_path: module_path.into(),
            query,
            root: None,
            instances: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers a new instance. Replacing an id is a bug upstream and
    /// is logged; order keeps the first position.
    pub fn insert(&mut self, instance: Instance) {
        let id = instance.id.clone();
        if self.instances.insert(id.clone(), instance).is_some() {
            log::warn!("instance '{id}' registered twice in session '{}'", self.bridge_id);
        } else {
            self.order.push(id);
        }
    }

    /// Unregisters an instance, preserving the order of the rest.
    pub fn remove(&mut self, id: &InstanceId) -> Option<Instance> {
        let removed = self.instances.remove(id);
        if removed.is_some() {
            self.order.retain(|other| other != id);
            if self.root.as_ref() == Some(id) {
                self.root = None;
            }
        }
        removed
    }

    /// Looks an instance up.
    #[must_use]
    pub fn get(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Looks an instance up mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: &InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    /// Looks an instance up, failing with [`ServiceError::InstanceNotFound`].
    pub fn require(&self, id: &InstanceId) -> Result<&Instance, ServiceError> {
        self.instances
            .get(id)
            .ok_or_else(|| ServiceError::InstanceNotFound(id.to_string()))
    }

    /// Mutable variant of [`Session::require`].
    pub fn require_mut(&mut self, id: &InstanceId) -> Result<&mut Instance, ServiceError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| ServiceError::InstanceNotFound(id.to_string()))
    }

    /// Instance ids in creation order.
    #[must_use]
    pub fn ids_in_order(&self) -> &[InstanceId] {
        &self.order
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// `true` when no instance is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Walks the parent chain: is `id` strictly below `ancestor`?
    #[must_use]
    pub fn is_descendant(&self, ancestor: &InstanceId, id: &InstanceId) -> bool {
        if ancestor == id {
            return false;
        }
        let mut cursor = self.get(id).and_then(|i| i.parent.clone());
        while let Some(parent) = cursor {
            if &parent == ancestor {
                return true;
            }
            cursor = self.get(&parent).and_then(|i| i.parent.clone());
        }
        false
    }

    /// Ids strictly below `ancestor`, in creation order.
    #[must_use]
    pub fn descendants_of(&self, ancestor: &InstanceId) -> Vec<InstanceId> {
        self.order
            .iter()
            .filter(|id| self.is_descendant(ancestor, id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{compose_component, ComponentSpec, ExtraInfo};
    use std::rc::Rc;

    fn session_with_chain() -> (Session, InstanceId, InstanceId, InstanceId) {
        let bp = Rc::new(compose_component(
            ComponentSpec::new(),
            ExtraInfo::component("c"),
        ));
        let bridge = BridgeId::from("b1");
        let mut session = Session::new(bridge.clone(), "pages/p", Value::Null);
        let (a, b, c) = (
            InstanceId::from("a"),
            InstanceId::from("b"),
            InstanceId::from("c"),
        );
        for (id, parent) in [(&a, None), (&b, Some(&a)), (&c, Some(&b))] {
            let mut inst = Instance::new(id.clone(), bp.clone(), bridge.clone());
            inst.parent = parent.cloned();
            session.insert(inst);
        }
        (session, a, b, c)
    }

    #[test]
    fn descendant_walk_follows_parent_chain() {
        let (session, a, b, c) = session_with_chain();
        assert!(session.is_descendant(&a, &b));
        assert!(session.is_descendant(&a, &c));
        assert!(!session.is_descendant(&c, &a));
        assert!(!session.is_descendant(&a, &a));
        assert_eq!(session.descendants_of(&a), vec![b, c]);
    }

    #[test]
    fn removal_preserves_remaining_order() {
        let (mut session, a, b, c) = session_with_chain();
        assert!(session.remove(&b).is_some());
        assert!(session.remove(&b).is_none());
        assert_eq!(session.ids_in_order(), &[a, c]);
    }
}
