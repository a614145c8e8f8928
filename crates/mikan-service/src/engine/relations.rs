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

//! The relations graph: typed, bidirectional, non-owning links.
//!
//! Linking is order-independent: when an instance attaches it scans the
//! session for partners of its own declarations, then every other
//! instance's declarations are re-checked against the newcomer. Either
//! order of creation converges to the same edges, and `linked` fires
//! exactly once per declaring side per partner (edge insertion is
//! idempotent). Unlink is symmetric: detaching A removes A from every
//! table that references it and notifies each owner.

use super::run_contained;
use crate::blueprint::{resolve_module_path, RelationKind, RelationSpec, RelationTarget};
use crate::scope::SessionScope;
use crate::session::Session;
use mikan_core::InstanceId;

/// Two-phase link pass for a freshly attached instance.
pub fn link_on_attach(scope: &mut SessionScope<'_>, id: &InstanceId) {
    let others: Vec<InstanceId> = scope
        .session
        .ids_in_order()
        .iter()
        .filter(|other| *other != id)
        .cloned()
        .collect();

    // Phase one: my declarations against everyone already here.
    let Some(my_blueprint) = scope.session.get(id).map(|i| i.blueprint.clone()) else {
        return;
    };
    for (key, spec) in &my_blueprint.relations {
        for candidate in &others {
            if relation_matches(scope.session, id, spec, candidate) {
                establish(scope, id, key, spec, candidate);
            }
        }
    }

    // Phase two: everyone re-checks their declarations against me.
    for other in &others {
        let Some(blueprint) = scope.session.get(other).map(|i| i.blueprint.clone()) else {
            continue;
        };
        for (key, spec) in &blueprint.relations {
            if relation_matches(scope.session, other, spec, id) {
                establish(scope, other, key, spec, id);
            }
        }
    }
}

/// Tears down every edge touching `id`: the instance's own table, and
/// every other table referencing it, firing `unlinked` on each owner.
pub fn unlink_all(scope: &mut SessionScope<'_>, id: &InstanceId) {
    let Some(instance) = scope.session.get_mut(id) else {
        return;
    };
    let blueprint = instance.blueprint.clone();
    let mine = std::mem::take(&mut instance.relations);
    for (key, partners) in mine {
        let unlinked = blueprint.relations.get(&key).and_then(|s| s.unlinked.clone());
        for partner in partners {
            if let Some(hook) = &unlinked {
                let result = hook(scope, id, &partner);
                run_contained(scope, id, result);
            }
        }
    }

    let others: Vec<InstanceId> = scope
        .session
        .ids_in_order()
        .iter()
        .filter(|other| *other != id)
        .cloned()
        .collect();
    for other in others {
        let Some(instance) = scope.session.get_mut(&other) else {
            continue;
        };
        let blueprint = instance.blueprint.clone();
        let removed_keys: Vec<String> = instance
            .relations
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .filter(|key| instance.remove_relation(key, id))
            .collect();
        for key in removed_keys {
            let Some(hook) = blueprint.relations.get(&key).and_then(|s| s.unlinked.clone()) else {
                continue;
            };
            let result = hook(scope, &other, id);
            run_contained(scope, &other, result);
        }
    }
}

/// Linked partners of one declared relation, in link order. Accepts the
/// declared key in relative form and resolves it the same way the
/// composer did.
pub fn relation_nodes(scope: &SessionScope<'_>, id: &InstanceId, key: &str) -> Vec<InstanceId> {
    let Some(instance) = scope.session.get(id) else {
        return Vec::new();
    };
    let resolved = if key.starts_with('.') {
        resolve_module_path(&instance.blueprint.path, key)
    } else {
        key.to_string()
    };
    instance.relation_partners(&resolved).to_vec()
}

/// Does `candidate` satisfy `spec` as declared by `declarer`?
fn relation_matches(
    session: &Session,
    declarer: &InstanceId,
    spec: &RelationSpec,
    candidate: &InstanceId,
) -> bool {
    if declarer == candidate {
        return false;
    }
    let Some(candidate_instance) = session.get(candidate) else {
        return false;
    };
    let target_ok = match &spec.target {
        RelationTarget::Path(path) => candidate_instance.blueprint.path == *path,
        RelationTarget::Behavior(behavior_id) => {
            candidate_instance.blueprint.has_behavior(behavior_id)
        }
    };
    if !target_ok {
        return false;
    }
    match spec.kind {
        RelationKind::Parent => session
            .get(declarer)
            .is_some_and(|i| i.parent.as_ref() == Some(candidate)),
        RelationKind::Child => candidate_instance.parent.as_ref() == Some(declarer),
        RelationKind::Ancestor => session.is_descendant(candidate, declarer),
        RelationKind::Descendant => session.is_descendant(declarer, candidate),
    }
}

fn establish(
    scope: &mut SessionScope<'_>,
    declarer: &InstanceId,
    key: &str,
    spec: &RelationSpec,
    partner: &InstanceId,
) {
    let fresh = match scope.session.get_mut(declarer) {
        Some(instance) => instance.add_relation(key, partner),
        None => false,
    };
    if !fresh {
        return;
    }
    if let Some(linked) = spec.linked.clone() {
        let result = linked(scope, declarer, partner);
        run_contained(scope, declarer, result);
    }
}
