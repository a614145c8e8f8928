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

//! Observer rule matching and dispatch.
//!
//! Rules come in five shapes, tried in this order per rule: exact key,
//! the global `**` wildcard, a `.**` subtree suffix, an array index
//! (`arr[12]`), and plain path overlap (one path is a prefix of the
//! other along segment boundaries). A rule fires at most once per
//! `set_data` call no matter how many patch keys matched it, and every
//! callback failure is contained at the instance boundary so the rest of
//! the dispatch still runs.

use super::data::lookup;
use crate::scope::SessionScope;
use mikan_core::InstanceId;
use serde_json::Value;

/// How a rule's arguments are assembled once it matched.
enum RuleMatch {
    /// Exact or overlapping single key: `(newValue, oldValue)`.
    Single { key: String, old: Option<Value> },
    /// Compound rule: one positional argument per declared key.
    Compound(Vec<String>),
    /// `prefix.**`: the current subtree value.
    Subtree(String),
    /// Bare `**`: the entire data object.
    Everything,
}

/// Dispatches every matching observer rule for one applied patch.
/// `changed` holds the applied patch paths with their pre-patch values.
pub fn dispatch(
    scope: &mut SessionScope<'_>,
    id: &InstanceId,
    changed: &[(String, Option<Value>)],
) {
    if changed.is_empty() {
        return;
    }
    let Some(instance) = scope.session.get(id) else {
        return;
    };
    let blueprint = instance.blueprint.clone();

    for rule in &blueprint.observers {
        let Some(matched) = match_rule(&rule.pattern, changed) else {
            continue;
        };
        // Arguments read the data as it is now, after the patch.
        let Some(instance) = scope.session.get(id) else {
            return;
        };
        let args: Vec<Value> = match &matched {
            RuleMatch::Single { key, old } => vec![
                lookup(&instance.data, key).cloned().unwrap_or(Value::Null),
                old.clone().unwrap_or(Value::Null),
            ],
            RuleMatch::Compound(keys) => keys
                .iter()
                .map(|key| lookup(&instance.data, key).cloned().unwrap_or(Value::Null))
                .collect(),
            RuleMatch::Subtree(prefix) => {
                vec![lookup(&instance.data, prefix).cloned().unwrap_or(Value::Null)]
            }
            RuleMatch::Everything => vec![Value::Object(instance.data.clone())],
        };
        for callback in rule.callbacks.clone() {
            let result = callback(scope, id, &args);
            super::run_contained(scope, id, result);
        }
    }
}

/// Decides whether one rule fires for this patch, and with what shape.
fn match_rule(pattern: &str, changed: &[(String, Option<Value>)]) -> Option<RuleMatch> {
    if pattern == "**" {
        return Some(RuleMatch::Everything);
    }
    if pattern.contains(',') {
        let keys: Vec<String> = pattern
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        let hit = keys
            .iter()
            .any(|key| changed.iter().any(|(path, _)| paths_overlap(key, path)));
        return hit.then_some(RuleMatch::Compound(keys));
    }
    if let Some(prefix) = pattern.strip_suffix(".**") {
        let hit = changed
            .iter()
            .any(|(path, _)| paths_overlap(prefix, path));
        return hit.then(|| RuleMatch::Subtree(prefix.to_string()));
    }
    // Plain key, possibly with an array index. Prefer an exact hit so
    // the old value is the one captured for this very path.
    if let Some((_, old)) = changed.iter().find(|(path, _)| path == pattern) {
        return Some(RuleMatch::Single {
            key: pattern.to_string(),
            old: old.clone(),
        });
    }
    changed
        .iter()
        .any(|(path, _)| paths_overlap(pattern, path))
        .then(|| RuleMatch::Single {
            key: pattern.to_string(),
            old: None,
        })
}

/// `true` when one path is the other, or a segment-aligned prefix of it.
/// `arr` overlaps `arr[2].x`; `arr[1]` never overlaps `arr[12]`.
fn paths_overlap(a: &str, b: &str) -> bool {
    fn prefixed(longer: &str, shorter: &str) -> bool {
        longer
            .strip_prefix(shorter)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
    }
    a == b || prefixed(a, b) || prefixed(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn changed(paths: &[&str]) -> Vec<(String, Option<Value>)> {
        paths
            .iter()
            .map(|p| (p.to_string(), Some(json!("old"))))
            .collect()
    }

    #[test]
    fn segment_alignment_guards_overlap() {
        assert!(paths_overlap("a", "a.b"));
        assert!(paths_overlap("a.b", "a"));
        assert!(paths_overlap("arr", "arr[2].x"));
        assert!(!paths_overlap("arr[1]", "arr[12]"));
        assert!(!paths_overlap("ab", "abc"));
    }

    #[test]
    fn exact_rule_keeps_its_old_value() {
        let m = match_rule("count", &changed(&["count"])).unwrap();
        assert!(matches!(m, RuleMatch::Single { old: Some(_), .. }));
    }

    #[test]
    fn nested_change_fires_parent_rule_without_old() {
        let m = match_rule("list", &changed(&["list[3].name"])).unwrap();
        assert!(matches!(m, RuleMatch::Single { old: None, .. }));
    }

    #[test]
    fn compound_rule_needs_any_key() {
        assert!(matches!(
            match_rule("a, b", &changed(&["b"])),
            Some(RuleMatch::Compound(keys)) if keys == ["a", "b"]
        ));
        assert!(match_rule("a, b", &changed(&["c"])).is_none());
    }

    #[test]
    fn subtree_rule_fires_for_self_children_and_prefix() {
        for path in ["a", "a.sub", "a.sub.deep"] {
            assert!(match_rule("a.**", &changed(&[path])).is_some(), "{path}");
        }
        assert!(match_rule("a.b.**", &changed(&["a"])).is_some());
        assert!(match_rule("a.**", &changed(&["other"])).is_none());
    }

    #[test]
    fn wildcard_always_fires() {
        assert!(matches!(
            match_rule("**", &changed(&["whatever"])),
            Some(RuleMatch::Everything)
        ));
    }

    #[test]
    fn array_index_rule_is_index_exact() {
        assert!(match_rule("arr[12]", &changed(&["arr[12]"])).is_some());
        assert!(match_rule("arr[12]", &changed(&["arr[12].x"])).is_some());
        assert!(match_rule("arr[12]", &changed(&["arr[11]"])).is_none());
    }
}
