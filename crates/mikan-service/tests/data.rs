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

//! Data engine scenarios: render sync, observers, batching, child
//! property bindings, selectors.

mod common;

use common::{entries, new_log, record, Harness};
use mikan_core::envelope::types;
use mikan_core::path::get_path;
use mikan_service::blueprint::{
    BuiltinBehavior, ComponentSpec, ExtraInfo, PageSpec, PropertySpec,
};
use mikan_service::engine::Selected;
use mikan_core::property::PropertyTag;
use serde_json::{json, Map, Value};

fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("patch must be an object"),
    }
}

fn data_of(h: &Harness, id: &str) -> Value {
    Value::Object(
        h.service
            .session(&"b1".into())
            .unwrap()
            .get(&id.into())
            .unwrap()
            .data
            .clone(),
    )
}

#[test]
fn set_data_updates_synchronously_and_pushes_a_diff() {
    let mut h = Harness::new();
    h.service.modules_mut().register_page(
        PageSpec::new()
            .data(json!({ "count": 0, "_draft": "" }))
            .method("bump", |scope, id, _| {
                scope.set_data(id, patch(json!({ "count": 1, "_draft": "hidden" })))?;
                Ok(None)
            }),
        ExtraInfo::page("pages/p"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.drain_render();
    h.trigger("b1", "p1", "bump");

    assert_eq!(get_path(&data_of(&h, "p1"), "count"), Some(&json!(1)));
    assert_eq!(get_path(&data_of(&h, "p1"), "_draft"), Some(&json!("hidden")));

    let pushed = h.drain_render();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].kind, types::UPDATE_DATA);
    // Underscore keys stay logic-side.
    assert_eq!(pushed[0].body["data"], json!({ "count": 1 }));
}

#[test]
fn nested_paths_create_structure_on_the_way() {
    let mut h = Harness::new();
    h.service.modules_mut().register_page(
        PageSpec::new().method("deep", |scope, id, _| {
            scope.set_data(id, patch(json!({ "list[1].name": "x" })))?;
            Ok(None)
        }),
        ExtraInfo::page("pages/p"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.trigger("b1", "p1", "deep");

    assert_eq!(
        get_path(&data_of(&h, "p1"), "list"),
        Some(&json!([null, { "name": "x" }]))
    );
}

#[test]
fn observer_rules_fire_per_shape() {
    let log = new_log();
    let mut h = Harness::new();

    h.service
        .modules_mut()
        .register_page(PageSpec::new(), ExtraInfo::page("pages/p"));
    let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .data(json!({ "a": 1, "b": 2, "nest": { "deep": 0 } }))
            .observer("a", move |_, _, args| {
                record(&l1, format!("a:{}<-{}", args[0], args[1]));
                Ok(())
            })
            .observer("a, b", move |_, _, args| {
                record(&l2, format!("ab:{},{}", args[0], args[1]));
                Ok(())
            })
            .observer("nest.**", move |_, _, args| {
                record(&l3, format!("nest**:{}", args[0]));
                Ok(())
            })
            .observer("**", move |_, _, args| {
                record(&l4, format!("**:{}", args[0]["a"]));
                Ok(())
            })
            .method("run", |scope, id, _| {
                scope.set_data(id, patch(json!({ "a": 10 })))?;
                scope.set_data(id, patch(json!({ "nest.deep": 5 })))?;
                Ok(None)
            }),
        ExtraInfo::component("comp/watched"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount("b1", "c1", "comp/watched", Some("p1"));
    h.trigger("b1", "c1", "run");

    assert_eq!(
        entries(&log),
        vec![
            // First set_data: key "a".
            "a:10<-1",
            "ab:10,2",
            "**:10",
            // Second set_data: key "nest.deep".
            "nest**:{\"deep\":5}",
            "**:10",
        ]
    );
}

#[test]
fn one_rule_fires_once_even_when_both_its_keys_change() {
    let log = new_log();
    let mut h = Harness::new();

    h.service
        .modules_mut()
        .register_page(PageSpec::new(), ExtraInfo::page("pages/p"));
    let l1 = log.clone();
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .data(json!({ "a": 0, "b": 0 }))
            .observer("a, b", move |_, _, args| {
                record(&l1, format!("ab:{},{}", args[0], args[1]));
                Ok(())
            })
            .method("both", |scope, id, _| {
                scope.set_data(id, patch(json!({ "a": 1, "b": 2 })))?;
                Ok(None)
            }),
        ExtraInfo::component("comp/pair"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount("b1", "c1", "comp/pair", Some("p1"));
    h.trigger("b1", "c1", "both");

    assert_eq!(entries(&log), vec!["ab:1,2"]);
}

#[test]
fn failing_observer_spares_later_rules() {
    let log = new_log();
    let mut h = Harness::new();

    h.service
        .modules_mut()
        .register_page(PageSpec::new(), ExtraInfo::page("pages/p"));
    let l1 = log.clone();
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .data(json!({ "x": 0 }))
            .observer("x", |_, _, _| anyhow::bail!("observer down"))
            .observer("**", move |_, _, _| {
                record(&l1, "wildcard");
                Ok(())
            })
            .method("go", |scope, id, _| {
                scope.set_data(id, patch(json!({ "x": 1 })))?;
                Ok(None)
            }),
        ExtraInfo::component("comp/fragile"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount("b1", "c1", "comp/fragile", Some("p1"));
    h.trigger("b1", "c1", "go");

    assert_eq!(entries(&log), vec!["wildcard"]);
    assert_eq!(get_path(&data_of(&h, "c1"), "x"), Some(&json!(1)));
}

#[test]
fn group_set_data_flushes_once_even_on_failure() {
    let mut h = Harness::new();
    h.service.modules_mut().register_page(
        PageSpec::new()
            .data(json!({ "a": 0, "b": 0 }))
            .method("batch", |scope, id, _| {
                scope.group_set_data(id, |scope, id| {
                    scope.set_data(id, patch(json!({ "a": 1 })))?;
                    scope.set_data(id, patch(json!({ "b": 2 })))?;
                    Ok(())
                })?;
                Ok(None)
            })
            .method("batchFail", |scope, id, _| {
                scope.group_set_data(id, |scope, id| {
                    scope.set_data(id, patch(json!({ "a": 9 })))?;
                    anyhow::bail!("mid-batch failure")
                })?;
                Ok(None)
            }),
        ExtraInfo::page("pages/p"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.drain_render();

    h.trigger("b1", "p1", "batch");
    let pushed = h.drain_render();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].body["data"], json!({ "a": 1, "b": 2 }));

    // The buffered patch still flushes when the closure fails.
    h.trigger("b1", "p1", "batchFail");
    let pushed = h.drain_render();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].body["data"], json!({ "a": 9 }));
}

#[test]
fn parent_set_data_syncs_declared_child_bindings() {
    let log = new_log();
    let mut h = Harness::new();

    h.service.modules_mut().register_page(
        PageSpec::new()
            .data(json!({ "items": ["a", "b"] }))
            .method("refresh", |scope, id, _| {
                scope.set_data(id, patch(json!({ "items": ["a", "b", "c"] })))?;
                Ok(None)
            }),
        ExtraInfo::page("pages/p"),
    );
    let l1 = log.clone();
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .property("list", PropertySpec::new(PropertyTag::Array, json!([])))
            .observer("list", move |_, _, args| {
                record(&l1, format!("list:{}", args[0]));
                Ok(())
            }),
        ExtraInfo::component("comp/listing"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount_with(json!({
        "bridgeId": "b1",
        "moduleId": "c1",
        "path": "comp/listing",
        "parentId": "p1",
        "propBindings": [["list", "items"]],
        "props": { "list": ["a", "b"] },
    }));
    h.drain_render();

    h.trigger("b1", "p1", "refresh");

    // Synchronous: the child's data already holds the new value.
    assert_eq!(
        get_path(&data_of(&h, "c1"), "list"),
        Some(&json!(["a", "b", "c"]))
    );
    assert_eq!(entries(&log), vec!["list:[\"a\",\"b\",\"c\"]"]);
    // Only the parent's own patch goes to the render context; the view
    // recomputes the binding itself.
    let pushed = h.drain_render();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].body["moduleId"], json!("p1"));
}

#[test]
fn remote_patch_fires_named_property_observer() {
    let log = new_log();
    let mut h = Harness::new();

    h.service
        .modules_mut()
        .register_page(PageSpec::new(), ExtraInfo::page("pages/p"));
    let l1 = log.clone();
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .property(
                "value",
                PropertySpec::new(PropertyTag::Number, json!(0)).observer("onValue"),
            )
            .method("onValue", move |_, _, event| {
                record(&l1, format!("onValue:{}<-{}", event["newVal"], event["oldVal"]));
                Ok(None)
            }),
        ExtraInfo::component("comp/field"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount("b1", "c1", "comp/field", Some("p1"));
    h.drain_render();

    h.send(
        types::UPDATE_DATA,
        json!({ "bridgeId": "b1", "moduleId": "c1", "data": { "value": 42 } }),
    );

    assert_eq!(entries(&log), vec!["onValue:42<-0"]);
    // Remote patches are not echoed back to the render context.
    assert!(h.drain_render().is_empty());
}

#[test]
fn selectors_walk_true_descendants_with_export_substitution() {
    let log = new_log();
    let mut h = Harness::new();

    let l0 = log.clone();
    h.service.modules_mut().register_page(
        PageSpec::new().method("query", move |scope, id, _| {
            let root = id.clone();
            let by_id = scope.select_component(&root, "#hero");
            assert_eq!(by_id, Some(Selected::Instance("hero1".into())));
            assert!(scope.select_component(&root, "#ghost").is_none());
            let cells = scope.select_all_components(&root, ".cell");
            assert_eq!(
                cells,
                vec![
                    Selected::Instance("hero1".into()),
                    Selected::Instance("cell2".into()),
                ]
            );
            let exported = scope.select_component(&root, "exporter");
            assert_eq!(exported, Some(Selected::Export(json!({ "api": 1 }))));
            record(&l0, "queried");
            Ok(None)
        }),
        ExtraInfo::page("pages/p"),
    );
    h.service
        .modules_mut()
        .register_component(ComponentSpec::new(), ExtraInfo::component("comp/cell"));
    h.service.modules_mut().register_component(
        ComponentSpec::new()
            .builtin_behavior(BuiltinBehavior::COMPONENT_EXPORT)
            .export(|_, _| json!({ "api": 1 })),
        ExtraInfo::component("comp/exporter"),
    );
    let l1 = log.clone();
    h.service.modules_mut().register_component(
        ComponentSpec::new().method("ask", move |scope, id, _| {
            let root = id.clone();
            let result = scope.select_component(&root, ".cell");
            record(&l1, format!("scoped:{}", result.is_some()));
            Ok(None)
        }),
        ExtraInfo::component("comp/island"),
    );

    h.load_page("b1", "pages/p", "p1");
    h.mount_with(json!({
        "bridgeId": "b1", "moduleId": "hero1", "path": "comp/cell",
        "parentId": "p1", "nodeInfo": { "id": "hero", "class": "cell" },
    }));
    h.mount_with(json!({
        "bridgeId": "b1", "moduleId": "cell2", "path": "comp/cell",
        "parentId": "hero1", "nodeInfo": { "class": "cell highlighted" },
    }));
    h.mount("b1", "exp1", "comp/exporter", Some("p1"));
    h.mount("b1", "island1", "comp/island", Some("p1"));

    // The island has no descendants; session members outside its subtree
    // never match.
    h.trigger("b1", "island1", "ask");
    assert_eq!(entries(&log), vec!["scoped:false"]);

    h.trigger("b1", "p1", "query");
    assert_eq!(entries(&log), vec!["scoped:false", "queried"]);
}
