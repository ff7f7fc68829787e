//! Structural diff and patch for nested content trees
//!
//! Trees are JSON objects whose leaves are anything that is not a non-empty object
//! (strings, numbers, booleans, null, arrays, `{}`). Leaves are addressed by their
//! dotted path; a `.` or `\` inside an object key is escaped with `\`, so
//! `{"common.welcome": 1}` has the path `common\.welcome` and
//! `apply(old, &diff(old, new)) == new` holds for every pair of trees.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::types::{AddEntry, ChangePatch, DeleteEntry, ModifyEntry};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';
const ESCAPE: char = '\\';

/// Append one object key to a path, escaping separators inside it.
fn push_escaped(path: &mut String, segment: &str) {
    for c in segment.chars() {
        if c == PATH_SEPARATOR || c == ESCAPE {
            path.push(ESCAPE);
        }
        path.push(c);
    }
}

/// Object keys of a path, unescaped. A trailing lone `\` is kept literally.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => current.push(chars.next().unwrap_or(ESCAPE)),
            PATH_SEPARATOR => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Key store name for a leaf path: its object keys joined with plain dots.
///
/// `common.welcome` and `common\.welcome` both name the key `common.welcome`.
pub fn key_name(path: &str) -> String {
    split_path(path).join(".")
}

/// Collect every leaf of `tree` by escaped path.
pub fn flatten(tree: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(tree, None, &mut out);
    out
}

fn flatten_into(
    tree: &Map<String, Value>,
    prefix: Option<&str>,
    out: &mut BTreeMap<String, Value>,
) {
    for (segment, value) in tree {
        let mut path = match prefix {
            Some(p) => format!("{p}{PATH_SEPARATOR}"),
            None => String::new(),
        };
        push_escaped(&mut path, segment);
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(child, Some(&path), out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuild a tree from dotted key names, one object level per `.`.
///
/// Names that collide with an existing leaf (`a` and `a.b` both present) cannot be
/// represented; they are skipped and returned as the second element.
pub fn unflatten<I>(leaves: I) -> (Map<String, Value>, Vec<String>)
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut tree = Map::new();
    let mut collisions = Vec::new();
    for (name, value) in leaves {
        let segments: Vec<&str> = name.split('.').collect();
        if !insert_new(&mut tree, &segments, value) {
            collisions.push(name);
        }
    }
    (tree, collisions)
}

/// Reshape `tree` so that every leaf sits at the nesting its key name implies.
///
/// Flat files (`{"common.welcome": ..}`) and nested ones (`{"common": {"welcome": ..}}`)
/// come out identical. Leaves whose key name collides with another are returned as
/// the second element by path.
pub fn canonicalize(tree: &Map<String, Value>) -> (Map<String, Value>, Vec<String>) {
    let mut by_name = BTreeMap::new();
    let mut collisions = Vec::new();
    for (path, value) in flatten(tree) {
        match by_name.entry(key_name(&path)) {
            Entry::Vacant(slot) => {
                slot.insert((path, value));
            }
            Entry::Occupied(_) => collisions.push(path),
        }
    }

    let mut canonical = Map::new();
    for (name, (path, value)) in by_name {
        let segments: Vec<&str> = name.split('.').collect();
        if !insert_new(&mut canonical, &segments, value) {
            collisions.push(path);
        }
    }
    collisions.sort();
    (canonical, collisions)
}

fn insert_new(map: &mut Map<String, Value>, segments: &[&str], value: Value) -> bool {
    match segments {
        [] => false,
        [last] => {
            if map.contains_key(*last) {
                return false;
            }
            map.insert((*last).to_string(), value);
            true
        }
        [head, rest @ ..] => {
            let entry = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(child) => insert_new(child, rest, value),
                _ => false,
            }
        }
    }
}

/// Leaf-level difference between `old` and `new`, each section sorted by path.
pub fn diff(old: &Map<String, Value>, new: &Map<String, Value>) -> ChangePatch {
    let old_leaves = flatten(old);
    let new_leaves = flatten(new);
    let mut patch = ChangePatch::default();

    for (path, old_value) in &old_leaves {
        match new_leaves.get(path) {
            None => patch.delete.push(DeleteEntry {
                path: path.clone(),
                old_value: old_value.clone(),
            }),
            Some(new_value) if new_value != old_value => patch.modify.push(ModifyEntry {
                path: path.clone(),
                old_value: old_value.clone(),
                new_value: new_value.clone(),
            }),
            Some(_) => {}
        }
    }

    for (path, new_value) in &new_leaves {
        if !old_leaves.contains_key(path) {
            patch.add.push(AddEntry {
                path: path.clone(),
                new_value: new_value.clone(),
            });
        }
    }

    patch
}

/// Apply `patch` to a copy of `base`: deletions, then additions, then modifications.
///
/// Deleting a leaf prunes the parent objects it leaves empty. Adding creates missing
/// intermediate objects. Modifying a path that does not exist sets it.
pub fn apply(base: &Map<String, Value>, patch: &ChangePatch) -> Map<String, Value> {
    let mut tree = base.clone();

    for entry in &patch.delete {
        remove_path(&mut tree, &split_path(&entry.path));
    }
    for entry in &patch.add {
        set_path(&mut tree, &split_path(&entry.path), entry.new_value.clone());
    }
    for entry in &patch.modify {
        set_path(&mut tree, &split_path(&entry.path), entry.new_value.clone());
    }

    tree
}

fn remove_path(map: &mut Map<String, Value>, segments: &[String]) -> bool {
    match segments {
        [] => false,
        [last] => map.remove(last).is_some(),
        [head, rest @ ..] => {
            let Some(Value::Object(child)) = map.get_mut(head) else {
                return false;
            };
            let removed = remove_path(child, rest);
            if removed && child.is_empty() {
                map.remove(head);
            }
            removed
        }
    }
}

fn set_path(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// Text stored in the key store for a content leaf; `None` for null.
pub fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn add_and_delete_sibling() {
        let old = obj(json!({"a": 1, "b": 2}));
        let new = obj(json!({"a": 1, "c": 3}));
        let patch = diff(&old, &new);

        assert_eq!(
            patch.add,
            vec![AddEntry {
                path: "c".to_string(),
                new_value: json!(3)
            }]
        );
        assert!(patch.modify.is_empty());
        assert_eq!(
            patch.delete,
            vec![DeleteEntry {
                path: "b".to_string(),
                old_value: json!(2)
            }]
        );
        assert_eq!(apply(&old, &patch), new);
    }

    #[test]
    fn nested_modify_uses_dotted_path() {
        let old = obj(json!({"common": {"welcome": "Welcome", "bye": "Bye"}}));
        let new = obj(json!({"common": {"welcome": "Welcome!", "bye": "Bye"}}));
        let patch = diff(&old, &new);
        assert_eq!(patch.modify.len(), 1);
        assert_eq!(patch.modify[0].path, "common.welcome");
        assert_eq!(patch.modify[0].old_value, json!("Welcome"));
        assert_eq!(apply(&old, &patch), new);
    }

    #[test]
    fn identical_trees_give_empty_patch() {
        let tree = obj(json!({"a": {"b": [1, 2], "c": null}, "d": true}));
        let patch = diff(&tree, &tree);
        assert!(patch.is_empty());
        assert_eq!(apply(&tree, &patch), tree);
    }

    #[test]
    fn delete_prunes_emptied_parents() {
        let base = obj(json!({"a": {"b": {"c": 1}}, "x": 1}));
        let patch = ChangePatch {
            delete: vec![DeleteEntry {
                path: "a.b.c".to_string(),
                old_value: json!(1),
            }],
            ..ChangePatch::default()
        };
        assert_eq!(apply(&base, &patch), obj(json!({"x": 1})));
    }

    #[test]
    fn add_creates_intermediate_objects() {
        let patch = ChangePatch {
            add: vec![AddEntry {
                path: "settings.profile.title".to_string(),
                new_value: json!("Profile"),
            }],
            ..ChangePatch::default()
        };
        assert_eq!(
            apply(&Map::new(), &patch),
            obj(json!({"settings": {"profile": {"title": "Profile"}}}))
        );
    }

    #[test]
    fn modify_missing_path_sets_it() {
        let patch = ChangePatch {
            modify: vec![ModifyEntry {
                path: "a.b".to_string(),
                old_value: json!("x"),
                new_value: json!("y"),
            }],
            ..ChangePatch::default()
        };
        assert_eq!(apply(&Map::new(), &patch), obj(json!({"a": {"b": "y"}})));
    }

    #[test]
    fn arrays_are_leaves() {
        let old = obj(json!({"list": [1, 2]}));
        let new = obj(json!({"list": [1, 2, 3]}));
        let patch = diff(&old, &new);
        assert_eq!(patch.modify.len(), 1);
        assert_eq!(patch.modify[0].path, "list");
    }

    #[test]
    fn leaf_becoming_object_round_trips() {
        let old = obj(json!({"a": "text", "e": {}}));
        let new = obj(json!({"a": {"b": "nested"}, "e": {"f": 1}}));
        assert_eq!(apply(&old, &diff(&old, &new)), new);
        assert_eq!(apply(&new, &diff(&new, &old)), old);
    }

    #[test]
    fn apply_leaves_base_untouched() {
        let base = obj(json!({"a": 1}));
        let patch = diff(&base, &obj(json!({"b": 2})));
        let _ = apply(&base, &patch);
        assert_eq!(base, obj(json!({"a": 1})));
    }

    #[test]
    fn unflatten_reports_collisions() {
        let (tree, collisions) = unflatten(vec![
            ("common.welcome".to_string(), json!("Welcome")),
            ("common".to_string(), json!("oops")),
            ("common.bye".to_string(), json!("Bye")),
        ]);
        assert_eq!(tree, obj(json!({"common": {"welcome": "Welcome", "bye": "Bye"}})));
        assert_eq!(collisions, vec!["common".to_string()]);
    }

    #[test]
    fn flat_dotted_key_modify_round_trips() {
        let old = obj(json!({"common.welcome": "Welcome", "common.bye": "Bye"}));
        let new = obj(json!({"common.welcome": "Welcome!", "common.bye": "Bye"}));
        let patch = diff(&old, &new);
        assert_eq!(patch.modify.len(), 1);
        assert_eq!(patch.modify[0].path, r"common\.welcome");
        assert_eq!(apply(&old, &patch), new);
    }

    #[test]
    fn flat_dotted_key_delete_round_trips() {
        let old = obj(json!({"common.welcome": "Welcome", "common.bye": "Bye"}));
        let new = obj(json!({"common.welcome": "Welcome"}));
        let patch = diff(&old, &new);
        assert_eq!(patch.delete.len(), 1);
        assert_eq!(patch.delete[0].path, r"common\.bye");
        assert_eq!(apply(&old, &patch), new);
        assert_eq!(apply(&new, &diff(&new, &old)), old);
    }

    #[test]
    fn flat_and_nested_spellings_stay_distinct() {
        let old = obj(json!({"a": {"b": 1}, "a.b": 2, "c\\d": 3}));
        let new = obj(json!({"a": {"b": 1}, "a.b": 20}));
        let patch = diff(&old, &new);
        assert_eq!(patch.modify.len(), 1);
        assert_eq!(patch.modify[0].path, r"a\.b");
        assert_eq!(patch.delete[0].path, r"c\\d");
        assert_eq!(apply(&old, &patch), new);
        assert_eq!(apply(&Map::new(), &diff(&Map::new(), &old)), old);
    }

    #[test]
    fn split_path_unescapes() {
        assert_eq!(split_path(r"a\.b.c"), vec!["a.b", "c"]);
        assert_eq!(split_path(r"x\\.y"), vec!["x\\", "y"]);
        assert_eq!(split_path("plain"), vec!["plain"]);
        assert_eq!(key_name(r"common\.welcome"), "common.welcome");
        assert_eq!(key_name("common.welcome"), "common.welcome");
    }

    #[test]
    fn canonicalize_nests_flat_keys() {
        let flat = obj(json!({"common.welcome": "Welcome", "common": {"bye": "Bye"}, "n": 1}));
        let (tree, collisions) = canonicalize(&flat);
        assert!(collisions.is_empty());
        assert_eq!(
            tree,
            obj(json!({"common": {"welcome": "Welcome", "bye": "Bye"}, "n": 1}))
        );

        let clash = obj(json!({"a": {"b": 1}, "a.b": 2, "x": "leaf", "x.y": 3}));
        let (tree, collisions) = canonicalize(&clash);
        assert_eq!(tree, obj(json!({"a": {"b": 1}, "x": "leaf"})));
        assert_eq!(collisions, vec![r"a\.b".to_string(), r"x\.y".to_string()]);
    }

    #[test]
    fn leaf_text_stringifies_scalars() {
        assert_eq!(leaf_text(&json!(3)).as_deref(), Some("3"));
        assert_eq!(leaf_text(&json!(false)).as_deref(), Some("false"));
        assert_eq!(leaf_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(leaf_text(&Value::Null), None);
    }
}
