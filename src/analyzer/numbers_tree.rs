//! Numbers-tree flattening.
//!
//! `/StructTreeRoot/ParentTree` is a PDF "number tree": either a leaf node
//! with a `/Nums` array of `(key, value)` pairs in key order, or an
//! intermediate node with a `/Kids` array of child number-tree nodes. This
//! module walks it into a flat `key -> element references` map.

use crate::document::PdfDocument;
use crate::object::{Object, ObjectRef};
use std::collections::HashMap;

/// Flattened numbers tree: struct-parent index -> the struct element
/// reference(s) registered under that index (a `/Nums` value is either a
/// single reference or an array of them).
pub type NumbersTree = HashMap<i64, Vec<ObjectRef>>;

/// Build the numbers tree from `/StructTreeRoot/ParentTree`. Tolerates a
/// missing or malformed tree by returning an empty map.
pub fn build_numbers_tree(doc: &mut PdfDocument, struct_tree_root: &Object) -> NumbersTree {
    let mut tree = NumbersTree::new();

    let root_dict = match struct_tree_root.as_dict() {
        Some(d) => d,
        None => return tree,
    };

    let parent_tree = match root_dict.get("ParentTree") {
        Some(obj) => obj.clone(),
        None => return tree,
    };

    let parent_tree = resolve(doc, &parent_tree);
    flatten_node(doc, &parent_tree, &mut tree, 0);
    tree
}

fn resolve(doc: &mut PdfDocument, obj: &Object) -> Object {
    if let Some(r) = obj.as_reference() {
        doc.load_object(r).unwrap_or(Object::Null)
    } else {
        obj.clone()
    }
}

fn flatten_node(doc: &mut PdfDocument, node: &Object, tree: &mut NumbersTree, depth: usize) {
    const MAX_DEPTH: usize = 32;
    if depth > MAX_DEPTH {
        return;
    }

    let dict = match node.as_dict() {
        Some(d) => d,
        None => return,
    };

    if let Some(nums) = dict.get("Nums").and_then(|o| o.as_array()) {
        let mut iter = nums.iter();
        while let (Some(key_obj), Some(value_obj)) = (iter.next(), iter.next()) {
            let Some(key) = key_obj.as_integer() else { continue };
            let refs = collect_refs(value_obj);
            tree.entry(key).or_default().extend(refs);
        }
        return;
    }

    if let Some(kids) = dict.get("Kids").and_then(|o| o.as_array()) {
        for kid in kids {
            let kid_node = resolve(doc, kid);
            flatten_node(doc, &kid_node, tree, depth + 1);
        }
    }
}

fn collect_refs(value: &Object) -> Vec<ObjectRef> {
    match value {
        Object::Reference(r) => vec![*r],
        Object::Array(items) => items.iter().filter_map(|o| o.as_reference()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn dict(entries: Vec<(&str, Object)>) -> Object {
        let mut m = Map::new();
        for (k, v) in entries {
            m.insert(k.to_string(), v);
        }
        Object::Dictionary(m)
    }

    #[test]
    fn flattens_flat_nums_array() {
        let mut tree = NumbersTree::new();
        let node = dict(vec![(
            "Nums",
            Object::Array(vec![
                Object::Integer(0),
                Object::Reference(ObjectRef::new(5, 0)),
                Object::Integer(1),
                Object::Reference(ObjectRef::new(6, 0)),
            ]),
        )]);
        flatten_node_standalone(&node, &mut tree);
        assert_eq!(tree.get(&0), Some(&vec![ObjectRef::new(5, 0)]));
        assert_eq!(tree.get(&1), Some(&vec![ObjectRef::new(6, 0)]));
    }

    fn flatten_node_standalone(node: &Object, tree: &mut NumbersTree) {
        let dict = node.as_dict().unwrap();
        let nums = dict.get("Nums").and_then(|o| o.as_array()).unwrap();
        let mut iter = nums.iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            let key = k.as_integer().unwrap();
            tree.entry(key).or_default().extend(collect_refs(v));
        }
    }
}
