//! Depth-first structure-tree traversal.
//!
//! Starting from `/StructTreeRoot`, visits each structure element exactly
//! once via [`super::indicator::visit_element`], in document (array) order.

use super::indicator;
use super::AnalyzerState;
use crate::document::PdfDocument;
use crate::object::{Object, ObjectRef};

const MAX_DEPTH: usize = 128;

/// Walk the structure tree rooted at `root` (typically `/StructTreeRoot`,
/// already resolved to a dictionary by the caller).
pub fn walk(doc: &mut PdfDocument, state: &mut AnalyzerState, root: &Object) {
    let Some(dict) = root.as_dict() else { return };
    let Some(kids) = dict.get("K") else { return };
    for kid in normalize_kids(kids) {
        visit_kid(doc, state, &kid, 0);
    }
}

fn normalize_kids(kids: &Object) -> Vec<Object> {
    match kids {
        Object::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn is_objr(obj: &Object) -> bool {
    obj.as_dict().and_then(|d| d.get("Type")).and_then(|o| o.as_name()) == Some("OBJR")
}

fn visit_kid(doc: &mut PdfDocument, state: &mut AnalyzerState, kid: &Object, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }

    match kid {
        // Marked-content identifiers are terminal: they denote content-stream
        // regions, not descendable structure elements.
        Object::Name(_) | Object::Integer(_) => {},
        Object::Reference(r) => match doc.load_object(*r) {
            Ok(resolved) => {
                if is_objr(&resolved) {
                    return;
                }
                visit_element(doc, state, &resolved, Some(*r), depth);
            },
            Err(_) => {},
        },
        Object::Dictionary(_) => {
            if is_objr(kid) {
                return;
            }
            visit_element(doc, state, kid, None, depth);
        },
        _ => {},
    }
}

fn visit_element(doc: &mut PdfDocument, state: &mut AnalyzerState, obj: &Object, obj_ref: Option<ObjectRef>, depth: usize) {
    let Some(dict) = obj.as_dict() else { return };

    let struct_type = match dict.get("S") {
        Some(Object::Name(n)) => n.clone(),
        Some(Object::Reference(r)) => match doc.load_object(*r) {
            Ok(resolved) => match resolved.as_name() {
                Some(n) => n.to_string(),
                None => return,
            },
            Err(_) => return,
        },
        _ => return,
    };

    indicator::visit_element(doc, state, obj_ref, &struct_type, dict);

    if struct_type == "Link" {
        collect_link_objr(doc, state, dict, obj_ref);
    }

    if let Some(kids) = dict.get("K") {
        for kid in normalize_kids(kids) {
            visit_kid(doc, state, &kid, depth + 1);
        }
    }

    indicator::pop_table_scope(state, &struct_type);
}

fn collect_link_objr(
    doc: &mut PdfDocument,
    state: &mut AnalyzerState,
    dict: &std::collections::HashMap<String, Object>,
    link_ref: Option<ObjectRef>,
) {
    let Some(link_ref) = link_ref else { return };
    let Some(kids) = dict.get("K") else { return };

    for kid in normalize_kids(kids) {
        let resolved = match &kid {
            Object::Reference(r) => doc.load_object(*r).ok(),
            Object::Dictionary(_) => Some(kid.clone()),
            _ => None,
        };
        let Some(resolved) = resolved else { continue };
        if !is_objr(&resolved) {
            continue;
        }
        if let Some(annot_ref) = resolved.as_dict().and_then(|d| d.get("Obj")).and_then(|o| o.as_reference()) {
            state.link_index.insert(annot_ref, link_ref);
        }
    }
}
