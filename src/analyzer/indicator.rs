//! Per-element indicator checks, invoked once per structure element visited
//! by the [`super::walker`].

use super::table::{TableAlphabet, TableRecord};
use super::{AnalyzerState, IndicatorValue};
use crate::document::PdfDocument;
use crate::object::{Object, ObjectRef};
use std::collections::HashMap;

const FORM_INDICATOR: &str = "EIAO.A.15.2.1.4.PDF.4.1";
const FIGURE_ALT_INDICATOR: &str = "EIAO.A.10.1.1.4.PDF.1.1";
const FIGURE_ACTUAL_TEXT_INDICATOR: &str = "EIAO.A.10.1.1.4.PDF.2.1";

/// Handle one visited structure element. `element_ref` is the element's own
/// identity if it was reached through an indirect reference (true for
/// essentially every real structure tree); elements reached only as an
/// inline dictionary have no identity and are exempted from the
/// identity-keyed bookkeeping (figure dedup, table records).
pub(super) fn visit_element(
    doc: &mut PdfDocument,
    state: &mut AnalyzerState,
    element_ref: Option<ObjectRef>,
    struct_type: &str,
    dict: &HashMap<String, Object>,
) {
    state.element_count += 1;
    let resolved_type = state.resolve_role(struct_type);
    let role_mapped_figure = struct_type != "Figure" && resolved_type == "Figure";

    if let Some(level) = header_level(&resolved_type) {
        let page = dict.get("Pg").and_then(|o| o.as_reference()).and_then(|r| doc.page_number_for_ref(r)).unwrap_or(0);
        state.headers.push((page, level));
    }

    match resolved_type.as_str() {
        "Table" | "TR" | "TH" | "TD" => handle_table(doc, state, element_ref, &resolved_type, dict),
        "Form" => handle_form(doc, state, dict),
        "Figure" => handle_figure(doc, state, element_ref, dict, role_mapped_figure),
        _ => {},
    }
}

fn header_level(struct_type: &str) -> Option<u8> {
    let rest = struct_type.strip_prefix('H')?;
    if rest.len() != 1 {
        return None;
    }
    let digit = rest.bytes().next()?;
    if digit.is_ascii_digit() && digit != b'0' {
        Some(digit - b'0')
    } else {
        None
    }
}

fn handle_table(
    doc: &mut PdfDocument,
    state: &mut AnalyzerState,
    element_ref: Option<ObjectRef>,
    struct_type: &str,
    dict: &HashMap<String, Object>,
) {
    let Some(alphabet) = TableAlphabet::from_struct_type(struct_type) else { return };
    let identity = element_ref.unwrap_or(ObjectRef::new(0, 0));

    if alphabet == TableAlphabet::Table {
        let page = dict
            .get("Pg")
            .and_then(|o| o.as_reference())
            .and_then(|r| doc.page_number_for_ref(r));
        state.tables.entry(identity).or_insert_with(|| TableRecord::new(identity, page)).add(identity, alphabet);
        state.table_stack.push(identity);
        return;
    }

    let Some(&root) = state.table_stack.last() else { return };
    if let Some(record) = state.tables.get_mut(&root) {
        record.add(identity, alphabet);
    }
}

/// Called by the walker after it finishes recursing into a `/Table`
/// element's kids, to pop the active-table stack pushed by [`handle_table`].
pub(super) fn pop_table_scope(state: &mut AnalyzerState, struct_type: &str) {
    if state.resolve_role(struct_type) == "Table" {
        state.table_stack.pop();
    }
}

fn handle_form(doc: &mut PdfDocument, state: &mut AnalyzerState, dict: &HashMap<String, Object>) {
    let kid_has_obj = |doc: &mut PdfDocument, kid: &Object| -> bool {
        let resolved = match kid {
            Object::Reference(r) => doc.load_object(*r).unwrap_or(Object::Null),
            other => other.clone(),
        };
        resolved.as_dict().map(|d| d.get("Obj").is_some()).unwrap_or(false)
    };

    let has_obj_kid = match dict.get("K") {
        Some(Object::Array(items)) => items.iter().any(|item| kid_has_obj(doc, item)),
        Some(other) => kid_has_obj(doc, other),
        None => false,
    };

    if !has_obj_kid {
        state.set_indicator(FORM_INDICATOR, (0, 1), IndicatorValue::Status(0));
    }
}

fn handle_figure(
    doc: &mut PdfDocument,
    state: &mut AnalyzerState,
    element_ref: Option<ObjectRef>,
    dict: &HashMap<String, Object>,
    role_mapped: bool,
) {
    let identity = element_ref.unwrap_or(ObjectRef::new(0, 0));
    if state.figure_set.contains(&identity) {
        return;
    }

    let has_alt = dict.get("Alt").and_then(|o| o.as_string()).map(|s| !s.is_empty()).unwrap_or(false);
    let has_actual_text = dict.get("ActualText").and_then(|o| o.as_string()).map(|s| !s.is_empty()).unwrap_or(false);

    let page_ref = dict.get("Pg").and_then(|o| o.as_reference());
    let page_number = page_ref.and_then(|r| doc.page_number_for_ref(r)).unwrap_or(0);

    state.figure_set.insert(identity);

    if role_mapped || !state.config.validate_images {
        let location = (0, state.element_count);
        state.set_indicator(FIGURE_ALT_INDICATOR, location, IndicatorValue::Status(has_alt as i32));
        state.set_indicator(FIGURE_ACTUAL_TEXT_INDICATOR, location, IndicatorValue::Status(has_actual_text as i32));
        if !has_alt && !has_actual_text {
            state.failed_images.entry(0).or_default().push(identity);
        }
        return;
    }

    let page_index = page_number.saturating_sub(1) as usize;
    let resources = doc.get_page_resources(page_index).unwrap_or(Object::Dictionary(Default::default()));
    let xobjects = resources
        .as_dict()
        .and_then(|d| d.get("XObject"))
        .and_then(|x| doc.resolve_object(x).ok())
        .and_then(|x| x.as_dict().cloned())
        .unwrap_or_default();

    let images: Vec<Object> = xobjects
        .values()
        .filter_map(|v| doc.resolve_object(v).ok())
        .filter(|o| o.as_dict().and_then(|d| d.get("Subtype").and_then(|s| s.as_name())) == Some("Image"))
        .collect();

    if images.is_empty() {
        return;
    }

    if state.config.ignore_single_bit_images {
        let all_single_bit = images.iter().all(|img| {
            img.as_dict().and_then(|d| d.get("BitsPerComponent")).and_then(|b| b.as_integer()) == Some(1)
        });
        if all_single_bit {
            return;
        }
    }

    let location = (page_number, state.element_count);
    state.set_indicator(FIGURE_ALT_INDICATOR, location, IndicatorValue::Status(has_alt as i32));
    state.set_indicator(FIGURE_ACTUAL_TEXT_INDICATOR, location, IndicatorValue::Status(has_actual_text as i32));
    if !has_alt && !has_actual_text {
        state.failed_images.entry(page_number).or_default().push(identity);
    }
}
