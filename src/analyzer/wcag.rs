//! The dispatched WCAG/EGOVMON test battery. Each `test_*` function
//! produces a [`TestOutcome`] or leaves its memo entry absent when the
//! criterion is not applicable to the document.

use super::content_inspector::ContentInspector;
use super::{AnalyzerState, TestOutcome};
use crate::document::PdfDocument;
use crate::object::Object;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Run every dispatched test and record its outcome in `state.memo`.
/// `wcag.pdf.02` is excluded: the initializer computes it directly from the
/// facade's outline before the structure walk even runs.
pub fn run_battery(doc: &mut PdfDocument, state: &mut AnalyzerState, inspector: &mut ContentInspector, rng: &mut StdRng) {
    record(state, "wcag.pdf.03", test_pdf_03(doc, state));
    record(state, "wcag.pdf.04", test_pdf_04(doc, state, inspector));
    record(state, "wcag.pdf.06", test_pdf_06(state));
    record(state, "wcag.pdf.09", test_pdf_09(doc, state));
    record_sc244(doc, state);
    record(state, "wcag.pdf.12", test_pdf_12(doc));
    record(state, "wcag.pdf.15", test_pdf_15(doc));
    record(state, "wcag.pdf.16", test_pdf_16(doc));
    record(state, "wcag.pdf.17", test_pdf_17(doc));
    record(state, "wcag.pdf.18", test_pdf_18(doc));
    record(state, "egovmon.pdf.05", test_egovmon_05(doc));
    record(state, "egovmon.pdf.08", test_egovmon_08(doc, state, inspector, rng));
    record(state, "egovmon.pdf.03", Some(TestOutcome::Status(state.struct_tree_exists as i32)));
}

fn record(state: &mut AnalyzerState, id: &str, outcome: Option<TestOutcome>) {
    if let Some(outcome) = outcome {
        state.memo.insert(id.to_string(), outcome);
    }
}

fn test_pdf_03(doc: &mut PdfDocument, state: &AnalyzerState) -> Option<TestOutcome> {
    if state.struct_tree_exists {
        return Some(TestOutcome::Status(1));
    }
    let count = doc.page_count().unwrap_or(0);
    if count == 0 {
        return Some(TestOutcome::Status(1));
    }
    let all_tabbed = (0..count).all(|i| {
        doc.get_page(i)
            .ok()
            .and_then(|p| p.as_dict().and_then(|d| d.get("Tabs")).and_then(|t| t.as_name().map(|s| s == "S")))
            .unwrap_or(false)
    });
    Some(TestOutcome::Status(all_tabbed as i32))
}

fn matches_image_or_form_name(name: &str) -> bool {
    for prefix in ["Im", "Fm"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

fn test_pdf_04(doc: &mut PdfDocument, state: &AnalyzerState, inspector: &mut ContentInspector) -> Option<TestOutcome> {
    let count = doc.page_count().unwrap_or(0);
    let mut fail = 0u32;
    let mut pass = 0u32;
    let mut found_image_artifact = false;

    for page in 0..count {
        let groups = inspector.artifact_elements(doc, page).to_vec();
        for group in &groups {
            let Some(opener) = group.first() else { continue };
            let arity_ok = match opener.operator.as_str() {
                "BMC" => opener.operands.len() == 1,
                "BDC" => opener.operands.len() == 2,
                _ => true,
            };
            if !arity_ok {
                fail += 1;
            }

            let has_image_name = group.iter().any(|op| {
                op.operands.iter().any(|o| o.as_name().map(matches_image_or_form_name).unwrap_or(false))
            });
            if has_image_name {
                pass += 1;
                found_image_artifact = true;
            }
        }
    }

    let _ = &state.config;
    if !found_image_artifact {
        return Some(TestOutcome::Status(2));
    }
    Some(TestOutcome::Counts { fail, pass })
}

fn test_pdf_06(state: &AnalyzerState) -> Option<TestOutcome> {
    if state.tables.is_empty() {
        return Some(TestOutcome::Status(2));
    }
    let mut fail = 0u32;
    let mut pass = 0u32;
    for record in state.tables.values() {
        if record.invalid {
            fail += 1;
        } else {
            pass += 1;
        }
    }
    Some(TestOutcome::Counts { fail, pass })
}

fn test_pdf_09(doc: &mut PdfDocument, state: &AnalyzerState) -> Option<TestOutcome> {
    if state.headers.is_empty() {
        let outline_empty = doc.get_outline().ok().flatten().map(|o| o.is_empty()).unwrap_or(true);
        if outline_empty {
            return None;
        }
        return Some(TestOutcome::Status(1));
    }

    Some(TestOutcome::Status(headers_well_formed(&state.headers) as i32))
}

/// Whether a document's headings, taken in ascending page order, start at
/// level 1 and never skip a level. `prev` threads across pages: a jump is a
/// jump whether it happens within a page or across a page boundary.
fn headers_well_formed(headers: &[(u32, u8)]) -> bool {
    let mut sorted = headers.to_vec();
    sorted.sort_by_key(|&(page, _)| page);

    if sorted[0].1 != 1 {
        return false;
    }

    let mut prev = sorted[0].1;
    for &(_page, level) in &sorted[1..] {
        if level > prev + 1 {
            return false;
        }
        prev = level;
    }

    true
}

fn record_sc244(doc: &mut PdfDocument, state: &mut AnalyzerState) {
    if !state.struct_tree_exists {
        return;
    }

    let links = external_links(doc);
    if links.is_empty() {
        return;
    }

    let mut fail11 = 0u32;
    let mut pass11 = 0u32;
    let mut fail13 = 0u32;
    let mut pass13 = 0u32;

    for annot_ref in &links {
        let containing = state.link_index.get(annot_ref).copied();
        match containing {
            Some(_) => pass11 += 1,
            None => fail11 += 1,
        }

        let has_alt = containing
            .and_then(|r| doc.load_object(r).ok())
            .and_then(|o| o.as_dict().and_then(|d| d.get("Alt")).and_then(|a| a.as_string()).map(|s| !s.is_empty()))
            .unwrap_or(false);
        if has_alt {
            pass13 += 1;
        } else {
            fail13 += 1;
        }
    }

    state.memo.insert("wcag.pdf.11".to_string(), TestOutcome::Counts { fail: fail11, pass: pass11 });
    state.memo.insert("wcag.pdf.13".to_string(), TestOutcome::Counts { fail: fail13, pass: pass13 });
}

fn external_links(doc: &mut PdfDocument) -> Vec<crate::object::ObjectRef> {
    let count = doc.page_count().unwrap_or(0);
    let mut refs = Vec::new();
    for page in 0..count {
        let Ok(page_obj) = doc.get_page(page) else { continue };
        let Some(annots) = page_obj.as_dict().and_then(|d| d.get("Annots")).cloned() else { continue };
        let Ok(resolved) = doc.resolve_object(&annots) else { continue };
        let Some(items) = resolved.as_array() else { continue };
        for item in items {
            let Some(r) = item.as_reference() else { continue };
            let Ok(annot) = doc.load_object(r) else { continue };
            if is_external_link(doc, &annot) {
                refs.push(r);
            }
        }
    }
    refs
}

fn is_external_link(doc: &mut PdfDocument, annot: &Object) -> bool {
    let Some(dict) = annot.as_dict() else { return false };
    if dict.get("Subtype").and_then(|s| s.as_name()) == Some("Link") {
        return true;
    }
    if dict.contains_key("URI") {
        return true;
    }
    if let Some(action) = dict.get("A") {
        if let Ok(action) = doc.resolve_object(action) {
            if action.as_dict().and_then(|d| d.get("S")).and_then(|s| s.as_name()) == Some("URI") {
                return true;
            }
        }
    }
    false
}

fn acroform_leaf_fields(doc: &mut PdfDocument) -> Option<Vec<HashMap<String, Object>>> {
    let catalog = doc.catalog().ok()?;
    let acroform = catalog.as_dict()?.get("AcroForm")?.clone();
    let acroform = doc.resolve_object(&acroform).ok()?;
    let fields = acroform.as_dict()?.get("Fields")?.clone();
    let fields = doc.resolve_object(&fields).ok()?;
    let top = fields.as_array()?.clone();

    let mut leaves = Vec::new();
    let mut stack = top;
    let mut guard = 0;
    while let Some(field_obj) = stack.pop() {
        guard += 1;
        if guard > 10_000 {
            break;
        }
        let Ok(field) = doc.resolve_object(&field_obj) else { continue };
        let Some(dict) = field.as_dict() else { continue };
        match dict.get("Kids") {
            Some(kids) => {
                if let Ok(kids) = doc.resolve_object(kids) {
                    if let Some(arr) = kids.as_array() {
                        stack.extend(arr.iter().cloned());
                        continue;
                    }
                }
                leaves.push(dict.clone());
            },
            None => leaves.push(dict.clone()),
        }
    }
    Some(leaves)
}

fn field_name_reachable(field: &HashMap<String, Object>) -> bool {
    field.get("TU").or_else(|| field.get("T")).and_then(|o| o.as_string()).map(|s| !s.is_empty()).unwrap_or(false)
}

fn test_pdf_12(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let fields = acroform_leaf_fields(doc)?;

    let mut all_ok = true;
    for field in &fields {
        let ft = field.get("FT").and_then(|o| o.as_name());
        let Some(ft) = ft else {
            all_ok = false;
            continue;
        };
        if !["Tx", "Btn", "Ch", "Sig"].contains(&ft) {
            all_ok = false;
            continue;
        }
        if ft == "Btn" {
            continue;
        }
        if !field_name_reachable(field) {
            all_ok = false;
            continue;
        }
        let has_value = field.contains_key("V")
            || field.contains_key("DV")
            || field.contains_key("Opt")
            || field.contains_key("Ff");
        if !has_value {
            all_ok = false;
        }
    }

    Some(TestOutcome::Status(all_ok as i32))
}

fn test_pdf_15(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let fields = acroform_leaf_fields(doc)?;
    let buttons: Vec<_> = fields
        .iter()
        .filter(|f| f.get("Ff").and_then(|o| o.as_integer()) == Some(65536))
        .collect();
    if buttons.is_empty() {
        return None;
    }

    let any_ok = buttons.iter().any(|field| {
        let mk = field.get("MK").and_then(|mk| doc.resolve_object(mk).ok());
        let has_ca = mk.as_ref().and_then(|mk| mk.as_dict()).map(|mk| mk.contains_key("CA")).unwrap_or(false);
        if has_ca {
            return true;
        }

        // The original reads the field's own /S, not the action dict's.
        match field.get("S").and_then(|s| s.as_name()) {
            Some("JavaScript") => {
                let action = field.get("A").and_then(|a| doc.resolve_object(a).ok());
                action.as_ref().and_then(|a| a.as_dict()).map(|a| a.contains_key("JS")).unwrap_or(false)
            },
            Some(_) => true,
            None => false,
        }
    });

    Some(TestOutcome::Status(any_ok as i32))
}

fn test_pdf_16(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let catalog = doc.catalog().ok()?;
    let has_lang = catalog.as_dict()?.contains_key("Lang");
    Some(TestOutcome::Status(has_lang as i32))
}

fn test_pdf_17(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let catalog = doc.catalog().ok()?;
    let page_labels = catalog.as_dict()?.get("PageLabels")?.clone();
    let page_labels = doc.resolve_object(&page_labels).ok()?;
    let nums = page_labels.as_dict()?.get("Nums")?.clone();
    let nums = doc.resolve_object(&nums).ok()?;
    let nums = nums.as_array()?;

    if nums.len() % 2 != 0 {
        return Some(TestOutcome::Status(0));
    }
    if nums.first().and_then(|o| o.as_integer()) != Some(0) {
        return Some(TestOutcome::Status(0));
    }

    let mut ok = true;
    let mut iter = nums.iter();
    while let (Some(_), Some(value)) = (iter.next(), iter.next()) {
        let resolved = doc.resolve_object(value).unwrap_or(Object::Null);
        let s = resolved.as_dict().and_then(|d| d.get("S")).and_then(|o| o.as_name());
        if !matches!(s, Some("D") | Some("r") | Some("R") | Some("A") | Some("a")) {
            ok = false;
            break;
        }
    }

    Some(TestOutcome::Status(ok as i32))
}

fn test_pdf_18(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let title = doc.metadata("Title").ok().flatten().unwrap_or_default();
    Some(TestOutcome::Status((!title.is_empty()) as i32))
}

fn test_egovmon_05(doc: &mut PdfDocument) -> Option<TestOutcome> {
    let Some(handler) = doc.encryption_handler() else { return Some(TestOutcome::Status(1)) };
    let revision = handler.revision();
    let permissions = handler.permission_bits();
    let bit5 = (permissions >> 4) & 1 == 1;
    let bit10 = (permissions >> 9) & 1 == 1;
    let pass = if revision == 2 { bit5 } else { bit5 || bit10 };
    Some(TestOutcome::Status(pass as i32))
}

fn test_egovmon_08(
    doc: &mut PdfDocument,
    state: &AnalyzerState,
    inspector: &mut ContentInspector,
    rng: &mut StdRng,
) -> Option<TestOutcome> {
    let scanned = inspector.is_scanned(doc, state.struct_tree_exists, rng);
    Some(TestOutcome::Status((!scanned) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_a_level_jump_across_a_page_boundary() {
        let headers = vec![(1u32, 1u8), (2u32, 3u8)];
        assert!(!headers_well_formed(&headers));
    }

    #[test]
    fn accepts_a_level_increase_split_across_pages() {
        let headers = vec![(1u32, 1u8), (2u32, 2u8), (3u32, 3u8)];
        assert!(headers_well_formed(&headers));
    }

    #[test]
    fn rejects_a_document_that_does_not_start_at_h1() {
        let headers = vec![(1u32, 2u8)];
        assert!(!headers_well_formed(&headers));
    }
}
