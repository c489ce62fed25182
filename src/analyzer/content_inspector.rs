//! Content-stream inspection: artifact grouping, column heuristics, and
//! multimedia/scanned-page detection.

use crate::content::ContentOp;
use crate::document::PdfDocument;
use crate::object::Object;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

const MULTIMEDIA_SUBTYPES: [&str; 4] = ["Movie", "Sound", "Screen", "FileAttachment"];

/// Producer-string prefixes (lowercased) known to belong to scan-to-PDF
/// software; matching any one short-circuits the scanned-document test.
const SCANNER_PRODUCER_PREFIXES: [&str; 4] = [
    "adobe pdf scan library",
    "scan to pdf",
    "hp scanjet",
    "ricoh",
];

fn as_number(obj: &Object) -> Option<f64> {
    obj.as_real().or_else(|| obj.as_integer().map(|i| i as f64))
}

/// Content-stream queries with per-page memoization of artifact groups.
pub struct ContentInspector {
    artifact_cache: HashMap<usize, Vec<Vec<ContentOp>>>,
}

impl Default for ContentInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentInspector {
    /// Create an inspector with an empty cache.
    pub fn new() -> Self {
        Self { artifact_cache: HashMap::new() }
    }

    /// Ordered sequence of `/Artifact`-marked content groups on `page`, each
    /// the run of operations from its opening `BMC`/`BDC` to the matching
    /// `EMC`. Memoized: repeated calls for the same page return the cached
    /// result without re-tokenizing the content stream.
    pub fn artifact_elements(&mut self, doc: &mut PdfDocument, page: usize) -> &[Vec<ContentOp>] {
        self.artifact_cache.entry(page).or_insert_with(|| {
            let ops = doc.content_stream(page).unwrap_or_default();
            group_artifacts(&ops)
        })
    }

    /// Heuristic multi-column detection via the text-matrix jump rule.
    pub fn has_columns(&self, doc: &mut PdfDocument, page: usize) -> bool {
        let ops = match doc.content_stream(page) {
            Ok(ops) => ops,
            Err(_) => return false,
        };

        let crop_y = page_crop_height(doc, page).unwrap_or(0.0);

        let mut baseline: Option<(f64, f64)> = None;
        let mut y2_prev = 0.0;

        for op in &ops {
            if op.operands.len() != 6 {
                continue;
            }
            let nums: Option<Vec<f64>> = op.operands.iter().map(as_number).collect();
            let Some(nums) = nums else { continue };
            let x2 = nums[4];
            let y2 = nums[5];

            match baseline {
                None => {
                    baseline = Some((x2, y2));
                    y2_prev = y2;
                },
                Some((x2_0, _)) => {
                    if x2 < x2_0 {
                        return false;
                    }
                    if x2 > x2_0 && y2 >= 2.0 * y2_prev && y2 >= 0.70 * crop_y {
                        return true;
                    }
                    y2_prev = y2;
                },
            }
        }

        false
    }

    /// Whether `page` carries any multimedia annotation.
    pub fn has_multimedia(&self, doc: &mut PdfDocument, page: usize) -> bool {
        annots(doc, page)
            .iter()
            .filter_map(|a| a.as_dict())
            .any(|d| matches_multimedia_subtype(d))
    }

    /// Whether `page` carries an *embedded* multimedia annotation: a
    /// `/FileAttachment`, or a multimedia annotation whose file specification
    /// is not a bare URI.
    pub fn has_embedded_multimedia(&mut self, doc: &mut PdfDocument, page: usize) -> bool {
        annots(doc, page).iter().any(|a| {
            let Some(d) = a.as_dict() else { return false };
            if !matches_multimedia_subtype(d) {
                return false;
            }
            if d.get("Subtype").and_then(|o| o.as_name()) == Some("FileAttachment") {
                return true;
            }
            match d.get("FS") {
                Some(fs) => {
                    let fs = doc.resolve_object(fs).unwrap_or(Object::Null);
                    !matches!(fs.as_dict().and_then(|fd| fd.get("FS")).and_then(|o| o.as_name()), Some("URL"))
                },
                None => false,
            }
        })
    }

    /// Whether the document appears to be a scanned image rather than a
    /// digitally authored one.
    pub fn is_scanned(&self, doc: &mut PdfDocument, struct_tree_exists: bool, rng: &mut StdRng) -> bool {
        if let Ok(Some(producer)) = doc.metadata("Producer") {
            let lower = producer.to_lowercase();
            if SCANNER_PRODUCER_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                return true;
            }
        }

        if struct_tree_exists {
            return false;
        }

        let count = doc.page_count().unwrap_or(0);
        if count == 0 {
            return false;
        }

        let mut sample_indices = vec![0usize];
        if count == 2 {
            sample_indices.push(1);
        } else if count > 2 {
            sample_indices.push(rng.gen_range(1..count));
            sample_indices.push(rng.gen_range(1..count));
        }

        sample_indices.iter().all(|&idx| page_looks_scanned(doc, idx))
    }
}

fn matches_multimedia_subtype(annot: &std::collections::HashMap<String, Object>) -> bool {
    annot
        .get("Subtype")
        .and_then(|o| o.as_name())
        .map(|s| MULTIMEDIA_SUBTYPES.contains(&s))
        .unwrap_or(false)
}

fn annots(doc: &mut PdfDocument, page: usize) -> Vec<Object> {
    let Ok(page_obj) = doc.get_page(page) else { return Vec::new() };
    let Some(dict) = page_obj.as_dict() else { return Vec::new() };
    let Some(annots_obj) = dict.get("Annots") else { return Vec::new() };
    let annots_obj = doc.resolve_object(annots_obj).unwrap_or(Object::Null);
    let Some(arr) = annots_obj.as_array() else { return Vec::new() };
    arr.iter().map(|a| doc.resolve_object(a).unwrap_or(Object::Null)).collect()
}

fn page_crop_height(doc: &mut PdfDocument, page: usize) -> Option<f64> {
    let page_obj = doc.get_page(page).ok()?;
    let dict = page_obj.as_dict()?;
    let box_obj = dict.get("CropBox").or_else(|| dict.get("MediaBox"))?;
    let arr = box_obj.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let lly = as_number(&arr[1])?;
    let ury = as_number(&arr[3])?;
    Some(ury - lly)
}

fn page_looks_scanned(doc: &mut PdfDocument, page: usize) -> bool {
    let resources = match doc.get_page_resources(page) {
        Ok(r) => r,
        Err(_) => return false,
    };
    let Some(dict) = resources.as_dict() else { return false };

    let has_font = dict
        .get("Font")
        .and_then(|f| doc.resolve_object(f).ok())
        .and_then(|f| f.as_dict().map(|d| !d.is_empty()))
        .unwrap_or(false);
    if has_font {
        return false;
    }

    let has_image = dict
        .get("XObject")
        .and_then(|x| doc.resolve_object(x).ok())
        .and_then(|x| x.as_dict().cloned())
        .map(|xobjs| {
            xobjs.values().any(|v| {
                doc.resolve_object(v)
                    .ok()
                    .and_then(|o| o.as_dict().and_then(|d| d.get("Subtype").and_then(|s| s.as_name()).map(|s| s == "Image")))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false);

    has_image
}

fn group_artifacts(ops: &[ContentOp]) -> Vec<Vec<ContentOp>> {
    let mut groups = Vec::new();
    let mut iter = ops.iter().enumerate();

    while let Some((i, op)) = iter.next() {
        let is_artifact_open = (op.operator == "BMC" || op.operator == "BDC")
            && op.operands.first().and_then(|o| o.as_name()) == Some("Artifact");
        if !is_artifact_open {
            continue;
        }

        // Closes at the next EMC regardless of any marked content nested
        // inside, matching the flat open/close flag the original uses.
        let mut group = vec![op.clone()];
        let mut j = i + 1;
        while j < ops.len() {
            let candidate = &ops[j];
            group.push(candidate.clone());
            j += 1;
            if candidate.operator == "EMC" {
                break;
            }
        }
        groups.push(group);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn op(operator: &str, operands: Vec<Object>) -> ContentOp {
        ContentOp { operands, operator: operator.to_string() }
    }

    #[test]
    fn groups_single_artifact_region() {
        let ops = vec![
            op("BMC", vec![Object::Name("Artifact".to_string())]),
            op("Tj", vec![Object::String(b"x".to_vec())]),
            op("EMC", vec![]),
        ];
        let groups = group_artifacts(&ops);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn ignores_non_artifact_marked_content() {
        let ops = vec![
            op("BMC", vec![Object::Name("P".to_string())]),
            op("EMC", vec![]),
        ];
        assert!(group_artifacts(&ops).is_empty());
    }

    #[test]
    fn closes_at_the_first_emc_even_with_nested_marked_content() {
        let ops = vec![
            op("BDC", vec![Object::Name("Artifact".to_string()), Object::Dictionary(Default::default())]),
            op("BMC", vec![Object::Name("P".to_string())]),
            op("EMC", vec![]),
            op("EMC", vec![]),
        ];
        let groups = group_artifacts(&ops);
        assert_eq!(groups.len(), 1);
        // The group ends at the first EMC, leaving the inner BMC/EMC pair's
        // second EMC outside it (and unconsumed, not part of any group).
        assert_eq!(groups[0].len(), 3);
    }
}
