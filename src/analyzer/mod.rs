//! Accessibility analyzer: walks a document's logical structure tree and
//! content streams against the WCAG 2.0 / EIAO indicator catalog.

pub mod content_inspector;
pub mod indicator;
pub mod numbers_tree;
pub mod report;
pub mod table;
pub mod walker;
pub mod wcag;

use crate::config::AnalyzerConfig;
use crate::document::PdfDocument;
use crate::object::ObjectRef;
use content_inspector::ContentInspector;
use rand::SeedableRng;
use report::Report;
use std::collections::{HashMap, HashSet};
use table::TableRecord;

/// Fatal errors that abort analysis outright. Everything else (a malformed
/// substructure, an unresolvable kid, an indeterminate heuristic) is
/// absorbed into the result map or memo instead of propagating here.
#[derive(Debug, thiserror::Error)]
pub enum PdfWamProcessingError {
    /// The document is encrypted and the supplied password (if any) did not
    /// authenticate against it.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// The document uses an encryption algorithm/revision the underlying
    /// facade does not implement.
    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The document could not be parsed at all (bad header, unreadable
    /// xref, truncated file).
    #[error("unreadable PDF: {0}")]
    UnreadablePdf(String),

    /// An internal invariant was violated; this should not happen for any
    /// well-formed input and indicates a bug rather than a malformed PDF.
    #[error("internal analyzer error: {0}")]
    Internal(String),
}

/// A location within the indicator result map: `(page, element_index)`.
/// `page` is 1-based, or `0` for "unknown / whole document".
pub type Location = (u32, u32);

/// The value recorded at one indicator/location pair.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    /// Pass/fail status: `0` fail, `1` pass.
    Status(i32),
    /// A metadata string (used only by the `EGOVMON.PDF.PROP.*` family).
    Text(String),
}

/// Per-indicator location -> value mapping.
pub type LocationMap = HashMap<Location, IndicatorValue>;

/// The full indicator result map: indicator id -> location map.
pub type ResultMap = HashMap<String, LocationMap>;

/// The outcome of one dispatched WCAG test.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    /// A single pass/fail/not-applicable status (`0`, `1`, `2`).
    Status(i32),
    /// Per-occurrence counts, folded from a `{page: [items]}` mapping.
    Counts {
        /// Total failing occurrences.
        fail: u32,
        /// Total passing occurrences.
        pass: u32,
    },
}

/// Short-test-id -> outcome memo, consulted by the reporter.
pub type Memo = HashMap<String, TestOutcome>;

/// All mutable state accumulated across a single document's analysis.
pub struct AnalyzerState {
    pub(crate) config: AnalyzerConfig,
    pub(crate) result_map: ResultMap,
    pub(crate) element_count: u32,
    pub(crate) figure_set: HashSet<ObjectRef>,
    pub(crate) link_index: HashMap<ObjectRef, ObjectRef>,
    pub(crate) tables: HashMap<ObjectRef, TableRecord>,
    pub(crate) table_stack: Vec<ObjectRef>,
    pub(crate) failed_images: HashMap<u32, Vec<ObjectRef>>,
    pub(crate) memo: Memo,
    pub(crate) struct_tree_exists: bool,
    pub(crate) role_map: HashMap<String, String>,
    /// `(page, level)` pairs for every `/H1`-`/H9` element, in traversal
    /// order, consulted by the `wcag.pdf.09` heading-level test.
    pub(crate) headers: Vec<(u32, u8)>,
}

impl AnalyzerState {
    fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            result_map: ResultMap::new(),
            element_count: 0,
            figure_set: HashSet::new(),
            link_index: HashMap::new(),
            tables: HashMap::new(),
            table_stack: Vec::new(),
            failed_images: HashMap::new(),
            memo: Memo::new(),
            struct_tree_exists: false,
            role_map: HashMap::new(),
            headers: Vec::new(),
        }
    }

    /// Resolve `struct_type` through the role map, if it names a
    /// non-standard structure type.
    pub(crate) fn resolve_role(&self, struct_type: &str) -> String {
        let mut current = struct_type.to_string();
        let mut hops = 0;
        while let Some(mapped) = self.role_map.get(&current) {
            if mapped == &current || hops > 16 {
                break;
            }
            current = mapped.clone();
            hops += 1;
        }
        current
    }

    pub(crate) fn set_indicator(&mut self, indicator: &str, location: Location, value: IndicatorValue) {
        self.result_map.entry(indicator.to_string()).or_default().insert(location, value);
    }
}

const EGOVMON_METADATA_FIELDS: [&str; 6] = ["Creator", "Producer", "Author", "Title", "CreationDate", "ModDate"];

/// Run the full accessibility analysis on an already-opened document.
///
/// `password` authenticates an encrypted document; pass `None` for an
/// unencrypted one. Returns a fatal [`PdfWamProcessingError`] only for
/// decryption/header/facade-level failures; every other anomaly is folded
/// into the returned report as a failing or not-applicable indicator.
pub fn analyze(
    mut doc: PdfDocument,
    password: Option<&[u8]>,
    config: AnalyzerConfig,
) -> Result<Report, PdfWamProcessingError> {
    let is_encrypted = doc.encryption_handler().is_some();
    if is_encrypted {
        let authenticated = doc
            .authenticate(password.unwrap_or(b""))
            .map_err(|e| PdfWamProcessingError::DecryptionFailed(e.to_string()))?;
        if !authenticated {
            return Err(PdfWamProcessingError::DecryptionFailed(
                "password did not authenticate against the document".to_string(),
            ));
        }
    }

    let mut state = AnalyzerState::new(config);

    for field in EGOVMON_METADATA_FIELDS {
        if let Ok(Some(value)) = doc.metadata(field) {
            state.set_indicator(&format!("EGOVMON.PDF.PROP.{field}"), (0, 0), IndicatorValue::Text(value));
        }
    }

    let catalog = doc
        .catalog()
        .map_err(|e| PdfWamProcessingError::UnreadablePdf(e.to_string()))?;
    let catalog_dict = catalog.as_dict().cloned().unwrap_or_default();

    let struct_tree_root = catalog_dict
        .get("StructTreeRoot")
        .map(|obj| doc.resolve_object(obj).unwrap_or(crate::object::Object::Null));

    if let Some(root) = &struct_tree_root {
        if let Some(root_dict) = root.as_dict() {
            state.struct_tree_exists = !root_dict.is_empty();

            if let Some(role_map_obj) = root_dict.get("RoleMap") {
                let role_map_obj = doc.resolve_object(role_map_obj).unwrap_or(crate::object::Object::Null);
                if let Some(rm) = role_map_obj.as_dict() {
                    for (k, v) in rm {
                        if let Some(name) = v.as_name() {
                            state.role_map.insert(k.clone(), name.to_string());
                        }
                    }
                }
            }
        }
    }

    let bookmarks_present = doc
        .get_outline()
        .ok()
        .flatten()
        .map(|items| !items.is_empty())
        .unwrap_or(false);
    state.memo.insert(
        "wcag.pdf.02".to_string(),
        TestOutcome::Status(if bookmarks_present { 1 } else { 0 }),
    );

    if let Some(root) = &struct_tree_root {
        if root.as_dict().is_some() {
            walker::walk(&mut doc, &mut state, root);
        }
    }

    let mut inspector = ContentInspector::new();
    let mut rng = StdRngSeeded::new();
    wcag::run_battery(&mut doc, &mut state, &mut inspector, &mut rng.0);

    Ok(report::build(state))
}

struct StdRngSeeded(rand::rngs::StdRng);

impl StdRngSeeded {
    fn new() -> Self {
        Self(rand::rngs::StdRng::seed_from_u64(0x5047_5746_4d41))
    }
}
