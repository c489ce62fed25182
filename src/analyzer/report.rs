//! Folds the analyzer's memo and indicator result map into the JSON report
//! shape consumed by callers.

use super::{AnalyzerState, IndicatorValue, ResultMap, TestOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A test's reported status: a simple pass/fail, or per-occurrence counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    /// `"Pass"` or `"Fail"`.
    Simple(String),
    /// `{"Fail": f, "Pass": p}`.
    Counts {
        /// Failing occurrence count.
        #[serde(rename = "Fail")]
        fail: u32,
        /// Passing occurrence count.
        #[serde(rename = "Pass")]
        pass: u32,
    },
}

impl Status {
    fn pass() -> Self {
        Self::Simple("Pass".to_string())
    }

    fn fail() -> Self {
        Self::Simple("Fail".to_string())
    }

    fn contributes(&self) -> (u32, u32) {
        match self {
            Status::Simple(s) if s == "Pass" => (0, 1),
            Status::Simple(_) => (1, 0),
            Status::Counts { fail, pass } => (*fail, *pass),
        }
    }
}

impl From<&TestOutcome> for Status {
    fn from(outcome: &TestOutcome) -> Self {
        match outcome {
            // not-applicable (2) is treated as pass by the reporter.
            TestOutcome::Status(s) if *s != 0 => Status::pass(),
            TestOutcome::Status(_) => Status::fail(),
            TestOutcome::Counts { fail, pass } => Status::Counts { fail: *fail, pass: *pass },
        }
    }
}

/// One row of the report's `result` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// Short test id, e.g. `wcag.pdf.06`.
    #[serde(rename = "Test")]
    pub test: String,
    /// The test's outcome.
    #[serde(rename = "Status")]
    pub status: Status,
    /// Fixed human-readable description of the criterion.
    #[serde(rename = "Description")]
    pub description: String,
}

/// Test-level totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of tests with a reported outcome.
    #[serde(rename = "Total")]
    pub total: u32,
    /// Total failing occurrences/tests.
    #[serde(rename = "Fail")]
    pub fail: u32,
    /// Total passing occurrences/tests.
    #[serde(rename = "Pass")]
    pub pass: u32,
}

/// An indicator's recorded value at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireIndicatorValue {
    /// `0` fail, `1` pass.
    Status(i32),
    /// A metadata string.
    Text(String),
}

impl From<&IndicatorValue> for WireIndicatorValue {
    fn from(value: &IndicatorValue) -> Self {
        match value {
            IndicatorValue::Status(s) => WireIndicatorValue::Status(*s),
            IndicatorValue::Text(t) => WireIndicatorValue::Text(t.clone()),
        }
    }
}

/// The raw indicator mapping, flattened for serialization: indicator id ->
/// `"page,count"` location -> value. A composite `(page, element_index)`
/// key cannot serialize to JSON directly, so it is rendered as the string
/// the location pair would print as.
pub type WireResultMap = HashMap<String, HashMap<String, WireIndicatorValue>>;

fn flatten_result_map(result_map: &ResultMap) -> WireResultMap {
    result_map
        .iter()
        .map(|(indicator, locations)| {
            let flattened: HashMap<String, WireIndicatorValue> = locations
                .iter()
                .map(|(&(page, count), value)| (format!("{page},{count}"), value.into()))
                .collect();
            (indicator.clone(), flattened)
        })
        .collect()
}

/// The analyzer's final output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Per-test outcomes, one row per applicable test.
    pub result: Vec<ResultRow>,
    /// Test-level totals.
    pub summary: Summary,
    /// The raw per-indicator, per-location mapping (including the
    /// `EGOVMON.PDF.PROP.*` metadata carriers), flattened for serialization.
    pub result_map: WireResultMap,
}

fn descriptions() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("wcag.pdf.01", "Images must have alternate text or equivalent marked as Artifact"),
        ("wcag.pdf.02", "Document should contain bookmarks for navigation"),
        ("wcag.pdf.03", "Tab order must follow document structure order"),
        ("wcag.pdf.04", "Decorative images must be marked as Artifact"),
        ("wcag.pdf.06", "Tables must use correct row/header/cell structure"),
        ("wcag.pdf.09", "Heading levels must not skip a level"),
        ("wcag.pdf.sc244", "Hyperlinks must be accessible and have alternate text"),
        ("wcag.pdf.10", "Form fields must reference an associated widget annotation"),
        ("wcag.pdf.12", "Form fields must expose a name and a value"),
        ("wcag.pdf.15", "Submit buttons must expose an accessible action"),
        ("wcag.pdf.16", "Document must declare a natural language"),
        ("wcag.pdf.17", "Page labels must be well-formed"),
        ("wcag.pdf.18", "Document must have a title"),
        ("egovmon.pdf.03", "Document must be tagged"),
        ("egovmon.pdf.05", "Encrypted document must permit assistive technology"),
        ("egovmon.pdf.08", "Document must not be a scanned image"),
    ])
}

const FIGURE_ALT_INDICATOR: &str = "EIAO.A.10.1.1.4.PDF.1.1";
const FIGURE_ACTUAL_TEXT_INDICATOR: &str = "EIAO.A.10.1.1.4.PDF.2.1";
const FORM_INDICATOR: &str = "EIAO.A.15.2.1.4.PDF.4.1";

/// Fold analyzer state into the final report. Synthesizes `wcag.pdf.01` from
/// the raw `/Alt`/`/ActualText` figure indicators (a figure passes if either
/// is present) and `wcag.pdf.sc244` from the `wcag.pdf.11`/`wcag.pdf.13`
/// memo entries, per the combination rule in the test battery.
pub fn build(mut state: AnalyzerState) -> Report {
    fold_figure_indicator(&mut state);
    fold_form_indicator(&mut state);
    fold_sc244(&mut state);

    let descriptions = descriptions();
    let mut result = Vec::new();
    let mut total_fail = 0u32;
    let mut total_pass = 0u32;

    let mut ids: Vec<&String> = state.memo.keys().collect();
    ids.sort();

    for id in ids {
        let outcome = &state.memo[id];
        let status: Status = outcome.into();
        let (fail, pass) = status.contributes();
        total_fail += fail;
        total_pass += pass;

        let description = descriptions.get(id.as_str()).copied().unwrap_or("").to_string();
        result.push(ResultRow { test: id.clone(), status, description });
    }

    let result_map = flatten_result_map(&state.result_map);

    Report {
        result,
        summary: Summary { total: total_fail + total_pass, fail: total_fail, pass: total_pass },
        result_map,
    }
}

fn fold_figure_indicator(state: &mut AnalyzerState) {
    let alt_entries = state.result_map.get(FIGURE_ALT_INDICATOR).cloned().unwrap_or_default();
    let actual_entries = state.result_map.get(FIGURE_ACTUAL_TEXT_INDICATOR).cloned().unwrap_or_default();

    if alt_entries.is_empty() && actual_entries.is_empty() {
        return;
    }

    let mut locations: Vec<_> = alt_entries.keys().chain(actual_entries.keys()).copied().collect();
    locations.sort_unstable();
    locations.dedup();

    let mut fail = 0u32;
    let mut pass = 0u32;
    for loc in locations {
        let has_alt = matches!(alt_entries.get(&loc), Some(super::IndicatorValue::Status(1)));
        let has_actual = matches!(actual_entries.get(&loc), Some(super::IndicatorValue::Status(1)));
        if has_alt || has_actual {
            pass += 1;
        } else {
            fail += 1;
        }
    }

    state.memo.insert("wcag.pdf.01".to_string(), TestOutcome::Counts { fail, pass });
}

fn fold_form_indicator(state: &mut AnalyzerState) {
    if let Some(entries) = state.result_map.get(FORM_INDICATOR) {
        if !entries.is_empty() {
            state.memo.insert("wcag.pdf.10".to_string(), TestOutcome::Status(0));
        }
    }
}

fn fold_sc244(state: &mut AnalyzerState) {
    let t11 = state.memo.remove("wcag.pdf.11");
    let t13 = state.memo.remove("wcag.pdf.13");
    let (Some(TestOutcome::Counts { fail: fail11, pass: pass11 }), Some(TestOutcome::Counts { fail: fail13, pass: pass13 })) =
        (t11, t13)
    else {
        return;
    };

    state.memo.insert(
        "wcag.pdf.sc244".to_string(),
        TestOutcome::Counts { fail: fail11.min(fail13), pass: pass11.max(pass13) },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_json() {
        let pass = Status::pass();
        let json = serde_json::to_string(&pass).unwrap();
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(pass, back);

        let counts = Status::Counts { fail: 2, pass: 3 };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"Fail":2,"Pass":3}"#);
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(counts, back);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = Report {
            result: vec![ResultRow {
                test: "wcag.pdf.16".to_string(),
                status: Status::pass(),
                description: "Document must declare a natural language".to_string(),
            }],
            summary: Summary { total: 1, fail: 0, pass: 1 },
            result_map: HashMap::new(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back.result.len(), 1);
        assert_eq!(back.summary.pass, 1);
    }

    #[test]
    fn result_map_flattens_composite_location_keys() {
        let mut raw = ResultMap::new();
        let mut locations = HashMap::new();
        locations.insert((1u32, 2u32), IndicatorValue::Status(1));
        locations.insert((0u32, 1u32), IndicatorValue::Text("Acme".to_string()));
        raw.insert("EIAO.A.10.1.1.4.PDF.1.1".to_string(), locations);

        let wire = flatten_result_map(&raw);
        let entries = &wire["EIAO.A.10.1.1.4.PDF.1.1"];
        assert_eq!(entries["1,2"], WireIndicatorValue::Status(1));
        assert_eq!(entries["0,1"], WireIndicatorValue::Text("Acme".to_string()));
    }
}
