//! Integration coverage for the report's JSON shape as seen by a consumer
//! of the library, not just the in-crate unit tests.

use pdf_wam::analyzer::report::{Report, ResultRow, Status, Summary};
use std::collections::HashMap;

#[test]
fn simple_status_serializes_as_a_bare_string() {
    let row = ResultRow {
        test: "wcag.pdf.18".to_string(),
        status: Status::Simple("Pass".to_string()),
        description: "Document must have a title".to_string(),
    };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["Status"], serde_json::json!("Pass"));
}

#[test]
fn counts_status_serializes_as_an_object() {
    let row = ResultRow {
        test: "wcag.pdf.06".to_string(),
        status: Status::Counts { fail: 1, pass: 4 },
        description: "Tables must use correct row/header/cell structure".to_string(),
    };
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["Status"], serde_json::json!({"Fail": 1, "Pass": 4}));
}

#[test]
fn report_preserves_field_names_and_totals() {
    let report = Report {
        result: vec![
            ResultRow {
                test: "wcag.pdf.01".to_string(),
                status: Status::Counts { fail: 0, pass: 1 },
                description: "Images must have alternate text or equivalent marked as Artifact".to_string(),
            },
            ResultRow {
                test: "wcag.pdf.16".to_string(),
                status: Status::Simple("Fail".to_string()),
                description: "Document must declare a natural language".to_string(),
            },
        ],
        summary: Summary { total: 2, fail: 1, pass: 1 },
        result_map: HashMap::new(),
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"]["Total"], serde_json::json!(2));
    assert_eq!(json["summary"]["Fail"], serde_json::json!(1));
    assert_eq!(json["result"][0]["Test"], serde_json::json!("wcag.pdf.01"));
    assert_eq!(json["result"][1]["Status"], serde_json::json!("Fail"));
}

#[test]
fn result_map_carries_metadata_and_composite_locations() {
    let mut locations = HashMap::new();
    locations.insert(
        "0,0".to_string(),
        pdf_wam::analyzer::report::WireIndicatorValue::Text("Acme Suite".to_string()),
    );
    let mut result_map = HashMap::new();
    result_map.insert("EGOVMON.PDF.PROP.Producer".to_string(), locations);

    let report = Report {
        result: Vec::new(),
        summary: Summary { total: 0, fail: 0, pass: 0 },
        result_map,
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["result_map"]["EGOVMON.PDF.PROP.Producer"]["0,0"], serde_json::json!("Acme Suite"));
}
