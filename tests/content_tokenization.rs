//! Integration coverage for content-stream tokenization as consumed from
//! outside the crate (the analyzer's view of the facade).

use pdf_wam::content::tokenize_content_stream;

#[test]
fn tokenizes_artifact_region_with_nested_marked_content() {
    let stream = b"q\n/Artifact BMC\nBT /P1 1 Tf (hi) Tj ET\nEMC\nQ";
    let ops = tokenize_content_stream(stream);

    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert!(operators.contains(&"BMC"));
    assert!(operators.contains(&"Tj"));
    assert!(operators.contains(&"EMC"));

    let bmc = ops.iter().find(|op| op.operator == "BMC").unwrap();
    assert_eq!(bmc.operands.len(), 1);
    assert_eq!(bmc.operands[0].as_name(), Some("Artifact"));
}

#[test]
fn recovers_past_inline_image_payload() {
    let stream = b"q\nBI /W 1 /H 1 /BPC 8 ID \x00\x01\x02 EI\nQ\n100 700 Td";
    let ops = tokenize_content_stream(stream);
    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert!(operators.contains(&"Td"));
}
