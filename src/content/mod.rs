//! PDF content stream tokenization.
//!
//! Content streams are parsed into raw `(operands, operator)` pairs rather
//! than a semantically-typed operator enum. Every consumer of this module
//! reasons about operand arity and raw operand values directly (artifact
//! marked-content grouping, text-matrix column detection, operand-arity
//! validation), so a richer operator model would just be dead weight.
//!
//! Phase 4

use crate::object::Object;
use crate::parser::parse_object;
use nom::IResult;
use nom::bytes::complete::take_while1;
use nom::character::complete::multispace0;

/// One `operands operator` unit from a content stream, e.g. `100 700 Td`
/// becomes `operands = [100, 700]`, `operator = "Td"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    /// Operands preceding the operator, in source order.
    pub operands: Vec<Object>,
    /// Operator keyword (e.g. `"Tj"`, `"BMC"`, `"q"`).
    pub operator: String,
}

/// Tokenize a (already filter-decoded) content stream into raw operator
/// units. Resilient to malformed input: unparsable bytes are skipped one at
/// a time so a single corrupt region doesn't abort the whole stream.
pub fn tokenize_content_stream(data: &[u8]) -> Vec<ContentOp> {
    let mut ops = Vec::new();
    let mut input = data;

    loop {
        if let Ok((rest, _)) = multispace0::<&[u8], nom::error::Error<&[u8]>>(input) {
            input = rest;
        }
        if input.is_empty() {
            break;
        }

        match parse_one(input) {
            Ok((rest, Some(op))) => {
                ops.push(op);
                input = rest;
            },
            Ok((rest, None)) => {
                // Inline image (BI...ID...EI): contributes no meaningful operands.
                input = rest;
            },
            Err(_) => {
                if input.len() > 1 {
                    input = &input[1..];
                } else {
                    break;
                }
            },
        }
    }

    ops
}

fn parse_one(input: &[u8]) -> IResult<&[u8], Option<ContentOp>> {
    let mut operands = Vec::new();
    let mut remaining = input;

    loop {
        let (inp, _) = multispace0(remaining)?;
        remaining = inp;

        if remaining.is_empty() {
            return Err(nom::Err::Error(nom::error::Error::new(
                remaining,
                nom::error::ErrorKind::Eof,
            )));
        }

        if is_operator_start(remaining[0]) {
            let (rest, name) = parse_operator_name(remaining)?;

            if name == "BI" {
                let rest = skip_inline_image(rest);
                return Ok((rest, None));
            }

            return Ok((
                rest,
                Some(ContentOp {
                    operands,
                    operator: name.to_string(),
                }),
            ));
        }

        let (inp, obj) = parse_object(remaining)?;
        operands.push(obj);
        remaining = inp;
    }
}

fn is_operator_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'\'' || byte == b'"' || byte == b'*'
}

fn parse_operator_name(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, name_bytes) =
        take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'\'' || c == b'"' || c == b'*')(
            input,
        )?;
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))?;
    Ok((input, name))
}

/// Skip over an inline image's binary payload, which may contain byte
/// sequences that look like PDF syntax. We don't need the pixel data for
/// any check in this analyzer, only that it doesn't derail tokenization.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    if let Some(pos) = find_ei(input) {
        &input[pos + 2..]
    } else {
        &[]
    }
}

fn find_ei(data: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < data.len() {
        if data[i] == b'E' && data[i + 1] == b'I' {
            let before_ok = i == 0 || data[i - 1].is_ascii_whitespace();
            let after_ok = i + 2 >= data.len() || data[i + 2].is_ascii_whitespace();
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_stream() {
        let stream = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
        let ops = tokenize_content_stream(stream);
        let names: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(names, vec!["BT", "Tf", "Td", "Tj", "ET"]);
        assert_eq!(ops[3].operands[0].as_string(), Some(&b"Hello"[..]));
    }

    #[test]
    fn tokenizes_artifact_marker() {
        let stream = b"/Artifact BMC q 1 0 0 1 0 0 cm Q EMC";
        let ops = tokenize_content_stream(stream);
        assert_eq!(ops[0].operator, "BMC");
        assert_eq!(ops[0].operands[0].as_name(), Some("Artifact"));
        assert_eq!(ops.last().unwrap().operator, "EMC");
    }

    #[test]
    fn skips_inline_image_payload() {
        let stream = b"BI /W 1 /H 1 ID \xff\xd8\xff EI Q";
        let ops = tokenize_content_stream(stream);
        let names: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(names, vec!["Q"]);
    }

    #[test]
    fn recovers_from_malformed_bytes() {
        let stream = b"\x00\x01 q Q";
        let ops = tokenize_content_stream(stream);
        let names: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(names, vec!["q", "Q"]);
    }
}
