//! Integration coverage for the table structural-validity state machine as
//! a reader of the structure tree would drive it: one record per physical
//! `/Table`, fed rows and cells in document order.

use pdf_wam::analyzer::table::{TableAlphabet, TableRecord};
use pdf_wam::object::ObjectRef;

fn r(id: u32) -> ObjectRef {
    ObjectRef::new(id, 0)
}

#[test]
fn well_formed_two_by_two_table_stays_valid() {
    let mut record = TableRecord::new(r(1), Some(1));

    record.add(r(2), TableAlphabet::Tr);
    record.add(r(3), TableAlphabet::Th);
    record.add(r(4), TableAlphabet::Th);
    record.add(r(5), TableAlphabet::Tr);
    record.add(r(6), TableAlphabet::Td);
    record.add(r(7), TableAlphabet::Td);

    assert!(!record.invalid);
    assert_eq!(record.current, r(7));
}

#[test]
fn a_cell_before_any_row_invalidates_permanently() {
    let mut record = TableRecord::new(r(10), Some(2));
    record.add(r(11), TableAlphabet::Td);
    assert!(record.invalid);

    // Once invalid, later well-formed-looking transitions do not reset it.
    record.add(r(12), TableAlphabet::Tr);
    record.add(r(13), TableAlphabet::Th);
    assert!(record.invalid);
    assert_eq!(record.current, r(11));
}

#[test]
fn nested_table_opens_a_fresh_validation_scope() {
    let mut record = TableRecord::new(r(20), Some(3));
    record.add(r(21), TableAlphabet::Tr);
    record.add(r(22), TableAlphabet::Th);

    // A /Table nested inside a cell resets current/level/invalid.
    record.add(r(23), TableAlphabet::Table);
    assert!(!record.invalid);
    assert_eq!(record.level, 0);

    record.add(r(24), TableAlphabet::Tr);
    assert_eq!(record.level, 1);
    assert!(!record.invalid);
}
