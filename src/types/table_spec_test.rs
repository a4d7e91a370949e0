//! Tests for `TableSpec`.

use super::{ColumnSpec, ColumnType, TableSpec};

fn spec(cols: &[(&str, ColumnType)]) -> TableSpec {
  TableSpec::new(
    cols
      .iter()
      .map(|(n, t)| ColumnSpec::new(*n, *t))
      .collect(),
  )
}

#[test]
fn empty_spec_has_no_columns() {
  assert_eq!(TableSpec::empty().num_columns(), 0);
}

#[test]
fn column_lookup() {
  let s = spec(&[("a", ColumnType::Int), ("b", ColumnType::Text)]);
  assert_eq!(s.num_columns(), 2);
  assert_eq!(s.column(0).unwrap().name, "a");
  assert_eq!(s.column(1).unwrap().column_type, ColumnType::Text);
  assert!(s.column(2).is_none());
}

#[test]
fn equal_structure_matches_identical_specs() {
  let a = spec(&[("x", ColumnType::Double)]);
  let b = spec(&[("x", ColumnType::Double)]);
  assert!(a.equal_structure(&b));
}

#[test]
fn equal_structure_rejects_renamed_column() {
  let a = spec(&[("x", ColumnType::Double)]);
  let b = spec(&[("y", ColumnType::Double)]);
  assert!(!a.equal_structure(&b));
}

#[test]
fn equal_structure_rejects_retyped_column() {
  let a = spec(&[("x", ColumnType::Double)]);
  let b = spec(&[("x", ColumnType::Int)]);
  assert!(!a.equal_structure(&b));
}

#[test]
fn equal_structure_rejects_different_arity() {
  let a = spec(&[("x", ColumnType::Int)]);
  let b = spec(&[("x", ColumnType::Int), ("y", ColumnType::Int)]);
  assert!(!a.equal_structure(&b));
}
