//! Schema of a data table, computed without running the computation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of the cells in one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
  Int,
  Double,
  Text,
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ColumnType::Int => "int",
      ColumnType::Double => "double",
      ColumnType::Text => "text",
    };
    write!(f, "{s}")
  }
}

/// One named, typed column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
  pub name: String,
  pub column_type: ColumnType,
}

impl ColumnSpec {
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self {
      name: name.into(),
      column_type,
    }
  }
}

/// Schema of a data table: an ordered list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
  columns: Vec<ColumnSpec>,
}

impl TableSpec {
  pub fn new(columns: Vec<ColumnSpec>) -> Self {
    Self { columns }
  }

  /// A spec with no columns.
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn num_columns(&self) -> usize {
    self.columns.len()
  }

  pub fn column(&self, index: usize) -> Option<&ColumnSpec> {
    self.columns.get(index)
  }

  pub fn columns(&self) -> &[ColumnSpec] {
    &self.columns
  }

  /// Whether two specs describe the same structure (same column names and
  /// types, in the same order).
  pub fn equal_structure(&self, other: &TableSpec) -> bool {
    self.columns == other.columns
  }
}
