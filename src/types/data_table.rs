//! Tabular payload exchanged between nodes through data ports.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use crate::error::TableError;

use super::{ColumnType, TableSpec};

/// One cell of a data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
  Int(i64),
  Double(f64),
  Text(String),
  Missing,
}

impl Cell {
  /// Whether this cell can live in a column of the given type. Missing cells
  /// fit every column.
  pub fn fits(&self, column_type: ColumnType) -> bool {
    matches!(
      (self, column_type),
      (Cell::Int(_), ColumnType::Int)
        | (Cell::Double(_), ColumnType::Double)
        | (Cell::Text(_), ColumnType::Text)
        | (Cell::Missing, _)
    )
  }
}

/// One keyed row of a data table. Row keys are what the hilite routing
/// marks refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
  pub key: String,
  pub cells: Vec<Cell>,
}

impl Row {
  pub fn new(key: impl Into<String>, cells: Vec<Cell>) -> Self {
    Self {
      key: key.into(),
      cells,
    }
  }
}

/// Where a table's rows live.
#[derive(Debug)]
enum Backing {
  Memory(Vec<Row>),
  /// Rows were spilled to a JSON file under a spill directory. The file is
  /// removed when the last handle to the table is dropped.
  Spilled { path: PathBuf, row_count: usize },
}

/// Tabular payload: a spec plus rows, held in memory or spilled to disc
/// according to the producing node's memory policy.
#[derive(Debug)]
pub struct DataTable {
  spec: TableSpec,
  backing: Backing,
}

impl DataTable {
  /// A table holding its rows in memory.
  pub fn in_memory(spec: TableSpec, rows: Vec<Row>) -> Self {
    Self {
      spec,
      backing: Backing::Memory(rows),
    }
  }

  /// A table whose rows were spilled to `path` (a JSON array of rows).
  pub(crate) fn spilled(spec: TableSpec, path: PathBuf, row_count: usize) -> Self {
    Self {
      spec,
      backing: Backing::Spilled { path, row_count },
    }
  }

  pub fn spec(&self) -> &TableSpec {
    &self.spec
  }

  pub fn row_count(&self) -> usize {
    match &self.backing {
      Backing::Memory(rows) => rows.len(),
      Backing::Spilled { row_count, .. } => *row_count,
    }
  }

  pub fn is_spilled(&self) -> bool {
    matches!(self.backing, Backing::Spilled { .. })
  }

  /// Materializes the rows. For spilled tables this reads the spill file.
  pub fn rows(&self) -> Result<Vec<Row>, TableError> {
    match &self.backing {
      Backing::Memory(rows) => Ok(rows.clone()),
      Backing::Spilled { path, .. } => {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
      }
    }
  }

  /// Writes the rows as a JSON array to `path`.
  pub(crate) fn write_rows(&self, path: &std::path::Path) -> Result<(), TableError> {
    let rows = self.rows()?;
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &rows)?;
    Ok(())
  }
}

impl Drop for DataTable {
  fn drop(&mut self) {
    if let Backing::Spilled { path, .. } = &self.backing {
      let _ = std::fs::remove_file(path);
    }
  }
}
