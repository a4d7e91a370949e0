//! Error taxonomy of the lifecycle engine.
//!
//! Recoverable faults are explicit `Result` values at the model seam and are
//! absorbed into [crate::types::NodeStatus] values by the coordinator;
//! process aborts (panics) are reserved for true precondition violations.

use std::path::PathBuf;
use thiserror::Error;

/// Cooperative cancellation was requested through the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("execution canceled")]
pub struct CanceledError;

/// Failure reported by a model's spec inference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigureFailure {
  /// Settings or inputs do not allow configuration yet (recoverable).
  #[error("{0}")]
  InvalidSettings(String),
  /// The model violated its contract; reported and logged as a coding
  /// defect, never propagated to the caller.
  #[error("{0}")]
  Internal(String),
}

/// Failure reported by a model's compute function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteFailure {
  #[error("execution canceled")]
  Canceled,
  #[error("{0}")]
  Failed(String),
}

impl From<CanceledError> for ExecuteFailure {
  fn from(_: CanceledError) -> Self {
    ExecuteFailure::Canceled
  }
}

/// Typed access failure on a settings tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
  #[error("missing settings key: {0}")]
  MissingKey(String),
  #[error("settings key {key} has the wrong type (expected {expected})")]
  WrongType { key: String, expected: &'static str },
  #[error("invalid value for settings key {key}: {reason}")]
  InvalidValue { key: String, reason: String },
}

/// Failure while producing or materializing a data table.
#[derive(Debug, Error)]
pub enum TableError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("row has {got} cells, the table spec has {expected} columns")]
  RowShape { expected: usize, got: usize },
  #[error("cell does not fit column {column} of type {expected}")]
  CellType { column: String, expected: String },
}

/// I/O fault while saving or loading node state. Surfaced as status values;
/// never corrupts the in-memory state it was loading into.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("malformed settings document: {0}")]
  Xml(String),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error(transparent)]
  Settings(#[from] SettingsError),
  #[error(transparent)]
  Table(#[from] TableError),
  #[error("model fault during persistence: {0}")]
  ModelFault(String),
  #[error("node directory not readable: {}", .0.display())]
  MissingDirectory(PathBuf),
  #[error(transparent)]
  Canceled(#[from] CanceledError),
}
