//! Cancellation-aware context threaded through a node's execute phase.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{CanceledError, TableError};
use crate::types::{DataTable, MemoryPolicy, Row, TableSpec};

/// Cell count above which `CacheSmallInMemory` spills a closed container.
pub const MAX_CELLS_IN_MEMORY: usize = 100_000;

/// Handle through which the workflow driver requests cooperative
/// cancellation of a running execute.
#[derive(Debug, Clone)]
pub struct CancelHandle {
  flag: Arc<AtomicBool>,
}

impl CancelHandle {
  pub fn request(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }
}

#[derive(Debug, Default)]
struct Progress {
  fraction: f64,
  message: Option<String>,
}

/// Execution context handed to a model's compute function.
///
/// Carries the cooperative cancel flag (checked by models periodically, not
/// preemptive), coarse progress, and a factory for output tables honoring
/// the producing node's memory policy. Tables created through the context
/// are tracked; whatever the model does not hand back as an output becomes a
/// temporary artifact of the node, released on reset.
pub struct ExecutionContext {
  canceled: Arc<AtomicBool>,
  progress: Mutex<Progress>,
  policy: MemoryPolicy,
  spill_dir: Option<PathBuf>,
  spill_threshold: usize,
  created: Mutex<Vec<Arc<DataTable>>>,
  spill_counter: AtomicU64,
}

impl ExecutionContext {
  /// A context producing tables under `policy`. Without a spill directory
  /// every table stays in memory regardless of policy.
  pub fn new(policy: MemoryPolicy, spill_dir: Option<PathBuf>) -> Self {
    Self {
      canceled: Arc::new(AtomicBool::new(false)),
      progress: Mutex::new(Progress::default()),
      policy,
      spill_dir,
      spill_threshold: MAX_CELLS_IN_MEMORY,
      created: Mutex::new(Vec::new()),
      spill_counter: AtomicU64::new(0),
    }
  }

  /// Overrides the `CacheSmallInMemory` spill threshold (cell count).
  pub fn with_spill_threshold(mut self, cells: usize) -> Self {
    self.spill_threshold = cells;
    self
  }

  pub fn cancel_handle(&self) -> CancelHandle {
    CancelHandle {
      flag: Arc::clone(&self.canceled),
    }
  }

  /// Errs once cancellation has been requested. Models call this
  /// periodically inside long computations.
  pub fn check_canceled(&self) -> Result<(), CanceledError> {
    if self.canceled.load(Ordering::SeqCst) {
      Err(CanceledError)
    } else {
      Ok(())
    }
  }

  pub fn set_progress(&self, fraction: f64, message: impl Into<String>) {
    let mut p = self.progress.lock().unwrap();
    p.fraction = fraction.clamp(0.0, 1.0);
    p.message = Some(message.into());
  }

  pub fn progress(&self) -> (f64, Option<String>) {
    let p = self.progress.lock().unwrap();
    (p.fraction, p.message.clone())
  }

  pub fn memory_policy(&self) -> MemoryPolicy {
    self.policy
  }

  /// Opens a container for building one output table under this context's
  /// memory policy.
  pub fn create_container(&self, spec: TableSpec) -> DataContainer<'_> {
    DataContainer {
      ctx: self,
      spec,
      rows: Vec::new(),
    }
  }

  /// Drains the tables created through this context since the last call.
  pub(crate) fn take_created(&self) -> Vec<Arc<DataTable>> {
    std::mem::take(&mut *self.created.lock().unwrap())
  }

  fn register(&self, table: &Arc<DataTable>) {
    self.created.lock().unwrap().push(Arc::clone(table));
  }

  fn next_spill_path(&self) -> Option<PathBuf> {
    let dir = self.spill_dir.as_ref()?;
    let n = self.spill_counter.fetch_add(1, Ordering::SeqCst);
    Some(dir.join(format!("container_{n}.json")))
  }

  fn should_spill(&self, rows: usize, columns: usize) -> bool {
    match self.policy {
      MemoryPolicy::CacheInMemory => false,
      MemoryPolicy::CacheOnDisc => true,
      MemoryPolicy::CacheSmallInMemory => rows * columns > self.spill_threshold,
    }
  }
}

/// Accumulates rows for one output table; [DataContainer::close] seals it.
pub struct DataContainer<'a> {
  ctx: &'a ExecutionContext,
  spec: TableSpec,
  rows: Vec<Row>,
}

impl DataContainer<'_> {
  pub fn spec(&self) -> &TableSpec {
    &self.spec
  }

  /// Appends a row after checking it against the spec.
  pub fn add_row(&mut self, row: Row) -> Result<(), TableError> {
    if row.cells.len() != self.spec.num_columns() {
      return Err(TableError::RowShape {
        expected: self.spec.num_columns(),
        got: row.cells.len(),
      });
    }
    for (cell, column) in row.cells.iter().zip(self.spec.columns()) {
      if !cell.fits(column.column_type) {
        return Err(TableError::CellType {
          column: column.name.clone(),
          expected: column.column_type.to_string(),
        });
      }
    }
    self.rows.push(row);
    Ok(())
  }

  /// Seals the container into a table, spilling to disc when the memory
  /// policy asks for it and a spill directory is available.
  pub fn close(self) -> Result<Arc<DataTable>, TableError> {
    let columns = self.spec.num_columns();
    let spill = self.ctx.should_spill(self.rows.len(), columns);
    let table = if spill {
      match self.ctx.next_spill_path() {
        Some(path) => {
          if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
          }
          let file = std::fs::File::create(&path)?;
          serde_json::to_writer(std::io::BufWriter::new(file), &self.rows)?;
          DataTable::spilled(self.spec, path, self.rows.len())
        }
        None => {
          debug!("no spill directory available, keeping table in memory");
          DataTable::in_memory(self.spec, self.rows)
        }
      }
    } else {
      DataTable::in_memory(self.spec, self.rows)
    };
    let table = Arc::new(table);
    self.ctx.register(&table);
    Ok(table)
  }
}
