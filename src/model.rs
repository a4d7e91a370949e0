//! The user-supplied computation behind a node.

use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::{ConfigureFailure, ExecuteFailure, SettingsError};
use crate::hilite::HiliteHandler;
use crate::settings::Settings;
use crate::types::{DataTable, ModelContent, TableSpec};

/// Computation contract a node drives through its lifecycle.
///
/// Port counts are fixed for the lifetime of a model; the owning node sizes
/// its port arrays from them at construction. `configure` is the dry-run
/// phase that infers output schemas without computing data; `execute`
/// produces the actual payloads. Models report recoverable failures as
/// `Err` values; a panicking model is treated as a coding defect by the
/// owning node (caught, reported, never a crash).
pub trait NodeModel: Send {
  /// Number of data input ports.
  fn nr_data_ins(&self) -> usize;

  /// Number of data output ports.
  fn nr_data_outs(&self) -> usize;

  /// Number of model-content input ports.
  fn nr_model_ins(&self) -> usize {
    0
  }

  /// Number of model-content output ports.
  fn nr_model_outs(&self) -> usize {
    0
  }

  /// Infers output table specs from the input specs, given the current
  /// settings. Must return exactly `nr_data_outs()` specs.
  fn configure(&mut self, in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure>;

  /// Runs the computation. Must return exactly `nr_data_outs()` tables.
  /// Long computations check `ctx.check_canceled()` periodically.
  fn execute(
    &mut self,
    in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure>;

  /// Drops state derived from a previous execute.
  fn reset(&mut self) {}

  fn save_settings_to(&self, _settings: &mut Settings) {}

  fn load_settings_from(&mut self, _settings: &Settings) -> Result<(), SettingsError> {
    Ok(())
  }

  /// Checks a settings tree without committing any value.
  fn validate_settings(&self, _settings: &Settings) -> Result<(), SettingsError> {
    Ok(())
  }

  /// Receives the content arriving at a model input port; `None` means the
  /// upstream content is gone and the slot must be cleared. Implementations
  /// must tolerate `None`.
  fn load_model_content(
    &mut self,
    _port: usize,
    _content: Option<&ModelContent>,
  ) -> Result<(), SettingsError> {
    Ok(())
  }

  /// Produces the content for a model output port after a successful
  /// execute.
  fn save_model_content(&self, _port: usize) -> Result<ModelContent, SettingsError> {
    Ok(ModelContent::new("model"))
  }

  /// Persists private state below the node directory. Only I/O failures are
  /// contract-legal here.
  fn save_internals(&self, _dir: &Path) -> io::Result<()> {
    Ok(())
  }

  /// Restores private state persisted by [NodeModel::save_internals].
  fn load_internals(&mut self, _dir: &Path) -> io::Result<()> {
    Ok(())
  }

  /// Whether the node should execute immediately whenever possible. Such
  /// nodes are never persisted as executed; they re-execute after load.
  fn is_auto_executable(&self) -> bool {
    false
  }

  /// Drains a pending warning raised during the last configure/execute; the
  /// owning node turns it into a Warning status.
  fn take_warning_message(&mut self) -> Option<String> {
    None
  }

  /// The hilite handler arriving at a data input port changed.
  fn in_hilite_handler_changed(&mut self, _port: usize, _handler: Option<&HiliteHandler>) {}

  /// Handler to expose at a data output port. `None` detaches the port from
  /// any routing path.
  fn out_hilite_handler(&self, _port: usize) -> Option<HiliteHandler> {
    None
  }
}

/// A model wrapping an inner workflow graph. Container models additionally
/// observe port topology changes and may veto execution while their inner
/// graph is incomplete.
pub trait ContainerModel: NodeModel {
  /// Identifier of the inner graph, resolved by the workflow driver.
  fn inner_graph_id(&self) -> &str;

  /// Whether the inner graph currently allows this node to execute.
  fn can_execute(&self) -> bool {
    true
  }

  fn input_connected(&mut self, _port: usize) {}

  fn input_disconnected(&mut self, _port: usize) {}
}

/// Capability-tagged model slot owned by a node, dispatched by pattern
/// match where container behavior differs from plain behavior.
pub enum Model {
  Plain(Box<dyn NodeModel>),
  Container(Box<dyn ContainerModel>),
}

impl Model {
  pub fn as_model(&self) -> &dyn NodeModel {
    match self {
      Model::Plain(m) => m.as_ref(),
      Model::Container(c) => c.as_ref() as &dyn NodeModel,
    }
  }

  pub fn as_model_mut(&mut self) -> &mut dyn NodeModel {
    match self {
      Model::Plain(m) => m.as_mut(),
      Model::Container(c) => c.as_mut() as &mut dyn NodeModel,
    }
  }

  pub fn is_container(&self) -> bool {
    matches!(self, Model::Container(_))
  }

  /// Inner graph identifier, for container models.
  pub fn inner_graph_id(&self) -> Option<&str> {
    match self {
      Model::Plain(_) => None,
      Model::Container(c) => Some(c.inner_graph_id()),
    }
  }
}
