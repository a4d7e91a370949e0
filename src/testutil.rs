//! Shared test fixtures: small models, factories, and driver helpers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::ExecutionContext;
use crate::error::{ConfigureFailure, ExecuteFailure, SettingsError};
use crate::factory::NodeFactory;
use crate::hilite::HiliteHandler;
use crate::model::{ContainerModel, Model, NodeModel};
use crate::node::Node;
use crate::port::PortRef;
use crate::settings::Settings;
use crate::types::{Cell, ColumnSpec, ColumnType, DataTable, ModelContent, Row, TableSpec};

pub fn int_spec(column: &str) -> TableSpec {
  TableSpec::new(vec![ColumnSpec::new(column, ColumnType::Int)])
}

pub fn int_values(table: &DataTable) -> Vec<i64> {
  table
    .rows()
    .unwrap()
    .into_iter()
    .map(|row| match &row.cells[0] {
      Cell::Int(v) => *v,
      other => panic!("expected int cell, got {other:?}"),
    })
    .collect()
}

/// Factory built from a closure producing fresh models.
pub struct FnFactory {
  name: String,
  build: Box<dyn Fn() -> Model + Send + Sync>,
}

impl NodeFactory for FnFactory {
  fn node_name(&self) -> &str {
    &self.name
  }

  fn create_model(&self) -> Model {
    (self.build)()
  }
}

pub fn factory(
  name: &str,
  build: impl Fn() -> Model + Send + Sync + 'static,
) -> Arc<dyn NodeFactory> {
  Arc::new(FnFactory {
    name: name.to_string(),
    build: Box::new(build),
  })
}

/// Wires `upstream`'s output port to `downstream`'s input port the way the
/// workflow driver does: connection plus the peer's payload snapshot.
pub fn connect(upstream: &Node, out_port: usize, downstream: &mut Node, in_port: usize) {
  let peer = PortRef {
    node: upstream.id(),
    port: out_port,
  };
  downstream.inport_has_new_connection(in_port, peer, upstream.peer_output(out_port));
}

/// Pushes `upstream`'s fresh output table to `downstream` after an execute,
/// as the driver does when data becomes available.
pub fn propagate_table(upstream: &Node, out_port: usize, downstream: &mut Node, in_port: usize) {
  let table = upstream.data_out_port(out_port).table().cloned();
  downstream.inport_has_new_data_table(in_port, table);
}

/// Source: no inputs, one int output column, values fixed at construction.
pub struct SourceModel {
  pub column: String,
  pub values: Vec<i64>,
  pub execute_calls: Arc<AtomicUsize>,
  hilite: HiliteHandler,
  auto_executable: bool,
}

impl SourceModel {
  pub fn new(column: &str, values: Vec<i64>) -> Self {
    Self {
      column: column.to_string(),
      values,
      execute_calls: Arc::new(AtomicUsize::new(0)),
      hilite: HiliteHandler::new(),
      auto_executable: false,
    }
  }

  pub fn auto_executable(mut self) -> Self {
    self.auto_executable = true;
    self
  }

  pub fn with_calls(mut self, calls: Arc<AtomicUsize>) -> Self {
    self.execute_calls = calls;
    self
  }
}

impl NodeModel for SourceModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    if self.column.is_empty() {
      return Err(ConfigureFailure::InvalidSettings(
        "no output column configured".to_string(),
      ));
    }
    Ok(vec![int_spec(&self.column)])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    self.execute_calls.fetch_add(1, Ordering::SeqCst);
    ctx.check_canceled()?;
    let mut container = ctx.create_container(int_spec(&self.column));
    for (i, v) in self.values.iter().enumerate() {
      container
        .add_row(Row::new(format!("r{i}"), vec![Cell::Int(*v)]))
        .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    }
    let table = container
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    Ok(vec![table])
  }

  fn save_settings_to(&self, settings: &mut Settings) {
    settings.add_string("column", self.column.as_str());
  }

  fn load_settings_from(&mut self, settings: &Settings) -> Result<(), SettingsError> {
    self.column = settings.get_string("column")?.to_string();
    Ok(())
  }

  fn validate_settings(&self, settings: &Settings) -> Result<(), SettingsError> {
    let column = settings.get_string("column")?;
    if column.is_empty() {
      return Err(SettingsError::InvalidValue {
        key: "column".to_string(),
        reason: "column name must not be empty".to_string(),
      });
    }
    Ok(())
  }

  fn is_auto_executable(&self) -> bool {
    self.auto_executable
  }

  fn out_hilite_handler(&self, _port: usize) -> Option<HiliteHandler> {
    Some(self.hilite.clone())
  }
}

/// Transform: one data input, one data output; doubles every int cell and
/// passes the input spec and hilite route through.
pub struct DoublerModel {
  in_hilite: Option<HiliteHandler>,
}

impl DoublerModel {
  pub fn new() -> Self {
    Self { in_hilite: None }
  }
}

impl NodeModel for DoublerModel {
  fn nr_data_ins(&self) -> usize {
    1
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![in_specs[0].clone()])
  }

  fn execute(
    &mut self,
    in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    let input = &in_data[0];
    let mut container = ctx.create_container(input.spec().clone());
    let rows = input
      .rows()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    for row in rows {
      ctx.check_canceled()?;
      let cells = row
        .cells
        .into_iter()
        .map(|c| match c {
          Cell::Int(v) => Cell::Int(v * 2),
          other => other,
        })
        .collect();
      container
        .add_row(Row::new(row.key, cells))
        .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    }
    let table = container
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    Ok(vec![table])
  }

  fn in_hilite_handler_changed(&mut self, _port: usize, handler: Option<&HiliteHandler>) {
    self.in_hilite = handler.cloned();
  }

  fn out_hilite_handler(&self, _port: usize) -> Option<HiliteHandler> {
    self.in_hilite.clone()
  }
}

/// Model whose configure always reports a recoverable settings problem.
pub struct InvalidSettingsModel;

impl NodeModel for InvalidSettingsModel {
  fn nr_data_ins(&self) -> usize {
    1
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Err(ConfigureFailure::InvalidSettings(
      "target column not selected".to_string(),
    ))
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    _ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    Err(ExecuteFailure::Failed("not executable".to_string()))
  }
}

/// Source whose configure violates the arity contract.
pub struct WrongArityModel;

impl NodeModel for WrongArityModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    _ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    Ok(vec![])
  }
}

/// Transform whose execute fails (recoverably or by panicking).
pub struct FailingExecModel {
  pub panic_instead: bool,
}

impl NodeModel for FailingExecModel {
  fn nr_data_ins(&self) -> usize {
    1
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![in_specs[0].clone()])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    _ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    if self.panic_instead {
      panic!("model bug");
    }
    Err(ExecuteFailure::Failed("division by zero".to_string()))
  }
}

/// Source whose configure leaves a warning message behind.
pub struct WarningModel {
  warning: Option<String>,
}

impl WarningModel {
  pub fn new() -> Self {
    Self { warning: None }
  }
}

impl NodeModel for WarningModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    self.warning = Some("using default separator".to_string());
    Ok(vec![int_spec("n")])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    let container = ctx.create_container(int_spec("n"));
    let table = container
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    Ok(vec![table])
  }

  fn take_warning_message(&mut self) -> Option<String> {
    self.warning.take()
  }
}

/// Producer with one model output carrying a trained "intercept".
pub struct ContentProducerModel {
  pub intercept: f64,
}

impl NodeModel for ContentProducerModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    0
  }

  fn nr_model_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    _ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    Ok(vec![])
  }

  fn save_model_content(&self, _port: usize) -> Result<ModelContent, SettingsError> {
    let mut content = ModelContent::new("predictor");
    content.tree_mut().add_double("intercept", self.intercept);
    Ok(content)
  }
}

/// Consumer with one model input. `strict` makes it reject absent content,
/// which the coordinator treats as a coding defect.
pub struct ContentConsumerModel {
  pub strict: bool,
  pub received: Option<ModelContent>,
}

impl ContentConsumerModel {
  pub fn new(strict: bool) -> Self {
    Self {
      strict,
      received: None,
    }
  }
}

impl NodeModel for ContentConsumerModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn nr_model_ins(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    match self.received {
      Some(_) => Ok(vec![int_spec("prediction")]),
      None => Err(ConfigureFailure::InvalidSettings(
        "no model content available".to_string(),
      )),
    }
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    let container = ctx.create_container(int_spec("prediction"));
    let table = container
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    Ok(vec![table])
  }

  fn load_model_content(
    &mut self,
    _port: usize,
    content: Option<&ModelContent>,
  ) -> Result<(), SettingsError> {
    if self.strict && content.is_none() {
      return Err(SettingsError::MissingKey("intercept".to_string()));
    }
    self.received = content.cloned();
    Ok(())
  }
}

/// Source persisting a private row cache below the node directory. The
/// probe mirrors whatever `load_internals` restored, so tests can observe
/// the boxed model.
pub struct InternalsModel {
  cache: Vec<i64>,
  pub probe: Arc<Mutex<Vec<i64>>>,
}

impl InternalsModel {
  const FILE: &'static str = "cache.json";

  pub fn new(probe: Arc<Mutex<Vec<i64>>>) -> Self {
    Self {
      cache: Vec::new(),
      probe,
    }
  }
}

impl NodeModel for InternalsModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![int_spec("n")])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    self.cache = vec![1, 2, 3];
    let mut container = ctx.create_container(int_spec("n"));
    for (i, v) in self.cache.iter().enumerate() {
      container
        .add_row(Row::new(format!("r{i}"), vec![Cell::Int(*v)]))
        .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    }
    container
      .close()
      .map(|t| vec![t])
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))
  }

  fn reset(&mut self) {
    self.cache.clear();
  }

  fn save_internals(&self, dir: &std::path::Path) -> std::io::Result<()> {
    let json = serde_json::to_string(&self.cache)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(dir.join(Self::FILE), json)
  }

  fn load_internals(&mut self, dir: &std::path::Path) -> std::io::Result<()> {
    let bytes = std::fs::read(dir.join(Self::FILE))?;
    self.cache = serde_json::from_slice(&bytes)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    *self.probe.lock().unwrap() = self.cache.clone();
    Ok(())
  }
}

/// Container stub wrapping an inner graph: records topology events and can
/// veto execution while its inner graph is "incomplete".
pub struct StubContainerModel {
  pub events: Arc<Mutex<Vec<String>>>,
  pub allow_execute: Arc<AtomicBool>,
}

impl NodeModel for StubContainerModel {
  fn nr_data_ins(&self) -> usize {
    1
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![in_specs[0].clone()])
  }

  fn execute(
    &mut self,
    in_data: &[Arc<DataTable>],
    _ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    Ok(vec![Arc::clone(&in_data[0])])
  }
}

impl ContainerModel for StubContainerModel {
  fn inner_graph_id(&self) -> &str {
    "inner-graph"
  }

  fn can_execute(&self) -> bool {
    self.allow_execute.load(Ordering::SeqCst)
  }

  fn input_connected(&mut self, port: usize) {
    self.events.lock().unwrap().push(format!("connect:{port}"));
  }

  fn input_disconnected(&mut self, port: usize) {
    self
      .events
      .lock()
      .unwrap()
      .push(format!("disconnect:{port}"));
  }
}

/// Source that additionally builds a scratch table it never hands back.
pub struct ScratchTableModel;

impl NodeModel for ScratchTableModel {
  fn nr_data_ins(&self) -> usize {
    0
  }

  fn nr_data_outs(&self) -> usize {
    1
  }

  fn configure(&mut self, _in_specs: &[TableSpec]) -> Result<Vec<TableSpec>, ConfigureFailure> {
    Ok(vec![int_spec("n")])
  }

  fn execute(
    &mut self,
    _in_data: &[Arc<DataTable>],
    ctx: &ExecutionContext,
  ) -> Result<Vec<Arc<DataTable>>, ExecuteFailure> {
    let mut scratch = ctx.create_container(int_spec("scratch"));
    scratch
      .add_row(Row::new("s0", vec![Cell::Int(0)]))
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    scratch
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;

    let mut out = ctx.create_container(int_spec("n"));
    out
      .add_row(Row::new("r0", vec![Cell::Int(1)]))
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    let table = out
      .close()
      .map_err(|e| ExecuteFailure::Failed(e.to_string()))?;
    Ok(vec![table])
  }
}
