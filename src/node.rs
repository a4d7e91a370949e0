//! The node coordinator: a finite-state lifecycle machine over ports,
//! model, and listeners.
//!
//! A node is where the data flow starts, ends, or intersects. It owns its
//! model and its port arrays, drives configure/execute/reset, and reports
//! every transition through the listener registry. Lifecycle methods never
//! let a fault escape to the caller; recoverable faults and model contract
//! violations alike are absorbed into [NodeStatus] values (the latter logged
//! on the dedicated `flowbench::coding` target). The only exception is the
//! configure-while-executed precondition, which is a programmer error and
//! panics.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::editor::SettingsEditor;
use crate::error::{ConfigureFailure, ExecuteFailure, SettingsError};
use crate::factory::NodeFactory;
use crate::hilite::HiliteHandler;
use crate::listener::{ListenerRegistry, NodeStateListener};
use crate::model::Model;
use crate::port::{DataInPort, DataOutPort, ModelInPort, ModelOutPort, PeerOutput, PortRef};
use crate::settings::Settings;
use crate::types::{DataTable, MemoryPolicy, ModelContent, NodeStatus, TableSpec};

/// Settings key for the node name.
pub(crate) const CFG_NAME: &str = "name";
/// Settings key for the configured flag.
pub(crate) const CFG_IS_CONFIGURED: &str = "is_configured";
/// Settings key for the executed flag.
pub(crate) const CFG_IS_EXECUTED: &str = "is_executed";
/// Sub-tree where the model saves its setup.
pub const CFG_MODEL: &str = "model";
/// Sub-tree with the misc settings shown in the editor next to the model
/// settings; currently holds the output memory policy.
pub const CFG_MISC_SETTINGS: &str = "internal_node_subsettings";
/// Settings key for the output memory policy inside the misc sub-tree.
pub(crate) const CFG_MEMORY_POLICY: &str = "memory_policy";

#[derive(Debug, Default)]
struct LifecycleState {
  configured: bool,
  executed: bool,
  status: Option<NodeStatus>,
}

/// Basic processing unit within the workflow graph.
pub struct Node {
  id: Uuid,
  name: String,
  factory: Arc<dyn NodeFactory>,
  model: Model,
  editor: Option<SettingsEditor>,
  /// Lifecycle flags and status. A dedicated lock so the workflow driver
  /// may query executability from one thread while configuration commits
  /// on another through re-entrant notifications.
  state: Mutex<LifecycleState>,
  in_data: Vec<DataInPort>,
  in_model: Vec<ModelInPort>,
  out_data: Vec<DataOutPort>,
  out_model: Vec<ModelOutPort>,
  memory_policy: MemoryPolicy,
  /// Tables created through the execution context that were not handed back
  /// as outputs. Released on reset/detach.
  temp_tables: Vec<Arc<DataTable>>,
  node_dir: Option<PathBuf>,
  currently_saved: bool,
  listeners: ListenerRegistry,
}

impl Node {
  /// Creates a node from its factory: model first, then fixed-size port
  /// arrays from the model's declared counts. The node configures itself
  /// once so source nodes publish their default output specs immediately.
  pub fn new(factory: Arc<dyn NodeFactory>) -> Self {
    let model = factory.create_model();
    let (nd_in, nm_in, nd_out, nm_out) = {
      let m = model.as_model();
      (
        m.nr_data_ins(),
        m.nr_model_ins(),
        m.nr_data_outs(),
        m.nr_model_outs(),
      )
    };
    let in_data = (0..nd_in)
      .map(|i| DataInPort::new(i, factory.data_in_port_name(i)))
      .collect();
    let in_model = (0..nm_in)
      .map(|i| ModelInPort::new(nd_in + i, factory.model_in_port_name(i)))
      .collect();
    let out_data = (0..nd_out)
      .map(|i| DataOutPort::new(i, factory.data_out_port_name(i)))
      .collect();
    let out_model = (0..nm_out)
      .map(|i| ModelOutPort::new(nd_out + i, factory.model_out_port_name(i)))
      .collect();

    let mut node = Self {
      id: Uuid::new_v4(),
      name: factory.node_name().to_string(),
      factory,
      model,
      editor: None,
      state: Mutex::new(LifecycleState::default()),
      in_data,
      in_model,
      out_data,
      out_model,
      memory_policy: MemoryPolicy::default(),
      temp_tables: Vec::new(),
      node_dir: None,
      currently_saved: false,
      listeners: ListenerRegistry::new(),
    };
    for i in 0..node.out_data.len() {
      let handler = node.model.as_model().out_hilite_handler(i);
      node.out_data[i].set_hilite_handler(handler);
    }
    node.configure();
    node
  }

  /// Creates a fresh node of the same type carrying this node's settings.
  /// A settings transfer failure is logged, not fatal.
  pub fn copy(&self) -> Node {
    let mut node = Node::new(Arc::clone(&self.factory));
    let tree = self.current_settings_tree();
    let transferred: Result<(), SettingsError> = (|| {
      node.load_misc_settings(tree.get_child(CFG_MISC_SETTINGS)?, true)?;
      node
        .model
        .as_model_mut()
        .load_settings_from(tree.get_child(CFG_MODEL)?)
    })();
    if let Err(e) = transferred {
      error!(node = %self.name, "could not copy node settings: {e}");
    }
    node.reset_and_configure();
    node
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn set_name(&mut self, name: impl Into<String>) {
    self.name = name.into();
  }

  pub fn factory(&self) -> &Arc<dyn NodeFactory> {
    &self.factory
  }

  /// Inner graph identifier if this node wraps a container model.
  pub fn inner_graph_id(&self) -> Option<&str> {
    self.model.inner_graph_id()
  }

  pub fn memory_policy(&self) -> MemoryPolicy {
    self.memory_policy
  }

  // ---- port geometry ----

  pub fn nr_data_in_ports(&self) -> usize {
    self.in_data.len()
  }

  pub fn nr_model_in_ports(&self) -> usize {
    self.in_model.len()
  }

  /// Total number of input ports (data ports first, then model ports).
  pub fn nr_in_ports(&self) -> usize {
    self.in_data.len() + self.in_model.len()
  }

  pub fn nr_data_out_ports(&self) -> usize {
    self.out_data.len()
  }

  pub fn nr_model_out_ports(&self) -> usize {
    self.out_model.len()
  }

  pub fn nr_out_ports(&self) -> usize {
    self.out_data.len() + self.out_model.len()
  }

  pub fn data_in_port(&self, index: usize) -> &DataInPort {
    &self.in_data[index]
  }

  pub fn model_in_port(&self, index: usize) -> &ModelInPort {
    &self.in_model[index]
  }

  pub fn data_out_port(&self, index: usize) -> &DataOutPort {
    &self.out_data[index]
  }

  pub fn model_out_port(&self, index: usize) -> &ModelOutPort {
    &self.out_model[index]
  }

  /// Name of the input port with the given combined index.
  pub fn in_port_name(&self, port: usize) -> &str {
    self.bound_in_port(port);
    if port < self.in_data.len() {
      self.in_data[port].name()
    } else {
      self.in_model[port - self.in_data.len()].name()
    }
  }

  /// Name of the output port with the given combined index.
  pub fn out_port_name(&self, port: usize) -> &str {
    self.bound_out_port(port);
    if port < self.out_data.len() {
      self.out_data[port].name()
    } else {
      self.out_model[port - self.out_data.len()].name()
    }
  }

  /// Snapshot of an output port's payload, in the shape
  /// [Node::inport_has_new_connection] expects on the downstream side.
  pub fn peer_output(&self, out_port: usize) -> PeerOutput {
    self.bound_out_port(out_port);
    if out_port < self.out_data.len() {
      let p = &self.out_data[out_port];
      PeerOutput::Data {
        hilite: p.hilite_handler().cloned(),
        spec: p.spec().cloned(),
        table: p.table().cloned(),
      }
    } else {
      let p = &self.out_model[out_port - self.out_data.len()];
      PeerOutput::Model {
        content: p.content().cloned(),
      }
    }
  }

  // ---- lifecycle queries ----

  pub fn is_configured(&self) -> bool {
    self.state.lock().unwrap().configured
  }

  pub fn is_executed(&self) -> bool {
    self.state.lock().unwrap().executed
  }

  /// Current status of the last lifecycle operation, `None` on the happy
  /// path.
  pub fn status(&self) -> Option<NodeStatus> {
    self.state.lock().unwrap().status.clone()
  }

  pub fn is_auto_executable(&self) -> bool {
    self.model.as_model().is_auto_executable()
  }

  /// Whether all input ports have a connected predecessor.
  pub fn is_fully_connected(&self) -> bool {
    self.in_data.iter().all(|p| p.is_connected())
      && self.in_model.iter().all(|p| p.is_connected())
  }

  /// Whether the node can execute right now: not executed yet, every input
  /// port connected and holding a payload, and configured. The flag read
  /// shares the configure lock so the answer is consistent with an
  /// in-flight configuration commit.
  pub fn is_executable(&self) -> bool {
    let st = self.state.lock().unwrap();
    if st.executed {
      return false;
    }
    for p in &self.in_data {
      if !p.is_connected() || p.table().is_none() {
        return false;
      }
    }
    for p in &self.in_model {
      if !p.is_connected() || p.content().is_none() {
        return false;
      }
    }
    if let Model::Container(c) = &self.model {
      if !c.can_execute() {
        return false;
      }
    }
    st.configured
  }

  // ---- lifecycle transitions ----

  /// Gathers the input specs, lets the model infer output specs, and stores
  /// them in the output ports. Never lets a fault propagate to the caller:
  /// recoverable failures reset the node (with a Warning status when it is
  /// fully wired), contract violations are logged as coding defects and
  /// reset the node.
  ///
  /// # Panics
  ///
  /// If called while the node is executed.
  pub fn configure(&mut self) {
    {
      let mut st = self.state.lock().unwrap();
      assert!(
        !st.executed,
        "configure() must not be called while the node is executed"
      );
      st.status = None;
      st.configured = false;
    }

    let nr_outs = self.out_data.len();
    match infer_output_specs(&mut self.model, &self.in_data, nr_outs) {
      Ok(specs) => {
        self.state.lock().unwrap().configured = true;
        self.broadcast(&NodeStatus::Configured);
        for (port, spec) in self.out_data.iter_mut().zip(specs) {
          port.set_spec(Some(spec));
        }
        self.process_model_warnings();
      }
      Err(ConfigureFailure::InvalidSettings(msg)) => {
        let fully = self.is_fully_connected();
        if fully {
          warn!(node = %self.name, "configure failed: {msg}");
        } else {
          debug!(node = %self.name, "configure failed: {msg}");
        }
        self.reset(true);
        for port in &mut self.out_data {
          port.set_spec(None);
        }
        self.process_model_warnings();
        if fully {
          self.record_and_broadcast(NodeStatus::Warning(format!("Warning: {msg}")));
        }
      }
      Err(ConfigureFailure::Internal(msg)) => {
        error!(target: "flowbench::coding", node = %self.name, "configure failed: {msg}");
        self.reset(true);
        for port in &mut self.out_data {
          port.set_spec(None);
        }
        self.process_model_warnings();
      }
    }
  }

  /// Runs the model's computation and installs the produced payloads in the
  /// output ports. Returns whether execution succeeded; an already-executed
  /// node is a no-op returning `true`. All faults (model failure,
  /// cancellation, contract violations, model panics) are absorbed into
  /// status values; the node resets on any of them.
  pub fn execute(&mut self, ctx: &ExecutionContext) -> bool {
    let start = Instant::now();
    info!(node = %self.name, "start execute");
    self.record(None);
    self.broadcast(&NodeStatus::StartExecute);

    if self.is_executed() {
      warn!(node = %self.name, "node is already executed");
      self.broadcast(&NodeStatus::EndExecute);
      return true;
    }
    if !self.is_fully_connected() {
      warn!(node = %self.name, "node is not fully connected");
      self.broadcast(&NodeStatus::EndExecute);
      return false;
    }
    if !self.is_configured() {
      warn!(node = %self.name, "node is not configured");
      self.broadcast(&NodeStatus::EndExecute);
      return false;
    }

    let mut in_data = Vec::with_capacity(self.in_data.len());
    for (i, port) in self.in_data.iter().enumerate() {
      match port.table() {
        Some(t) => in_data.push(Arc::clone(t)),
        None => {
          error!(node = %self.name, "no data at input port {i} although the node reported executable");
          self.record_and_broadcast(NodeStatus::Error(format!(
            "couldn't get data from predecessor at input port {i}; is it executed?"
          )));
          self.broadcast(&NodeStatus::EndExecute);
          return false;
        }
      }
    }

    let model = self.model.as_model_mut();
    let outcome = catch_unwind(AssertUnwindSafe(|| model.execute(&in_data, ctx)));
    let out_tables = match outcome {
      Err(payload) => {
        let msg = panic_message(payload.as_ref());
        error!(target: "flowbench::coding", node = %self.name, "model panicked during execute: {msg}");
        self.reset_and_configure();
        self.record_and_broadcast(NodeStatus::Error(format!("Execute failed: {msg}")));
        return false;
      }
      Ok(Err(ExecuteFailure::Canceled)) => {
        info!(node = %self.name, "execute canceled");
        self.reset_and_configure();
        self.record_and_broadcast(NodeStatus::ExecutionCanceled(
          "Execution canceled".to_string(),
        ));
        return false;
      }
      Ok(Err(ExecuteFailure::Failed(msg))) => {
        error!(node = %self.name, "execute failed: {msg}");
        self.reset_and_configure();
        self.record_and_broadcast(NodeStatus::Error(format!("Execute failed: {msg}")));
        return false;
      }
      Ok(Ok(tables)) => tables,
    };
    self.process_model_warnings();

    if out_tables.len() != self.out_data.len() {
      error!(
        target: "flowbench::coding",
        node = %self.name,
        "execute returned {} output tables, expected {}",
        out_tables.len(),
        self.out_data.len()
      );
      self.reset_and_configure();
      self.record_and_broadcast(NodeStatus::Error(
        "Execute failed: model produced a wrong number of outputs".to_string(),
      ));
      return false;
    }

    let mut contents = Vec::with_capacity(self.out_model.len());
    for p in 0..self.out_model.len() {
      let model = self.model.as_model();
      let saved = catch_unwind(AssertUnwindSafe(|| model.save_model_content(p)));
      let failure = match saved {
        Ok(Ok(content)) => {
          contents.push(content);
          None
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
      };
      if let Some(msg) = failure {
        error!(node = %self.name, "model content couldn't be saved at output port {p}: {msg}");
        self.record_and_broadcast(NodeStatus::Error(format!(
          "model content couldn't be saved at output port {p}: {msg}"
        )));
        self.broadcast(&NodeStatus::EndExecute);
        return false;
      }
    }

    for (port, table) in self.out_data.iter_mut().zip(&out_tables) {
      if let Some(promised) = port.spec() {
        if !promised.equal_structure(table.spec()) {
          error!(
            target: "flowbench::coding",
            node = %self.name,
            "spec generated by configure does not match spec after execution"
          );
        }
      }
      port.set_table(Some(Arc::clone(table)));
    }
    for (port, content) in self.out_model.iter_mut().zip(contents) {
      port.set_content(Some(content));
    }

    // whatever the model created but did not hand back is a temp artifact
    let created = ctx.take_created();
    self.temp_tables.extend(
      created
        .into_iter()
        .filter(|t| !out_tables.iter().any(|o| Arc::ptr_eq(o, t))),
    );

    self.state.lock().unwrap().executed = true;
    self.currently_saved = false;
    info!(
      node = %self.name,
      elapsed_ms = start.elapsed().as_millis() as u64,
      "end execute"
    );
    self.broadcast(&NodeStatus::EndExecute);
    true
  }

  /// Resets the node back to idle: clears status and output payloads,
  /// releases temporary tables, resets the model, and feeds the cached
  /// upstream model content back into it. Always succeeds and is
  /// idempotent.
  fn reset(&mut self, notify: bool) {
    info!(node = %self.name, "reset");
    {
      let mut st = self.state.lock().unwrap();
      st.status = None;
      st.configured = false;
      st.executed = false;
    }
    self.currently_saved = false;

    let model = self.model.as_model_mut();
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| model.reset())) {
      let msg = panic_message(payload.as_ref());
      error!(target: "flowbench::coding", node = %self.name, "model panicked during reset: {msg}");
      self.record(Some(NodeStatus::Warning(format!("Reset failed: {msg}"))));
    }

    for port in &mut self.out_data {
      port.set_table(None);
    }
    self.temp_tables.clear();
    for port in &mut self.out_model {
      port.set_content(None);
    }

    // upstream connections remain after a reset, so the model gets their
    // content back into its input slots
    for idx in 0..self.in_model.len() {
      let content = self.in_model[idx].content().cloned();
      let model = self.model.as_model_mut();
      let loaded =
        catch_unwind(AssertUnwindSafe(|| model.load_model_content(idx, content.as_ref())));
      match loaded {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          debug!(node = %self.name, "load_model_content failed during reset: {e}");
          self.record(Some(NodeStatus::Warning(
            "could not load model content into the node".to_string(),
          )));
        }
        Err(payload) => {
          let msg = panic_message(payload.as_ref());
          error!(
            target: "flowbench::coding",
            node = %self.name,
            "load_model_content must tolerate absent content: {msg}"
          );
          self.record(Some(NodeStatus::Warning(
            "model does not tolerate absent content in load_model_content".to_string(),
          )));
        }
      }
    }

    if notify {
      self.broadcast(&NodeStatus::Reset);
      if let Some(status) = self.status() {
        self.broadcast(&status);
      }
    }
  }

  /// Reset followed by configure. Faults in either phase are absorbed;
  /// nothing propagates to the caller.
  pub fn reset_and_configure(&mut self) {
    self.reset(false);
    self.configure();
  }

  /// Resets the node with notification. The spec-level entry point the
  /// workflow driver uses; internal callers pick the notification mode via
  /// [Node::reset].
  pub fn reset_notify(&mut self) {
    self.reset(true);
  }

  /// Prepares deletion: resets, disconnects all input ports, and drops all
  /// listeners.
  pub fn detach(&mut self) {
    self.reset(true);
    for port in &mut self.in_data {
      port.disconnect();
    }
    for port in &mut self.in_model {
      port.disconnect();
    }
    self.listeners.clear();
  }

  /// Drops the output tables (spill files go with the last table handle).
  pub fn cleanup(&mut self) {
    for port in &mut self.out_data {
      port.set_table(None);
    }
  }

  /// Removes the node's persisted directory and everything in it.
  pub fn remove_internals(&self) {
    if let Some(dir) = &self.node_dir {
      if dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(dir) {
          warn!(node = %self.name, "unable to delete node directory {}: {e}", dir.display());
        }
      }
    }
  }

  // ---- port-connection notifications (called by the workflow driver) ----

  /// A predecessor's output port was wired to the given input port.
  /// `output` is the peer's current payload snapshot (see
  /// [Node::peer_output]).
  pub fn inport_has_new_connection(&mut self, port: usize, peer: PortRef, output: PeerOutput) {
    self.bound_in_port(port);
    if let Model::Container(c) = &mut self.model {
      c.input_connected(port);
    }
    if port < self.in_data.len() {
      let PeerOutput::Data {
        hilite,
        spec,
        table,
      } = output
      else {
        panic!("data input port {port} wired with a model payload");
      };
      self.in_data[port].connect(peer);
      self.inport_has_new_hilite_handler(port, hilite);
      self.inport_has_new_table_spec(port, spec);
      if table.is_some() {
        self.inport_has_new_data_table(port, table);
      }
    } else {
      let PeerOutput::Model { content } = output else {
        panic!("model input port {port} wired with a data payload");
      };
      self.in_model[port - self.in_data.len()].connect(peer);
      self.inport_has_new_model_content(port, content);
    }
  }

  /// The upstream spec at a data input port changed. Resets the node first
  /// if it is executed, then reconfigures.
  pub fn inport_has_new_table_spec(&mut self, port: usize, spec: Option<TableSpec>) {
    self.bound_data_in_port(port);
    self.in_data[port].set_spec(spec);
    if self.is_executed() {
      self.reset(true);
    }
    self.configure();
  }

  /// The upstream table at a data input port changed. A pure notification;
  /// consumption happens at execute time.
  pub fn inport_has_new_data_table(&mut self, port: usize, table: Option<Arc<DataTable>>) {
    self.bound_data_in_port(port);
    self.in_data[port].set_table(table);
  }

  /// The upstream content at a model input port changed (combined port
  /// index). Loads the content into the model and reconfigures; a load
  /// failure resets the node and reports an Error status.
  pub fn inport_has_new_model_content(&mut self, port: usize, content: Option<ModelContent>) {
    self.bound_model_in_port(port);
    let idx = port - self.in_data.len();
    self.in_model[idx].set_content(content.clone());
    if self.is_executed() {
      self.reset(true);
    }
    let model = self.model.as_model_mut();
    let loaded = catch_unwind(AssertUnwindSafe(|| {
      model.load_model_content(idx, content.as_ref())
    }));
    match loaded {
      Ok(Ok(())) => self.configure(),
      Ok(Err(e)) => {
        self.reset(false);
        warn!(node = %self.name, "unable to load model content: {e}");
        self.record_and_broadcast(NodeStatus::Error(format!(
          "could not load model content: {e}"
        )));
      }
      Err(payload) => {
        self.reset(false);
        let msg = panic_message(payload.as_ref());
        error!(target: "flowbench::coding", node = %self.name, "load_model_content failed: {msg}");
        self.record_and_broadcast(NodeStatus::Error(format!(
          "could not load model content: {msg}"
        )));
      }
    }
  }

  /// The hilite handler at a data input port changed. Routed through the
  /// model, which decides what every output port exposes.
  pub fn inport_has_new_hilite_handler(&mut self, port: usize, handler: Option<HiliteHandler>) {
    self.bound_data_in_port(port);
    self.in_data[port].set_hilite_handler(handler.clone());
    self
      .model
      .as_model_mut()
      .in_hilite_handler_changed(port, handler.as_ref());
    for i in 0..self.out_data.len() {
      let out_handler = self.model.as_model().out_hilite_handler(i);
      self.out_data[i].set_hilite_handler(out_handler);
    }
  }

  /// The predecessor at the given input port was unwired. Resets the node;
  /// data ports additionally clear their hilite route, model ports clear
  /// the model's content slot (models must tolerate the absence).
  pub fn inport_was_disconnected(&mut self, port: usize) {
    self.bound_in_port(port);
    self.reset(true);
    if port < self.in_data.len() {
      self.in_data[port].disconnect();
      self.inport_has_new_hilite_handler(port, None);
      self.configure();
    } else {
      let idx = port - self.in_data.len();
      self.in_model[idx].disconnect();
      let model = self.model.as_model_mut();
      let cleared = catch_unwind(AssertUnwindSafe(|| model.load_model_content(idx, None)));
      match cleared {
        Ok(Ok(())) => self.configure(),
        Ok(Err(e)) => {
          error!(
            target: "flowbench::coding",
            node = %self.name,
            "load_model_content must tolerate absent content: {e}"
          );
          self.record_and_broadcast(NodeStatus::Error(
            "model must tolerate absent content in load_model_content".to_string(),
          ));
        }
        Err(payload) => {
          let msg = panic_message(payload.as_ref());
          error!(
            target: "flowbench::coding",
            node = %self.name,
            "load_model_content must tolerate absent content: {msg}"
          );
          self.record_and_broadcast(NodeStatus::Error(
            "model must tolerate absent content in load_model_content".to_string(),
          ));
        }
      }
    }
    if let Model::Container(c) = &mut self.model {
      c.input_disconnected(port);
    }
  }

  // ---- listeners ----

  pub fn add_state_listener(&self, listener: &Arc<dyn NodeStateListener>) {
    self.listeners.add(listener);
  }

  pub fn remove_state_listener(&self, listener: &Arc<dyn NodeStateListener>) {
    self.listeners.remove(listener);
  }

  pub(crate) fn broadcast(&self, status: &NodeStatus) {
    self.listeners.notify(status);
  }

  pub(crate) fn record(&self, status: Option<NodeStatus>) {
    self.state.lock().unwrap().status = status;
  }

  pub(crate) fn record_and_broadcast(&self, status: NodeStatus) {
    self.record(Some(status.clone()));
    self.broadcast(&status);
  }

  pub(crate) fn process_model_warnings(&mut self) {
    if let Some(msg) = self.model.as_model_mut().take_warning_message() {
      warn!(node = %self.name, "model warning: {msg}");
      self.record_and_broadcast(NodeStatus::Warning(format!("Warning: {msg}")));
    }
  }

  // ---- settings ----

  /// Serializes name, lifecycle flags, misc settings, and the model's
  /// settings into the given tree.
  pub fn save_settings(&self, settings: &mut Settings) {
    settings.add_string(CFG_NAME, self.name.as_str());
    settings.add_bool(CFG_IS_CONFIGURED, self.is_configured());
    settings.add_bool(CFG_IS_EXECUTED, self.is_executed());
    let misc = settings.add_child(CFG_MISC_SETTINGS);
    self.save_misc_settings_to(misc);
    let model_settings = settings.add_child(CFG_MODEL);
    let model = self.model.as_model();
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| model.save_settings_to(model_settings)))
    {
      error!(
        target: "flowbench::coding",
        node = %self.name,
        "model panicked while saving settings: {}",
        panic_message(payload.as_ref())
      );
    }
  }

  /// Loads name, misc settings, and model settings from the given tree
  /// (lifecycle flags are persistence-level and handled by
  /// [crate::node_io::load_node]). Settings written before the misc section
  /// existed fall back to the default memory policy.
  pub fn load_settings(&mut self, settings: &Settings) -> Result<(), SettingsError> {
    self.name = settings.get_string(CFG_NAME)?.to_string();
    if settings.contains_key(CFG_MISC_SETTINGS) {
      self.load_misc_settings(settings.get_child(CFG_MISC_SETTINGS)?, true)?;
    } else {
      self.memory_policy = MemoryPolicy::default();
    }
    let model_settings = settings.get_child(CFG_MODEL)?;
    self.model.as_model_mut().load_settings_from(model_settings)
  }

  /// Performs the same parsing as [Node::load_settings] without committing
  /// any value.
  pub fn validate_settings(&self, settings: &Settings) -> Result<(), SettingsError> {
    if settings.contains_key(CFG_MISC_SETTINGS) && !self.out_data.is_empty() {
      parse_memory_policy(settings.get_child(CFG_MISC_SETTINGS)?)?;
    }
    self
      .model
      .as_model()
      .validate_settings(settings.get_child(CFG_MODEL)?)
  }

  fn save_misc_settings_to(&self, misc: &mut Settings) {
    if !self.out_data.is_empty() {
      misc.add_string(CFG_MEMORY_POLICY, self.memory_policy.to_string());
    }
  }

  pub(crate) fn load_misc_settings(
    &mut self,
    misc: &Settings,
    commit: bool,
  ) -> Result<(), SettingsError> {
    if self.out_data.is_empty() {
      return Ok(());
    }
    let policy = parse_memory_policy(misc)?;
    if commit {
      self.memory_policy = policy;
    }
    Ok(())
  }

  fn current_settings_tree(&self) -> Settings {
    let mut tree = Settings::new(self.name.clone());
    let model_settings = tree.add_child(CFG_MODEL);
    self.model.as_model().save_settings_to(model_settings);
    let misc = tree.add_child(CFG_MISC_SETTINGS);
    self.save_misc_settings_to(misc);
    tree
  }

  // ---- editor ----

  /// Whether this node offers a settings editor: its factory ships one, or
  /// it has data outputs (whose memory policy is always editable).
  pub fn has_editor(&self) -> bool {
    self.factory.has_editor() || !self.out_data.is_empty()
  }

  /// Opens the settings editor, (re)loading the node's current model and
  /// misc settings into it. Created lazily on first open.
  pub fn open_editor(&mut self) -> &mut SettingsEditor {
    let tree = self.current_settings_tree();
    match &mut self.editor {
      Some(editor) => {
        editor.replace(tree);
      }
      None => self.editor = Some(SettingsEditor::new(tree)),
    }
    self
      .editor
      .as_mut()
      .expect("editor exists after open")
  }

  /// Checks the staged editor settings without committing them.
  pub fn validate_editor_settings(&self) -> Result<(), SettingsError> {
    let Some(editor) = &self.editor else {
      return Ok(());
    };
    let staged = editor.settings();
    self
      .model
      .as_model()
      .validate_settings(staged.get_child(CFG_MODEL)?)?;
    if !self.out_data.is_empty() {
      parse_memory_policy(staged.get_child(CFG_MISC_SETTINGS)?)?;
    }
    Ok(())
  }

  /// Commits the staged editor settings into the model and the node's misc
  /// fields. A failure leaves previously committed parts in place, as the
  /// model's own loading order dictates.
  pub fn apply_editor_settings(&mut self) -> Result<(), SettingsError> {
    let Some(editor) = &self.editor else {
      debug!(node = %self.name, "no editor open, nothing to apply");
      return Ok(());
    };
    let staged = editor.settings().clone();
    self
      .model
      .as_model_mut()
      .load_settings_from(staged.get_child(CFG_MODEL)?)?;
    self.load_misc_settings(staged.get_child(CFG_MISC_SETTINGS)?, true)
  }

  /// Whether the staged editor settings equal the node's current settings.
  /// With no editor open nothing is staged, which counts as equal.
  pub fn editor_settings_equal(&self) -> bool {
    match &self.editor {
      Some(editor) => *editor.settings() == self.current_settings_tree(),
      None => true,
    }
  }

  // ---- persistence support ----

  pub fn node_dir(&self) -> Option<&Path> {
    self.node_dir.as_deref()
  }

  pub(crate) fn set_node_dir(&mut self, dir: PathBuf) {
    self.node_dir = Some(dir);
  }

  /// Whether the current output payloads have been persisted since the last
  /// execute/reset.
  pub fn is_currently_saved(&self) -> bool {
    self.currently_saved
  }

  pub(crate) fn set_currently_saved(&mut self, saved: bool) {
    self.currently_saved = saved;
  }

  pub(crate) fn set_lifecycle_flags(&mut self, configured: bool, executed: bool) {
    let mut st = self.state.lock().unwrap();
    st.configured = configured;
    st.executed = executed;
  }

  pub(crate) fn model(&self) -> &Model {
    &self.model
  }

  pub(crate) fn model_mut(&mut self) -> &mut Model {
    &mut self.model
  }

  pub(crate) fn out_data_port_mut(&mut self, index: usize) -> &mut DataOutPort {
    &mut self.out_data[index]
  }

  pub(crate) fn out_model_port_mut(&mut self, index: usize) -> &mut ModelOutPort {
    &mut self.out_model[index]
  }

  // ---- bounds ----

  fn bound_in_port(&self, port: usize) {
    assert!(
      port < self.nr_in_ports(),
      "invalid input port index {port} (valid range 0..{})",
      self.nr_in_ports()
    );
  }

  fn bound_data_in_port(&self, port: usize) {
    assert!(
      port < self.in_data.len(),
      "invalid data input port index {port} (valid range 0..{})",
      self.in_data.len()
    );
  }

  fn bound_model_in_port(&self, port: usize) {
    assert!(
      port >= self.in_data.len() && port < self.nr_in_ports(),
      "invalid model input port index {port} (valid range {}..{})",
      self.in_data.len(),
      self.nr_in_ports()
    );
  }

  fn bound_out_port(&self, port: usize) {
    assert!(
      port < self.nr_out_ports(),
      "invalid output port index {port} (valid range 0..{})",
      self.nr_out_ports()
    );
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} [in={};out={};fully_connected={};configured={};executable={};executed={}]",
      self.name,
      self.nr_in_ports(),
      self.nr_out_ports(),
      self.is_fully_connected(),
      self.is_configured(),
      self.is_executable(),
      self.is_executed()
    )
  }
}

/// Gathers input specs and runs the model's spec inference, converting
/// panics and wrong-arity results into [ConfigureFailure::Internal].
fn infer_output_specs(
  model: &mut Model,
  in_data: &[DataInPort],
  nr_outs: usize,
) -> Result<Vec<TableSpec>, ConfigureFailure> {
  let mut in_specs = Vec::with_capacity(in_data.len());
  for port in in_data {
    match port.spec() {
      Some(s) => in_specs.push(s.clone()),
      None => {
        return Err(ConfigureFailure::InvalidSettings(
          "node is not executable until all predecessors are configured or executed".to_string(),
        ));
      }
    }
  }
  let m = model.as_model_mut();
  let specs = catch_unwind(AssertUnwindSafe(|| m.configure(&in_specs))).map_err(|payload| {
    ConfigureFailure::Internal(format!(
      "model panicked during configure: {}",
      panic_message(payload.as_ref())
    ))
  })??;
  if specs.len() != nr_outs {
    return Err(ConfigureFailure::Internal(format!(
      "configure returned {} output specs, expected {nr_outs}",
      specs.len()
    )));
  }
  Ok(specs)
}

/// Parses the memory policy entry of a misc settings sub-tree.
pub(crate) fn parse_memory_policy(misc: &Settings) -> Result<MemoryPolicy, SettingsError> {
  let raw = misc.get_string(CFG_MEMORY_POLICY)?;
  raw.parse().map_err(|reason| SettingsError::InvalidValue {
    key: CFG_MEMORY_POLICY.to_string(),
    reason,
  })
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
