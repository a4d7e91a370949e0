//! Typed endpoints through which nodes exchange payloads.
//!
//! Ports cache payloads locally; the workflow driver owns the edge topology
//! and pushes peer payloads through the node's `inport_*` notification
//! methods. A connection is a plain [PortRef] back-reference; removing it
//! never destroys the peer.

use std::sync::Arc;

use uuid::Uuid;

use crate::hilite::HiliteHandler;
use crate::types::{DataTable, ModelContent, TableSpec};

/// Non-owning reference to a port on another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
  pub node: Uuid,
  /// Combined port index on the peer (data ports first, then model ports).
  pub port: usize,
}

/// Payload snapshot of an upstream output port, handed to
/// `inport_has_new_connection` when an edge is wired.
pub enum PeerOutput {
  Data {
    hilite: Option<HiliteHandler>,
    spec: Option<TableSpec>,
    table: Option<Arc<DataTable>>,
  },
  Model {
    content: Option<ModelContent>,
  },
}

/// Data input port: caches the upstream spec, table, and hilite handler
/// while connected.
#[derive(Debug)]
pub struct DataInPort {
  index: usize,
  name: String,
  connection: Option<PortRef>,
  hilite: Option<HiliteHandler>,
  spec: Option<TableSpec>,
  table: Option<Arc<DataTable>>,
}

impl DataInPort {
  pub(crate) fn new(index: usize, name: String) -> Self {
    Self {
      index,
      name,
      connection: None,
      hilite: None,
      spec: None,
      table: None,
    }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_connected(&self) -> bool {
    self.connection.is_some()
  }

  pub fn connection(&self) -> Option<PortRef> {
    self.connection
  }

  pub(crate) fn connect(&mut self, peer: PortRef) {
    self.connection = Some(peer);
  }

  /// Drops the connection and every payload cached from it.
  pub(crate) fn disconnect(&mut self) {
    self.connection = None;
    self.hilite = None;
    self.spec = None;
    self.table = None;
  }

  pub fn spec(&self) -> Option<&TableSpec> {
    self.spec.as_ref()
  }

  pub(crate) fn set_spec(&mut self, spec: Option<TableSpec>) {
    self.spec = spec;
  }

  pub fn table(&self) -> Option<&Arc<DataTable>> {
    self.table.as_ref()
  }

  pub(crate) fn set_table(&mut self, table: Option<Arc<DataTable>>) {
    self.table = table;
  }

  pub fn hilite_handler(&self) -> Option<&HiliteHandler> {
    self.hilite.as_ref()
  }

  pub(crate) fn set_hilite_handler(&mut self, handler: Option<HiliteHandler>) {
    self.hilite = handler;
  }
}

/// Model-content input port.
#[derive(Debug)]
pub struct ModelInPort {
  index: usize,
  name: String,
  connection: Option<PortRef>,
  content: Option<ModelContent>,
}

impl ModelInPort {
  pub(crate) fn new(index: usize, name: String) -> Self {
    Self {
      index,
      name,
      connection: None,
      content: None,
    }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_connected(&self) -> bool {
    self.connection.is_some()
  }

  pub fn connection(&self) -> Option<PortRef> {
    self.connection
  }

  pub(crate) fn connect(&mut self, peer: PortRef) {
    self.connection = Some(peer);
  }

  pub(crate) fn disconnect(&mut self) {
    self.connection = None;
    self.content = None;
  }

  pub fn content(&self) -> Option<&ModelContent> {
    self.content.as_ref()
  }

  pub(crate) fn set_content(&mut self, content: Option<ModelContent>) {
    self.content = content;
  }
}

/// Data output port: holds the spec promised at configure time and the
/// table produced at execute time.
#[derive(Debug)]
pub struct DataOutPort {
  index: usize,
  name: String,
  hilite: Option<HiliteHandler>,
  spec: Option<TableSpec>,
  table: Option<Arc<DataTable>>,
}

impl DataOutPort {
  pub(crate) fn new(index: usize, name: String) -> Self {
    Self {
      index,
      name,
      hilite: None,
      spec: None,
      table: None,
    }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn spec(&self) -> Option<&TableSpec> {
    self.spec.as_ref()
  }

  pub(crate) fn set_spec(&mut self, spec: Option<TableSpec>) {
    self.spec = spec;
  }

  pub fn table(&self) -> Option<&Arc<DataTable>> {
    self.table.as_ref()
  }

  pub(crate) fn set_table(&mut self, table: Option<Arc<DataTable>>) {
    self.table = table;
  }

  pub fn hilite_handler(&self) -> Option<&HiliteHandler> {
    self.hilite.as_ref()
  }

  pub(crate) fn set_hilite_handler(&mut self, handler: Option<HiliteHandler>) {
    self.hilite = handler;
  }
}

/// Model-content output port.
#[derive(Debug)]
pub struct ModelOutPort {
  index: usize,
  name: String,
  content: Option<ModelContent>,
}

impl ModelOutPort {
  pub(crate) fn new(index: usize, name: String) -> Self {
    Self {
      index,
      name,
      content: None,
    }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn content(&self) -> Option<&ModelContent> {
    self.content.as_ref()
  }

  pub(crate) fn set_content(&mut self, content: Option<ModelContent>) {
    self.content = content;
  }
}
