//! # flowbench
//!
//! Node lifecycle engine for dataflow workbench graphs.
//!
//! A [Node] is the basic processing unit within a workflow graph: it owns a
//! user-supplied [model::NodeModel], typed input/output ports, and a status,
//! and drives the configure/execute/reset lifecycle. The workflow driver
//! wires edges and notifies nodes through the `inport_*` methods; nodes
//! report every transition to registered [listener::NodeStateListener]s.
//!
//! ## Modules
//!
//! - [types]: statuses, specs, tables, model content, memory policies.
//! - [settings] / [settings_xml]: the persisted key-value tree.
//! - [context]: cancellation-aware execution context and data containers.
//! - [node] / [node_io]: the coordinator and its on-disk state.

pub mod context;
pub mod editor;
#[cfg(test)]
mod editor_test;
pub mod error;
pub mod factory;
pub mod hilite;
pub mod listener;
pub mod model;
pub mod node;
pub mod node_io;
pub mod port;
pub mod settings;
pub mod settings_xml;
#[cfg(test)]
mod testutil;
pub mod types;

pub use context::{CancelHandle, DataContainer, ExecutionContext};
pub use error::{
  CanceledError, ConfigureFailure, ExecuteFailure, PersistenceError, SettingsError, TableError,
};
pub use factory::NodeFactory;
pub use hilite::HiliteHandler;
pub use listener::NodeStateListener;
pub use model::{ContainerModel, Model, NodeModel};
pub use node::Node;
pub use node_io::{load_node, save_node, SETTINGS_FILE_NAME};
pub use port::{PeerOutput, PortRef};
pub use settings::{Settings, SettingsValue};
pub use types::{
  Cell, ColumnSpec, ColumnType, DataTable, MemoryPolicy, ModelContent, NodeStatus, Row, TableSpec,
};
