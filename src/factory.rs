//! Factory bundling a node's model with its presentation metadata.

use crate::model::Model;

/// Creates the model for a node type and names its ports. A node keeps an
/// immutable reference to the factory that built it.
pub trait NodeFactory: Send + Sync {
  /// Display name of the node type.
  fn node_name(&self) -> &str;

  /// Builds a fresh model instance.
  fn create_model(&self) -> Model;

  fn data_in_port_name(&self, index: usize) -> String {
    format!("Data inport {index}")
  }

  fn data_out_port_name(&self, index: usize) -> String {
    format!("Data outport {index}")
  }

  fn model_in_port_name(&self, index: usize) -> String {
    format!("Model inport {index}")
  }

  fn model_out_port_name(&self, index: usize) -> String {
    format!("Model outport {index}")
  }

  /// Whether this node type ships a settings editor of its own. Nodes with
  /// data outputs always offer at least the memory-policy section.
  fn has_editor(&self) -> bool {
    false
  }
}
