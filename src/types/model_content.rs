//! Serialized side-channel payload passed between nodes via model ports.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Side-channel payload (e.g. a trained model) exchanged through model
/// ports, distinct from tabular data. A thin wrapper around a settings tree
/// so content serializes the same way configuration does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelContent {
  tree: Settings,
}

impl ModelContent {
  pub fn new(key: impl Into<String>) -> Self {
    Self {
      tree: Settings::new(key),
    }
  }

  pub fn from_tree(tree: Settings) -> Self {
    Self { tree }
  }

  pub fn tree(&self) -> &Settings {
    &self.tree
  }

  pub fn tree_mut(&mut self) -> &mut Settings {
    &mut self.tree
  }
}
