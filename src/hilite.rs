//! Row-mark routing handle shared along data edges.
//!
//! A [HiliteHandler] carries the set of currently marked row keys. Cloning a
//! handler shares the underlying mark set, so every node on a routing path
//! observes the same marks. Which handler an output port exposes is decided
//! by the node's model.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Shared set of marked row keys.
#[derive(Debug, Clone, Default)]
pub struct HiliteHandler {
  marks: Arc<Mutex<HashSet<String>>>,
}

impl HiliteHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hilite(&self, key: impl Into<String>) {
    self.marks.lock().unwrap().insert(key.into());
  }

  pub fn unhilite(&self, key: &str) {
    self.marks.lock().unwrap().remove(key);
  }

  pub fn clear(&self) {
    self.marks.lock().unwrap().clear();
  }

  pub fn is_hilited(&self, key: &str) -> bool {
    self.marks.lock().unwrap().contains(key)
  }

  pub fn num_hilited(&self) -> usize {
    self.marks.lock().unwrap().len()
  }

  /// Whether two handles route to the same mark set.
  pub fn same_route(&self, other: &HiliteHandler) -> bool {
    Arc::ptr_eq(&self.marks, &other.marks)
  }
}
