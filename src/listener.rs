//! State-change observers and their registry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error};

use crate::types::NodeStatus;

/// Observer of a node's lifecycle transitions (the workflow driver, a GUI).
pub trait NodeStateListener: Send + Sync {
  fn state_changed(&self, status: &NodeStatus);
}

/// Weak-reference listener registry.
///
/// Notification iterates over a snapshot, so a listener may add or remove
/// listeners re-entrantly without invalidating the iteration. A panicking
/// listener is caught and logged; siblings are still notified.
pub struct ListenerRegistry {
  entries: Mutex<Vec<Weak<dyn NodeStateListener>>>,
}

impl ListenerRegistry {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(Vec::new()),
    }
  }

  /// Registers a listener; ignored if it is already registered.
  pub fn add(&self, listener: &Arc<dyn NodeStateListener>) {
    let mut entries = self.entries.lock().unwrap();
    let weak = Arc::downgrade(listener);
    if entries.iter().any(|w| Weak::ptr_eq(w, &weak)) {
      debug!("listener already registered");
      return;
    }
    entries.push(weak);
  }

  /// Unregisters a listener; ignored if it was not registered.
  pub fn remove(&self, listener: &Arc<dyn NodeStateListener>) {
    let mut entries = self.entries.lock().unwrap();
    let weak = Arc::downgrade(listener);
    let before = entries.len();
    entries.retain(|w| !Weak::ptr_eq(w, &weak));
    if entries.len() == before {
      debug!("listener was not registered");
    }
  }

  pub fn clear(&self) {
    self.entries.lock().unwrap().clear();
  }

  /// Live listener count (dead weak references are pruned first).
  pub fn len(&self) -> usize {
    let mut entries = self.entries.lock().unwrap();
    entries.retain(|w| w.strong_count() > 0);
    entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Notifies all registered listeners of `status`, synchronously and
  /// best-effort.
  pub fn notify(&self, status: &NodeStatus) {
    let snapshot: Vec<Weak<dyn NodeStateListener>> = {
      let mut entries = self.entries.lock().unwrap();
      entries.retain(|w| w.strong_count() > 0);
      entries.clone()
    };
    for weak in snapshot {
      if let Some(listener) = weak.upgrade() {
        if catch_unwind(AssertUnwindSafe(|| listener.state_changed(status))).is_err() {
          error!(status = %status, "listener panicked during state notification");
        }
      }
    }
  }
}

impl Default for ListenerRegistry {
  fn default() -> Self {
    Self::new()
  }
}
