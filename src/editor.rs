//! Headless settings editor: staging area for a node's configuration.
//!
//! Stands in for the original workbench dialog. The owning node fills the
//! editor with its current model and misc settings; callers edit the staged
//! tree and ask the node to validate or apply it.

use crate::settings::Settings;

/// Staged settings tree, owned by a node and lazily created.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsEditor {
  settings: Settings,
}

impl SettingsEditor {
  pub(crate) fn new(settings: Settings) -> Self {
    Self { settings }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut Settings {
    &mut self.settings
  }

  pub(crate) fn replace(&mut self, settings: Settings) {
    self.settings = settings;
  }
}
