//! Tests for the settings editor flow on a node.

use crate::model::Model;
use crate::node::{Node, CFG_MISC_SETTINGS, CFG_MODEL};
use crate::testutil::{factory, int_spec, SourceModel};
use crate::types::MemoryPolicy;

fn source_node() -> Node {
  Node::new(factory("Table Creator", || {
    Model::Plain(Box::new(SourceModel::new("price", vec![1])))
  }))
}

#[test]
fn nodes_with_data_outputs_always_offer_an_editor() {
  let node = source_node();
  assert!(node.has_editor());
}

#[test]
fn open_editor_loads_current_settings() {
  let mut node = source_node();
  let editor = node.open_editor();
  let staged = editor.settings();
  assert_eq!(
    staged.get_child(CFG_MODEL).unwrap().get_string("column").unwrap(),
    "price"
  );
  assert_eq!(
    staged
      .get_child(CFG_MISC_SETTINGS)
      .unwrap()
      .get_string("memory_policy")
      .unwrap(),
    "CacheSmallInMemory"
  );
}

#[test]
fn apply_commits_staged_model_settings() {
  let mut node = source_node();
  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MODEL)
    .unwrap()
    .add_string("column", "amount");
  node.apply_editor_settings().unwrap();
  node.reset_and_configure();
  assert_eq!(node.data_out_port(0).spec(), Some(&int_spec("amount")));
}

#[test]
fn apply_commits_staged_memory_policy() {
  let mut node = source_node();
  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MISC_SETTINGS)
    .unwrap()
    .add_string("memory_policy", "CacheOnDisc");
  node.apply_editor_settings().unwrap();
  assert_eq!(node.memory_policy(), MemoryPolicy::CacheOnDisc);
}

#[test]
fn validate_rejects_bad_staged_settings_without_committing() {
  let mut node = source_node();
  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MODEL)
    .unwrap()
    .add_string("column", "");
  assert!(node.validate_editor_settings().is_err());
  // nothing committed
  node.reset_and_configure();
  assert_eq!(node.data_out_port(0).spec(), Some(&int_spec("price")));
}

#[test]
fn validate_rejects_unknown_memory_policy() {
  let mut node = source_node();
  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MISC_SETTINGS)
    .unwrap()
    .add_string("memory_policy", "KeepForever");
  assert!(node.validate_editor_settings().is_err());
}

#[test]
fn editor_settings_equal_tracks_drift() {
  let mut node = source_node();
  node.open_editor();
  assert!(node.editor_settings_equal());

  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MODEL)
    .unwrap()
    .add_string("column", "amount");
  assert!(!node.editor_settings_equal());

  node.apply_editor_settings().unwrap();
  assert!(node.editor_settings_equal());
}

#[test]
fn apply_without_editor_is_a_noop() {
  let mut node = source_node();
  assert!(node.apply_editor_settings().is_ok());
  assert!(node.editor_settings_equal());
}

#[test]
fn reopening_the_editor_discards_stale_edits() {
  let mut node = source_node();
  node
    .open_editor()
    .settings_mut()
    .get_child_mut(CFG_MODEL)
    .unwrap()
    .add_string("column", "amount");
  // reopening reloads from the node, dropping the uncommitted edit
  let staged = node.open_editor().settings().clone();
  assert_eq!(
    staged.get_child(CFG_MODEL).unwrap().get_string("column").unwrap(),
    "price"
  );
}
