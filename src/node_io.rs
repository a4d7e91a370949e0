//! Save/load of node state to a node directory.
//!
//! Layout under a node directory:
//!
//! - `settings.xml`: the settings tree (name, lifecycle flags, misc and
//!   model settings, data/model file references).
//! - `data/port_<i>/spec.json` + `rows.json`: per data output port.
//! - `model_<i>.json`: per model output port.
//! - `internal/`: model-private state.
//!
//! The document keys are a stable contract; loaders tolerate sections older
//! writers did not produce (a missing misc section falls back to the
//! default memory policy).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::context::ExecutionContext;
use crate::error::PersistenceError;
use crate::node::{
  panic_message, Node, CFG_IS_CONFIGURED, CFG_IS_EXECUTED, CFG_MISC_SETTINGS, CFG_MODEL, CFG_NAME,
};
use crate::settings::Settings;
use crate::settings_xml;
use crate::types::{DataTable, ModelContent, NodeStatus, Row, TableSpec};

/// Node settings document file name.
pub const SETTINGS_FILE_NAME: &str = "settings.xml";
/// Directory for model-private state below the node directory.
const INTERN_DIR: &str = "internal";
/// Directory for output port payloads below the node directory.
const DATA_DIR: &str = "data";

const CFG_SAVED_AT: &str = "saved_at";
const CFG_DATA: &str = "data";
const CFG_DATA_DIR_KEY: &str = "data_files_directory";
const CFG_HAS_SPEC: &str = "has_output_spec";
const CFG_MODEL_FILES: &str = "model_files";
const CFG_OUTPUT_PREFIX: &str = "output_";

const SPEC_FILE: &str = "spec.json";
const ROWS_FILE: &str = "rows.json";

fn data_port_dir_name(index: usize) -> String {
  format!("port_{index}")
}

fn model_file_name(index: usize) -> String {
  format!("model_{index}.json")
}

/// Saves node settings and all internal structures (specs, rows, model
/// contents, model internals) to `node_dir`. Skipped entirely while the
/// node is marked saved.
pub fn save_node(
  node: &mut Node,
  node_dir: &Path,
  ctx: &ExecutionContext,
) -> Result<(), PersistenceError> {
  if node.is_currently_saved() {
    debug!(node = %node.name(), "output already saved, skipping");
    return Ok(());
  }
  info!(node = %node.name(), dir = %node_dir.display(), "saving node");
  std::fs::create_dir_all(node_dir)?;
  node.set_node_dir(node_dir.to_path_buf());

  let mut settings = Settings::new(SETTINGS_FILE_NAME);
  node.save_settings(&mut settings);
  settings.add_string(CFG_SAVED_AT, Utc::now().to_rfc3339());

  let data_dir = node_dir.join(DATA_DIR);
  if node.is_configured() || node.is_executed() {
    if data_dir.exists() {
      std::fs::remove_dir_all(&data_dir)?;
    }
    std::fs::create_dir_all(&data_dir)?;
    let executed = node.is_executed();
    let data_settings = settings.add_child(CFG_DATA);
    data_settings.add_string(CFG_DATA_DIR_KEY, DATA_DIR);
    for i in 0..node.nr_data_out_ports() {
      ctx.check_canceled()?;
      let dir_name = data_port_dir_name(i);
      let port_dir = data_dir.join(&dir_name);
      std::fs::create_dir_all(&port_dir)?;
      let port_settings = data_settings.add_child(format!("{CFG_OUTPUT_PREFIX}{i}"));
      port_settings.add_string(CFG_DATA_DIR_KEY, dir_name);
      let port = node.data_out_port(i);
      match port.spec() {
        Some(spec) => {
          port_settings.add_bool(CFG_HAS_SPEC, true);
          let file = File::create(port_dir.join(SPEC_FILE))?;
          serde_json::to_writer_pretty(BufWriter::new(file), spec)?;
        }
        None => port_settings.add_bool(CFG_HAS_SPEC, false),
      }
      if executed {
        if let Some(table) = port.table() {
          table.write_rows(&port_dir.join(ROWS_FILE))?;
        }
      }
    }
  } else if data_dir.exists() {
    std::fs::remove_dir_all(&data_dir)?;
  }

  if !node.is_auto_executable() {
    let intern_dir = node_dir.join(INTERN_DIR);
    // may exist from a previous save
    if intern_dir.exists() {
      std::fs::remove_dir_all(&intern_dir)?;
    }
    if node.is_executed() {
      std::fs::create_dir_all(&intern_dir)?;
      let model = node.model().as_model();
      let saved = catch_unwind(AssertUnwindSafe(|| model.save_internals(&intern_dir)));
      match saved {
        Ok(Ok(())) => node.process_model_warnings(),
        Ok(Err(e)) => {
          debug!(node = %node.name(), "save_internals failed: {e}");
          node.record_and_broadcast(NodeStatus::Error(format!("unable to save internals: {e}")));
        }
        Err(payload) => {
          let msg = panic_message(payload.as_ref());
          error!(
            target: "flowbench::coding",
            node = %node.name(),
            "save_internals should only fail with I/O errors: {msg}"
          );
          node.record_and_broadcast(NodeStatus::Error(format!("unable to save internals: {msg}")));
        }
      }
    }
  }

  let executed = node.is_executed();
  let model_files = settings.add_child(CFG_MODEL_FILES);
  for i in 0..node.nr_model_out_ports() {
    let file_name = model_file_name(i);
    model_files.add_string(format!("{CFG_OUTPUT_PREFIX}{i}"), file_name.as_str());
    let target = node_dir.join(&file_name);
    // stale file from a previous save
    if target.exists() {
      std::fs::remove_file(&target)?;
    }
    if executed {
      if let Some(content) = node.model_out_port(i).content() {
        let file = File::create(&target)?;
        serde_json::to_writer_pretty(BufWriter::new(file), content)?;
      }
    }
  }

  settings_xml::write_settings_file(&node_dir.join(SETTINGS_FILE_NAME), &settings)?;
  node.set_currently_saved(true);
  Ok(())
}

/// Loads node settings and internal structures from `node_dir`, restoring
/// the configured/executed state persisted there. Previously executed
/// auto-executable nodes are re-executed instead of restored.
pub fn load_node(
  node: &mut Node,
  node_dir: &Path,
  ctx: &ExecutionContext,
) -> Result<(), PersistenceError> {
  let settings_path = node_dir.join(SETTINGS_FILE_NAME);
  if !settings_path.is_file() {
    node.set_lifecycle_flags(false, false);
    return Err(PersistenceError::MissingDirectory(node_dir.to_path_buf()));
  }
  info!(node = %node.name(), dir = %node_dir.display(), "loading node");
  let settings = settings_xml::read_settings_file(&settings_path)?;

  node.set_name(settings.get_string(CFG_NAME)?);

  // misc section may be absent in documents written by older versions
  if settings.contains_key(CFG_MISC_SETTINGS) {
    if let Err(e) = node.load_misc_settings(settings.get_child(CFG_MISC_SETTINGS)?, true) {
      warn!(node = %node.name(), "unable to load settings: {e}");
      node.broadcast(&NodeStatus::Warning(format!("unable to load settings: {e}")));
    }
  }
  let model_settings = settings.get_child(CFG_MODEL)?;
  {
    let model = node.model_mut().as_model_mut();
    let loaded = catch_unwind(AssertUnwindSafe(|| model.load_settings_from(model_settings)));
    match loaded {
      Ok(Ok(())) => {}
      Ok(Err(e)) => {
        warn!(node = %node.name(), "unable to load settings: {e}");
        node.broadcast(&NodeStatus::Warning(format!("unable to load settings: {e}")));
      }
      Err(payload) => {
        return Err(PersistenceError::ModelFault(panic_message(payload.as_ref())));
      }
    }
  }

  let was_configured = settings.get_bool(CFG_IS_CONFIGURED)?;
  let was_executed = settings.get_bool(CFG_IS_EXECUTED)?;
  let executed = if node.is_auto_executable() {
    false
  } else {
    was_executed
  };
  node.set_lifecycle_flags(was_configured, executed);
  node.set_node_dir(node_dir.to_path_buf());

  if node.is_executed() {
    let intern_dir = node_dir.join(INTERN_DIR);
    let model = node.model_mut().as_model_mut();
    let loaded = catch_unwind(AssertUnwindSafe(|| model.load_internals(&intern_dir)));
    match loaded {
      Ok(Ok(())) => node.process_model_warnings(),
      Ok(Err(e)) => {
        debug!(node = %node.name(), "load_internals failed: {e}");
        node.record_and_broadcast(NodeStatus::Error(format!("unable to load internals: {e}")));
      }
      Err(payload) => {
        let msg = panic_message(payload.as_ref());
        error!(
          target: "flowbench::coding",
          node = %node.name(),
          "load_internals should only fail with I/O errors: {msg}"
        );
        node.record_and_broadcast(NodeStatus::Error(format!("unable to load internals: {msg}")));
      }
    }
  }

  if node.is_configured() || node.is_executed() {
    let data_settings = settings.get_child(CFG_DATA)?;
    let data_dir = node_dir.join(data_settings.get_string(CFG_DATA_DIR_KEY)?);
    for i in 0..node.nr_data_out_ports() {
      ctx.check_canceled()?;
      let port_settings = data_settings.get_child(&format!("{CFG_OUTPUT_PREFIX}{i}"))?;
      let port_dir = data_dir.join(port_settings.get_string(CFG_DATA_DIR_KEY)?);
      if !port_dir.is_dir() {
        return Err(PersistenceError::MissingDirectory(port_dir));
      }
      let has_spec = if port_settings.contains_key(CFG_HAS_SPEC) {
        port_settings.get_bool(CFG_HAS_SPEC)?
      } else {
        true
      };
      let spec = if has_spec {
        let file = File::open(port_dir.join(SPEC_FILE))?;
        Some(serde_json::from_reader::<_, TableSpec>(BufReader::new(
          file,
        ))?)
      } else {
        None
      };
      node.out_data_port_mut(i).set_spec(spec.clone());
      if node.is_executed() {
        let file = File::open(port_dir.join(ROWS_FILE))?;
        let rows: Vec<Row> = serde_json::from_reader(BufReader::new(file))?;
        let table = DataTable::in_memory(spec.unwrap_or_default(), rows);
        node.out_data_port_mut(i).set_table(Some(Arc::new(table)));
      }
    }
  }

  if node.is_executed() {
    let model_files = settings.get_child(CFG_MODEL_FILES)?;
    for i in 0..node.nr_model_out_ports() {
      let file_name = model_files.get_string(&format!("{CFG_OUTPUT_PREFIX}{i}"))?;
      let file = File::open(node_dir.join(file_name))?;
      let content: ModelContent = serde_json::from_reader(BufReader::new(file))?;
      node.out_model_port_mut(i).set_content(Some(content));
    }
    node.set_currently_saved(true);
  }

  if was_executed && node.is_auto_executable() {
    node.execute(ctx);
  }
  Ok(())
}
