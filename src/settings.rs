//! Nested ordered key-value tree for configuration and status flags.
//!
//! A [Settings] tree is a pure serialization of coordinator and model state:
//! independent of runtime object identity, written on save, read on
//! load/validate. Insertion order is preserved and round-trips through the
//! on-disk document.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// One value in a settings tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingsValue {
  String(String),
  Bool(bool),
  Int(i64),
  Double(f64),
  Child(Settings),
}

impl SettingsValue {
  /// Name of the variant as used in the persisted document and in error
  /// messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      SettingsValue::String(_) => "string",
      SettingsValue::Bool(_) => "bool",
      SettingsValue::Int(_) => "int",
      SettingsValue::Double(_) => "double",
      SettingsValue::Child(_) => "config",
    }
  }
}

/// Nested ordered mapping from string keys to primitives and sub-mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  key: String,
  entries: Vec<(String, SettingsValue)>,
}

impl Settings {
  pub fn new(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      entries: Vec::new(),
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.iter().any(|(k, _)| k == key)
  }

  /// Keys in insertion order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn get(&self, key: &str) -> Option<&SettingsValue> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v)
  }

  /// Inserts `value` under `key`, replacing any previous entry with that key
  /// (keys are unique; replacing keeps the original position).
  pub fn set(&mut self, key: impl Into<String>, value: SettingsValue) {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn add_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.set(key, SettingsValue::String(value.into()));
  }

  pub fn add_bool(&mut self, key: impl Into<String>, value: bool) {
    self.set(key, SettingsValue::Bool(value));
  }

  pub fn add_int(&mut self, key: impl Into<String>, value: i64) {
    self.set(key, SettingsValue::Int(value));
  }

  pub fn add_double(&mut self, key: impl Into<String>, value: f64) {
    self.set(key, SettingsValue::Double(value));
  }

  /// Adds an empty sub-tree under `key` and returns it for population.
  pub fn add_child(&mut self, key: impl Into<String>) -> &mut Settings {
    let key = key.into();
    self.set(key.clone(), SettingsValue::Child(Settings::new(key.clone())));
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some((_, SettingsValue::Child(child))) => child,
      _ => unreachable!("child entry was just inserted"),
    }
  }

  /// Inserts a fully built sub-tree under its own key.
  pub fn put_child(&mut self, child: Settings) {
    self.set(child.key.clone(), SettingsValue::Child(child));
  }

  pub fn get_string(&self, key: &str) -> Result<&str, SettingsError> {
    match self.require(key)? {
      SettingsValue::String(s) => Ok(s),
      _ => Err(self.wrong_type(key, "string")),
    }
  }

  pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
    match self.require(key)? {
      SettingsValue::Bool(b) => Ok(*b),
      _ => Err(self.wrong_type(key, "bool")),
    }
  }

  pub fn get_int(&self, key: &str) -> Result<i64, SettingsError> {
    match self.require(key)? {
      SettingsValue::Int(i) => Ok(*i),
      _ => Err(self.wrong_type(key, "int")),
    }
  }

  pub fn get_double(&self, key: &str) -> Result<f64, SettingsError> {
    match self.require(key)? {
      SettingsValue::Double(d) => Ok(*d),
      _ => Err(self.wrong_type(key, "double")),
    }
  }

  pub fn get_child(&self, key: &str) -> Result<&Settings, SettingsError> {
    match self.require(key)? {
      SettingsValue::Child(c) => Ok(c),
      _ => Err(self.wrong_type(key, "config")),
    }
  }

  pub fn get_child_mut(&mut self, key: &str) -> Result<&mut Settings, SettingsError> {
    let missing = SettingsError::MissingKey(key.to_string());
    let wrong = self.wrong_type(key, "config");
    match self.entries.iter_mut().find(|(k, _)| k == key) {
      Some((_, SettingsValue::Child(c))) => Ok(c),
      Some(_) => Err(wrong),
      None => Err(missing),
    }
  }

  fn require(&self, key: &str) -> Result<&SettingsValue, SettingsError> {
    self
      .get(key)
      .ok_or_else(|| SettingsError::MissingKey(key.to_string()))
  }

  fn wrong_type(&self, key: &str, expected: &'static str) -> SettingsError {
    SettingsError::WrongType {
      key: key.to_string(),
      expected,
    }
  }

  /// Entries in insertion order, for serialization.
  pub(crate) fn entries(&self) -> &[(String, SettingsValue)] {
    &self.entries
  }
}
