//! XML (de)serialization of [Settings] trees.
//!
//! The persisted document is a stable on-disk contract: a nested `<config>`
//! tree whose leaves are `<entry key=".." type=".." value=".."/>` elements.
//! Readers must tolerate sections that older writers did not produce;
//! callers handle that by probing `contains_key` before descending.

use std::path::Path;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::instrument;

use crate::error::PersistenceError;
use crate::settings::{Settings, SettingsValue};

/// Serializes a settings tree to an XML document string.
pub fn to_xml(settings: &Settings) -> String {
  let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
  write_config(&mut out, settings, 0);
  out
}

fn indent(out: &mut String, depth: usize) {
  for _ in 0..depth {
    out.push_str("  ");
  }
}

fn write_config(out: &mut String, settings: &Settings, depth: usize) {
  indent(out, depth);
  out.push_str(&format!("<config key=\"{}\">\n", escape(settings.key())));
  for (key, value) in settings.entries() {
    match value {
      SettingsValue::Child(child) => write_config(out, child, depth + 1),
      leaf => {
        let rendered = match leaf {
          SettingsValue::String(s) => s.clone(),
          SettingsValue::Bool(b) => b.to_string(),
          SettingsValue::Int(i) => i.to_string(),
          SettingsValue::Double(d) => d.to_string(),
          SettingsValue::Child(_) => unreachable!("handled above"),
        };
        indent(out, depth + 1);
        out.push_str(&format!(
          "<entry key=\"{}\" type=\"{}\" value=\"{}\"/>\n",
          escape(key),
          leaf.type_name(),
          escape(&rendered)
        ));
      }
    }
  }
  indent(out, depth);
  out.push_str("</config>\n");
}

/// Parses a settings tree from an XML document string.
pub fn from_xml(xml: &str) -> Result<Settings, PersistenceError> {
  let mut reader = Reader::from_str(xml);
  let mut stack: Vec<Settings> = Vec::new();
  let mut root: Option<Settings> = None;

  loop {
    match reader.read_event().map_err(xml_err)? {
      Event::Start(e) if e.name().as_ref() == b"config" => {
        let key = attr(&e, "key")?.ok_or_else(|| malformed("config without key"))?;
        stack.push(Settings::new(key));
      }
      Event::Empty(e) if e.name().as_ref() == b"config" => {
        let key = attr(&e, "key")?.ok_or_else(|| malformed("config without key"))?;
        let child = Settings::new(key);
        match stack.last_mut() {
          Some(parent) => parent.put_child(child),
          None => root = Some(child),
        }
      }
      Event::Empty(e) if e.name().as_ref() == b"entry" => {
        let parent = stack
          .last_mut()
          .ok_or_else(|| malformed("entry outside of config"))?;
        let key = attr(&e, "key")?.ok_or_else(|| malformed("entry without key"))?;
        let kind = attr(&e, "type")?.ok_or_else(|| malformed("entry without type"))?;
        let value = attr(&e, "value")?.ok_or_else(|| malformed("entry without value"))?;
        parent.set(key.clone(), parse_entry(&key, &kind, &value)?);
      }
      Event::End(e) if e.name().as_ref() == b"config" => {
        let finished = stack.pop().ok_or_else(|| malformed("unbalanced config"))?;
        match stack.last_mut() {
          Some(parent) => parent.put_child(finished),
          None => root = Some(finished),
        }
      }
      Event::Eof => break,
      // declaration, comments, whitespace
      _ => {}
    }
  }

  if !stack.is_empty() {
    return Err(malformed("unterminated config element"));
  }
  root.ok_or_else(|| malformed("document holds no config element"))
}

fn parse_entry(key: &str, kind: &str, value: &str) -> Result<SettingsValue, PersistenceError> {
  match kind {
    "string" => Ok(SettingsValue::String(value.to_string())),
    "bool" => value
      .parse()
      .map(SettingsValue::Bool)
      .map_err(|_| malformed(&format!("entry {key} has a non-bool value"))),
    "int" => value
      .parse()
      .map(SettingsValue::Int)
      .map_err(|_| malformed(&format!("entry {key} has a non-int value"))),
    "double" => value
      .parse()
      .map(SettingsValue::Double)
      .map_err(|_| malformed(&format!("entry {key} has a non-double value"))),
    other => Err(malformed(&format!("entry {key} has unknown type {other}"))),
  }
}

fn attr(
  e: &quick_xml::events::BytesStart<'_>,
  name: &str,
) -> Result<Option<String>, PersistenceError> {
  for a in e.attributes() {
    let a = a.map_err(xml_err)?;
    if a.key.as_ref() == name.as_bytes() {
      return Ok(Some(a.unescape_value().map_err(xml_err)?.into_owned()));
    }
  }
  Ok(None)
}

fn xml_err(e: impl std::fmt::Display) -> PersistenceError {
  PersistenceError::Xml(e.to_string())
}

fn malformed(msg: &str) -> PersistenceError {
  PersistenceError::Xml(msg.to_string())
}

/// Writes a settings tree as an XML document to `path`.
#[instrument(level = "trace", skip(path, settings))]
pub fn write_settings_file(path: &Path, settings: &Settings) -> Result<(), PersistenceError> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, to_xml(settings))?;
  Ok(())
}

/// Reads a settings tree from the XML document at `path`.
#[instrument(level = "trace", skip(path))]
pub fn read_settings_file(path: &Path) -> Result<Settings, PersistenceError> {
  let xml = std::fs::read_to_string(path)?;
  from_xml(&xml)
}
