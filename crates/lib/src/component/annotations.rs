//! Provenance annotations attached to generated components.

use std::io;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::Formatter;

use tracing::warn;

use crate::git::GitInfo;

pub const CLOUD_PIPELINES_KEY: &str = "cloud_pipelines.net";
pub const GENERATED_BY_KEY: &str = "components new regenerate python-function-component";
pub const PYTHON_ORIGINAL_CODE_KEY: &str = "python_original_code";
pub const PYTHON_DEPENDENCIES_KEY: &str = "python_dependencies";

/// Insertion-ordered string map, serialized as a YAML mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(Vec<(String, String)>);

impl Annotations {
  /// Set `key`, replacing an existing value in place.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    match self.0.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.0.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|(k, _)| k.as_str())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Serialize for Annotations {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (key, value) in &self.0 {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}

/// JSON in the layout of Python's `json.dumps` defaults: `", "` and `": "`
/// separators and non-ASCII characters escaped.
struct PythonJsonFormatter;

impl Formatter for PythonJsonFormatter {
  fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
    if first { Ok(()) } else { writer.write_all(b", ") }
  }

  fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
    if first { Ok(()) } else { writer.write_all(b", ") }
  }

  fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
    writer.write_all(b": ")
  }

  fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
    for c in fragment.chars() {
      if c.is_ascii() {
        writer.write_all(&[c as u8])?;
      } else {
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
          write!(writer, "\\u{:04x}", unit)?;
        }
      }
    }
    Ok(())
  }
}

fn python_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
  let mut buffer = Vec::new();
  let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PythonJsonFormatter);
  value.serialize(&mut serializer)?;
  // The formatter only ever writes ASCII.
  Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Assemble the provenance of a component generated from `source`.
///
/// Dependencies are recorded as a JSON list only when there are any. Git
/// fields are added for whatever the probe found.
pub fn provenance(source: &str, dependencies: Option<&[String]>, git: Option<&GitInfo>) -> Annotations {
  let mut annotations = Annotations::default();
  annotations.insert(CLOUD_PIPELINES_KEY, "true");
  annotations.insert(GENERATED_BY_KEY, "true");
  annotations.insert(PYTHON_ORIGINAL_CODE_KEY, source);

  if let Some(dependencies) = dependencies.filter(|d| !d.is_empty()) {
    match python_json(dependencies) {
      Ok(json) => annotations.insert(PYTHON_DEPENDENCIES_KEY, json),
      Err(e) => warn!(error = %e, "failed to serialize dependencies"),
    }
  }

  if let Some(git) = git {
    for (key, value) in git.annotations() {
      annotations.insert(key, value);
    }
  }

  annotations
}
