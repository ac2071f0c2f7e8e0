//! Conversion between record values and engine values, and scope building.

use crate::record::{FileEntry, Record};
use crate::value::Value;
use rhai::{Dynamic, Map, Scope};
use std::path::Path;

/// Name of the map binding that holds the whole record (or file info).
pub const DATA_BINDING: &str = "data";

/// Synthetic description of a file entry exposed to file rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub filename: String,
}

impl FileInfo {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    /// Lower-case extension without the dot; empty when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

impl From<&FileEntry> for FileInfo {
    fn from(entry: &FileEntry) -> Self {
        Self::new(entry.filename())
    }
}

pub fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Int(i) => Dynamic::from(*i),
        Value::Float(f) => Dynamic::from(*f),
        Value::Bool(b) => Dynamic::from(*b),
        Value::DateTime(_) => Dynamic::from(value.to_string()),
        Value::Null => Dynamic::UNIT,
    }
}

pub fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Int(i);
    }
    if let Ok(f) = value.as_float() {
        return Value::Float(f);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if value.is_string() {
        return match value.into_string() {
            Ok(s) => Value::String(s),
            Err(type_name) => Value::String(type_name.to_string()),
        };
    }
    Value::String(value.to_string())
}

/// JavaScript truthiness of an engine value.
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(i) = value.as_int() {
        return i != 0;
    }
    if let Ok(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if value.is_string() {
        return !value.to_string().is_empty();
    }
    true
}

/// Scope exposing each record field as a top-level variable plus the whole
/// record as the `data` map. A field named `data` shadows the map.
pub fn record_scope(record: &Record) -> Scope<'static> {
    let mut scope = Scope::new();

    let data: Map = record
        .iter()
        .map(|(name, value)| (name.as_str().into(), to_dynamic(value)))
        .collect();
    scope.push_dynamic(DATA_BINDING, Dynamic::from_map(data));

    for (name, value) in record.iter() {
        scope.push_dynamic(name.clone(), to_dynamic(value));
    }
    scope
}

/// Scope exposing `filename`, `Filename`, `extension` and the `data` map.
pub fn file_scope(info: &FileInfo) -> Scope<'static> {
    let mut scope = Scope::new();

    let mut data = Map::new();
    data.insert("filename".into(), Dynamic::from(info.filename.clone()));
    data.insert("Filename".into(), Dynamic::from(info.filename.clone()));
    data.insert("extension".into(), Dynamic::from(info.extension()));
    scope.push_dynamic(DATA_BINDING, Dynamic::from_map(data));

    scope.push("filename", info.filename.clone());
    scope.push("Filename", info.filename.clone());
    scope.push("extension", info.extension());
    scope
}
