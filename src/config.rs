//! Function configuration access and loading.
//!
//! Functions receive an untyped key/value map. The accessors here validate one
//! key at a time and report the offending key in a
//! [`FunctionError::Config`].

use crate::dataflow::ErrorPolicy;
use crate::error::{FunctionError, Result};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Untyped configuration handed to [`Function::execute`](crate::Function::execute).
pub type ConfigMap = serde_json::Map<String, JsonValue>;

/// Configuration key selecting the per-entry error policy.
pub const ERROR_POLICY_KEY: &str = "onEntryError";

/// Load a configuration map from a YAML file.
///
/// JSON documents are valid YAML, so both formats are accepted.
///
/// # Errors
/// Returns a configuration error if the file cannot be read, is not valid
/// YAML, or its top level is not a mapping.
///
/// # Example
/// ```ignore
/// use portflow::config::load_config_file;
///
/// let config = load_config_file("split_by_balance.yaml")?;
/// ```
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigMap> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        FunctionError::config(path.display().to_string(), format!("failed to read file: {}", e))
    })?;
    parse_config(&contents).map_err(|e| match e {
        FunctionError::Config { reason, .. } => {
            FunctionError::config(path.display().to_string(), reason)
        }
        other => other,
    })
}

/// Parse a configuration map from YAML text.
pub fn parse_config(text: &str) -> Result<ConfigMap> {
    let value: JsonValue = serde_yaml::from_str(text)
        .map_err(|e| FunctionError::config("<document>", format!("failed to parse YAML: {}", e)))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(FunctionError::config(
            "<document>",
            format!("expected a mapping at the top level, got {}", json_type(&other)),
        )),
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn wrong_type(key: &str, expected: &str, actual: &JsonValue) -> FunctionError {
    FunctionError::config(key, format!("expected {}, got {}", expected, json_type(actual)))
}

fn missing(key: &str) -> FunctionError {
    FunctionError::config(key, "required key is missing")
}

pub fn required<'a>(config: &'a ConfigMap, key: &str) -> Result<&'a JsonValue> {
    config.get(key).ok_or_else(|| missing(key))
}

pub fn required_str(config: &ConfigMap, key: &str) -> Result<String> {
    match required(config, key)? {
        JsonValue::String(s) => Ok(s.clone()),
        other => Err(wrong_type(key, "a string", other)),
    }
}

/// Optional string; an explicit `null` counts as absent.
pub fn optional_str(config: &ConfigMap, key: &str) -> Result<Option<String>> {
    match config.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_type(key, "a string", other)),
    }
}

pub fn optional_bool(config: &ConfigMap, key: &str, default: bool) -> Result<bool> {
    match config.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(JsonValue::Bool(b)) => Ok(*b),
        Some(other) => Err(wrong_type(key, "a boolean", other)),
    }
}

pub fn required_array<'a>(config: &'a ConfigMap, key: &str) -> Result<&'a Vec<JsonValue>> {
    match required(config, key)? {
        JsonValue::Array(items) => Ok(items),
        other => Err(wrong_type(key, "a list", other)),
    }
}

/// Interpret a list element as a nested configuration map.
///
/// `key` and `index` only serve to name the element in errors
/// (e.g. `rules[2]`).
pub fn object_at<'a>(value: &'a JsonValue, key: &str, index: usize) -> Result<&'a ConfigMap> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(wrong_type(&format!("{}[{}]", key, index), "a mapping", other)),
    }
}

fn as_usize(key: &str, value: &JsonValue) -> Result<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).map_err(|_| wrong_type(key, "a non-negative integer", value));
    }
    // Some decoders hand integers over as floats (e.g. 3.0)
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Ok(f as usize),
        _ => Err(wrong_type(key, "a non-negative integer", value)),
    }
}

pub fn required_usize(config: &ConfigMap, key: &str) -> Result<usize> {
    as_usize(key, required(config, key)?)
}

pub fn optional_usize(config: &ConfigMap, key: &str) -> Result<Option<usize>> {
    match config.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => as_usize(key, value).map(Some),
    }
}

/// Resolve a single-character delimiter.
///
/// An absent key or an empty string yields `default`. Delimiters must be one
/// ASCII character since the delimited reader and writer operate on bytes.
pub fn delimiter(config: &ConfigMap, key: &str, default: u8) -> Result<u8> {
    let Some(text) = optional_str(config, key)? else {
        return Ok(default);
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(default),
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(_), None) => Err(FunctionError::config(key, "delimiter must be an ASCII character")),
        _ => Err(FunctionError::config(
            key,
            format!("delimiter can only be a single character, got '{}'", text),
        )),
    }
}

/// Read the per-entry error policy (`onEntryError`), defaulting to fail-fast.
pub fn error_policy(config: &ConfigMap) -> Result<ErrorPolicy> {
    match optional_str(config, ERROR_POLICY_KEY)?.as_deref() {
        None | Some("fail") => Ok(ErrorPolicy::FailFast),
        Some("skip") => Ok(ErrorPolicy::SkipEntry),
        Some(other) => Err(FunctionError::config(
            ERROR_POLICY_KEY,
            format!("expected \"fail\" or \"skip\", got \"{}\"", other),
        )),
    }
}
