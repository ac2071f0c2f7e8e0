//! Dynamically-typed field values.
//!
//! Every record field holds one [`Value`]. The set of kinds is closed; there is
//! no implicit widening between them except the coercions performed by the
//! comparison engine.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use std::fmt;

/// Represents the value of a single record field
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<FixedOffset>),
    Null,
}

impl Value {
    /// Name of this value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Null => Value::Null,
            // Nested structures are kept as their JSON text
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::String(other.to_string())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Value::from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Float(40.5).to_string(), "40.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "");

        let dt = DateTime::parse_from_rfc3339("2024-03-01T10:15:00+02:00").unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2024-03-01T10:15:00+02:00");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from(json!(50)), Value::Int(50));
        assert_eq!(Value::from(json!(50.25)), Value::Float(50.25));
        assert_eq!(Value::from(json!("M")), Value::String("M".to_string()));
        assert_eq!(Value::from(json!(null)), Value::Null);
        assert_eq!(Value::from(json!([1, 2])), Value::String("[1,2]".to_string()));
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_string(&Value::Int(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&Value::Null).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Float(1.0).type_name(), "float");
        assert_eq!(Value::Null.type_name(), "null");
    }
}
