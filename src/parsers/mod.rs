//! Table parsers turning raw text into typed records.
//!
//! Both parsers share the column datatype model defined here: a datatype tag,
//! an optional format string and the target field name.

pub mod delimited;
pub mod fixed_width;

pub use delimited::ParseDelimited;
pub use fixed_width::ParseFixedWidth;

use crate::config::{self, ConfigMap};
use crate::error::{FunctionError, Result};
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    String,
    Integer,
    Decimal,
    Date,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Integer => "integer",
            Datatype::Decimal => "decimal",
            Datatype::Date => "date",
        }
    }
}

impl FromStr for Datatype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Datatype::String),
            "integer" => Ok(Datatype::Integer),
            "decimal" => Ok(Datatype::Decimal),
            "date" => Ok(Datatype::Date),
            other => Err(format!(
                "unsupported datatype '{}' (expected string, integer, decimal or date)",
                other
            )),
        }
    }
}

/// Parse a date/time with a strftime-style `format`.
///
/// Formats carrying an offset keep it; date-and-time formats without one are
/// read as UTC; date-only formats yield midnight UTC. An empty format means
/// RFC 3339.
pub fn parse_date(raw: &str, format: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    if format.is_empty() {
        return DateTime::parse_from_rfc3339(raw);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, format) {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
        return Ok(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(raw, format)
        .map(|date| date.and_time(NaiveTime::default()).and_utc().fixed_offset())
}

/// Conversion rule for one column: datatype, format and target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub datatype: Datatype,
    /// Datatype-specific format (dates only)
    pub format: String,
    pub field_name: String,
}

impl Conversion {
    /// Read `datatype`, `format` and `fieldName` from a column mapping.
    ///
    /// `fieldName` may be omitted only when `field_name_optional` is set; the
    /// field name is then left empty for the caller to fill.
    pub fn from_config(column: &ConfigMap, field_name_optional: bool) -> Result<Self> {
        let datatype = config::required_str(column, "datatype")?
            .parse::<Datatype>()
            .map_err(|reason| FunctionError::config("datatype", reason))?;
        let format = config::optional_str(column, "format")?.unwrap_or_default();
        let field_name = if field_name_optional {
            config::optional_str(column, "fieldName")?.unwrap_or_default()
        } else {
            config::required_str(column, "fieldName")?
        };

        Ok(Self {
            datatype,
            format,
            field_name,
        })
    }

    /// Convert a raw cell.
    ///
    /// Strings are kept verbatim and numbers are parsed as-is; dates are
    /// trimmed before parsing.
    pub fn convert(&self, raw: &str) -> Result<Value> {
        match self.datatype {
            Datatype::String => Ok(Value::String(raw.to_string())),
            Datatype::Integer => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| self.conversion_error(raw, e)),
            Datatype::Decimal => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| self.conversion_error(raw, e)),
            Datatype::Date => parse_date(raw.trim(), &self.format)
                .map(Value::DateTime)
                .map_err(|e| self.conversion_error(raw, e)),
        }
    }

    fn conversion_error(&self, raw: &str, reason: impl std::fmt::Display) -> FunctionError {
        FunctionError::Conversion {
            field: self.field_name.clone(),
            datatype: self.datatype.as_str(),
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Read the list under `columns`, handing each mapping and its index to `build`.
pub(crate) fn parse_columns<T, F>(config: &ConfigMap, mut build: F) -> Result<Vec<T>>
where
    F: FnMut(&ConfigMap, usize) -> Result<T>,
{
    config::required_array(config, "columns")?
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let column = config::object_at(value, "columns", i)?;
            build(column, i).map_err(|e| match e {
                FunctionError::Config { key, reason } => {
                    FunctionError::config(format!("columns[{}].{}", i, key), reason)
                }
                other => other,
            })
        })
        .collect()
}
