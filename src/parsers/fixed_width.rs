//! Fixed-width text parser (`parseFixedLength`).

use super::{parse_columns, Conversion};
use crate::config::{self, ConfigMap};
use crate::dataflow::{
    drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter,
    DEFAULT_OUTPUT_PORT,
};
use crate::error::{FunctionError, Result};
use crate::record::{FileEntry, Record};
use std::io::{BufRead, BufReader};

/// A column occupying bytes `[start, start + length)` of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthColumn {
    pub start: usize,
    pub length: usize,
    pub conversion: Conversion,
}

impl FixedWidthColumn {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Slice this column out of `line` (1-based `line_number` for errors).
    fn slice<'l>(&self, line: &'l str, line_number: usize) -> Result<&'l str> {
        line.get(self.start..self.end())
            .ok_or_else(|| FunctionError::OutOfBounds {
                field: self.conversion.field_name.clone(),
                start: self.start,
                end: self.end(),
                line: line_number,
                len: line.len(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthConfig {
    pub has_header_row: bool,
    pub columns: Vec<FixedWidthColumn>,
}

impl FixedWidthConfig {
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let has_header_row = config::optional_bool(config, "hasHeaderRow", false)?;
        let columns = parse_columns(config, |column, _| {
            let start = config::required_usize(column, "start")?;
            let length = config::required_usize(column, "length")?;
            if start.checked_add(length).is_none() {
                return Err(FunctionError::config("length", "column end overflows"));
            }
            Ok(FixedWidthColumn {
                start,
                length,
                conversion: Conversion::from_config(column, false)?,
            })
        })?;

        Ok(Self {
            has_header_row,
            columns,
        })
    }

    /// Decode one line. Every column is trimmed before conversion.
    pub fn parse_line(&self, line: &str, line_number: usize) -> Result<Record> {
        let mut record = Record::new();
        for column in &self.columns {
            let raw = column.slice(line, line_number)?.trim();
            record.set(column.conversion.field_name.clone(), column.conversion.convert(raw)?);
        }
        Ok(record)
    }

    /// Parse every non-blank line of one file.
    ///
    /// The whole file is decoded before anything is returned.
    pub fn parse_file(&self, file: FileEntry) -> Result<Vec<Record>> {
        let filename = file.filename().to_string();
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            if i == 0 && self.has_header_row {
                continue;
            }
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.trim().is_empty() {
                continue;
            }

            records.push(self.parse_line(line, i + 1)?);
        }

        tracing::debug!("Parsed {} records from {}", records.len(), filename);
        Ok(records)
    }
}

/// Parses fixed-width text files into records.
#[derive(Debug, Default)]
pub struct ParseFixedWidth;

impl ParseFixedWidth {
    pub const KEY: &'static str = "parseFixedLength";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Parses Fixed Length Text",
            "Parses a fixed length text file and outputs the records",
            "Data",
        )
    }
}

impl Function for ParseFixedWidth {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let parsed = FixedWidthConfig::from_config(config)?;
            let policy = config::error_policy(config)?;

            let mut records = 0;
            let stats = drain_input(input, policy, |entry| {
                for record in parsed.parse_file(entry.into_file()?)? {
                    output.write_record(DEFAULT_OUTPUT_PORT, record)?;
                    records += 1;
                }
                Ok(())
            })?;

            tracing::info!(
                "parseFixedLength: parsed {} records from {} files ({} skipped)",
                records,
                stats.entries,
                stats.skipped
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::memory::{MemoryInput, MemoryOutput};
    use crate::dataflow::Entry;
    use crate::value::Value;
    use serde_json::json;

    fn run(config: serde_json::Value, text: &str) -> (Result<()>, MemoryOutput) {
        let config = config.as_object().cloned().unwrap();
        let mut input =
            MemoryInput::with_entries(vec![Entry::from(FileEntry::from_bytes("fixed.txt", text))]);
        let mut output = MemoryOutput::new();
        let result = ParseFixedWidth.execute(&mut input, &mut output, &config);
        (result, output)
    }

    #[test]
    fn test_slice_and_trim() {
        let (result, output) = run(
            json!({"columns": [{"start": 0, "length": 3, "datatype": "string", "fieldName": "code"}]}),
            "ABC  rest\n",
        );

        result.unwrap();
        assert_eq!(output.records("default"), &[Record::new().with("code", "ABC")]);
    }

    #[test]
    fn test_typed_columns_with_header() {
        let (result, output) = run(
            json!({
                "hasHeaderRow": true,
                "columns": [
                    {"start": 0, "length": 6, "datatype": "string", "fieldName": "name"},
                    {"start": 6, "length": 4, "datatype": "integer", "fieldName": "qty"},
                    {"start": 10, "length": 6, "datatype": "decimal", "fieldName": "price"},
                    {"start": 16, "length": 10, "datatype": "date", "format": "%Y-%m-%d", "fieldName": "day"}
                ]
            }),
            "NAME  QTY PRICE DAY\r\nwidget  12  2.502024-05-01\r\n\r\n   \ngadget   3 10.002024-05-02\n",
        );

        result.unwrap();
        let records = output.records("default");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some(&Value::from("widget")));
        assert_eq!(records[0].get("qty"), Some(&Value::Int(12)));
        assert_eq!(records[1].get("price"), Some(&Value::Float(10.0)));
        assert!(matches!(records[1].get("day"), Some(Value::DateTime(_))));
    }

    #[test]
    fn test_out_of_bounds_aborts() {
        let (result, output) = run(
            json!({"columns": [{"start": 2, "length": 5, "datatype": "string", "fieldName": "tail"}]}),
            "abcdefg\nabc\n",
        );

        match result {
            Err(FunctionError::OutOfBounds { line, len, ref field, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(len, 3);
                assert_eq!(field, "tail");
            }
            other => panic!("expected out-of-bounds, got {:?}", other),
        }
        assert!(output.records("default").is_empty());
        assert_eq!(output.close_count(), 1);
    }

    #[test]
    fn test_skip_drops_whole_file() {
        let (result, output) = run(
            json!({
                "onEntryError": "skip",
                "columns": [{"start": 0, "length": 2, "datatype": "integer", "fieldName": "n"}]
            }),
            "10\n11\nxx\n12\n",
        );

        result.unwrap();
        assert!(output.records("default").is_empty());
    }

    #[test]
    fn test_missing_start_is_config_error() {
        let (result, _) = run(
            json!({"columns": [{"length": 5, "datatype": "string", "fieldName": "x"}]}),
            "abcdef\n",
        );
        assert!(matches!(result, Err(FunctionError::Config { ref key, .. }) if key == "columns[0].start"));
    }
}
