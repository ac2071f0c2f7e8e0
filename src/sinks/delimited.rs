//! Delimited text writer (`generateCSV`).
//!
//! All records on the default input port become rows of one file on the
//! default output port. Fields are extracted in the order given by
//! `headerValue`; missing and null fields are written as empty cells.

use crate::config::{self, ConfigMap};
use crate::dataflow::{
    drain_input, with_output, DrainStats, ErrorPolicy, Function, FunctionSpec, InputReader,
    OutputWriter, DEFAULT_OUTPUT_PORT,
};
use crate::error::{FunctionError, Result};
use crate::record::Record;
use csv::{Terminator, WriterBuilder};
use serde_json::Value as JsonValue;
use std::io::Write;

/// Validated `generateCSV` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedWriterConfig {
    /// Whether `header_values` is written as the first row
    pub header: bool,
    pub header_values: Vec<String>,
    pub delimiter: u8,
    pub filename: String,
}

impl DelimitedWriterConfig {
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let header = match config.get("header") {
            Some(JsonValue::String(s)) => s == "true",
            Some(JsonValue::Bool(b)) => *b,
            _ => false,
        };

        let header_values = config::required_array(config, "headerValue")?
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                JsonValue::String(s) => Ok(s.clone()),
                other => Err(FunctionError::config(
                    format!("headerValue[{}]", i),
                    format!("expected a string, got {}", config::json_type(other)),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        config::required(config, "delimiter")?;
        let delimiter = config::delimiter(config, "delimiter", b',')?;
        let filename = config::required_str(config, "filename")?;

        Ok(Self {
            header,
            header_values,
            delimiter,
            filename,
        })
    }

    /// Cells of `record` in `header_values` order.
    pub fn row(&self, record: &Record) -> Vec<String> {
        self.header_values
            .iter()
            .map(|name| record.get(name).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    /// Write the header (if enabled) and one row per input record to `sink`.
    pub fn write_rows(
        &self,
        input: &mut dyn InputReader,
        policy: ErrorPolicy,
        sink: &mut dyn Write,
    ) -> Result<DrainStats> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(sink);

        if self.header {
            writer.write_record(&self.header_values)?;
        }

        let stats = drain_input(input, policy, |entry| {
            let record = entry.into_record()?;
            writer.write_record(self.row(&record))?;
            Ok(())
        })?;

        writer.flush()?;
        Ok(stats)
    }
}

/// Writes input records to a single delimited text file.
#[derive(Debug, Default)]
pub struct GenerateDelimited;

impl GenerateDelimited {
    pub const KEY: &'static str = "generateCSV";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Writes a file to the data pipeline",
            "Writes a file to the data pipeline",
            "Data",
        )
    }
}

impl Function for GenerateDelimited {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let parsed = DelimitedWriterConfig::from_config(config)?;
            let policy = config::error_policy(config)?;

            let mut file = output.new_file_writer(DEFAULT_OUTPUT_PORT, &parsed.filename)?;
            let written = parsed.write_rows(input, policy, &mut file);
            let closed = file.close();
            let stats = written?;
            closed?;

            tracing::info!(
                "generateCSV: wrote {} rows to {} ({} skipped)",
                stats.entries - stats.skipped,
                parsed.filename,
                stats.skipped
            );
            Ok(())
        })
    }
}
