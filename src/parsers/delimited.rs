//! Delimited text parser (`parseCSV`).
//!
//! Reads every file on the default input port as delimited text and emits
//! one record per data row. Columns are mapped to fields by header name
//! first, then by position.

use super::{parse_columns, Conversion, Datatype};
use crate::config::{self, ConfigMap};
use crate::dataflow::{
    drain_input, with_output, Function, FunctionSpec, InputReader, OutputWriter,
    DEFAULT_OUTPUT_PORT,
};
use crate::error::{FunctionError, Result};
use crate::record::{FileEntry, Record};
use csv::{ReaderBuilder, StringRecord};
use std::borrow::Cow;

/// One configured column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedColumn {
    /// Header name this column is matched by
    pub column_name: Option<String>,
    /// Zero-based position this column is matched by
    pub index: Option<usize>,
    pub conversion: Conversion,
}

/// Validated `parseCSV` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedConfig {
    pub has_header_row: bool,
    pub use_header_names: bool,
    pub ignore_unmapped: bool,
    pub delimiter: u8,
    pub columns: Vec<DelimitedColumn>,
}

impl DelimitedConfig {
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let has_header_row = config::optional_bool(config, "hasHeaderRow", false)?;
        let use_header_names =
            config::optional_bool(config, "useHeaderColumnNamesAsFieldNames", false)?;
        let ignore_unmapped = config::optional_bool(config, "ignoreUnmappedColumns", false)?;
        let delimiter = config::delimiter(config, "delimiter", b',')?;

        let columns = parse_columns(config, |column, _| {
            let column_name = config::optional_str(column, "columnName")?;
            let index = config::optional_usize(column, "index")?;
            let conversion = Conversion::from_config(column, use_header_names)?;

            if conversion.field_name.is_empty() && column_name.is_none() {
                return Err(FunctionError::config(
                    "fieldName",
                    "required unless the column is named by its header",
                ));
            }

            Ok(DelimitedColumn {
                column_name,
                index,
                conversion,
            })
        })?;

        Ok(Self {
            has_header_row,
            use_header_names,
            ignore_unmapped,
            delimiter,
            columns,
        })
    }

    fn by_header(&self, name: &str) -> Option<&DelimitedColumn> {
        self.columns
            .iter()
            .find(|c| c.column_name.as_deref() == Some(name))
    }

    fn by_index(&self, index: usize) -> Option<&DelimitedColumn> {
        self.columns.iter().find(|c| c.index == Some(index))
    }

    /// Decide how the cell at `position` is converted.
    ///
    /// Returns `None` when the column is skipped.
    fn resolve(&self, position: usize, header: Option<&str>) -> Result<Option<Cow<'_, Conversion>>> {
        let matched = header
            .and_then(|name| self.by_header(name))
            .or_else(|| self.by_index(position));

        if let Some(column) = matched {
            if column.conversion.field_name.is_empty() {
                // Only reachable with header names enabled
                let mut conversion = column.conversion.clone();
                conversion.field_name = header
                    .or(column.column_name.as_deref())
                    .unwrap_or_default()
                    .to_string();
                return Ok(Some(Cow::Owned(conversion)));
            }
            return Ok(Some(Cow::Borrowed(&column.conversion)));
        }

        if self.ignore_unmapped {
            return Ok(None);
        }

        match header {
            Some(name) => Ok(Some(Cow::Owned(Conversion {
                datatype: Datatype::String,
                format: String::new(),
                field_name: name.to_string(),
            }))),
            None => Err(FunctionError::Unsupported(format!(
                "column {} has no mapping and the file has no header row; \
                 map every column or set ignoreUnmappedColumns",
                position
            ))),
        }
    }

    /// Convert one data row into a record.
    pub fn parse_row(&self, row: &StringRecord, header: Option<&StringRecord>) -> Result<Record> {
        let mut record = Record::new();
        for (position, cell) in row.iter().enumerate() {
            let name = header.and_then(|h| h.get(position));
            if let Some(conversion) = self.resolve(position, name)? {
                let value = conversion.convert(cell)?;
                record.set(conversion.field_name.clone(), value);
            }
        }
        Ok(record)
    }

    /// Parse one file into records.
    ///
    /// Nothing is returned unless every row parses, so a rejected file
    /// contributes no records. Every row must have as many fields as the
    /// first row of the file.
    pub fn parse_file(&self, file: FileEntry) -> Result<Vec<Record>> {
        let filename = file.filename().to_string();
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(file);

        let mut rows = reader.records();
        let header = if self.has_header_row {
            match rows.next() {
                Some(row) => Some(row?),
                None => {
                    tracing::debug!("File {} is empty", filename);
                    return Ok(Vec::new());
                }
            }
        } else {
            None
        };

        let mut width = header.as_ref().map(StringRecord::len);
        let mut records = Vec::new();
        for row in rows {
            let row = row?;
            let expected = *width.get_or_insert(row.len());
            if row.len() != expected {
                return Err(FunctionError::Unsupported(format!(
                    "{} line {}: row has {} fields, expected {}",
                    filename,
                    row.position().map_or(0, |p| p.line()),
                    row.len(),
                    expected
                )));
            }
            records.push(self.parse_row(&row, header.as_ref())?);
        }

        tracing::debug!("Parsed {} records from {}", records.len(), filename);
        Ok(records)
    }
}

/// Parses delimited text files into records.
#[derive(Debug, Default)]
pub struct ParseDelimited;

impl ParseDelimited {
    pub const KEY: &'static str = "parseCSV";

    pub fn spec() -> FunctionSpec {
        FunctionSpec::sync(
            Self::KEY,
            "Parses Delimited Text File",
            "Parses delimited text files and outputs the records",
            "File",
        )
    }
}

impl Function for ParseDelimited {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()> {
        with_output(output, |output| {
            let parsed = DelimitedConfig::from_config(config)?;
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
                "parseCSV: parsed {} records from {} files ({} skipped)",
                records,
                stats.entries,
                stats.skipped
            );
            Ok(())
        })
    }
}
