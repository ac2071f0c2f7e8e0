//! NDJSON reading and writing for records.
//!
//! Used by the runner to feed records into a function and to persist the
//! records collected on each output port.

use crate::record::Record;
use serde::Serialize;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Error type for serialization operations
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: expected a JSON object")]
    NotAnObject { line: usize },
}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes values as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write a single value as an NDJSON line
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, values: &[T]) -> Result<(), SerializationError> {
        for value in values {
            self.write(value)?;
        }
        Ok(())
    }

    /// Number of lines written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read one record per non-blank line.
///
/// JSON numbers become integers when integral and floats otherwise; nested
/// arrays and objects are kept as their JSON text.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>, SerializationError> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)?;
        let record = Record::from_json(value).ok_or(SerializationError::NotAnObject { line: i + 1 })?;
        records.push(record);
    }
    Ok(records)
}
