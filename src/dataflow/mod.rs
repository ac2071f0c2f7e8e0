//! Function and port contract between the catalog and its orchestrator.
//!
//! A [`Function`] receives an [`InputReader`] holding its named input ports,
//! an [`OutputWriter`] accepting entries for its named output ports, and an
//! untyped [`ConfigMap`]. It validates the configuration, drains its input
//! and closes its output exactly once on every exit path.

pub mod memory;

use crate::config::ConfigMap;
use crate::error::{FunctionError, Result};
use crate::record::{FileEntry, Record};
use serde::Serialize;
use std::io::{self, Read, Write};

/// Port read when a function declares no explicit input topology.
pub const DEFAULT_INPUT_PORT: &str = "default";

/// Port written when a function declares no explicit output topology.
pub const DEFAULT_OUTPUT_PORT: &str = "default";

/// How a function invocation is executed. Only synchronous execution exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sync,
}

/// Immutable metadata describing a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// Unique key used for registry lookup (e.g. `parseCSV`)
    pub key: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Category tag (`Data`, `File`, ...)
    pub category: String,
    pub execution_mode: ExecutionMode,
    /// Declared input ports; empty means only [`DEFAULT_INPUT_PORT`] is used
    pub input_ports: Vec<String>,
    /// Declared output ports; empty means only [`DEFAULT_OUTPUT_PORT`] is used
    pub output_ports: Vec<String>,
}

impl FunctionSpec {
    /// Spec for a synchronous function using the default port topology.
    pub fn sync(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            execution_mode: ExecutionMode::Sync,
            input_ports: Vec::new(),
            output_ports: Vec::new(),
        }
    }
}

/// One unit flowing through a port.
#[derive(Debug)]
pub enum Entry {
    Record(Record),
    File(FileEntry),
}

impl Entry {
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Record(_) => "record",
            Entry::File(_) => "file",
        }
    }

    /// Take the record, failing with a type mismatch for file entries.
    pub fn into_record(self) -> Result<Record> {
        match self {
            Entry::Record(record) => Ok(record),
            Entry::File(file) => Err(FunctionError::TypeMismatch {
                expected: "record",
                actual: format!("file '{}'", file.filename()),
            }),
        }
    }

    /// Take the file, failing with a type mismatch for record entries.
    pub fn into_file(self) -> Result<FileEntry> {
        match self {
            Entry::File(file) => Ok(file),
            Entry::Record(_) => Err(FunctionError::TypeMismatch {
                expected: "file",
                actual: "record".to_string(),
            }),
        }
    }
}

impl From<Record> for Entry {
    fn from(record: Record) -> Self {
        Entry::Record(record)
    }
}

impl From<FileEntry> for Entry {
    fn from(file: FileEntry) -> Self {
        Entry::File(file)
    }
}

/// Pull-style reader over one input port.
pub trait PortReader {
    fn open(&mut self) -> Result<()>;
    fn has_next(&mut self) -> bool;
    fn next(&mut self) -> Result<Entry>;
}

/// The set of input ports handed to a function.
pub trait InputReader {
    fn port_reader(&mut self, port: &str) -> Result<&mut dyn PortReader>;
}

/// Writer for a single file opened on an output port.
///
/// The file is only handed downstream once [`FileWriter::close`] succeeds.
pub trait FileWriter: Write {
    fn close(self: Box<Self>) -> Result<()>;
}

/// The set of output ports handed to a function.
pub trait OutputWriter {
    /// Write one record; ownership moves to the port.
    fn write_record(&mut self, port: &str, record: Record) -> Result<()>;

    /// Open a new file on `port`. The writer must be closed once fully written.
    fn new_file_writer<'a>(
        &'a mut self,
        port: &str,
        filename: &str,
    ) -> Result<Box<dyn FileWriter + 'a>>;

    /// Release the output. Called exactly once by the owning function.
    fn close(&mut self) -> Result<()>;
}

/// A processing unit in the catalog.
///
/// Instances are created fresh per invocation by the
/// [`FunctionRegistry`](crate::FunctionRegistry) and are not required to be
/// reentrant.
pub trait Function: Send {
    fn execute(
        &mut self,
        input: &mut dyn InputReader,
        output: &mut dyn OutputWriter,
        config: &ConfigMap,
    ) -> Result<()>;
}

/// What to do when processing a single entry fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole invocation on the first error.
    #[default]
    FailFast,
    /// Log entry-scoped errors, drop the entry and continue. Configuration,
    /// port and IO errors still abort.
    SkipEntry,
}

/// Run `body` against `output`, then close `output` whatever the outcome.
///
/// The body's error takes precedence over a close error.
pub fn with_output<F>(output: &mut dyn OutputWriter, body: F) -> Result<()>
where
    F: FnOnce(&mut dyn OutputWriter) -> Result<()>,
{
    let result = body(&mut *output);
    let closed = output.close();
    result.and(closed)
}

/// Stream `source` into a new file on `port` and close the file writer.
///
/// Returns the number of bytes copied. The file writer is closed on every
/// path.
pub fn copy_into(
    output: &mut dyn OutputWriter,
    port: &str,
    filename: &str,
    source: &mut dyn Read,
) -> Result<u64> {
    let mut writer = output.new_file_writer(port, filename)?;
    let copied = io::copy(source, &mut writer).map_err(FunctionError::from);
    let closed = writer.close();
    let size = copied?;
    closed?;
    Ok(size)
}

/// Counters reported by [`drain_input`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub entries: usize,
    pub skipped: usize,
}

/// Open the default input port and hand every entry to `handle`.
///
/// Errors from `handle` abort the loop unless `policy` is
/// [`ErrorPolicy::SkipEntry`] and the error is entry-scoped.
pub fn drain_input<F>(
    input: &mut dyn InputReader,
    policy: ErrorPolicy,
    mut handle: F,
) -> Result<DrainStats>
where
    F: FnMut(Entry) -> Result<()>,
{
    let reader = input.port_reader(DEFAULT_INPUT_PORT)?;
    reader.open()?;

    let mut stats = DrainStats::default();
    while reader.has_next() {
        let entry = reader.next()?;
        stats.entries += 1;

        match handle(entry) {
            Ok(()) => {}
            Err(err) if policy == ErrorPolicy::SkipEntry && err.is_entry_scoped() => {
                stats.skipped += 1;
                tracing::warn!("Skipping entry {}: {}", stats.entries, err);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(stats)
}
