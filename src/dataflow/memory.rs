//! In-memory port implementation.
//!
//! Backs the local runner and the test-suite: input ports are pre-filled
//! queues of entries, output ports collect records and files per port name.

use super::{Entry, FileWriter, InputReader, OutputWriter, PortReader, DEFAULT_INPUT_PORT};
use crate::error::{FunctionError, Result};
use crate::record::Record;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::io::{self, Write};

/// Input port backed by a queue of entries.
#[derive(Debug, Default)]
pub struct MemoryPortReader {
    entries: VecDeque<Entry>,
    opened: bool,
}

impl MemoryPortReader {
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            opened: false,
        }
    }

    pub fn push(&mut self, entry: impl Into<Entry>) {
        self.entries.push_back(entry.into());
    }
}

impl PortReader for MemoryPortReader {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> bool {
        self.opened && !self.entries.is_empty()
    }

    fn next(&mut self) -> Result<Entry> {
        if !self.opened {
            return Err(FunctionError::Port {
                port: DEFAULT_INPUT_PORT.to_string(),
                reason: "read before open".to_string(),
            });
        }
        self.entries.pop_front().ok_or_else(|| FunctionError::Port {
            port: DEFAULT_INPUT_PORT.to_string(),
            reason: "no more entries".to_string(),
        })
    }
}

/// Named input ports held in memory.
#[derive(Debug, Default)]
pub struct MemoryInput {
    ports: IndexMap<String, MemoryPortReader>,
}

impl MemoryInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input with a single default port holding `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut input = Self::new();
        input
            .ports
            .insert(DEFAULT_INPUT_PORT.to_string(), MemoryPortReader::new(entries));
        input
    }

    /// Input with a single default port holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self::with_entries(records.into_iter().map(Entry::Record))
    }

    /// Append an entry to `port`, creating the port if needed.
    pub fn push(&mut self, port: &str, entry: impl Into<Entry>) {
        self.ports.entry(port.to_string()).or_default().push(entry);
    }
}

impl InputReader for MemoryInput {
    fn port_reader(&mut self, port: &str) -> Result<&mut dyn PortReader> {
        match self.ports.get_mut(port) {
            Some(reader) => Ok(reader as &mut dyn PortReader),
            None => Err(FunctionError::Port {
                port: port.to_string(),
                reason: "no such input port".to_string(),
            }),
        }
    }
}

/// A file written to an output port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

/// Output ports collected in memory.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    records: IndexMap<String, Vec<Record>>,
    files: IndexMap<String, Vec<OutputFile>>,
    close_count: usize,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written to `port`, in write order.
    pub fn records(&self, port: &str) -> &[Record] {
        self.records.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files written to `port`, in close order.
    pub fn files(&self, port: &str) -> &[OutputFile] {
        self.files.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Contents of the file named `filename` on `port`.
    pub fn file(&self, port: &str, filename: &str) -> Option<&[u8]> {
        self.files(port)
            .iter()
            .find(|f| f.filename == filename)
            .map(|f| f.contents.as_slice())
    }

    /// Names of ports that received at least one record.
    pub fn record_ports(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    /// Names of ports that received at least one file.
    pub fn file_ports(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    pub fn is_closed(&self) -> bool {
        self.close_count > 0
    }

    fn ensure_open(&self, port: &str) -> Result<()> {
        if self.is_closed() {
            return Err(FunctionError::Port {
                port: port.to_string(),
                reason: "write after close".to_string(),
            });
        }
        Ok(())
    }
}

impl OutputWriter for MemoryOutput {
    fn write_record(&mut self, port: &str, record: Record) -> Result<()> {
        self.ensure_open(port)?;
        self.records.entry(port.to_string()).or_default().push(record);
        Ok(())
    }

    fn new_file_writer<'a>(
        &'a mut self,
        port: &str,
        filename: &str,
    ) -> Result<Box<dyn FileWriter + 'a>> {
        self.ensure_open(port)?;
        Ok(Box::new(MemoryFileWriter {
            files: self.files.entry(port.to_string()).or_default(),
            filename: filename.to_string(),
            buffer: Vec::new(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.close_count += 1;
        Ok(())
    }
}

/// Buffers a file's bytes until closed, then publishes it on its port.
struct MemoryFileWriter<'a> {
    files: &'a mut Vec<OutputFile>,
    filename: String,
    buffer: Vec<u8>,
}

impl Write for MemoryFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileWriter for MemoryFileWriter<'_> {
    fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.files.push(OutputFile {
            filename: this.filename,
            contents: this.buffer,
        });
        Ok(())
    }
}
