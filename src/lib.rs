//! # Portflow: Pluggable Record and File Functions
//!
//! Portflow provides a catalog of processing functions for a dataflow
//! orchestrator. Each function reads entries (structured records or whole
//! files) from named input ports, writes entries to named output ports and is
//! driven by a declarative configuration map.
//!
//! ## Features
//!
//! - **Function registry**: key-based catalog constructing a fresh function per invocation
//! - **Parsers**: delimited and fixed-width text into typed records
//! - **Routers**: native field comparisons or scripted conditions choose the output port
//! - **Field derivation**: scripted expressions compute new fields
//! - **Sinks**: delimited text generation and writing files to disk
//!
//! ## Example: Split by Balance
//!
//! ```yaml
//! function: splitOnField
//! config:
//!   defaultOutputPort: ok
//!   rules:
//!     - field: balance
//!       op: "<="
//!       value: 50.00
//!       valueType: literal
//!       outputPort: poor
//! ```
//!
//! ## Example: Route Files by Name
//!
//! ```yaml
//! function: fileRouter
//! config:
//!   defaultOutputPort: other
//!   rules:
//!     - jsCondition: filename.toLowerCase().endsWith(".csv")
//!       outputPort: csv
//! ```

// Core modules
pub mod config;
pub mod dataflow;
pub mod error;
pub mod record;
pub mod registry;
pub mod serialization;
pub mod value;

// Rule evaluation
pub mod compare;
pub mod script;

// Built-in functions
pub mod parsers;
pub mod routers;
pub mod sinks;

// Re-export key types
pub use config::ConfigMap;
pub use dataflow::{
    Entry, ErrorPolicy, FileWriter, Function, FunctionSpec, InputReader, OutputWriter, PortReader,
    DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT,
};
pub use error::{ErrorKind, FunctionError};
pub use record::{FileEntry, Record};
pub use registry::FunctionRegistry;
pub use value::Value;
