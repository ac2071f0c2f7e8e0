//! Error type shared by every function in the catalog.
//!
//! Errors are grouped into a small taxonomy ([`ErrorKind`]) so callers can
//! decide how to react without matching on every variant.

use thiserror::Error;

/// Coarse classification of a [`FunctionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required configuration key is absent or has the wrong shape.
    Configuration,
    /// A cell's text cannot be parsed to its declared datatype.
    Conversion,
    /// An entry or operand is not of the expected kind.
    TypeMismatch,
    /// Unknown comparator, unsupported operator/type combination, script fault.
    Unsupported,
    /// Port, filesystem or stream failure.
    Io,
}

/// Error returned by a function invocation.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("Invalid configuration for '{key}': {reason}")]
    Config { key: String, reason: String },

    #[error("Cannot convert '{raw}' to {datatype} for field '{field}': {reason}")]
    Conversion {
        field: String,
        datatype: &'static str,
        raw: String,
        reason: String,
    },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Column '{field}' slice [{start}, {end}) is out of bounds on line {line} (length {len})")]
    OutOfBounds {
        field: String,
        start: usize,
        end: usize,
        line: usize,
        len: usize,
    },

    #[error("Script error in `{source_text}`: {message}")]
    Script { source_text: String, message: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Delimited text error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Port '{port}': {reason}")]
    Port { port: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FunctionError {
    /// Build a configuration error for `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FunctionError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FunctionError::Config { .. } => ErrorKind::Configuration,
            FunctionError::Conversion { .. } => ErrorKind::Conversion,
            FunctionError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            FunctionError::Unsupported(_)
            | FunctionError::OutOfBounds { .. }
            | FunctionError::Script { .. }
            | FunctionError::Pattern(_) => ErrorKind::Unsupported,
            FunctionError::Csv(_) | FunctionError::Port { .. } | FunctionError::Io(_) => {
                ErrorKind::Io
            }
        }
    }

    /// Whether the failure concerns a single entry rather than the whole
    /// invocation. Only these errors may be skipped under
    /// [`ErrorPolicy::SkipEntry`](crate::dataflow::ErrorPolicy).
    pub fn is_entry_scoped(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Io)
    }
}

pub type Result<T, E = FunctionError> = std::result::Result<T, E>;
