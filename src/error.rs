//! Error types for the ofxkit library.

use crate::types::RecordKind;
use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that stop a parse run.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred while reading the source or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error writing CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The byte stream is not a well-formed document in the selected dialect.
    #[error("Malformed document at byte {offset}: {message}")]
    MalformedDocument { offset: usize, message: String },

    /// No dialect was given and none could be inferred from the header.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// A second account or statement block under a single-record policy.
    #[error("Duplicate top-level {kind} record")]
    DuplicateTopLevelRecord { kind: RecordKind },

    /// The record handler asked for the run to stop.
    #[error("Parse aborted by {kind} handler: {reason}")]
    CallbackAbort { kind: RecordKind, reason: String },

    /// Invalid format name.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Operation not allowed in the current run state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Data-less discriminant of [`Error`], kept by a failed context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Io,
    Csv,
    MalformedDocument,
    UnsupportedDialect,
    DuplicateTopLevelRecord,
    CallbackAbort,
    InvalidFormat,
    InvalidState,
}

impl Error {
    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Csv(_) => ErrorKind::Csv,
            Error::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Error::UnsupportedDialect(_) => ErrorKind::UnsupportedDialect,
            Error::DuplicateTopLevelRecord { .. } => ErrorKind::DuplicateTopLevelRecord,
            Error::CallbackAbort { .. } => ErrorKind::CallbackAbort,
            Error::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Error::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    /// Byte offset into the source, for tokenizer-level errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::MalformedDocument { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub(crate) fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Error::MalformedDocument {
            offset,
            message: message.into(),
        }
    }
}

/// A field whose text failed its decode rule.
///
/// Never fatal: the record is still dispatched with the field absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeWarning {
    /// Record root element the field belongs to (e.g. `STMTTRN`).
    pub element: String,
    /// Tag of the offending field (e.g. `TRNAMT`).
    pub field: String,
    /// Raw text as found in the document.
    pub value: String,
    /// Why the text was rejected.
    pub reason: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}> in <{}>: {} ({:?})",
            self.field, self.element, self.reason, self.value
        )
    }
}
