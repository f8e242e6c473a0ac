//! Reader error types.

use std::path::PathBuf;

use batchimport_schema::{ErrorKind, SchemaError};
use thiserror::Error;

/// Errors raised while opening or decoding a record source.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The file extension does not map to a supported format.
    #[error("unsupported file extension: '{extension}' ({})", path.display())]
    UnsupportedExtension {
        path: PathBuf,
        /// Extension including the leading dot, empty if there is none.
        extension: String,
    },

    /// A declared format name is not supported.
    #[error("unsupported format: '{format}' (expected csv or json)")]
    UnsupportedFormat { format: String },

    /// The source has no header row or first object.
    #[error("input is empty: no header row or first object")]
    EmptyInput,

    /// The source is not shaped like a record stream.
    #[error("invalid JSON format: {detail}")]
    InvalidStructure { detail: String },

    /// Opening or reading the file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from an already-open source failed.
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),

    /// CSV decoding failed.
    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding failed.
    #[error("failed to decode JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// The source's headers do not fit the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ReaderError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedExtension { .. } | Self::UnsupportedFormat { .. } => {
                ErrorKind::UnsupportedFormat
            }
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::InvalidStructure { .. } => ErrorKind::InvalidStructure,
            Self::Io { .. } | Self::Read(_) => ErrorKind::Io,
            Self::Csv(e) if e.is_io_error() => ErrorKind::Io,
            Self::Csv(_) => ErrorKind::InvalidStructure,
            Self::Json(e) if e.is_io() => ErrorKind::Io,
            Self::Json(_) => ErrorKind::InvalidStructure,
            Self::Schema(e) => e.kind(),
        }
    }

    /// The field name this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Schema(e) => e.field(),
            _ => None,
        }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidStructure {
            detail: detail.into(),
        }
    }
}
