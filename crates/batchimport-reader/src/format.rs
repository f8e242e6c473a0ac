//! # Input Formats
//!
//! The only file-format contract the importer defines: `.csv` files are
//! delimited text with a header row, `.json` files hold either an array of
//! objects or a single object.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ReaderError;

/// Supported record source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Delimited text; the first row names the fields.
    Csv,
    /// A JSON array of objects, or a single JSON object.
    Json,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(ReaderError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Detect the format from a file name's extension.
///
/// The match is exact: `.csv` or `.json`, lowercase.
///
/// # Errors
///
/// [`ReaderError::UnsupportedExtension`] for any other extension,
/// including none at all.
pub fn detect_format(path: impl AsRef<Path>) -> Result<InputFormat, ReaderError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(InputFormat::Csv),
        Some("json") => Ok(InputFormat::Json),
        other => Err(ReaderError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension: other.map(|e| format!(".{e}")).unwrap_or_default(),
        }),
    }
}
