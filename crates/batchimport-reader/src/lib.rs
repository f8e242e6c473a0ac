//! # batchimport-reader: Record Sources for Identity Imports
//!
//! Opens CSV and JSON input files and exposes what the validation engine
//! needs from them:
//!
//! - [`detect_format`] maps `.csv` / `.json` to an [`InputFormat`].
//! - [`extract_headers`] produces the field names a source declares;
//!   [`read_headers`] does the same for a file path.
//! - [`read_records`] streams records one at a time.
//!
//! [`Reader`] ties a file, its format and the identity schema together.
//!
//! ## Crate Policy
//!
//! - File and decoder failures are wrapped with the path, never interpreted.
//! - Field names are taken verbatim; only set membership is meaningful.

pub mod error;
pub mod format;
pub mod headers;
pub mod records;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use batchimport_schema::{HeaderReport, Schema};

pub use error::ReaderError;
pub use format::{detect_format, InputFormat};
pub use headers::{csv_headers, extract_headers, json_headers};
pub use records::{cell_value, read_records, Record, Records};

/// An input file paired with its format and the schema it is imported into.
#[derive(Debug, Clone)]
pub struct Reader {
    path: PathBuf,
    format: InputFormat,
    schema: Arc<Schema>,
}

impl Reader {
    pub fn new(path: impl Into<PathBuf>, format: InputFormat, schema: Arc<Schema>) -> Self {
        Self {
            path: path.into(),
            format,
            schema,
        }
    }

    /// Build a reader whose format is detected from the file extension.
    ///
    /// # Errors
    ///
    /// [`ReaderError::UnsupportedExtension`] for anything but `.csv`/`.json`.
    pub fn detect(path: impl Into<PathBuf>, schema: Arc<Schema>) -> Result<Self, ReaderError> {
        let path = path.into();
        let format = detect_format(&path)?;
        Ok(Self::new(path, format, schema))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Field names declared by the file.
    pub fn headers(&self) -> Result<Vec<String>, ReaderError> {
        read_headers(&self.path, self.format)
    }

    /// Fail-fast structural validation of the file's field names.
    ///
    /// # Errors
    ///
    /// Any [`Reader::headers`] error, or the first unknown/missing field
    /// wrapped as [`ReaderError::Schema`].
    pub fn validate_headers(&self) -> Result<(), ReaderError> {
        let headers = self.headers()?;
        batchimport_schema::validate_headers(&headers, &self.schema)?;
        Ok(())
    }

    /// Every structural violation of the file's field names.
    pub fn check_headers(&self) -> Result<HeaderReport, ReaderError> {
        let headers = self.headers()?;
        Ok(batchimport_schema::check_headers(&headers, &self.schema))
    }

    /// Stream the file's records.
    pub fn records(&self) -> Result<Records<File>, ReaderError> {
        read_records(open(&self.path)?, self.format, Arc::clone(&self.schema))
    }
}

/// Open a file and extract the field names it declares.
///
/// # Errors
///
/// [`ReaderError::Io`] (carrying the path) if the file cannot be opened,
/// otherwise any [`extract_headers`] error.
pub fn read_headers(path: impl AsRef<Path>, format: InputFormat) -> Result<Vec<String>, ReaderError> {
    let path = path.as_ref();
    let headers = extract_headers(open(path)?, format)?;
    tracing::debug!(
        path = %path.display(),
        format = %format,
        fields = headers.len(),
        "extracted headers"
    );
    Ok(headers)
}

fn open(path: &Path) -> Result<File, ReaderError> {
    File::open(path).map_err(|source| ReaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}
