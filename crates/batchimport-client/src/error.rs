//! Schema fetch error types.

use std::path::PathBuf;

use batchimport_schema::{ErrorKind, SchemaError};

/// Errors from obtaining an identity schema document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The project API returned a non-2xx status.
    #[error("Ory API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The project has no identity service configuration.
    #[error("project '{project_id}' has no identity service configured")]
    MissingIdentityService { project_id: String },
    /// The project id cannot address a project.
    #[error("invalid project id '{project_id}'")]
    InvalidProjectId { project_id: String },
    /// The identity schema document is absent or not a JSON object.
    #[error("invalid identity schema from {origin}: {reason}")]
    InvalidSchemaDocument { origin: String, reason: String },
    /// Reading a local schema file failed.
    #[error("failed to read schema file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {reason}")]
    Client { reason: String },
    /// The schema document does not describe a usable identity schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl FetchError {
    /// Classification shared with the validation engine, for the errors
    /// that have one. Transport and API failures have none.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Schema(e) => Some(e.kind()),
            Self::InvalidSchemaDocument { .. } => Some(ErrorKind::MalformedSchema),
            Self::Io { .. } => Some(ErrorKind::Io),
            Self::Http { .. }
            | Self::Api { .. }
            | Self::Deserialization { .. }
            | Self::MissingIdentityService { .. }
            | Self::InvalidProjectId { .. }
            | Self::Client { .. }
            | Self::Config(_) => None,
        }
    }
}
