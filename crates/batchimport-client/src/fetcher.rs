//! # Schema Fetchers
//!
//! [`SchemaFetcher`] is the boundary through which the validator obtains an
//! identity schema document for a project. Two implementations:
//!
//! - [`OryProjectFetcher`] reads the project configuration from the Ory
//!   Network project API and returns the identity schema embedded in it.
//! - [`FileSchemaFetcher`] reads a schema document from a local file.
//!
//! Fetchers return the raw document; [`fetch_identity_schema`] parses it
//! into a [`Schema`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use batchimport_schema::{Schema, SchemaError};
use serde_json::Value;
use url::Url;

use crate::config::OryApiConfig;
use crate::error::FetchError;

/// Source of identity schema documents.
pub trait SchemaFetcher: Send + Sync {
    /// Fetch the identity schema document of `project_id`.
    fn fetch_schema(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Fetch a project's schema document and parse it.
///
/// # Errors
///
/// Any fetch error, or [`FetchError::Schema`] when the document is not a
/// usable identity schema.
pub async fn fetch_identity_schema<F>(fetcher: &F, project_id: &str) -> Result<Schema, FetchError>
where
    F: SchemaFetcher,
{
    let document = fetcher.fetch_schema(project_id).await?;
    let schema = Schema::from_value(document)?;
    tracing::info!(
        project_id,
        traits = schema.trait_names().count(),
        "loaded identity schema"
    );
    Ok(schema)
}

/// Reads identity schemas from the Ory Network project API.
#[derive(Debug)]
pub struct OryProjectFetcher {
    client: reqwest::Client,
    api_url: Url,
}

impl OryProjectFetcher {
    pub fn new(config: &OryApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth =
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", *config.api_key))
                        .map_err(|_| FetchError::Client {
                            reason: "invalid API key characters".into(),
                        })?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| FetchError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// `{api_url}/projects/{project_id}`, with the id percent-encoded.
    pub fn project_url(&self, project_id: &str) -> Result<Url, FetchError> {
        if project_id.trim().is_empty() {
            return Err(FetchError::InvalidProjectId {
                project_id: project_id.to_string(),
            });
        }
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::Client {
                reason: format!("{} cannot be used as a base URL", self.api_url),
            })?
            .pop_if_empty()
            .extend(["projects", project_id]);
        Ok(url)
    }

    async fn get_project(&self, project_id: &str) -> Result<Value, FetchError> {
        let url = self.project_url(project_id)?;
        let endpoint = url.to_string();
        tracing::debug!(%endpoint, "fetching project");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|source| FetchError::Deserialization { endpoint, source })
    }
}

impl SchemaFetcher for OryProjectFetcher {
    async fn fetch_schema(&self, project_id: &str) -> Result<Value, FetchError> {
        let project = self.get_project(project_id).await?;
        let schema = identity_schema(project, project_id)?;
        tracing::info!(project_id, "fetched identity schema from project");
        Ok(schema)
    }
}

/// Extract `services.identity.config.identity_schema` from a project document.
///
/// # Errors
///
/// [`FetchError::MissingIdentityService`] when the project has no identity
/// service, [`FetchError::InvalidSchemaDocument`] when the schema is absent
/// or not an object.
pub fn identity_schema(mut project: Value, project_id: &str) -> Result<Value, FetchError> {
    let identity = match project.pointer_mut("/services/identity") {
        Some(identity) if !identity.is_null() => identity,
        _ => {
            return Err(FetchError::MissingIdentityService {
                project_id: project_id.to_string(),
            })
        }
    };

    let invalid = |reason: String| FetchError::InvalidSchemaDocument {
        origin: format!("project '{project_id}'"),
        reason,
    };
    match identity.pointer_mut("/config/identity_schema").map(Value::take) {
        Some(Value::Object(schema)) => Ok(Value::Object(schema)),
        None | Some(Value::Null) => Err(invalid(
            "services.identity.config.identity_schema is not set".into(),
        )),
        Some(other) => Err(invalid(format!(
            "expected an object, got {}",
            json_type(&other)
        ))),
    }
}

/// Reads an identity schema document from a local file. The project id is
/// only used for logging.
#[derive(Debug, Clone)]
pub struct FileSchemaFetcher {
    path: PathBuf,
}

impl FileSchemaFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaFetcher for FileSchemaFetcher {
    async fn fetch_schema(&self, project_id: &str) -> Result<Value, FetchError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let document: Value = serde_json::from_slice(&bytes).map_err(|e| {
            FetchError::Schema(SchemaError::MalformedSchema {
                reason: format!("{} is not a JSON document: {e}", self.path.display()),
            })
        })?;
        if !document.is_object() {
            return Err(FetchError::InvalidSchemaDocument {
                origin: self.path.display().to_string(),
                reason: format!("expected an object, got {}", json_type(&document)),
            });
        }
        tracing::debug!(project_id, path = %self.path.display(), "read identity schema file");
        Ok(document)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
