//! # batchimport-client: Identity Schema Sources
//!
//! Obtains the identity schema a batch import is validated against:
//!
//! - [`OryProjectFetcher`] calls the Ory Network project API
//!   (`GET /projects/{id}`, bearer-token auth) and extracts
//!   `services.identity.config.identity_schema`.
//! - [`FileSchemaFetcher`] reads a schema document from disk.
//!
//! Both implement [`SchemaFetcher`]. Configuration comes from the
//! environment via [`OryApiConfig::from_env`].
//!
//! ## Crate Policy
//!
//! - Transport and API failures are wrapped with the endpoint, never retried.
//! - The API key is held in [`zeroize::Zeroizing`] and redacted from `Debug`.

pub mod config;
pub mod error;
pub mod fetcher;

pub use config::{ConfigError, OryApiConfig};
pub use error::FetchError;
pub use fetcher::{
    fetch_identity_schema, identity_schema, FileSchemaFetcher, OryProjectFetcher, SchemaFetcher,
};
