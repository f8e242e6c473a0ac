//! # Ory API Configuration
//!
//! Connection settings for the Ory Network project API, read from the
//! environment:
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `ORY_API_KEY` | yes | |
//! | `ORY_API_URL` | no | `https://api.ory.sh` |
//! | `ORY_API_TIMEOUT_SECS` | no | `30` |

use std::fmt;

use url::Url;
use zeroize::Zeroizing;

pub const DEFAULT_API_URL: &str = "https://api.ory.sh";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_KEY: &str = "ORY_API_KEY";
pub const ENV_API_URL: &str = "ORY_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "ORY_API_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for [`crate::OryProjectFetcher`].
#[derive(Clone)]
pub struct OryApiConfig {
    /// Base URL of the project API.
    pub api_url: Url,
    /// Bearer token. Zeroized on drop.
    pub api_key: Zeroizing<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for OryApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OryApiConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OryApiConfig {
    pub fn new(api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            api_url,
            api_key: Zeroizing::new(api_key.into()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing(ENV_API_KEY))?;

        let api_url = lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&api_url)?;

        let timeout_secs = match lookup(ENV_TIMEOUT_SECS) {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: ENV_TIMEOUT_SECS,
                        reason: format!("expected a positive number of seconds, got '{raw}'"),
                    })
                }
            },
        };

        Ok(Self {
            api_url,
            api_key: Zeroizing::new(api_key),
            timeout_secs,
        })
    }
}

/// Parse and check an API base URL.
pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: ENV_API_URL,
        reason: format!("'{raw}': {e}"),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: ENV_API_URL,
            reason: format!("'{raw}' is not an http(s) base URL"),
        });
    }
    Ok(url)
}
