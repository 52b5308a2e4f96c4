//! Session authentication configuration.
//!
//! The signing secret and both token lifetimes have no defaults: a deployment
//! that omits them is misconfigured, and [`AuthConfig::validate`] reports it.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.token]
//! secret = "a-long-random-string-of-at-least-32-bytes"
//! access_token_lifetime = "15m"
//! refresh_token_lifetime = "7d"
//!
//! [auth.google]
//! client_id = "1234.apps.googleusercontent.com"
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum accepted length of the HMAC signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default Google JWKS endpoint.
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Root authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token signing and lifetime configuration.
    pub token: TokenConfig,

    /// Google sign-in configuration.
    pub google: GoogleConfig,
}

/// Token signing configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HMAC secret used to sign and verify both token kinds.
    pub secret: Option<String>,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Option<Duration>,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Option<Duration>,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish()
    }
}

/// Google sign-in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client ID; ID tokens must carry it as their audience.
    /// Google sign-in is disabled when unset.
    pub client_id: Option<String>,

    /// JWKS endpoint holding Google's signing keys.
    pub jwks_url: String,

    /// How long fetched keys are trusted when the response has no `max-age`.
    #[serde(with = "humantime_serde")]
    pub jwks_cache_ttl: Duration,

    /// HTTP timeout for JWKS fetches.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            jwks_cache_ttl: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the secret or a lifetime is unset, and
    /// `ConfigError::InvalidValue` if:
    /// - The secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// - A lifetime is zero
    /// - The access lifetime is not shorter than the refresh lifetime
    /// - The JWKS URL does not parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self
            .token
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing("auth.token.secret".to_string()))?;
        let access = self
            .token
            .access_token_lifetime
            .ok_or_else(|| ConfigError::Missing("auth.token.access_token_lifetime".to_string()))?;
        let refresh = self
            .token
            .refresh_token_lifetime
            .ok_or_else(|| ConfigError::Missing("auth.token.refresh_token_lifetime".to_string()))?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token.secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        if access.is_zero() || refresh.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be > 0".to_string(),
            ));
        }

        if access >= refresh {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be shorter than refresh_token_lifetime".to_string(),
            ));
        }

        if url::Url::parse(&self.google.jwks_url).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid auth.google.jwks_url: '{}'",
                self.google.jwks_url
            )));
        }

        Ok(())
    }
}
