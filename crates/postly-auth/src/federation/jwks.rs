//! Provider JWKS fetching and caching.
//!
//! [`JwksCache`] holds the signing keys of a single identity provider
//! endpoint. Keys are fetched on first use and re-fetched when the cached set
//! expires or a token names a `kid` the cached set does not have (providers
//! rotate keys). Unknown-`kid` refetches of a fresh set are limited to one per
//! `min_ttl`.
//!
//! # Cache-Control Support
//!
//! The TTL comes from the response's `Cache-Control: max-age` directive when
//! present, clamped to `[min_ttl, max_ttl]`. Otherwise `default_ttl` applies.

use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet, PublicKeyUse};
use tokio::sync::RwLock;
use url::Url;

/// Configuration for the JWKS cache.
#[derive(Debug, Clone)]
pub struct JwksCacheConfig {
    /// TTL when Cache-Control is absent (default: 1 hour).
    pub default_ttl: Duration,

    /// Upper bound on any TTL (default: 24 hours).
    pub max_ttl: Duration,

    /// Lower bound on any TTL (default: 5 minutes).
    pub min_ttl: Duration,

    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,
}

impl Default for JwksCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_ttl: Duration::from_secs(86400),
            min_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
        }
    }
}

/// Errors that can occur during JWKS operations.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed as JSON.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// The requested key was not found in the JWKS.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// No signing keys were found in the JWKS.
    #[error("No signing keys found in JWKS")]
    NoSigningKeys,

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

struct CachedJwks {
    jwks: JwkSet,
    expires_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory cache for one provider's JWKS endpoint.
pub struct JwksCache {
    http_client: reqwest::Client,
    jwks_url: Url,
    cached: RwLock<Option<CachedJwks>>,
    /// When a lookup miss last forced a refetch.
    last_forced_refresh: RwLock<Option<Instant>>,
    config: JwksCacheConfig,
}

impl JwksCache {
    /// Creates a cache for `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the HTTP client cannot be built.
    pub fn new(jwks_url: Url, config: JwksCacheConfig) -> Result<Self, JwksError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            jwks_url,
            cached: RwLock::new(None),
            last_forced_refresh: RwLock::new(None),
            config,
        })
    }

    /// Returns the endpoint this cache fetches from.
    #[must_use]
    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }

    /// Gets the decoding key with the given `kid`.
    ///
    /// A cache miss triggers one re-fetch before giving up. While the cached
    /// set is fresh, misses re-fetch at most once per `min_ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS cannot be fetched or has no such key.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        if let Some(key) = self.cached_key(kid).await {
            tracing::trace!(kid, "JWKS cache hit");
            return Ok(key);
        }

        if self.in_refetch_cooldown().await {
            tracing::debug!(kid, "JWKS cache miss, refetch suppressed");
            return Err(JwksError::KeyNotFound(kid.to_string()));
        }

        tracing::debug!(kid, url = %self.jwks_url, "JWKS cache miss");
        *self.last_forced_refresh.write().await = Some(Instant::now());
        self.refresh().await?;

        self.cached_key(kid)
            .await
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn in_refetch_cooldown(&self) -> bool {
        let fresh = self.cached.read().await.as_ref().is_some_and(CachedJwks::is_fresh);
        let recent = self
            .last_forced_refresh
            .read()
            .await
            .is_some_and(|at| at.elapsed() < self.config.min_ttl);
        fresh && recent
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|c| c.is_fresh())
            .and_then(|c| {
                c.jwks
                    .keys
                    .iter()
                    .find(|k| k.common.key_id.as_deref() == Some(kid))
            })
            .and_then(|jwk| DecodingKey::from_jwk(jwk).ok())
    }

    /// Gets every signing key, for tokens without a `kid` header.
    ///
    /// Keys marked `use: "enc"` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS cannot be fetched or has no signing keys.
    pub async fn signing_keys(&self) -> Result<Vec<DecodingKey>, JwksError> {
        let fresh = self.cached.read().await.as_ref().is_some_and(CachedJwks::is_fresh);
        if !fresh {
            self.refresh().await?;
        }

        let cached = self.cached.read().await;
        let keys: Vec<_> = cached
            .as_ref()
            .map(|c| signing_keys_of(&c.jwks))
            .unwrap_or_default();

        if keys.is_empty() {
            Err(JwksError::NoSigningKeys)
        } else {
            Ok(keys)
        }
    }

    /// Fetches the JWKS and replaces the cached set.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a JWKS.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(self.jwks_url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.jwks_url, error = %e, "Failed to fetch JWKS");
                JwksError::NetworkError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(JwksError::HttpError(response.status().as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_size
        {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.config.max_response_size,
            });
        }

        let ttl = self.ttl_from_headers(response.headers());

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| JwksError::ParseError(e.to_string()))?;

        tracing::debug!(keys = jwks.keys.len(), ttl = ?ttl, "Cached JWKS");
        self.store(jwks, ttl).await;
        Ok(())
    }

    async fn store(&self, jwks: JwkSet, ttl: Duration) {
        *self.cached.write().await = Some(CachedJwks {
            jwks,
            expires_at: Instant::now() + ttl,
        });
    }

    /// Drops the cached set so the next lookup re-fetches.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn ttl_from_headers(&self, headers: &reqwest::header::HeaderMap) -> Duration {
        let max_age = headers
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age);
        self.clamp_ttl(max_age.map(Duration::from_secs))
    }

    fn clamp_ttl(&self, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or(self.config.default_ttl)
            .min(self.config.max_ttl)
            .max(self.config.min_ttl)
    }
}

/// Extracts `max-age` seconds from a Cache-Control value.
fn parse_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|s| s.parse::<u64>().ok())
    })
}

fn signing_keys_of(jwks: &JwkSet) -> Vec<DecodingKey> {
    jwks.keys
        .iter()
        .filter(|k| !is_encryption_key(k))
        .filter_map(|jwk| DecodingKey::from_jwk(jwk).ok())
        .collect()
}

fn is_encryption_key(jwk: &Jwk) -> bool {
    matches!(&jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

#[cfg(test)]
impl JwksCache {
    /// Seeds the cache so lookups succeed without network access.
    pub(crate) async fn seed(&self, jwks: JwkSet) {
        self.store(jwks, self.config.default_ttl).await;
    }
}
