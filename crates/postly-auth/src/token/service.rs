//! Token pair issuance and verification.
//!
//! [`TokenService`] is built once from [`TokenConfig`]. Missing settings are
//! carried as `None` and surface as [`AuthError::ConfigMissing`] from the
//! operation that needs them.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::token::jwt::{JwtService, SessionClaims, TokenKind};

/// Number of random bytes in a pair nonce.
const NONCE_BYTES: usize = 16;

/// An access/refresh token pair minted in one issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived token for authorizing requests.
    pub access_token: String,
    /// Long-lived, single-use token for minting the next pair.
    pub refresh_token: String,
}

/// Signs and verifies session tokens.
pub struct TokenService {
    jwt: Option<JwtService>,
    access_lifetime: Option<Duration>,
    refresh_lifetime: Option<Duration>,
}

impl TokenService {
    /// Creates a token service from configuration.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            jwt: config
                .secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| JwtService::from_secret(s.as_bytes())),
            access_lifetime: config.access_token_lifetime,
            refresh_lifetime: config.refresh_token_lifetime,
        }
    }

    /// Returns `true` if a signing secret is configured.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.jwt.is_some()
    }

    /// Issues a fresh access/refresh pair for `user_id`.
    ///
    /// Both tokens share one random nonce, so two pairs minted in the same
    /// second for the same user still differ.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if the secret or a lifetime is not configured,
    /// and `ServerError` if signing fails.
    pub fn issue_pair(&self, user_id: &str) -> AuthResult<TokenPair> {
        let jwt = self
            .jwt
            .as_ref()
            .ok_or_else(|| AuthError::config_missing("auth.token.secret"))?;
        let access_lifetime = self
            .access_lifetime
            .ok_or_else(|| AuthError::config_missing("auth.token.access_token_lifetime"))?;
        let refresh_lifetime = self
            .refresh_lifetime
            .ok_or_else(|| AuthError::config_missing("auth.token.refresh_token_lifetime"))?;

        let nonce = generate_nonce();

        let access = SessionClaims::new(
            user_id,
            nonce.clone(),
            TokenKind::Access,
            lifetime_secs(access_lifetime),
        );
        let refresh = SessionClaims::new(
            user_id,
            nonce,
            TokenKind::Refresh,
            lifetime_secs(refresh_lifetime),
        );

        let access_token = jwt
            .encode(&access)
            .map_err(|e| AuthError::server_error(e.to_string()))?;
        let refresh_token = jwt
            .encode(&refresh)
            .map_err(|e| AuthError::server_error(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verifies signature, expiry and kind of `token`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if no secret is configured, and `Unauthorized`
    /// for any verification failure.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AuthResult<SessionClaims> {
        let jwt = self
            .jwt
            .as_ref()
            .ok_or_else(|| AuthError::config_missing("auth.token.secret"))?;

        let claims = jwt
            .decode(token)
            .map_err(|e| AuthError::unauthorized(e.to_string()))?;

        if claims.typ != expected {
            return Err(AuthError::unauthorized(format!(
                "expected {expected} token, got {}",
                claims.typ
            )));
        }

        Ok(claims)
    }
}

fn lifetime_secs(lifetime: Duration) -> i64 {
    i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX / 2)
}

fn generate_nonce() -> String {
    let bytes: [u8; NONCE_BYTES] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}
