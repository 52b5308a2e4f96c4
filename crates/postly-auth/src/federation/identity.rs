//! Externally verified identities.
//!
//! An [`IdentityVerifier`] turns a provider-issued credential (for Google, an
//! ID token) into an [`ExternalIdentity`]. The authenticator trusts whatever
//! the verifier returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Identity asserted by a trusted external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Verified email address.
    pub email: String,

    /// Display name, if the provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ExternalIdentity {
    /// Creates an identity with no display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Verifies provider credentials.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Short provider name used in errors and logs (e.g. `"google"`).
    fn provider(&self) -> &str;

    /// Verifies `credential` and returns the identity it asserts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityProvider` if the credential is rejected.
    async fn verify(&self, credential: &str) -> AuthResult<ExternalIdentity>;
}
