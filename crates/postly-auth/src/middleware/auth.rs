//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use postly_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(user_id): BearerAuth) -> String {
//!     user_id
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::federation::IdentityVerifier;
use crate::session::SessionAuthenticator;
use crate::storage::UserStore;

// =============================================================================
// Auth State
// =============================================================================

/// State shared by the auth handlers and the [`BearerAuth`] extractor.
///
/// Include it in the application state and expose it via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// The session authenticator.
    pub authenticator: Arc<SessionAuthenticator>,

    /// Verifier for Google ID tokens. Google sign-in is disabled when `None`.
    pub identity_verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AuthState {
    /// Creates auth state without federated sign-in.
    pub fn new(authenticator: Arc<SessionAuthenticator>) -> Self {
        Self {
            authenticator,
            identity_verifier: None,
        }
    }

    /// Enables federated sign-in through `verifier`.
    #[must_use]
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity_verifier = Some(verifier);
        self
    }

    /// Returns the user store behind the authenticator.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        self.authenticator.users()
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor yielding the user id of a valid access token.
///
/// Rejects with `Unauthorized` (401) for a missing, malformed, expired or
/// forged token, and with `ServerMisconfigured` (500) when no signing secret
/// is configured. The store is not consulted.
pub struct BearerAuth(pub String);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user_id = auth_state
            .authenticator
            .authenticate_request(header)
            .inspect_err(|e| tracing::debug!(error = %e, "Bearer authentication failed"))?;

        Ok(BearerAuth(user_id))
    }
}
