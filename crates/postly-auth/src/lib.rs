//! # postly-auth
//!
//! Session authentication for the Postly server.
//!
//! This crate provides:
//! - Paired access/refresh token issuance (HS256)
//! - Refresh-token rotation with replay detection
//! - Password and Google sign-in
//! - Axum handlers and a bearer-token extractor
//!
//! ## Overview
//!
//! Every login, registration or refresh mints an access/refresh pair. The
//! refresh token is stored in its owner's active set and is single use:
//! redeeming it removes it. A refresh token that verifies but is no longer in
//! the set signals replay, and the owner's whole set is revoked.
//!
//! ## Modules
//!
//! - [`config`] - Token and Google sign-in configuration
//! - [`token`] - Token encoding, issuance and verification
//! - [`session`] - The session authenticator
//! - [`password`] - Argon2 password hashing
//! - [`federation`] - External identity verification
//! - [`storage`] - User store trait
//! - [`middleware`] - Bearer extractor and error responses
//! - [`http`] - Axum HTTP handlers

pub mod config;
pub mod error;
pub mod federation;
pub mod http;
pub mod middleware;
pub mod password;
pub mod session;
pub mod storage;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AuthConfig, ConfigError, GoogleConfig, TokenConfig};
pub use error::{AuthError, ErrorCategory};
pub use federation::{ExternalIdentity, GoogleIdTokenVerifier, IdentityVerifier};
pub use http::auth_router;
pub use middleware::{AuthState, BearerAuth};
pub use session::{Registration, RegisteredUser, SessionAuthenticator, SessionTokens};
pub use storage::{NewUser, StoreError, StoreResult, User, UserStore};
pub use token::{TokenKind, TokenPair};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use postly_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, GoogleConfig, TokenConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::federation::{ExternalIdentity, GoogleIdTokenVerifier, IdentityVerifier};
    pub use crate::http::auth_router;
    pub use crate::middleware::{AuthState, BearerAuth};
    pub use crate::session::{Registration, RegisteredUser, SessionAuthenticator, SessionTokens};
    pub use crate::storage::{NewUser, StoreError, StoreResult, User, UserStore};
    pub use crate::token::{TokenKind, TokenPair};
}
