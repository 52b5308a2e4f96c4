//! External identity provider federation.
//!
//! - [`identity`] - Verified identity type and the verifier trait
//! - [`jwks`] - JWK set fetching and caching
//! - [`google`] - Google ID token verification

pub mod google;
pub mod identity;
pub mod jwks;

pub use google::GoogleIdTokenVerifier;
pub use identity::{ExternalIdentity, IdentityVerifier};
pub use jwks::{JwksCache, JwksCacheConfig, JwksError};
