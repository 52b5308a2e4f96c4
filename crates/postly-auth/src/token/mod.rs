//! Session token encoding, issuance and verification.
//!
//! - [`jwt`] - HS256 codec and claim types
//! - [`service`] - Pair issuance from configuration

pub mod jwt;
pub mod service;

pub use jwt::{JwtError, JwtService, SessionClaims, TokenKind};
pub use service::{TokenPair, TokenService};
