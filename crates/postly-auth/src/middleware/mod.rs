//! HTTP middleware for authentication.
//!
//! - Bearer token extraction and validation
//! - JSON error responses for [`AuthError`](crate::error::AuthError)

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth};
pub use error::status_for;
