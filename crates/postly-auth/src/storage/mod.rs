//! Storage traits for session data.
//!
//! User records hold both the credential hash and the set of currently
//! redeemable refresh tokens.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `postly-db-memory` - In-process backend
//! - `postly-db-mongo` - MongoDB backend

pub mod user;

pub use user::{NewUser, StoreError, StoreResult, User, UserStore};
