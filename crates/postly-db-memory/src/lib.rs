//! In-memory user store for the Postly server.
//!
//! This crate provides an in-process implementation of the
//! [`UserStore`](postly_auth::UserStore) trait. State lives for the lifetime
//! of the process, which suits tests and single-node development.
//!
//! # Example
//!
//! ```ignore
//! use postly_db_memory::create_user_store;
//!
//! let auth = SessionAuthenticator::new(&config.token, create_user_store());
//! ```

pub mod storage;

pub use storage::InMemoryUserStore;

/// Creates a new shareable in-memory user store.
pub fn create_user_store() -> std::sync::Arc<dyn postly_auth::UserStore> {
    std::sync::Arc::new(InMemoryUserStore::new())
}
