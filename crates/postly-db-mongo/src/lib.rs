//! MongoDB storage backend for Postly auth
//!
//! Persists user accounts, including each user's active refresh-token set,
//! in a `users` collection. Documents keep the legacy field names
//! (`password`, `refreshToken`) so data written by earlier deployments loads
//! unchanged.
//!
//! # Example
//!
//! ```ignore
//! use postly_db_mongo::MongoUserStore;
//!
//! let store = MongoUserStore::connect("mongodb://localhost:27017", "postly").await?;
//! let user = store.find_by_email("ann@example.com").await?;
//! ```

pub mod user;

pub use user::{MongoUserStore, USERS_COLLECTION, UserDocument};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while setting up the MongoDB backend.
#[derive(Debug, thiserror::Error)]
pub enum MongoStorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// Result type for MongoDB backend setup.
pub type MongoStorageResult<T> = Result<T, MongoStorageError>;
