//! User storage trait.
//!
//! Defines the interface for user persistence operations.
//! Implementations are provided by storage backends (in-memory, MongoDB).

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by a [`UserStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with the same email already exists.
    #[error("Duplicate user: {email}")]
    Duplicate {
        /// The conflicting email.
        email: String,
    },

    /// The backend failed (connection, serialization, write conflict).
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `Duplicate` error.
    #[must_use]
    pub fn duplicate(email: impl Into<String>) -> Self {
        Self::Duplicate {
            email: email.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// User Type
// =============================================================================

/// A user account.
///
/// The refresh-token set is the only session state in the system: a token is
/// redeemable exactly while it is a member of `refresh_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier assigned by the store.
    pub id: String,

    /// Email address, unique across users.
    pub email: String,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Argon2 PHC hash of the password.
    ///
    /// Federated accounts hold the hash of a random secret nobody knows.
    pub password_hash: String,

    /// Profile image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Currently redeemable refresh tokens.
    #[serde(default)]
    pub refresh_tokens: BTreeSet<String>,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Builds a stored user from creation fields and a store-assigned id.
    #[must_use]
    pub fn from_new(id: impl Into<String>, new: NewUser) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: id.into(),
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            image: None,
            refresh_tokens: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if `token` is in the active refresh-token set.
    #[must_use]
    pub fn has_refresh_token(&self, token: &str) -> bool {
        self.refresh_tokens.contains(token)
    }

    /// Adds a refresh token to the active set.
    pub fn add_refresh_token(&mut self, token: impl Into<String>) {
        self.refresh_tokens.insert(token.into());
        self.touch();
    }

    /// Removes one refresh token. Returns `true` if it was present.
    pub fn remove_refresh_token(&mut self, token: &str) -> bool {
        let removed = self.refresh_tokens.remove(token);
        if removed {
            self.touch();
        }
        removed
    }

    /// Revokes every session by clearing the refresh-token set.
    pub fn clear_refresh_tokens(&mut self) {
        self.refresh_tokens.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Argon2 PHC hash of the password.
    pub password_hash: String,
    /// Optional display name.
    pub username: Option<String>,
}

// =============================================================================
// User Store Trait
// =============================================================================

/// Storage operations for users.
///
/// `save` replaces the stored record with the given one (last writer wins).
///
/// # Example
///
/// ```ignore
/// use postly_auth::storage::UserStore;
///
/// async fn example(store: &dyn UserStore) -> StoreResult<()> {
///     if let Some(mut user) = store.find_by_email("ann@example.com").await? {
///         user.clear_refresh_tokens();
///         store.save(&user).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by id.
    ///
    /// Returns `None` for unknown or malformed ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Create a user with an empty refresh-token set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the email is taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    /// Persist a mutated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the write fails.
    async fn save(&self, user: &User) -> StoreResult<()>;
}
