//! User storage.
//!
//! One document per user in the `users` collection, with a unique index on
//! `email`. `save` replaces the whole document, so concurrent writers to one
//! user follow last-writer-wins.

use async_trait::async_trait;
use mongodb::bson::{DateTime as BsonDateTime, doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use postly_auth::storage::{NewUser, StoreError, StoreResult, User, UserStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::MongoStorageResult;

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// MongoDB duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

// =============================================================================
// Types
// =============================================================================

/// User document as stored in MongoDB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Unique email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Argon2 PHC hash.
    pub password: String,
    /// Profile image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Active refresh tokens.
    #[serde(default)]
    pub refresh_token: Vec<String>,
    /// Creation time. Absent on documents written by older deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
}

impl UserDocument {
    /// Converts a domain user into a document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the user id is not an ObjectId.
    pub fn from_user(user: &User) -> StoreResult<Self> {
        let id = ObjectId::parse_str(&user.id)
            .map_err(|e| StoreError::backend(format!("invalid user id {}: {e}", user.id)))?;

        Ok(Self {
            id,
            email: user.email.clone(),
            username: user.username.clone(),
            password: user.password_hash.clone(),
            image: user.image.clone(),
            refresh_token: user.refresh_tokens.iter().cloned().collect(),
            created_at: Some(to_bson_datetime(user.created_at)),
            updated_at: Some(to_bson_datetime(user.updated_at)),
        })
    }

    /// Converts the document into a domain user.
    #[must_use]
    pub fn into_user(self) -> User {
        let created_at = self
            .created_at
            .unwrap_or_else(|| self.id.timestamp());
        let created_at = from_bson_datetime(created_at);
        let updated_at = self
            .updated_at
            .map(from_bson_datetime)
            .unwrap_or(created_at);

        User {
            id: self.id.to_hex(),
            email: self.email,
            username: self.username,
            password_hash: self.password,
            image: self.image,
            refresh_tokens: self.refresh_token.into_iter().collect(),
            created_at,
            updated_at,
        }
    }
}

fn to_bson_datetime(t: OffsetDateTime) -> BsonDateTime {
    let millis = t.unix_timestamp_nanos() / 1_000_000;
    BsonDateTime::from_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

fn from_bson_datetime(dt: BsonDateTime) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(dt.timestamp_millis()) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

// =============================================================================
// User Storage
// =============================================================================

/// MongoDB-backed [`UserStore`].
#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    /// Wraps an existing collection.
    #[must_use]
    pub fn new(collection: Collection<UserDocument>) -> Self {
        Self { collection }
    }

    /// Connects to `uri`, opens `database` and ensures indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or index creation
    /// fails.
    pub async fn connect(uri: &str, database: &str) -> MongoStorageResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client
            .database(database)
            .collection::<UserDocument>(USERS_COLLECTION);

        let store = Self::new(collection);
        store.ensure_indexes().await?;
        tracing::info!(database, "Connected to MongoDB user store");
        Ok(store)
    }

    /// Creates the unique index on `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if index creation fails.
    pub async fn ensure_indexes(&self) -> MongoStorageResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

fn backend(err: mongodb::error::Error) -> StoreError {
    StoreError::backend(err.to_string())
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let found = self
            .collection
            .find_one(doc! { "email": email })
            .await
            .map_err(backend)?;
        Ok(found.map(UserDocument::into_user))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        let found = self
            .collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(backend)?;
        Ok(found.map(UserDocument::into_user))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let user = User::from_new(ObjectId::new().to_hex(), user);
        let document = UserDocument::from_user(&user)?;

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::duplicate(user.email.clone())
                } else {
                    backend(e)
                }
            })?;

        tracing::debug!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn save(&self, user: &User) -> StoreResult<()> {
        let document = UserDocument::from_user(user)?;

        let result = self
            .collection
            .replace_one(doc! { "_id": document.id }, &document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::duplicate(user.email.clone())
                } else {
                    backend(e)
                }
            })?;

        if result.matched_count == 0 {
            return Err(StoreError::backend(format!(
                "user {} does not exist",
                user.id
            )));
        }
        Ok(())
    }
}
