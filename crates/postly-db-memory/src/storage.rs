use std::collections::HashMap;

use async_trait::async_trait;
use postly_auth::storage::{NewUser, StoreError, StoreResult, User, UserStore};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, User>,
    /// email -> id
    by_email: HashMap<String, String>,
}

/// In-memory user store.
///
/// One `RwLock` guards both the records and the email index, so `create`
/// checks uniqueness and inserts atomically. `save` replaces the whole record
/// (last writer wins).
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    /// Returns `true` if no users are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&user.email) {
            return Err(StoreError::duplicate(user.email));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let stored = User::from_new(id.clone(), user);
        inner.by_email.insert(stored.email.clone(), id.clone());
        inner.users.insert(id, stored.clone());

        tracing::debug!(user_id = %stored.id, "Created user");
        Ok(stored)
    }

    async fn save(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.users.get(&user.id) else {
            return Err(StoreError::backend(format!("user {} does not exist", user.id)));
        };

        if existing.email != user.email {
            if inner.by_email.contains_key(&user.email) {
                return Err(StoreError::duplicate(user.email.clone()));
            }
            let old_email = existing.email.clone();
            inner.by_email.remove(&old_email);
            inner.by_email.insert(user.email.clone(), user.id.clone());
        }

        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            username: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty().await);

        let user = store.create(new_user("ann@example.com")).await.unwrap();
        assert!(!user.id.is_empty());
        assert!(user.refresh_tokens.is_empty());

        let by_email = store.find_by_email("ann@example.com").await.unwrap().unwrap();
        let by_id = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_email, user);
        assert_eq!(by_id, user);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_lookups_return_none() {
        let store = InMemoryUserStore::new();
        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(store.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryUserStore::new();
        store.create(new_user("ann@example.com")).await.unwrap();
        let err = store.create(new_user("ann@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_save_persists_token_set() {
        let store = InMemoryUserStore::new();
        let mut user = store.create(new_user("ann@example.com")).await.unwrap();

        user.add_refresh_token("t1");
        user.add_refresh_token("t2");
        store.save(&user).await.unwrap();
        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_tokens.len(), 2);

        user.clear_refresh_tokens();
        store.save(&user).await.unwrap();
        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_save_unknown_user_fails() {
        let store = InMemoryUserStore::new();
        let ghost = User::from_new("ghost", new_user("ghost@example.com"));
        assert!(matches!(
            store.save(&ghost).await,
            Err(StoreError::Backend { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_moves_email_index() {
        let store = InMemoryUserStore::new();
        let mut user = store.create(new_user("old@example.com")).await.unwrap();
        store.create(new_user("taken@example.com")).await.unwrap();

        user.email = "taken@example.com".to_string();
        assert!(matches!(
            store.save(&user).await,
            Err(StoreError::Duplicate { .. })
        ));

        user.email = "new@example.com".to_string();
        store.save(&user).await.unwrap();
        assert!(store.find_by_email("old@example.com").await.unwrap().is_none());
        assert_eq!(
            store.find_by_email("new@example.com").await.unwrap().unwrap().id,
            user.id
        );
    }
}
