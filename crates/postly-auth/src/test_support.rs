//! In-crate user store for unit tests, with failure injection.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::storage::{NewUser, StoreError, StoreResult, User, UserStore};

#[derive(Default)]
pub(crate) struct MockUserStore {
    users: Mutex<HashMap<String, User>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    save_budget: Mutex<Option<usize>>,
}

impl MockUserStore {
    /// Returns the stored copy of a user.
    pub(crate) fn get(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }

    /// Makes every lookup fail while `fail` is set.
    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Lets `n` more saves succeed, then fails every later one.
    pub(crate) fn fail_saves_after(&self, n: usize) {
        *self.save_budget.lock().unwrap() = Some(n);
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected read failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check_read()?;
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.check_read()?;
        Ok(self.get(id))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::duplicate(user.email));
        }
        let id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = User::from_new(id.clone(), user);
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, user: &User) -> StoreResult<()> {
        {
            let mut budget = self.save_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(StoreError::backend("injected write failure")),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(StoreError::backend(format!("no user {}", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
