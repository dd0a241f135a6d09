//! In-memory credential store.
//!
//! Backs tests and local experiments. A single mutex makes each operation
//! atomic, so the duplicate-email semantics match the Postgres constraint:
//! two concurrent `create_user` calls for one email cannot both succeed.

use super::{validate_new_account, CredentialStore, NewAccount, StoreError, UserAccount};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by normalized email.
    users: HashMap<String, UserAccount>,
    roles: HashSet<String>,
    assignments: HashSet<(Uuid, String)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Snapshot of the role set.
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().roles.iter().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.lock().users.get(email).cloned())
    }

    async fn create_user(&self, account: NewAccount) -> Result<UserAccount, StoreError> {
        validate_new_account(&account)?;

        let mut inner = self.lock();
        if inner.users.contains_key(&account.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let created = UserAccount {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            password_hash: account.password_hash,
            email_confirmed: account.email_confirmed,
        };
        inner.users.insert(account.email, created.clone());

        Ok(created)
    }

    async fn role_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.lock().roles.contains(name))
    }

    async fn create_role(&self, name: &str) -> Result<(), StoreError> {
        self.lock().roles.insert(name.to_string());

        Ok(())
    }

    async fn is_in_role(&self, user_id: Uuid, role: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .assignments
            .contains(&(user_id, role.to_string())))
    }

    async fn add_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        // Same contract as the user_roles foreign key in Postgres.
        if !inner.roles.contains(role) {
            return Err(StoreError::Unavailable(anyhow::anyhow!(
                "role {role} does not exist"
            )));
        }
        inner.assignments.insert((user_id, role.to_string()));

        Ok(())
    }
}
