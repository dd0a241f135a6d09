//! Credential store: the persistence seam shared by registration and
//! seeding.
//!
//! Uniqueness of emails and roles is enforced here, at the storage layer,
//! not by the callers' pre-checks. Both flows must treat the store's
//! conflict signal as authoritative.

pub mod memory;
pub mod pg;

pub use self::memory::MemoryStore;
pub use self::pg::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// A persisted user identity record.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) email; the uniqueness key.
    pub email: String,
    /// PHC-formatted hash, never plaintext.
    pub password_hash: String,
    pub email_confirmed: bool,
}

/// Fields for a user record about to be created; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account with this email already exists")]
    DuplicateEmail,
    #[error("invalid account data: {0}")]
    Invalid(String),
    #[error("credential store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Persistence operations for accounts, roles, and role memberships.
///
/// All mutations are durable before the call returns. Implementations must
/// report a concurrent insert for an already-claimed email as
/// [`StoreError::DuplicateEmail`], backed by a real uniqueness constraint,
/// not a prior read.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Create an account, assigning a fresh id.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateEmail`] when the email is already claimed,
    /// [`StoreError::Invalid`] when fields are malformed.
    async fn create_user(&self, account: NewAccount) -> Result<UserAccount, StoreError>;

    async fn role_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Create a role; a no-op if it already exists.
    async fn create_role(&self, name: &str) -> Result<(), StoreError>;

    async fn is_in_role(&self, user_id: Uuid, role: &str) -> Result<bool, StoreError>;

    /// Assign a role; a no-op if already assigned.
    async fn add_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError>;
}

pub(crate) fn validate_new_account(account: &NewAccount) -> Result<(), StoreError> {
    if account.email.is_empty() {
        return Err(StoreError::Invalid("email must not be empty".to_string()));
    }

    if account.password_hash.is_empty() {
        return Err(StoreError::Invalid(
            "password hash must not be empty".to_string(),
        ));
    }

    Ok(())
}
