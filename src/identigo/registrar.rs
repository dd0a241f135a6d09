//! Account registrar: validation, uniqueness pre-check, hashing, creation.
//!
//! The pre-check in [`Registrar::register`] is advisory; the store's
//! uniqueness constraint is authoritative. A constraint violation during
//! creation surfaces as the same [`RegisterError::DuplicateEmail`] as the
//! pre-check, so callers see one conflict outcome regardless of which phase
//! detected it.

use super::password;
use super::store::{CredentialStore, NewAccount, StoreError, UserAccount};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Emails compare case-insensitively; the normalized form is the stored and
/// compared identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Per-field validation message.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid registration input")]
    Validation(Vec<FieldError>),
    #[error("account with this email already exists")]
    DuplicateEmail,
    #[error("password hashing failed")]
    Hasher(#[source] argon2::password_hash::Error),
    #[error(transparent)]
    Store(StoreError),
}

/// Successful registration outcome; the password hash is never part of it.
#[derive(Debug, Clone)]
pub struct Registered {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct Registrar {
    store: Arc<dyn CredentialStore>,
}

impl Registrar {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// [`RegisterError::Validation`] on malformed input (no store access
    /// occurs), [`RegisterError::DuplicateEmail`] when the email is already
    /// claimed, whether detected by the pre-check or by the store's
    /// constraint during creation.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Registered, RegisterError> {
        let email = normalize_email(email);

        let mut errors = Vec::new();
        if !valid_email(&email) {
            errors.push(FieldError {
                field: "email",
                message: "must be a valid email address",
            });
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(FieldError {
                field: "password",
                message: "must be at least 6 characters",
            });
        }
        if !errors.is_empty() {
            return Err(RegisterError::Validation(errors));
        }

        if self
            .store
            .find_by_email(&email)
            .await
            .map_err(conflict_or_store)?
            .is_some()
        {
            debug!("email already registered");
            return Err(RegisterError::DuplicateEmail);
        }

        let account = self.create_account(&email, password).await?;

        Ok(Registered {
            user_id: account.id,
            email: account.email,
        })
    }

    /// Creation primitive: hash and create, no duplicate pre-check.
    ///
    /// Also used by startup seeding, which has just confirmed absence
    /// itself. The store's constraint still guards the race.
    ///
    /// # Errors
    ///
    /// [`RegisterError::DuplicateEmail`] if the email was claimed
    /// concurrently, [`RegisterError::Hasher`] if hashing fails.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, RegisterError> {
        let password_hash = password::hash(password).map_err(RegisterError::Hasher)?;

        self.store
            .create_user(NewAccount {
                email: normalize_email(email),
                password_hash,
                email_confirmed: true,
            })
            .await
            .map_err(conflict_or_store)
    }
}

fn conflict_or_store(err: StoreError) -> RegisterError {
    match err {
        StoreError::DuplicateEmail => RegisterError::DuplicateEmail,
        other => RegisterError::Store(other),
    }
}
