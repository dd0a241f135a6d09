//! Startup seeding: roles, admin account, admin role memberships.
//!
//! Runs once per process start, before the listener binds. Every step is
//! idempotent, and N replicas may seed the same store concurrently: the
//! store's uniqueness constraints arbitrate races, so a lost admin-creation
//! race is re-resolved by lookup instead of failing startup.

use super::registrar::{normalize_email, RegisterError, Registrar};
use super::store::{CredentialStore, StoreError, UserAccount};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Declarative seed state, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct SeedConfig {
    pub roles: Vec<String>,
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: SecretString,
    pub roles: Vec<String>,
}

/// Fatal startup error: the process must not serve traffic unseeded.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to provision role {role}")]
    Role {
        role: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to look up admin account {email}")]
    AdminLookup {
        email: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to create admin account {email}")]
    AdminCreate {
        email: String,
        #[source]
        source: RegisterError,
    },
    #[error("admin account {email} reported as existing but not found")]
    AdminVanished { email: String },
    #[error("failed to assign role {role} to admin account")]
    Assign {
        role: String,
        #[source]
        source: StoreError,
    },
}

/// Converge the store on the configured baseline state.
///
/// # Errors
///
/// Any [`SeedError`] is fatal; operators restart the process to retry.
#[instrument(skip(store, config))]
pub async fn seed(store: Arc<dyn CredentialStore>, config: &SeedConfig) -> Result<(), SeedError> {
    for role in &config.roles {
        let exists = store
            .role_exists(role)
            .await
            .map_err(|source| SeedError::Role {
                role: role.clone(),
                source,
            })?;
        if !exists {
            store
                .create_role(role)
                .await
                .map_err(|source| SeedError::Role {
                    role: role.clone(),
                    source,
                })?;
            info!(role, "provisioned role");
        }
    }

    let Some(admin) = &config.admin else {
        debug!("no admin configured, seeding roles only");
        return Ok(());
    };

    let registrar = Registrar::new(store.clone());
    let account = ensure_admin(&registrar, store.as_ref(), admin).await?;

    for role in &admin.roles {
        let assigned =
            store
                .is_in_role(account.id, role)
                .await
                .map_err(|source| SeedError::Assign {
                    role: role.clone(),
                    source,
                })?;
        if !assigned {
            store
                .add_role(account.id, role)
                .await
                .map_err(|source| SeedError::Assign {
                    role: role.clone(),
                    source,
                })?;
            info!(role, "assigned role to admin account");
        }
    }

    Ok(())
}

async fn ensure_admin(
    registrar: &Registrar,
    store: &dyn CredentialStore,
    admin: &AdminConfig,
) -> Result<UserAccount, SeedError> {
    let email = normalize_email(&admin.email);

    if let Some(account) = store
        .find_by_email(&email)
        .await
        .map_err(|source| SeedError::AdminLookup {
            email: email.clone(),
            source,
        })?
    {
        debug!("admin account already present");
        return Ok(account);
    }

    match registrar
        .create_account(&email, admin.password.expose_secret())
        .await
    {
        Ok(account) => {
            info!("provisioned admin account");
            Ok(account)
        }
        // Another replica won the creation race; the account must now exist.
        Err(RegisterError::DuplicateEmail) => store
            .find_by_email(&email)
            .await
            .map_err(|source| SeedError::AdminLookup {
                email: email.clone(),
                source,
            })?
            .ok_or(SeedError::AdminVanished { email }),
        Err(source) => Err(SeedError::AdminCreate { email, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identigo::password;
    use crate::identigo::store::MemoryStore;

    fn config(roles: &[&str], admin: Option<AdminConfig>) -> SeedConfig {
        SeedConfig {
            roles: roles.iter().map(ToString::to_string).collect(),
            admin,
        }
    }

    fn admin(email: &str, password: &str, roles: &[&str]) -> AdminConfig {
        AdminConfig {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
            roles: roles.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn seed_provisions_roles_admin_and_membership() {
        let store = Arc::new(MemoryStore::new());
        let config = config(
            &["Admin", "Support"],
            Some(admin("root@x.com", "hunter2!", &["Admin"])),
        );

        seed(store.clone(), &config).await.unwrap();

        assert_eq!(store.role_names(), vec!["Admin", "Support"]);
        assert_eq!(store.user_count(), 1);

        let account = store.find_by_email("root@x.com").await.unwrap().unwrap();
        assert!(account.email_confirmed);
        assert!(password::verify("hunter2!", &account.password_hash));
        assert!(store.is_in_role(account.id, "Admin").await.unwrap());
        assert!(!store.is_in_role(account.id, "Support").await.unwrap());
    }

    #[tokio::test]
    async fn seed_creates_missing_role_before_assigning_it() {
        let store = Arc::new(MemoryStore::new());
        let config = config(&["Admin"], Some(admin("root@x.com", "hunter2!", &["Admin"])));

        assert!(!store.role_exists("Admin").await.unwrap());
        seed(store.clone(), &config).await.unwrap();

        assert!(store.role_exists("Admin").await.unwrap());
        let account = store.find_by_email("root@x.com").await.unwrap().unwrap();
        assert!(store.is_in_role(account.id, "Admin").await.unwrap());
    }

    #[tokio::test]
    async fn seed_twice_converges_on_identical_state() {
        let store = Arc::new(MemoryStore::new());
        let config = config(
            &["Admin", "Support"],
            Some(admin("root@x.com", "hunter2!", &["Admin"])),
        );

        seed(store.clone(), &config).await.unwrap();
        let first = store.find_by_email("root@x.com").await.unwrap().unwrap();

        seed(store.clone(), &config).await.unwrap();
        let second = store.find_by_email("root@x.com").await.unwrap().unwrap();

        assert_eq!(store.role_names(), vec!["Admin", "Support"]);
        assert_eq!(store.user_count(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.password_hash, second.password_hash);
        assert!(store.is_in_role(second.id, "Admin").await.unwrap());
    }

    #[tokio::test]
    async fn seed_without_admin_provisions_roles_only() {
        let store = Arc::new(MemoryStore::new());
        let config = config(&["Admin", "Support"], None);

        seed(store.clone(), &config).await.unwrap();

        assert_eq!(store.role_names(), vec!["Admin", "Support"]);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn seed_keeps_existing_admin_account() {
        let store = Arc::new(MemoryStore::new());
        let registrar = Registrar::new(store.clone());
        let existing = registrar
            .register("root@x.com", "original-password")
            .await
            .unwrap();

        let config = config(&["Admin"], Some(admin("Root@X.com", "new-password", &["Admin"])));
        seed(store.clone(), &config).await.unwrap();

        let account = store.find_by_email("root@x.com").await.unwrap().unwrap();
        assert_eq!(account.id, existing.user_id);
        assert!(password::verify("original-password", &account.password_hash));
        assert!(store.is_in_role(account.id, "Admin").await.unwrap());
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn seed_fails_when_admin_role_is_not_provisioned() {
        let store = Arc::new(MemoryStore::new());
        // "Admin" missing from the role list: the store rejects the
        // assignment and startup must abort.
        let config = config(&[], Some(admin("root@x.com", "hunter2!", &["Admin"])));

        let err = seed(store.clone(), &config).await.unwrap_err();
        assert!(matches!(err, SeedError::Assign { .. }));
    }

    #[tokio::test]
    async fn concurrent_seeds_converge_without_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let config = config(&["Admin"], Some(admin("root@x.com", "hunter2!", &["Admin"])));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let config = config.clone();
            handles.push(tokio::spawn(
                async move { seed(store, &config).await },
            ));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.user_count(), 1);
        assert_eq!(store.role_names(), vec!["Admin"]);
    }
}
