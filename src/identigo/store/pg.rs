//! Postgres-backed credential store.

use super::{validate_new_account, CredentialStore, NewAccount, StoreError, UserAccount};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the idempotent bootstrap schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if a statement cannot be applied.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(unavailable)?;
        }

        Ok(())
    }
}

// Line-based split: a statement ends on a line ending with ';', so
// semicolons inside `--` comments never terminate one.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let query =
            "SELECT id, email, password_hash, email_confirmed FROM users WHERE email = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(unavailable)?;

        Ok(row.map(|row| UserAccount {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            email_confirmed: row.get("email_confirmed"),
        }))
    }

    async fn create_user(&self, account: NewAccount) -> Result<UserAccount, StoreError> {
        validate_new_account(&account)?;

        let id = Uuid::new_v4();
        let query = "INSERT INTO users (id, email, password_hash, email_confirmed) VALUES ($1, $2, $3, $4)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        match sqlx::query(query)
            .bind(id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.email_confirmed)
            .execute(&self.pool)
            .instrument(span)
            .await
        {
            Ok(_) => Ok(UserAccount {
                id,
                email: account.email,
                password_hash: account.password_hash,
                email_confirmed: account.email_confirmed,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn role_exists(&self, name: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1) AS exists";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(unavailable)?;

        Ok(row.get("exists"))
    }

    async fn create_role(&self, name: &str) -> Result<(), StoreError> {
        let query = "INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(name)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(unavailable)?;

        Ok(())
    }

    async fn is_in_role(&self, user_id: Uuid, role: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = $1 AND role_name = $2) AS exists";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(role)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(unavailable)?;

        Ok(row.get("exists"))
    }

    async fn add_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError> {
        let query = "INSERT INTO user_roles (user_id, role_name) VALUES ($1, $2) ON CONFLICT DO NOTHING";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(anyhow::Error::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn schema_splits_into_create_table_statements() {
        let statements = split_sql_statements(SCHEMA_SQL);

        assert_eq!(statements.len(), 3);
        for statement in statements {
            assert!(statement.starts_with("CREATE TABLE IF NOT EXISTS"));
            assert!(statement.ends_with(';'));
        }
    }

    #[test]
    fn split_ignores_semicolons_inside_comments() {
        let sql = "-- first; second; third\nCREATE TABLE a (\n    id INT -- not yet; later\n);\nCREATE TABLE b (id INT);\n";

        let statements = split_sql_statements(sql);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert_eq!(statements[1], "CREATE TABLE b (id INT);");
    }
}
