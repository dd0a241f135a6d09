//! Domain core: password hashing, credential store, registrar, seeding,
//! and the HTTP surface that exposes them.

pub mod handlers;
pub mod password;
pub mod registrar;
pub mod seed;
pub mod store;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use self::registrar::Registrar;
use self::seed::SeedConfig;
use self::store::{CredentialStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Connect, bootstrap the schema, seed, then serve.
///
/// Seeding is an awaited startup phase: a seed failure returns an error and
/// the process never starts serving traffic.
///
/// # Errors
///
/// Returns an error if the database is unreachable, seeding fails, or the
/// listener cannot bind.
pub async fn new(port: u16, dsn: &str, seed_config: SeedConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(dsn)
        .await
        .context("failed to connect to database")?;

    let store = PgStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to bootstrap schema")?;

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    seed::seed(store.clone(), &seed_config)
        .await
        .context("seeding failed, refusing to serve traffic")?;

    let registrar = Registrar::new(store);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;
    info!(port, "listening");

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .layer(Extension(registrar));

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
