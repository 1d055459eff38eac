//! Postgres-backed repository implementations.
//!
//! One `PostgresRepositories` value implements every repository trait; the
//! services receive it behind `Arc<dyn …Repo>` handles.

mod analytics;
mod comments;
mod content;
mod interactions;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, Transaction,
    migrate::MigrateError,
    postgres::{PgPool, PgPoolOptions},
};

use crate::config::DatabaseSettings;

use super::error::InfraError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool sized by `settings`; waiting for a free connection counts
    /// against the storage deadline.
    pub async fn connect(
        settings: &DatabaseSettings,
        acquire_timeout: Duration,
    ) -> Result<Self, InfraError> {
        let url = settings
            .url
            .as_deref()
            .ok_or(InfraError::Missing { key: "database.url" })?;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.get())
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool()).await
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
