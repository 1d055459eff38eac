use thiserror::Error;

/// Failures while bootstrapping the runtime: pool, migrations, telemetry.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("`{key}` is not configured")]
    Missing { key: &'static str },
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
