use anyhow::Result;
use splitflow_core::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates a connection pool for the configured `PostgreSQL` database.
///
/// # Errors
/// Returns an error if the database connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Applies the embedded schema migrations.
///
/// # Errors
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
