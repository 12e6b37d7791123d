use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::Config;

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
}

/// Opens the pool and brings the schema up to date before anything uses it.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(config).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Database ready, migrations applied"
    );

    Ok(pool)
}
