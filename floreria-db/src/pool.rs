use std::time::Duration;

use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use tracing::info;

use crate::{bootstrap::Report, config::DatabaseConfig, rewrite::Normalize, Bootstrap, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Opens a pool against the server in `config`. Connections don't select a
/// database; statements qualify or `USE` the schema themselves.
pub async fn connect(config: &DatabaseConfig, settings: PoolSettings) -> Result<MySqlPool> {
    info!(
        host = %config.host,
        port = config.port,
        max_connections = settings.max_connections,
        "connecting to MySQL"
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(config.connect_options())
        .await?;
    Ok(pool)
}

/// Runs `bootstrap` on a single connection checked out of `pool`.
pub async fn bootstrap<N: Normalize>(pool: &MySqlPool, bootstrap: &Bootstrap<N>) -> Result<Report> {
    let mut conn = pool.acquire().await?;
    bootstrap.run(&mut *conn).await
}
