use deadpool::managed::PoolConfig;
use deadpool_sqlite::{Config as SqliteConfig, Pool, Runtime};

use crate::config::DbConfig;
use crate::error::NadoError;

/// Build a `SQLite` pool from a [`DbConfig`] and switch the database to
/// WAL mode.
///
/// The `database` field is the file path, or a `file:` URI such as
/// `file::memory:?cache=shared`; the other connection fields are
/// ignored.
///
/// # Errors
///
/// Returns `NadoError::ConfigError` when the path is missing and
/// `NadoError::ConnectionError` if pool creation or the pragma setup
/// fails.
pub async fn build_pool(config: &DbConfig) -> Result<Pool, NadoError> {
    let Some(db_path) = config.database.clone() else {
        return Err(NadoError::ConfigError(
            "database path is required".to_string(),
        ));
    };

    let mut cfg: SqliteConfig = SqliteConfig::new(db_path);
    cfg.pool = Some(PoolConfig::new(config.max_size));

    let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
        NadoError::ConnectionError(format!("Failed to create SQLite pool: {e}"))
    })?;

    {
        let conn = pool.get().await.map_err(NadoError::PoolErrorSqlite)?;
        conn.interact(|conn| {
            conn.execute_batch(
                "
                    PRAGMA journal_mode = WAL;
                ",
            )
            .map_err(NadoError::SqliteError)
        })
        .await??;
    }

    Ok(pool)
}
