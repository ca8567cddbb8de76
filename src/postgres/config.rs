use deadpool_postgres::{Config as PgConfig, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

use crate::config::DbConfig;
use crate::error::NadoError;

/// Build a `PostgreSQL` pool from a [`DbConfig`].
///
/// `host`, `user` and `database` are required; the port defaults to
/// 5432 and the password may be omitted for trust-style auth. The
/// charset is forwarded as `client_encoding`.
///
/// # Errors
///
/// Returns `NadoError::ConfigError` if required config fields are
/// missing or `NadoError::ConnectionError` if pool creation fails.
pub fn build_pool(config: &DbConfig) -> Result<Pool, NadoError> {
    if config.host.is_none() {
        return Err(NadoError::ConfigError("host is required".to_string()));
    }
    if config.user.is_none() {
        return Err(NadoError::ConfigError("user is required".to_string()));
    }
    if config.database.is_none() {
        return Err(NadoError::ConfigError("database is required".to_string()));
    }

    let mut pg_config = PgConfig::new();
    pg_config.host.clone_from(&config.host);
    pg_config.port = Some(config.port.unwrap_or(5432));
    pg_config.user.clone_from(&config.user);
    pg_config.password.clone_from(&config.password);
    pg_config.dbname.clone_from(&config.database);
    if !config.charset.is_empty() {
        pg_config.options = Some(format!("-c client_encoding={}", config.charset));
    }
    pg_config.pool = Some(PoolConfig::new(config.max_size));

    pg_config
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| {
            NadoError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
        })
}
