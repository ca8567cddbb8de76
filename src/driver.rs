//! Driver construction: configuration in, pool and contexts out.

use crate::config::DbConfig;
use crate::context::DbContext;
use crate::dialect::SqlDialect;
use crate::error::NadoError;
use crate::pool::NadoPool;
use crate::types::DatabaseType;

/// A configured database: the connection pool, its engine type, and the
/// settings every context created from it inherits.
///
/// Cloning a `Driver` clones pool handles, not connections, so one
/// driver can be shared across tasks and each task can open its own
/// [`DbContext`].
#[derive(Debug, Clone)]
pub struct Driver {
    pool: NadoPool,
    db_type: DatabaseType,
    config: DbConfig,
}

impl Driver {
    /// Initialize a `PostgreSQL` driver.
    ///
    /// # Errors
    /// Returns `NadoError::ConfigError` if required config fields are
    /// missing or `NadoError::ConnectionError` if pool creation fails.
    #[cfg(feature = "postgres")]
    #[allow(clippy::unused_async)]
    pub async fn new_postgres(config: DbConfig) -> Result<Self, NadoError> {
        let pool = crate::postgres::build_pool(&config)?;
        Ok(Driver {
            pool: NadoPool::Postgres(pool),
            db_type: DatabaseType::Postgres,
            config,
        })
    }

    /// Initialize a `SQLite` driver, creating the database file if
    /// needed and switching it to WAL mode.
    ///
    /// # Errors
    /// Returns `NadoError::ConfigError` when the path is missing or
    /// `NadoError::ConnectionError` if pool creation fails.
    #[cfg(feature = "sqlite")]
    pub async fn new_sqlite(config: DbConfig) -> Result<Self, NadoError> {
        let pool = crate::sqlite::build_pool(&config).await?;
        Ok(Driver {
            pool: NadoPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
            config,
        })
    }

    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        SqlDialect::from(self.db_type)
    }

    #[must_use]
    pub fn pool(&self) -> &NadoPool {
        &self.pool
    }

    #[must_use]
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Open a fresh context. The context lazily checks a connection out
    /// of the pool on first use.
    #[must_use]
    pub fn context(&self) -> DbContext {
        DbContext::new(self.pool.clone(), self.dialect(), &self.config)
    }
}
