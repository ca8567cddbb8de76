//! Connection pooling.
//!
//! [`NadoPool`] wraps the engine-specific deadpool pools behind one
//! enum; [`NadoConnection`] is a checked-out connection that carries the
//! context's autocommit setting with it. All statement execution goes
//! through the connection methods here, which dispatch to the engine
//! modules.

#[cfg(feature = "postgres")]
use deadpool_postgres::{Object as PostgresObject, Pool as PostgresPool};
#[cfg(feature = "sqlite")]
use deadpool_sqlite::{Object as SqliteObject, Pool as SqlitePool, rusqlite};

use crate::error::NadoError;
use crate::results::ResultSet;

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;

/// Wrapper around a raw backend connection for generic code.
///
/// Handed to the `interact_*` escape hatches so callers can reach
/// driver features the crate does not model.
pub enum AnyConnWrapper<'a> {
    /// `PostgreSQL` client connection
    #[cfg(feature = "postgres")]
    Postgres(&'a mut tokio_postgres::Client),
    /// `SQLite` database connection
    #[cfg(feature = "sqlite")]
    Sqlite(&'a mut rusqlite::Connection),
}

/// Connection pool for database access.
#[derive(Debug, Clone)]
pub enum NadoPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(PostgresPool),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

impl NadoPool {
    /// Check a connection out of the pool.
    ///
    /// The `autocommit` flag is stamped onto the connection; transaction
    /// finalizers consult it to decide whether COMMIT and ROLLBACK are
    /// real operations or no-ops.
    ///
    /// # Errors
    ///
    /// Returns `NadoError::PoolErrorPostgres` or
    /// `NadoError::PoolErrorSqlite` if the pool fails to provide a
    /// connection.
    pub async fn acquire(&self, autocommit: bool) -> Result<NadoConnection, NadoError> {
        match self {
            #[cfg(feature = "postgres")]
            NadoPool::Postgres(pool) => {
                let client: PostgresObject =
                    pool.get().await.map_err(NadoError::PoolErrorPostgres)?;
                Ok(NadoConnection::Postgres { client, autocommit })
            }
            #[cfg(feature = "sqlite")]
            NadoPool::Sqlite(pool) => {
                let conn: SqliteObject = pool.get().await.map_err(NadoError::PoolErrorSqlite)?;
                Ok(NadoConnection::Sqlite { conn, autocommit })
            }
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }
}

/// A pooled connection plus the autocommit mode it was checked out
/// under.
#[derive(Debug)]
pub enum NadoConnection {
    #[cfg(feature = "postgres")]
    Postgres {
        client: PostgresObject,
        autocommit: bool,
    },
    #[cfg(feature = "sqlite")]
    Sqlite {
        conn: SqliteObject,
        autocommit: bool,
    },
}

impl NadoConnection {
    /// Autocommit mode stamped at checkout time.
    #[must_use]
    pub fn autocommit(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { autocommit, .. } => *autocommit,
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { autocommit, .. } => *autocommit,
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    /// Run one or more semicolon-separated statements that return no
    /// rows. Transaction-control statements also travel through here.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), NadoError> {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { client, .. } => postgres::execute_batch(client, sql).await,
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { conn, .. } => sqlite::execute_batch(conn, sql).await,
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Run a single DML statement and return the affected-row count.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn execute_dml(&mut self, sql: &str) -> Result<usize, NadoError> {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { client, .. } => postgres::execute_dml(client, sql).await,
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { conn, .. } => sqlite::execute_dml(conn, sql).await,
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Run a SELECT and collect the full result set.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn execute_select(&mut self, sql: &str) -> Result<ResultSet, NadoError> {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { client, .. } => postgres::execute_select(client, sql).await,
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { conn, .. } => sqlite::execute_select(conn, sql).await,
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Run an INSERT and return the key the engine generated for it.
    ///
    /// `PostgreSQL` gets a `RETURNING` clause appended; `SQLite` reads
    /// `last_insert_rowid()` on the same worker hop as the insert.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn insert_with_id(&mut self, sql: &str, pk_column: &str) -> Result<i64, NadoError> {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { client, .. } => {
                let sql = format!(
                    "{sql} RETURNING {}",
                    crate::dialect::SqlDialect::Postgres.quote_ident(pk_column)
                );
                postgres::insert_returning(client, &sql).await
            }
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { conn, .. } => {
                let _ = pk_column;
                sqlite::insert_rowid(conn, sql).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Run an async closure against the raw `PostgreSQL` client.
    ///
    /// # Errors
    ///
    /// Returns `NadoError::Unimplemented` when the connection is not
    /// `PostgreSQL`.
    #[allow(unused_variables)]
    pub async fn interact_async<F, Fut>(&mut self, func: F) -> Result<Fut::Output, NadoError>
    where
        F: FnOnce(AnyConnWrapper<'_>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), NadoError>> + Send + 'static,
    {
        match self {
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { client, .. } => {
                let client: &mut tokio_postgres::Client = client.as_mut();
                Ok(func(AnyConnWrapper::Postgres(client)).await)
            }
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { .. } => Err(NadoError::Unimplemented(
                "interact_async is not supported for SQLite; use interact_sync instead".to_string(),
            )),
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "interact_async is not implemented for this database type".to_string(),
            )),
        }
    }

    /// Run blocking work against the raw `SQLite` connection on its
    /// worker thread.
    ///
    /// # Errors
    ///
    /// Returns `NadoError::Unimplemented` when the connection is not
    /// `SQLite`.
    #[allow(unused_variables)]
    pub async fn interact_sync<F, R>(&self, func: F) -> Result<R, NadoError>
    where
        F: FnOnce(AnyConnWrapper) -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            #[cfg(feature = "sqlite")]
            NadoConnection::Sqlite { conn, .. } => Ok(conn
                .interact(move |conn| func(AnyConnWrapper::Sqlite(conn)))
                .await?),
            #[cfg(feature = "postgres")]
            NadoConnection::Postgres { .. } => Err(NadoError::Unimplemented(
                "interact_sync is not supported for Postgres; use interact_async instead"
                    .to_string(),
            )),
            #[allow(unreachable_patterns)]
            _ => Err(NadoError::Unimplemented(
                "interact_sync is not implemented for this database type".to_string(),
            )),
        }
    }
}
