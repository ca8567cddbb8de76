//! Statement execution on a pooled `PostgreSQL` client.
//!
//! None of these wrap the statement in a transaction; the context layer
//! issues BEGIN/COMMIT/SAVEPOINT itself on the same client, so the
//! executors must run statements exactly as given.

use deadpool_postgres::Object;

use super::query::build_result_set;
use crate::error::NadoError;
use crate::results::ResultSet;

/// Run one or more semicolon-separated statements via the simple-query
/// protocol.
///
/// # Errors
/// Returns errors reported by the server.
pub async fn execute_batch(pg_client: &mut Object, sql: &str) -> Result<(), NadoError> {
    pg_client.batch_execute(sql).await?;
    Ok(())
}

/// Run a single DML statement and return the affected-row count.
///
/// # Errors
/// Returns errors reported by the server.
pub async fn execute_dml(pg_client: &mut Object, sql: &str) -> Result<usize, NadoError> {
    let rows = pg_client.execute(sql, &[]).await?;
    usize::try_from(rows).map_err(|e| {
        NadoError::ExecutionError(format!("postgres affected rows conversion error: {e}"))
    })
}

/// Run a SELECT and collect the full result set.
///
/// # Errors
/// Returns errors from query execution or result extraction.
pub async fn execute_select(pg_client: &mut Object, sql: &str) -> Result<ResultSet, NadoError> {
    let stmt = pg_client.prepare(sql).await?;
    let rows = pg_client.query(&stmt, &[]).await?;
    build_result_set(&stmt, &rows)
}

/// Run an INSERT carrying a `RETURNING` clause and read back the
/// generated key from its single result row.
///
/// # Errors
/// Returns errors reported by the server, including the case where the
/// statement yields no row.
pub async fn insert_returning(pg_client: &mut Object, sql: &str) -> Result<i64, NadoError> {
    let row = pg_client.query_one(sql, &[]).await?;
    let id: i64 = row.try_get(0)?;
    Ok(id)
}
