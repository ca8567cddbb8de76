//! Statement execution on a pooled `SQLite` connection.
//!
//! Each call hops to the deadpool worker thread that owns the raw
//! connection. Transaction state persists between hops on the same
//! checked-out connection, so the context layer can issue BEGIN in one
//! call and COMMIT in a later one; nothing here wraps statements in a
//! transaction of its own.

use deadpool_sqlite::Object;

use super::query::build_result_set;
use crate::error::NadoError;
use crate::results::ResultSet;

/// Run one or more semicolon-separated statements in one worker hop.
/// Transaction-control statements also travel through here.
///
/// # Errors
///
/// Returns driver errors reported by `SQLite`.
pub async fn execute_batch(sqlite_conn: &Object, sql: &str) -> Result<(), NadoError> {
    let sql_owned = sql.to_owned();
    sqlite_conn
        .interact(move |conn| -> Result<(), NadoError> {
            conn.execute_batch(&sql_owned)?;
            Ok(())
        })
        .await?
}

/// Run a single DML statement and return the affected-row count.
///
/// # Errors
///
/// Returns driver errors reported by `SQLite`.
pub async fn execute_dml(sqlite_conn: &Object, sql: &str) -> Result<usize, NadoError> {
    let sql_owned = sql.to_owned();
    sqlite_conn
        .interact(move |conn| -> Result<usize, NadoError> {
            let mut stmt = conn.prepare_cached(&sql_owned)?;
            Ok(stmt.execute(())?)
        })
        .await?
}

/// Run a SELECT and collect the full result set.
///
/// # Errors
///
/// Returns driver errors from execution or result extraction.
pub async fn execute_select(sqlite_conn: &Object, sql: &str) -> Result<ResultSet, NadoError> {
    let sql_owned = sql.to_owned();
    sqlite_conn
        .interact(move |conn| -> Result<ResultSet, NadoError> {
            let mut stmt = conn.prepare_cached(&sql_owned)?;
            build_result_set(&mut stmt)
        })
        .await?
}

/// Run an INSERT and read `last_insert_rowid()` on the same worker hop,
/// so no other statement can slip in between.
///
/// # Errors
///
/// Returns driver errors, or `ExecutionError` when the insert affected
/// no rows.
pub async fn insert_rowid(sqlite_conn: &Object, sql: &str) -> Result<i64, NadoError> {
    let sql_owned = sql.to_owned();
    sqlite_conn
        .interact(move |conn| -> Result<i64, NadoError> {
            let changed = {
                let mut stmt = conn.prepare_cached(&sql_owned)?;
                stmt.execute(())?
            };
            if changed == 0 {
                return Err(NadoError::ExecutionError(
                    "insert affected no rows".to_string(),
                ));
            }
            Ok(conn.last_insert_rowid())
        })
        .await?
}
