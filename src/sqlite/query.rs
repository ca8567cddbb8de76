use std::sync::Arc;

use deadpool_sqlite::rusqlite;
use rusqlite::Statement;
use rusqlite::types::ValueRef;

use crate::error::NadoError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Extract a [`SqlValue`] from a `SQLite` row.
///
/// `SQLite` has no timestamp or JSON storage class, so those arrive as
/// text and are re-interpreted by the value accessors.
///
/// # Errors
///
/// Returns driver errors when the column cannot be read.
pub fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, NadoError> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Int(i)),
        ValueRef::Real(f) => Ok(SqlValue::Float(f)),
        ValueRef::Text(bytes) => Ok(SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(b) => Ok(SqlValue::Blob(b.to_vec())),
    }
}

/// Run a prepared statement and collect every row it yields.
///
/// # Errors
///
/// Returns driver errors from execution or value extraction.
pub fn build_result_set(stmt: &mut Statement) -> Result<ResultSet, NadoError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_columns(Arc::new(column_names));

    let mut rows_iter = stmt.query(())?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
