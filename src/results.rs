//! Query results: rows of [`SqlValue`]s with shared column metadata.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::SqlValue;

/// A single result row.
///
/// Column names and the name-to-index map are shared across all rows of a
/// result set, so cloning a row never duplicates metadata.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Value by column name, `None` for unknown columns.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.index.get(column).and_then(|i| self.values.get(*i))
    }

    /// Value by position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Row {
            columns: Arc::new(Vec::new()),
            index: Arc::new(HashMap::new()),
            values: Vec::new(),
        }
    }
}

/// Rows returned by a query, plus the affected-row count for DML.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query.
    pub rows: Vec<Row>,
    /// Rows affected; for selects this tracks the row count.
    pub rows_affected: usize,
    columns: Option<Arc<Vec<String>>>,
    index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: Vec::with_capacity(capacity),
            rows_affected: 0,
            columns: None,
            index: None,
        }
    }

    /// Set the column names shared by every row. Builds the name-to-index
    /// map once; rows added afterwards only clone the two `Arc`s.
    pub fn set_columns(&mut self, columns: Arc<Vec<String>>) {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        self.index = Some(Arc::new(index));
        self.columns = Some(columns);
    }

    #[must_use]
    pub fn columns(&self) -> Option<&Arc<Vec<String>>> {
        self.columns.as_ref()
    }

    /// Append a row of values. A no-op unless columns were set first.
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        if let (Some(columns), Some(index)) = (&self.columns, &self.index) {
            self.rows.push(Row {
                columns: columns.clone(),
                index: index.clone(),
                values,
            });
            self.rows_affected += 1;
        }
    }

    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_columns(Arc::new(vec!["id".to_string(), "name".to_string()]));
        rs.add_row_values(vec![SqlValue::Int(1), SqlValue::Text("a".into())]);
        rs.add_row_values(vec![SqlValue::Int(2), SqlValue::Text("b".into())]);
        rs
    }

    #[test]
    fn lookup_by_name_and_index() {
        let rs = sample();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.rows_affected, 2);
        let row = rs.first().unwrap();
        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get_by_index(1), Some(&SqlValue::Text("a".into())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn rows_share_column_metadata() {
        let rs = sample();
        let a = rs.rows[0].columns().as_ptr();
        let b = rs.rows[1].columns().as_ptr();
        assert_eq!(a, b);
    }

    #[test]
    fn add_without_columns_is_noop() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![SqlValue::Int(1)]);
        assert!(rs.is_empty());
    }
}
