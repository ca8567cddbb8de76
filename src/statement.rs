//! Statement templates and the generic table-operation builders.

use crate::dialect::SqlDialect;
use crate::error::NadoError;
use crate::interpolate::{interpolate, sql_literal};
use crate::types::SqlValue;

/// A SQL template with `{}` placeholders plus the parameters to
/// interpolate into it.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Statement {
            sql: sql.into(),
            params,
        }
    }

    /// A statement with no parameters; the text is taken as-is.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Render to final SQL text.
    ///
    /// # Errors
    ///
    /// `ParameterError` on placeholder/parameter mismatch or unrenderable
    /// values.
    pub fn render(&self) -> Result<String, NadoError> {
        interpolate(&self.sql, &self.params)
    }
}

/// Builders for the generic single-table statements, parameterized by
/// dialect for identifier quoting. Column lists are quoted; select
/// columns and WHERE text pass through untouched (they may be
/// expressions).
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    dialect: SqlDialect,
}

impl StatementBuilder {
    #[must_use]
    pub fn new(dialect: SqlDialect) -> Self {
        StatementBuilder { dialect }
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// `insert into <t> (<cols>) values ({},...)` with one placeholder
    /// per column; `last` is appended verbatim (upsert clauses land
    /// there).
    ///
    /// # Errors
    ///
    /// `ParameterError` when no columns are given.
    pub fn insert(
        &self,
        table: &str,
        values: &[(&str, SqlValue)],
        last: &str,
    ) -> Result<Statement, NadoError> {
        if values.is_empty() {
            return Err(NadoError::ParameterError(format!(
                "insert into {table} requires at least one column"
            )));
        }
        let columns = values
            .iter()
            .map(|(c, _)| self.dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(",");
        let placeholders = vec!["{}"; values.len()].join(",");
        let mut sql = format!(
            "insert into {} ({columns}) values ({placeholders})",
            self.dialect.quote_ident(table)
        );
        push_last(&mut sql, last);
        Ok(Statement::new(
            sql,
            values.iter().map(|(_, v)| v.clone()).collect(),
        ))
    }

    /// Multi-row insert. Values are rendered inline (a thousand-row batch
    /// as one statement), so rendering errors surface here rather than at
    /// execute time.
    ///
    /// # Errors
    ///
    /// `ParameterError` for an empty column list, an empty batch, a row
    /// whose width differs from the column list, or an unrenderable
    /// value.
    pub fn insert_many(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
        last: &str,
    ) -> Result<Statement, NadoError> {
        if columns.is_empty() {
            return Err(NadoError::ParameterError(format!(
                "insert into {table} requires at least one column"
            )));
        }
        if rows.is_empty() {
            return Err(NadoError::ParameterError(format!(
                "batch insert into {table} requires at least one row"
            )));
        }
        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(",");
        let mut tuples = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(NadoError::ParameterError(format!(
                    "batch row {i} has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            let rendered = row
                .iter()
                .map(sql_literal)
                .collect::<Result<Vec<_>, _>>()?;
            tuples.push(format!("({})", rendered.join(",")));
        }
        let mut sql = format!(
            "insert into {} ({column_list}) values {}",
            self.dialect.quote_ident(table),
            tuples.join(",")
        );
        push_last(&mut sql, last);
        Ok(Statement::raw(sql))
    }

    /// `update <t> set a = {},... where <where>`. An empty WHERE falls
    /// back to the neutral `1=1`, which touches every row.
    ///
    /// # Errors
    ///
    /// `ParameterError` when no assignments are given.
    pub fn update(
        &self,
        table: &str,
        values: &[(&str, SqlValue)],
        where_clause: &str,
    ) -> Result<Statement, NadoError> {
        if values.is_empty() {
            return Err(NadoError::ParameterError(format!(
                "update {table} requires at least one assignment"
            )));
        }
        let assignments = values
            .iter()
            .map(|(c, _)| format!("{} = {{}}", self.dialect.quote_ident(c)))
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "update {} set {assignments} where {}",
            self.dialect.quote_ident(table),
            default_where(where_clause)
        );
        Ok(Statement::new(
            sql,
            values.iter().map(|(_, v)| v.clone()).collect(),
        ))
    }

    /// `delete from <t> where <where>` (`1=1` when empty).
    #[must_use]
    pub fn delete(&self, table: &str, where_clause: &str) -> Statement {
        Statement::raw(format!(
            "delete from {} where {}",
            self.dialect.quote_ident(table),
            default_where(where_clause)
        ))
    }

    /// `select <cols> from <t> where <where> <last>`. Columns default to
    /// `*` and are not quoted, so expressions like `count(*)` work.
    #[must_use]
    pub fn select(
        &self,
        table: &str,
        columns: &[&str],
        where_clause: &str,
        last: &str,
    ) -> Statement {
        let cols = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(",")
        };
        let mut sql = format!(
            "select {cols} from {} where {}",
            self.dialect.quote_ident(table),
            default_where(where_clause)
        );
        push_last(&mut sql, last);
        Statement::raw(sql)
    }
}

fn default_where(where_clause: &str) -> &str {
    if where_clause.is_empty() {
        "1=1"
    } else {
        where_clause
    }
}

fn push_last(sql: &mut String, last: &str) {
    if !last.is_empty() {
        sql.push(' ');
        sql.push_str(last);
    }
}
