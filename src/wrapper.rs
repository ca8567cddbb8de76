//! Predicate builder producing WHERE-clause text.
//!
//! A wrapper starts from the neutral condition `1=1`, so generated clauses
//! can always be appended with `and` and an empty wrapper is a valid
//! predicate. All values pass through the same literal rendering as
//! statement interpolation; LIKE values additionally get their wildcard
//! characters escaped per dialect.

use crate::dialect::SqlDialect;
use crate::error::NadoError;
use crate::interpolate::sql_literal;
use crate::types::SqlValue;

/// Render a predicate value, falling back to a quoted text literal for
/// values [`sql_literal`] refuses (malformed decimals, non-finite floats).
/// The fallback cannot match a numeric column but also cannot escape its
/// quotes, so a bad value degrades to a non-matching predicate instead of
/// an injection vector.
fn predicate_literal(value: &SqlValue) -> String {
    match sql_literal(value) {
        Ok(text) => text,
        Err(_) => {
            let raw = match value {
                SqlValue::Decimal(d) => d.clone(),
                SqlValue::Float(f) => f.to_string(),
                other => format!("{other:?}"),
            };
            format!("'{}'", raw.replace('\'', "''"))
        }
    }
}

/// Builder for WHERE-clause fragments.
///
/// ```rust
/// use nado::prelude::*;
///
/// let w = QueryWrapper::new()
///     .eq("status", 1)
///     .like("name", "O'Brien");
/// assert_eq!(w.sql_segment(), "1=1 and status = 1 and name like '%O''Brien%'  ");
/// ```
#[derive(Debug, Clone)]
pub struct QueryWrapper {
    dialect: SqlDialect,
    conditions: Vec<String>,
    ordering: Vec<String>,
    last: String,
}

impl Default for QueryWrapper {
    fn default() -> Self {
        Self::new()
    }
}

enum LikeShape {
    Both,
    Left,
    Right,
}

impl QueryWrapper {
    #[must_use]
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::MySql)
    }

    #[must_use]
    pub fn with_dialect(dialect: SqlDialect) -> Self {
        QueryWrapper {
            dialect,
            conditions: vec!["1=1".to_string()],
            ordering: Vec::new(),
            last: String::new(),
        }
    }

    /// Comparison against a value, with range widening for timestamps:
    /// `>`/`>=` pins the fractional part low, `<`/`<=` pins it high, so
    /// second-precision bounds cover the whole second. Dates widen to the
    /// day's first and last instant the same way.
    fn cmp(mut self, column: &str, op: &'static str, value: SqlValue) -> Self {
        let rendered = match &value {
            SqlValue::Timestamp(ts) => {
                let base = ts.format("%Y-%m-%d %H:%M:%S");
                match op {
                    ">" | ">=" => format!("'{base}.000000'"),
                    "<" | "<=" => format!("'{base}.999999'"),
                    _ => format!("'{base}'"),
                }
            }
            SqlValue::Date(d) => {
                let base = d.format("%Y-%m-%d");
                match op {
                    ">" | ">=" => format!("'{base} 00:00:00.000000'"),
                    "<" | "<=" => format!("'{base} 23:59:59.999999'"),
                    _ => format!("'{base}'"),
                }
            }
            _ => predicate_literal(&value),
        };
        self.conditions.push(format!("{column} {op} {rendered}"));
        self
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, "=", value.into())
    }

    #[must_use]
    pub fn ne(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, "<>", value.into())
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, "<", value.into())
    }

    #[must_use]
    pub fn le(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, "<=", value.into())
    }

    #[must_use]
    pub fn gt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, ">", value.into())
    }

    #[must_use]
    pub fn ge(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, ">=", value.into())
    }

    fn like_impl(mut self, column: &str, value: &str, shape: LikeShape, op: &str) -> Self {
        // Quote-escape once, then wildcard-escape; the pattern is wrapped
        // in quotes as-is afterwards, never re-escaped.
        let quoted = value.replace('\'', "''");
        let (escaped, was_escaped) = self.dialect.escape_like(&quoted);
        let pattern = match shape {
            LikeShape::Both => format!("%{escaped}%"),
            LikeShape::Left => format!("%{escaped}"),
            LikeShape::Right => format!("{escaped}%"),
        };
        let escape_clause = if was_escaped {
            self.dialect.like_escape_clause().unwrap_or("")
        } else {
            ""
        };
        self.conditions
            .push(format!("{column} {op} '{pattern}'{escape_clause}"));
        self
    }

    #[must_use]
    pub fn like(self, column: &str, value: &str) -> Self {
        self.like_impl(column, value, LikeShape::Both, "like")
    }

    #[must_use]
    pub fn not_like(self, column: &str, value: &str) -> Self {
        self.like_impl(column, value, LikeShape::Both, "not like")
    }

    /// Fuzzy on the left only: matches values ending with `value`.
    #[must_use]
    pub fn like_left(self, column: &str, value: &str) -> Self {
        self.like_impl(column, value, LikeShape::Left, "like")
    }

    /// Fuzzy on the right only: matches values starting with `value`.
    #[must_use]
    pub fn like_right(self, column: &str, value: &str) -> Self {
        self.like_impl(column, value, LikeShape::Right, "like")
    }

    /// Membership test, `column in (v1,v2,...)`.
    ///
    /// # Errors
    ///
    /// `ParameterError` for an empty value list; `in ()` is not valid SQL
    /// and silently matching nothing would hide the bug.
    pub fn include<V: Into<SqlValue>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, NadoError> {
        let rendered: Vec<String> = values
            .into_iter()
            .map(|v| predicate_literal(&v.into()))
            .collect();
        if rendered.is_empty() {
            return Err(NadoError::ParameterError(format!(
                "include() on column {column} requires at least one value"
            )));
        }
        self.conditions
            .push(format!("{column} in ({})", rendered.join(",")));
        Ok(self)
    }

    /// Inclusive range test.
    #[must_use]
    pub fn between(
        mut self,
        column: &str,
        left: impl Into<SqlValue>,
        right: impl Into<SqlValue>,
    ) -> Self {
        self.conditions.push(format!(
            "{column} between {} and {}",
            predicate_literal(&left.into()),
            predicate_literal(&right.into())
        ));
        self
    }

    #[must_use]
    pub fn not_between(
        mut self,
        column: &str,
        left: impl Into<SqlValue>,
        right: impl Into<SqlValue>,
    ) -> Self {
        self.conditions.push(format!(
            "{column} not between {} and {}",
            predicate_literal(&left.into()),
            predicate_literal(&right.into())
        ));
        self
    }

    /// Correlated subquery test. The subquery text is trusted as-is.
    #[must_use]
    pub fn exists(mut self, sub_sql: &str) -> Self {
        self.conditions.push(format!("exists ({sub_sql})"));
        self
    }

    #[must_use]
    pub fn not_exists(mut self, sub_sql: &str) -> Self {
        self.conditions.push(format!("not exists ({sub_sql})"));
        self
    }

    /// Append a raw condition, parenthesized but otherwise trusted as-is.
    #[must_use]
    pub fn add_raw_condition(mut self, condition: &str) -> Self {
        self.conditions.push(format!("({condition})"));
        self
    }

    /// Fold this wrapper's conditions with another's into
    /// `((mine) or (theirs))`. Ordering and trailing clause stay mine;
    /// the other wrapper is not touched.
    #[must_use]
    pub fn xor(mut self, other: &QueryWrapper) -> Self {
        let mine = self.conditions.join(" and ");
        let theirs = other.conditions.join(" and ");
        self.conditions = vec![format!("(({mine}) or ({theirs}))")];
        self
    }

    /// `ORDER BY` entry; `asc` false renders `desc`.
    #[must_use]
    pub fn add_order(mut self, column: &str, asc: bool) -> Self {
        self.ordering
            .push(format!("{column} {}", if asc { "asc" } else { "desc" }));
        self
    }

    /// Raw trailing clause (typically `LIMIT n OFFSET m`), placed after
    /// the ordering. Replaces any previous trailing clause.
    #[must_use]
    pub fn last(mut self, sql: impl Into<String>) -> Self {
        self.last = sql.into();
        self
    }

    pub(crate) fn set_last(&mut self, sql: String) {
        self.last = sql;
    }

    /// Reset to the neutral `1=1` state.
    pub fn clear(&mut self) {
        self.conditions = vec!["1=1".to_string()];
        self.ordering.clear();
        self.last.clear();
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// ` ORDER BY a asc,b desc ` (space-padded), or empty.
    #[must_use]
    pub fn order_clause(&self) -> String {
        if self.ordering.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {} ", self.ordering.join(","))
        }
    }

    /// The conditions alone, joined with ` and `, with no ordering or
    /// trailing clause. Count queries build on this.
    #[must_use]
    pub fn conditions_segment(&self) -> String {
        self.conditions.join(" and ")
    }

    /// The full predicate fragment: conditions joined with ` and `, then
    /// the order clause, then the trailing clause, single-space separated.
    #[must_use]
    pub fn sql_segment(&self) -> String {
        format!(
            "{} {} {}",
            self.conditions.join(" and "),
            self.order_clause(),
            self.last
        )
    }
}
