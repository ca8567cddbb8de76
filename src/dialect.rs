use serde::{Deserialize, Serialize};

use crate::types::DatabaseType;

/// ANSI isolation levels, rendered into transaction-opening text per dialect.
///
/// SQLite ignores the level (its transactions are always serializable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Everything that differs between engines at the level of generated SQL
/// text: identifier quoting, LIKE wildcard escaping, upsert clauses, and
/// transaction-control statements.
///
/// Dialects are pure text policy. They exist for engines the crate has no
/// live backend for, so statement builders can target MySQL or SQL Server
/// text without a driver feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
}

impl From<DatabaseType> for SqlDialect {
    fn from(db: DatabaseType) -> Self {
        match db {
            DatabaseType::Postgres => SqlDialect::Postgres,
            DatabaseType::Sqlite => SqlDialect::Sqlite,
        }
    }
}

impl SqlDialect {
    /// Quote an identifier. Dotted names (`u.status`) quote per segment.
    #[must_use]
    pub fn quote_ident(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| self.quote_ident_part(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn quote_ident_part(&self, part: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", part.replace('`', "``")),
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
            SqlDialect::SqlServer => format!("[{}]", part.replace(']', "]]")),
        }
    }

    /// Escape LIKE wildcard characters in a literal fragment so user input
    /// matches itself instead of acting as a pattern. Returns the escaped
    /// fragment and whether anything was escaped (SQLite needs an explicit
    /// `ESCAPE` clause in that case).
    #[must_use]
    pub fn escape_like(&self, fragment: &str) -> (String, bool) {
        let needs_escape = fragment.contains(['%', '_', '\\']);
        if !needs_escape {
            return (fragment.to_string(), false);
        }
        let escaped = match self {
            SqlDialect::SqlServer => fragment
                .replace('[', "[[]")
                .replace('%', "[%]")
                .replace('_', "[_]"),
            _ => fragment
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_"),
        };
        (escaped, !matches!(self, SqlDialect::SqlServer))
    }

    /// `ESCAPE` clause required after an escaped LIKE pattern, if any.
    /// Backslash is the default escape character on MySQL and Postgres;
    /// SQLite has none, so the clause must be spelled out.
    #[must_use]
    pub fn like_escape_clause(&self) -> Option<&'static str> {
        match self {
            SqlDialect::Sqlite => Some(" escape '\\'"),
            _ => None,
        }
    }

    /// Clause turning a multi-row INSERT into an upsert over `columns`
    /// (the non-key columns). `None` when the dialect has no such clause.
    #[must_use]
    pub fn upsert_clause(&self, primary_key: &str, columns: &[&str]) -> Option<String> {
        match self {
            SqlDialect::MySql => {
                let assignments = columns
                    .iter()
                    .map(|c| {
                        let q = self.quote_ident(c);
                        format!("{q}=VALUES({q})")
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                Some(format!(" ON DUPLICATE KEY UPDATE {assignments}"))
            }
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                let assignments = columns
                    .iter()
                    .map(|c| {
                        let q = self.quote_ident(c);
                        format!("{q}=excluded.{q}")
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                Some(format!(
                    " ON CONFLICT ({}) DO UPDATE SET {assignments}",
                    self.quote_ident(primary_key)
                ))
            }
            SqlDialect::SqlServer => None,
        }
    }

    /// Statement text opening a transaction, with the isolation level
    /// rendered where the engine accepts one.
    #[must_use]
    pub fn begin_statement(&self, isolation: Option<IsolationLevel>) -> String {
        match (self, isolation) {
            (SqlDialect::Postgres, Some(level)) => {
                format!("BEGIN ISOLATION LEVEL {}", level.as_sql())
            }
            (SqlDialect::Postgres, None) => "BEGIN".to_string(),
            (SqlDialect::MySql, Some(level)) => format!(
                "SET TRANSACTION ISOLATION LEVEL {}; START TRANSACTION",
                level.as_sql()
            ),
            (SqlDialect::MySql, None) => "START TRANSACTION".to_string(),
            // SQLite transactions are serializable regardless.
            (SqlDialect::Sqlite, _) => "BEGIN".to_string(),
            (SqlDialect::SqlServer, Some(level)) => format!(
                "SET TRANSACTION ISOLATION LEVEL {}; BEGIN TRANSACTION",
                level.as_sql()
            ),
            (SqlDialect::SqlServer, None) => "BEGIN TRANSACTION".to_string(),
        }
    }

    /// `SAVEPOINT NADO_<depth>` (T-SQL: `SAVE TRANSACTION`).
    #[must_use]
    pub fn savepoint_statement(&self, depth: usize) -> String {
        match self {
            SqlDialect::SqlServer => format!("SAVE TRANSACTION NADO_{depth}"),
            _ => format!("SAVEPOINT NADO_{depth}"),
        }
    }

    /// `RELEASE SAVEPOINT NADO_<depth>`; T-SQL has no release, the
    /// savepoint simply dissolves into the enclosing transaction.
    #[must_use]
    pub fn release_savepoint_statement(&self, depth: usize) -> Option<String> {
        match self {
            SqlDialect::SqlServer => None,
            _ => Some(format!("RELEASE SAVEPOINT NADO_{depth}")),
        }
    }

    /// `ROLLBACK TO SAVEPOINT NADO_<depth>`.
    #[must_use]
    pub fn rollback_savepoint_statement(&self, depth: usize) -> String {
        match self {
            SqlDialect::SqlServer => format!("ROLLBACK TRANSACTION NADO_{depth}"),
            _ => format!("ROLLBACK TO SAVEPOINT NADO_{depth}"),
        }
    }
}
