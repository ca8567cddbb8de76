//! Connection configuration.
//!
//! One [`DbConfig`] drives every backend; fields a backend does not use
//! (e.g. `host` for SQLite) are simply ignored by its constructor. The
//! struct deserializes from JSON/TOML with sensible defaults, so a
//! minimal config is just the fields that identify the database.

use serde::{Deserialize, Serialize};

use crate::dialect::IsolationLevel;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database name; for SQLite this is the file path (or a
    /// `file::memory:` URI).
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// When false, connections are held for the lifetime of the context
    /// instead of returning to the pool between operations.
    #[serde(default = "default_true")]
    pub pooling: bool,
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Isolation level for explicit transactions; `None` leaves the
    /// server default in place.
    #[serde(default)]
    pub isolation_level: Option<IsolationLevel>,
    /// Autocommit contexts never issue BEGIN/COMMIT; `begin()` hands
    /// back a transaction whose finalizers do nothing.
    #[serde(default)]
    pub autocommit: bool,
    /// When true (the default), a nested `begin()` is a no-op frame;
    /// when false it opens a savepoint.
    #[serde(default = "default_true")]
    pub ignore_nested_transactions: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            charset: default_charset(),
            pooling: true,
            min_size: default_min_size(),
            max_size: default_max_size(),
            isolation_level: None,
            autocommit: false,
            ignore_nested_transactions: true,
        }
    }
}

impl DbConfig {
    /// Config pointing at a SQLite database file.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        DbConfig {
            database: Some(path.into()),
            ..DbConfig::default()
        }
    }
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_size() -> usize {
    1
}

fn default_max_size() -> usize {
    10
}
