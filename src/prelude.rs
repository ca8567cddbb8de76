//! Convenient imports for common functionality.
//!
//! Pulls in the driver, context, repository, and query-building types
//! most applications touch, so one glob import gets a working surface.

pub use crate::config::DbConfig;
pub use crate::context::{DbContext, TxFuture};
pub use crate::dialect::{IsolationLevel, SqlDialect};
pub use crate::driver::Driver;
pub use crate::error::NadoError;
pub use crate::page::Page;
pub use crate::pool::{AnyConnWrapper, NadoConnection, NadoPool};
pub use crate::record::{BaseRecord, Record};
pub use crate::repository::{IdStrategy, Repository, RepositoryOptions};
pub use crate::results::{ResultSet, Row};
pub use crate::statement::{Statement, StatementBuilder};
pub use crate::transaction::{Transaction, TxCapability};
pub use crate::types::{DatabaseType, SqlValue};
pub use crate::wrapper::QueryWrapper;
