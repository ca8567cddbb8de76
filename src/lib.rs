//! Async SQL middleware over `PostgreSQL` and `SQLite`.
//!
//! One configuration/connection/transaction/query surface regardless of
//! backend: pooled connections from [deadpool], statements rendered by
//! client-side parameter interpolation, nested transactions emulated with
//! savepoints, and an optimistic-concurrency repository layer for mapped
//! records.
//!
//! ```rust,no_run
//! use nado::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NadoError> {
//!     let driver = Driver::new_sqlite(DbConfig::sqlite("app.db")).await?;
//!     let mut ctx = driver.context();
//!     ctx.execute_batch("create table if not exists note (id integer primary key, body text)")
//!         .await?;
//!     ctx.execute(
//!         "insert into note (body) values ({})",
//!         &[SqlValue::Text("hello".into())],
//!     )
//!     .await?;
//!     let rows = ctx
//!         .query(
//!             "select id, body from note where body = {}",
//!             &[SqlValue::Text("hello".into())],
//!         )
//!         .await?;
//!     println!("{} notes", rows.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod interpolate;
pub mod page;
pub mod pool;
pub mod record;
pub mod repository;
pub mod results;
pub mod snowflake;
pub mod statement;
pub mod transaction;
pub mod types;
pub mod wrapper;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod prelude;

pub use error::NadoError;
