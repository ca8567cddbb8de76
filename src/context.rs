//! The unit-of-work layer.
//!
//! A [`DbContext`] owns at most one checked-out connection plus a stack
//! of transaction frames, and every statement the crate issues goes
//! through it. Outside an explicit transaction each write runs as its
//! own unit: begin, execute, commit, release. Inside one, statements
//! run on the open frame and the caller's finalizers decide the
//! outcome.

use std::future::Future;
use std::pin::Pin;

use tracing::error;

use crate::config::DbConfig;
use crate::dialect::{IsolationLevel, SqlDialect};
use crate::error::NadoError;
use crate::interpolate::interpolate;
use crate::pool::{AnyConnWrapper, NadoConnection, NadoPool};
use crate::results::ResultSet;
use crate::statement::{Statement, StatementBuilder};
use crate::transaction::{Transaction, TxCapability, TxEngine};
use crate::types::SqlValue;
use crate::wrapper::QueryWrapper;

/// Boxed future returned by scoped-transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, NadoError>> + Send + 'a>>;

/// A unit-of-work handle over one pooled connection.
///
/// Contexts are cheap to create and not shared: open one per task from
/// a [`crate::driver::Driver`] and let it drop when done. Dropping a
/// context with an open transaction schedules a rollback on the
/// runtime.
#[derive(Debug)]
pub struct DbContext {
    pool: NadoPool,
    dialect: SqlDialect,
    conn: Option<NadoConnection>,
    transactions: Vec<TxEngine>,
    pooling: bool,
    ignore_nested: bool,
    isolation: Option<IsolationLevel>,
    autocommit: bool,
}

impl DbContext {
    #[must_use]
    pub fn new(pool: NadoPool, dialect: SqlDialect, config: &DbConfig) -> Self {
        DbContext {
            pool,
            dialect,
            conn: None,
            transactions: Vec::new(),
            pooling: config.pooling,
            ignore_nested: config.ignore_nested_transactions,
            isolation: config.isolation_level,
            autocommit: config.autocommit,
        }
    }

    #[must_use]
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// A condition builder seeded with this context's dialect.
    #[must_use]
    pub fn wrapper(&self) -> QueryWrapper {
        QueryWrapper::with_dialect(self.dialect)
    }

    /// A statement builder seeded with this context's dialect.
    #[must_use]
    pub fn statements(&self) -> StatementBuilder {
        StatementBuilder::new(self.dialect)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.transactions.is_empty()
    }

    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transactions.len()
    }

    /// Ensure a connection is checked out and return it.
    async fn load(&mut self) -> Result<&mut NadoConnection, NadoError> {
        if self.conn.is_none() {
            self.conn = Some(self.pool.acquire(self.autocommit).await?);
        }
        self.require_conn()
    }

    fn require_conn(&mut self) -> Result<&mut NadoConnection, NadoError> {
        self.conn
            .as_mut()
            .ok_or_else(|| NadoError::ConnectionError("no loaded connection".to_string()))
    }

    /// Return the connection to the pool if nothing is holding it open.
    ///
    /// A no-op while a transaction is running. In non-pooling mode the
    /// connection is also released; the next operation checks out a
    /// fresh one.
    pub fn unload(&mut self) {
        if self.transactions.is_empty() {
            self.conn = None;
        }
    }

    fn release_if_pooling(&mut self) {
        if self.pooling && self.transactions.is_empty() {
            self.conn = None;
        }
    }

    async fn run_dml(&mut self, sql: &str) -> Result<usize, NadoError> {
        let conn = self.load().await?;
        conn.execute_dml(sql).await
    }

    /// Interpolate `params` into `sql` and execute it as a DML
    /// statement, returning the affected-row count.
    ///
    /// Outside a transaction this runs as its own unit of work and the
    /// connection goes back to the pool afterwards; inside one it runs
    /// on the open frame.
    ///
    /// # Errors
    ///
    /// `ParameterError` for placeholder mismatches, otherwise driver
    /// errors. Failed statements are logged with their SQL text.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize, NadoError> {
        let rendered = interpolate(sql, params)?;
        if self.transactions.is_empty() {
            let tx = self.begin().await?;
            match self.run_dml(&rendered).await {
                Ok(affected) => {
                    self.commit(&tx).await?;
                    Ok(affected)
                }
                Err(e) => {
                    error!("statement failed: {rendered}");
                    self.rollback_quietly(&tx).await;
                    Err(e)
                }
            }
        } else {
            match self.run_dml(&rendered).await {
                Ok(affected) => Ok(affected),
                Err(e) => {
                    error!("statement failed: {rendered}");
                    Err(e)
                }
            }
        }
    }

    /// Interpolate `params` into `sql`, run it as a SELECT and collect
    /// the rows.
    ///
    /// Reads never open a transaction; outside one, the connection is
    /// released again afterwards.
    ///
    /// # Errors
    ///
    /// `ParameterError` for placeholder mismatches, otherwise driver
    /// errors.
    pub async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, NadoError> {
        let rendered = interpolate(sql, params)?;
        let in_tx = !self.transactions.is_empty();
        let result = {
            let conn = self.load().await?;
            conn.execute_select(&rendered).await
        };
        if !in_tx {
            self.release_if_pooling();
        }
        match result {
            Ok(set) => Ok(set),
            Err(e) => {
                error!("query failed: {rendered}");
                Err(e)
            }
        }
    }

    /// Execute a pre-built [`Statement`].
    ///
    /// # Errors
    ///
    /// Same as [`DbContext::execute`].
    pub async fn execute_statement(&mut self, stmt: &Statement) -> Result<usize, NadoError> {
        self.execute(&stmt.sql, &stmt.params).await
    }

    /// Query with a pre-built [`Statement`].
    ///
    /// # Errors
    ///
    /// Same as [`DbContext::query`].
    pub async fn query_statement(&mut self, stmt: &Statement) -> Result<ResultSet, NadoError> {
        self.query(&stmt.sql, &stmt.params).await
    }

    /// Select from `table` with a condition wrapper. Columns default to
    /// `*` when empty.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn select(
        &mut self,
        table: &str,
        columns: &[&str],
        wrapper: &QueryWrapper,
    ) -> Result<ResultSet, NadoError> {
        let stmt = self
            .statements()
            .select(table, columns, &wrapper.sql_segment(), "");
        self.query_statement(&stmt).await
    }

    /// Run one or more semicolon-separated statements (DDL scripts,
    /// fixtures). No interpolation, no result rows.
    ///
    /// # Errors
    ///
    /// Driver errors from the underlying engine.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), NadoError> {
        let in_tx = !self.transactions.is_empty();
        let result = {
            let conn = self.load().await?;
            conn.execute_batch(sql).await
        };
        if !in_tx {
            self.release_if_pooling();
        }
        if result.is_err() {
            error!("batch failed: {sql}");
        }
        result
    }

    /// Run an INSERT statement and return the generated key, reading it
    /// back in the same unit of work as the insert.
    ///
    /// # Errors
    ///
    /// `ParameterError` for placeholder mismatches, otherwise driver
    /// errors.
    pub async fn insert_with_id(
        &mut self,
        stmt: &Statement,
        pk_column: &str,
    ) -> Result<i64, NadoError> {
        let rendered = stmt.render()?;
        if self.transactions.is_empty() {
            let tx = self.begin().await?;
            let result = {
                let conn = self.require_conn()?;
                conn.insert_with_id(&rendered, pk_column).await
            };
            match result {
                Ok(id) => {
                    self.commit(&tx).await?;
                    Ok(id)
                }
                Err(e) => {
                    error!("statement failed: {rendered}");
                    self.rollback_quietly(&tx).await;
                    Err(e)
                }
            }
        } else {
            let result = {
                let conn = self.load().await?;
                conn.insert_with_id(&rendered, pk_column).await
            };
            match result {
                Ok(id) => Ok(id),
                Err(e) => {
                    error!("statement failed: {rendered}");
                    Err(e)
                }
            }
        }
    }

    /// Open a transaction frame.
    ///
    /// The outermost frame issues BEGIN. A nested `begin()` opens a
    /// savepoint, unless the context ignores nested transactions, in
    /// which case the frame is a no-op and its rollback cannot undo
    /// anything. On an autocommit context every frame is a no-op.
    ///
    /// # Errors
    ///
    /// Driver errors from issuing the transaction statement.
    pub async fn begin(&mut self) -> Result<Transaction, NadoError> {
        let depth = self.transactions.len();
        let engine = if self.autocommit {
            TxEngine::NoOp
        } else if depth == 0 {
            TxEngine::Real
        } else if self.ignore_nested {
            TxEngine::NoOp
        } else {
            TxEngine::Savepoint
        };
        self.load().await?;
        match engine {
            TxEngine::Real => {
                let sql = self.dialect.begin_statement(self.isolation);
                self.require_conn()?.execute_batch(&sql).await?;
            }
            TxEngine::Savepoint => {
                let sql = self.dialect.savepoint_statement(depth);
                self.require_conn()?.execute_batch(&sql).await?;
            }
            TxEngine::NoOp => {}
        }
        self.transactions.push(engine);
        Ok(Transaction { depth, engine })
    }

    /// Commit the frame `tx`, along with any frames opened inside it
    /// that are still on the stack. Committing a frame that was already
    /// closed is a no-op.
    ///
    /// # Errors
    ///
    /// Driver errors from COMMIT or the savepoint release. The stack is
    /// only popped after the statement succeeds.
    pub async fn commit(&mut self, tx: &Transaction) -> Result<(), NadoError> {
        if self.transactions.len() <= tx.depth {
            return Ok(());
        }
        match tx.engine {
            TxEngine::Real => {
                self.require_conn()?.commit().await?;
            }
            TxEngine::Savepoint => {
                if let Some(sql) = self.dialect.release_savepoint_statement(tx.depth) {
                    self.require_conn()?.execute_batch(&sql).await?;
                }
            }
            TxEngine::NoOp => {}
        }
        self.transactions.truncate(tx.depth);
        if self.transactions.is_empty() {
            self.release_if_pooling();
        }
        Ok(())
    }

    /// Roll back the frame `tx`, along with any frames opened inside it
    /// that are still on the stack. A savepoint frame rolls back to its
    /// savepoint and leaves outer frames untouched; rolling back an
    /// already-closed frame is a no-op.
    ///
    /// # Errors
    ///
    /// Driver errors from ROLLBACK. The stack is only popped after the
    /// statement succeeds.
    pub async fn rollback(&mut self, tx: &Transaction) -> Result<(), NadoError> {
        if self.transactions.len() <= tx.depth {
            return Ok(());
        }
        match tx.engine {
            TxEngine::Real => {
                self.require_conn()?.rollback().await?;
            }
            TxEngine::Savepoint => {
                let sql = self.dialect.rollback_savepoint_statement(tx.depth);
                self.require_conn()?.execute_batch(&sql).await?;
            }
            TxEngine::NoOp => {}
        }
        self.transactions.truncate(tx.depth);
        if self.transactions.is_empty() {
            self.release_if_pooling();
        }
        Ok(())
    }

    pub(crate) async fn rollback_quietly(&mut self, tx: &Transaction) {
        if let Err(e) = self.rollback(tx).await {
            error!("rollback after failed statement also failed: {e}");
        }
    }

    /// Run `func` inside a transaction frame: committed when it returns
    /// `Ok`, rolled back when it returns `Err`.
    ///
    /// ```ignore
    /// let n = ctx
    ///     .transaction(|ctx| {
    ///         Box::pin(async move {
    ///             ctx.execute("update t set a = {} where id = {}", &params).await
    ///         })
    ///     })
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// The closure's error after rollback, or driver errors from the
    /// frame statements themselves.
    pub async fn transaction<T, F>(&mut self, func: F) -> Result<T, NadoError>
    where
        F: for<'c> FnOnce(&'c mut DbContext) -> TxFuture<'c, T>,
    {
        let tx = self.begin().await?;
        match func(self).await {
            Ok(value) => {
                self.commit(&tx).await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback_quietly(&tx).await;
                Err(e)
            }
        }
    }

    /// Run blocking work against the raw `SQLite` connection.
    ///
    /// # Errors
    ///
    /// `Unimplemented` when the loaded connection is not `SQLite`.
    pub async fn interact_sync<F, R>(&mut self, func: F) -> Result<R, NadoError>
    where
        F: FnOnce(AnyConnWrapper) -> R + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.load().await?;
        conn.interact_sync(func).await
    }

    /// Run an async closure against the raw `PostgreSQL` client.
    ///
    /// # Errors
    ///
    /// `Unimplemented` when the loaded connection is not `PostgreSQL`.
    pub async fn interact_async<F, Fut>(&mut self, func: F) -> Result<Fut::Output, NadoError>
    where
        F: FnOnce(AnyConnWrapper<'_>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), NadoError>> + Send + 'static,
    {
        let conn = self.load().await?;
        conn.interact_async(func).await
    }
}

impl Drop for DbContext {
    fn drop(&mut self) {
        if self.transactions.is_empty() {
            return;
        }
        self.transactions.clear();
        if let Some(mut conn) = self.conn.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                if let Err(e) = conn.rollback().await {
                    error!("rollback on drop failed: {e}");
                }
            });
        }
    }
}
