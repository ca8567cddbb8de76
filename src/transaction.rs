//! Transaction frames and the connection-level commit/rollback
//! capability.

use async_trait::async_trait;

use crate::error::NadoError;
use crate::pool::NadoConnection;

/// How a transaction frame finalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEngine {
    /// Outermost frame: BEGIN at open, COMMIT/ROLLBACK at close.
    Real,
    /// Nested frame backed by a named savepoint.
    Savepoint,
    /// Frame whose finalizers do nothing. Used for nested frames when
    /// nesting is ignored, and for every frame on an autocommit
    /// context.
    NoOp,
}

/// Handle for one frame on a context's transaction stack.
///
/// `depth` is the stack length observed when the frame was opened. The
/// finalizers act only while the stack is still deeper than that, so a
/// frame that was already closed (directly or by an outer rollback)
/// turns into a no-op instead of double-finalizing.
#[derive(Debug, Clone, Copy)]
pub struct Transaction {
    pub(crate) depth: usize,
    pub(crate) engine: TxEngine,
}

impl Transaction {
    /// Stack depth at which this frame was opened; the outermost frame
    /// is depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn engine(&self) -> TxEngine {
        self.engine
    }
}

/// Connection-level COMMIT/ROLLBACK.
///
/// On a connection checked out in autocommit mode both calls are
/// no-ops, which lets callers finalize uniformly without asking what
/// kind of connection they hold.
#[async_trait]
pub trait TxCapability {
    async fn commit(&mut self) -> Result<(), NadoError>;
    async fn rollback(&mut self) -> Result<(), NadoError>;
}

#[async_trait]
impl TxCapability for NadoConnection {
    async fn commit(&mut self) -> Result<(), NadoError> {
        if self.autocommit() {
            return Ok(());
        }
        self.execute_batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), NadoError> {
        if self.autocommit() {
            return Ok(());
        }
        self.execute_batch("ROLLBACK").await
    }
}
