//! Error taxonomy for executor and pool operations.

use thiserror::Error;

use crate::core::ledger::LedgerError;
use crate::core::types::{ObjectId, TransactionDigest};

/// Errors produced by the executors and the resource pool.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No funding handle was available and the pool could not replenish
    /// itself. The next acquire retries the refill on demand.
    #[error("resource pool exhausted: {reason}")]
    PoolExhausted {
        /// Why the pool could not supply a handle.
        reason: String,
        /// Underlying failure from the refill attempt, when one was made.
        #[source]
        source: Option<Box<ExecutorError>>,
    },
    /// The ledger rejected the transaction because a referenced object's
    /// recorded version no longer matches. No version was consumed.
    #[error("version conflict on object {id}")]
    VersionConflict {
        /// The stale or unknown reference.
        id: ObjectId,
    },
    /// The transaction was accepted but its application logic aborted. The
    /// referenced object versions were still consumed.
    #[error("transaction {digest} aborted: {reason}")]
    ExecutionAbort {
        /// Digest of the aborted transaction.
        digest: TransactionDigest,
        /// Abort reason reported by the ledger.
        reason: String,
    },
    /// Failure before the ledger reached a decision. Safe to retry with
    /// identical inputs since no version was consumed.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<LedgerError> for ExecutorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::VersionConflict { id } => Self::VersionConflict { id },
            LedgerError::Transport(msg) => Self::Transport(msg),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let id = ObjectId::random();
        let err = ExecutorError::VersionConflict { id };
        assert_eq!(format!("{err}"), format!("version conflict on object {id}"));

        let err = ExecutorError::Transport("connection reset".into());
        assert_eq!(format!("{err}"), "transport failure: connection reset");

        let err = ExecutorError::PoolExhausted {
            reason: "refill failed".into(),
            source: None,
        };
        assert_eq!(format!("{err}"), "resource pool exhausted: refill failed");
    }

    #[test]
    fn ledger_errors_convert() {
        let id = ObjectId::random();
        let err: ExecutorError = LedgerError::VersionConflict { id }.into();
        assert!(matches!(err, ExecutorError::VersionConflict { id: got } if got == id));

        let err: ExecutorError = LedgerError::Transport("timeout".into()).into();
        assert!(matches!(err, ExecutorError::Transport(_)));
    }
}
