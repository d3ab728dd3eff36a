//! Core scheduling abstractions: pool, executors, and shared types.

pub mod error;
pub mod ledger;
pub mod parallel;
pub mod resource_pool;
pub mod serial;
pub mod transaction;
pub mod types;

pub use error::{AppResult, ExecutorError};
pub use ledger::{LedgerClient, LedgerError, Signer};
pub use parallel::{ExecutorStats, ParallelExecutor};
pub use resource_pool::{PoolStats, ResourcePool};
pub use serial::SerialChainExecutor;
pub use transaction::{
    ChainTransaction, ExecutionResult, ExecutionStatus, SignedTransaction, TransactionData,
    TransactionKind, TransactionTask,
};
pub use types::{
    CreatedObject, ObjectDigest, ObjectId, ObjectRef, OwnedRef, OwnerId, ResourceHandle,
    Signature, TransactionDigest, Version,
};
