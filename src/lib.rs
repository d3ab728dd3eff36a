//! # txexec
//!
//! Client-side transaction schedulers for ledgers whose objects are versioned
//! and exclusively owned.
//!
//! One client identity driving many transactions through such a ledger faces
//! a coordination problem: two in-flight transactions must never reference
//! the same object version, because the ledger rejects the second one, and
//! there is no server-side coordination to lean on. This crate solves it
//! entirely on the client with two cooperating schedulers built around a
//! shared funding pool:
//!
//! - [`core::ResourcePool`] owns a bounded set of fungible funding handles,
//!   checks them out exclusively (a move, so the type system rules out
//!   concurrent reuse), and replenishes itself by splitting a larger handle
//!   into `coin_batch_size` fragments when it runs dry.
//! - [`core::ParallelExecutor`] dispatches independent tasks through the
//!   pool with concurrency bounded at `max_pool_size` and bulkhead isolation
//!   between tasks: one task's rejection, abort, or transport failure never
//!   affects the others.
//! - [`core::SerialChainExecutor`] runs a chain of dependent transactions
//!   over a locally predicted view of the ledger, seeding its version cache
//!   with a single real lookup and discarding the whole cache on any
//!   failure.
//!
//! The ledger itself and the signing key are external collaborators behind
//! the [`core::LedgerClient`] and [`core::Signer`] traits;
//! [`infra::InMemoryLedger`] is a reference backend used by the test suite.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use txexec::builders::ExecutorBuilder;
//! use txexec::core::{Signer, TransactionData, TransactionKind, TransactionTask};
//! use txexec::infra::{InMemoryLedger, StaticSigner};
//!
//! # async fn run() -> txexec::core::AppResult<()> {
//! let ledger = Arc::new(InMemoryLedger::new());
//! let signer = Arc::new(StaticSigner::random());
//! let sender = signer.owner();
//! ledger.mint(sender, 1_000_000);
//!
//! let executor = ExecutorBuilder::new(ledger, signer)
//!     .with_max_pool_size(8)
//!     .with_coin_batch_size(4)
//!     .build_parallel()?;
//!
//! let task = TransactionTask::new(move |handles| {
//!     TransactionData::new(
//!         sender,
//!         handles[0].reference(),
//!         TransactionKind::Invoke { payload: b"ping".to_vec() },
//!     )
//! });
//! let effects = executor.execute_transaction_block(task).await?;
//! println!("executed {}", effects.digest);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]

/// Core scheduling abstractions: pool, executors, and shared types.
pub mod core;
/// Configuration models for the executors.
pub mod config;
/// Builders to construct executors from configuration.
pub mod builders;
/// Infrastructure adapters for ledger backends.
pub mod infra;
/// Shared utilities.
pub mod util;
