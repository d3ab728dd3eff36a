//! Bounded-concurrency executor with bulkhead fault isolation.
//!
//! Independent tasks are dispatched through the shared
//! [`ResourcePool`](crate::core::ResourcePool); the pool's concurrency
//! accounting is the executor's bound, so the number of in-flight
//! submissions never exceeds `max_pool_size`. One task's failure never
//! cancels or fails another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::core::error::ExecutorError;
use crate::core::ledger::{sign_and_submit, LedgerClient, Signer};
use crate::core::resource_pool::ResourcePool;
use crate::core::transaction::{ExecutionResult, ExecutionStatus, TransactionTask};

/// Snapshot of executor activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorStats {
    /// Tasks handed to the ledger so far.
    pub submitted: u64,
    /// Tasks that completed with success effects.
    pub succeeded: u64,
    /// Tasks that failed (rejection, abort, or transport error).
    pub failed: u64,
    /// Tasks currently dispatched and unresolved.
    pub in_flight: u64,
    /// High-water mark of simultaneously dispatched tasks.
    pub max_in_flight: u64,
}

/// Internal counters, shared-nothing atomics.
#[derive(Debug, Default)]
struct ExecutorCounters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

/// Runs up to `max_pool_size` independent transaction tasks concurrently.
///
/// Safe to invoke from many callers at once; ordering across tasks is not
/// guaranteed, only per-handle exclusivity.
pub struct ParallelExecutor<C, S> {
    client: Arc<C>,
    signer: Arc<S>,
    pool: Arc<ResourcePool<C, S>>,
    counters: ExecutorCounters,
}

impl<C, S> ParallelExecutor<C, S>
where
    C: LedgerClient,
    S: Signer,
{
    /// Create an executor over a ledger client and signer, validating the
    /// configuration.
    pub fn new(
        client: Arc<C>,
        signer: Arc<S>,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        config.validate().map_err(ExecutorError::InvalidConfig)?;
        let pool = Arc::new(ResourcePool::new(
            Arc::clone(&client),
            Arc::clone(&signer),
            &config,
        ));
        Ok(Self {
            client,
            signer,
            pool,
            counters: ExecutorCounters::default(),
        })
    }

    /// The shared funding pool.
    pub fn pool(&self) -> &ResourcePool<C, S> {
        &self.pool
    }

    /// Current executor activity.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            max_in_flight: self.counters.max_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Dispatch one task: acquire funding handles, build and sign the
    /// payload, submit, and settle the handles according to the outcome.
    ///
    /// Failures are isolated to the failing task. A version conflict discards
    /// the stale handles; a transport error returns them untouched (no
    /// version was consumed); an abort applies the effects before surfacing
    /// the error, since the ledger still consumed the referenced versions.
    ///
    /// Handles are checked out all-or-nothing, so a task requiring more of
    /// them than `max_pool_size` fails with
    /// [`ExecutorError::PoolExhausted`] instead of stalling the pool on a
    /// partial checkout.
    pub async fn execute_transaction_block(
        &self,
        task: TransactionTask,
    ) -> Result<ExecutionResult, ExecutorError> {
        let handles = self.pool.acquire_many(task.required_handles()).await?;

        let data = task.build(&handles);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let now_in_flight = self.counters.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters
            .max_in_flight
            .fetch_max(now_in_flight, Ordering::Relaxed);

        let outcome = sign_and_submit(self.client.as_ref(), self.signer.as_ref(), &data).await;
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(effects) if effects.status.is_success() => {
                for handle in handles {
                    self.pool.release(handle, &effects).await;
                }
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(digest = %effects.digest, "task succeeded");
                Ok(effects)
            }
            Ok(effects) => {
                // Abort: versions were consumed, so the effects still apply.
                let digest = effects.digest;
                let reason = match &effects.status {
                    ExecutionStatus::Abort { reason } => reason.clone(),
                    ExecutionStatus::Success => String::new(),
                };
                for handle in handles {
                    self.pool.release(handle, &effects).await;
                }
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(digest = %digest, reason = %reason, "task aborted");
                Err(ExecutorError::ExecutionAbort { digest, reason })
            }
            Err(e @ ExecutorError::VersionConflict { .. }) => {
                for handle in handles {
                    self.pool.discard(handle).await;
                }
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "task rejected with a version conflict");
                Err(e)
            }
            Err(e) => {
                // Transport failure: no version consumed, handles stay valid.
                for handle in handles {
                    self.pool.put_back(handle).await;
                }
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "task submission failed");
                Err(e)
            }
        }
    }
}
