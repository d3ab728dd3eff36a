//! Funding handle pool with split-based replenishment.
//!
//! The pool owns a bounded set of fungible funding handles. Tasks check
//! handles out (a move, so one handle is never shared by two in-flight
//! tasks), use them to fund a submission, and return them with the
//! transaction's effects applied. When the pool runs dry and a concurrency
//! slot is free, it synthesizes a split transaction dividing one of its
//! larger source handles into `coin_batch_size` fragments.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::config::ExecutorConfig;
use crate::core::error::ExecutorError;
use crate::core::ledger::{sign_and_submit, LedgerClient, Signer};
use crate::core::transaction::{ExecutionResult, TransactionData, TransactionKind};
use crate::core::types::{OwnerId, ResourceHandle};

/// Mutable pool state. Single owner behind one async mutex; the mutex is
/// never held across a ledger call (refills drop it and set
/// `refill_in_flight` instead).
#[derive(Debug, Default)]
struct PoolState {
    /// Handles ready to be checked out.
    available: VecDeque<ResourceHandle>,
    /// Larger handles kept back as split sources for refills.
    sources: Vec<ResourceHandle>,
    /// Whether the owner's resources have been fetched at least once.
    sources_fetched: bool,
    /// In-flight submissions funded by this pool, refill included.
    outstanding: usize,
    /// At most one refill (or source fetch) may be in flight at a time.
    refill_in_flight: bool,
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Handles currently available for checkout.
    pub available: usize,
    /// Handles checked out by in-flight tasks (refill included).
    pub outstanding: usize,
    /// Successful refill splits performed so far.
    pub refills: u64,
    /// Handles dropped because they were consumed in full or went stale.
    pub dropped: u64,
}

enum Plan {
    /// Fetch the owner's resources for the first time.
    Fetch,
    /// Split this source handle into fragments.
    Refill(ResourceHandle),
}

/// Supplies exclusive funding handles to tasks and replenishes its supply by
/// splitting, bounded at `max_pool_size` concurrent checkouts.
pub struct ResourcePool<C, S> {
    client: Arc<C>,
    signer: Arc<S>,
    owner: OwnerId,
    max_pool_size: usize,
    coin_batch_size: u32,
    state: Mutex<PoolState>,
    wake: Notify,
    refills: AtomicU64,
    dropped: AtomicU64,
}

impl<C, S> ResourcePool<C, S>
where
    C: LedgerClient,
    S: Signer,
{
    /// Create a pool over a validated configuration. The owner address is
    /// taken from the signer.
    pub fn new(client: Arc<C>, signer: Arc<S>, config: &ExecutorConfig) -> Self {
        let owner = signer.owner();
        Self {
            client,
            signer,
            owner,
            max_pool_size: config.max_pool_size as usize,
            coin_batch_size: config.coin_batch_size,
            state: Mutex::new(PoolState::default()),
            wake: Notify::new(),
            refills: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Address whose objects fund this pool.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Check out an exclusive funding handle.
    ///
    /// Waits while the concurrency bound is reached or a refill is in
    /// flight. Fails with [`ExecutorError::PoolExhausted`] when no handle is
    /// available and the pool cannot replenish itself; the next call retries
    /// the refill on demand.
    pub async fn acquire(&self) -> Result<ResourceHandle, ExecutorError> {
        let mut batch = self.acquire_many(1).await?;
        batch.pop().ok_or_else(|| ExecutorError::PoolExhausted {
            reason: "checkout granted an empty batch".into(),
            source: None,
        })
    }

    /// Check out `count` handles atomically: either all are granted in one
    /// step or none are, so two multi-handle callers can never deadlock each
    /// other on partial checkouts.
    ///
    /// Waits while the handles are missing but still obtainable. Fails with
    /// [`ExecutorError::PoolExhausted`] when `count` exceeds the concurrency
    /// bound, since such a request could never be satisfied.
    pub async fn acquire_many(
        &self,
        count: usize,
    ) -> Result<Vec<ResourceHandle>, ExecutorError> {
        if count > self.max_pool_size {
            return Err(ExecutorError::PoolExhausted {
                reason: format!(
                    "task requires {count} handles but the pool is bounded at {}",
                    self.max_pool_size
                ),
                source: None,
            });
        }
        loop {
            let plan = {
                let mut state = self.state.lock().await;
                let decision = if state.outstanding + count <= self.max_pool_size
                    && state.available.len() >= count
                {
                    state.outstanding += count;
                    let batch: Vec<ResourceHandle> = state.available.drain(..count).collect();
                    tracing::debug!(
                        count,
                        outstanding = state.outstanding,
                        "handles checked out"
                    );
                    return Ok(batch);
                } else if state.available.len() < count
                    && !state.refill_in_flight
                    && state.outstanding < self.max_pool_size
                {
                    if state.sources_fetched {
                        match take_largest(&mut state.sources) {
                            Some(source) => {
                                // The refill submission occupies one
                                // concurrency slot while in flight.
                                state.refill_in_flight = true;
                                state.outstanding += 1;
                                Some(Plan::Refill(source))
                            }
                            None if state.outstanding == 0 => {
                                return Err(ExecutorError::PoolExhausted {
                                    reason: format!(
                                        "owner {} cannot fund {count} concurrent handles",
                                        self.owner
                                    ),
                                    source: None,
                                });
                            }
                            // Outstanding handles may still come back.
                            None => None,
                        }
                    } else {
                        state.refill_in_flight = true;
                        Some(Plan::Fetch)
                    }
                } else {
                    None
                };

                match decision {
                    Some(p) => p,
                    None => {
                        // Register the waiter before releasing the lock so a
                        // release between unlock and await cannot be missed.
                        let notified = self.wake.notified();
                        tokio::pin!(notified);
                        notified.as_mut().enable();
                        drop(state);
                        notified.await;
                        continue;
                    }
                }
            };

            match plan {
                Plan::Fetch => self.fetch_sources().await?,
                Plan::Refill(source) => self.refill(source).await?,
            }
        }
    }

    /// Return a handle after a submission, applying the transaction's
    /// effects. The handle is dropped instead of requeued when the effects
    /// show it was deleted or transferred away in full.
    pub async fn release(&self, handle: ResourceHandle, effects: &ExecutionResult) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        if effects.deleted.contains(&handle.id) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(handle = %handle.id, "handle deleted by transaction, dropping");
        } else if let Some(mutated) = effects.mutated_ref(handle.id) {
            if mutated.owner == self.owner {
                let mut handle = handle;
                handle.advance(mutated);
                state.available.push_back(handle);
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(handle = %handle.id, "handle transferred away, dropping");
            }
        } else {
            // Untouched by the transaction; recorded version still current.
            state.available.push_back(handle);
        }
        drop(state);
        self.wake.notify_waiters();
    }

    /// Return an unused handle untouched.
    pub async fn put_back(&self, handle: ResourceHandle) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        state.available.push_back(handle);
        drop(state);
        self.wake.notify_waiters();
    }

    /// Forget a handle known to be stale. Its slot is freed but the handle is
    /// not requeued.
    pub async fn discard(&self, handle: ResourceHandle) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(handle = %handle.id, "stale handle discarded");
        drop(state);
        self.wake.notify_waiters();
    }

    /// Current pool activity.
    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats {
            available: state.available.len(),
            outstanding: state.outstanding,
            refills: self.refills.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// One-time fetch of the owner's resources, serialized by
    /// `refill_in_flight`.
    async fn fetch_sources(&self) -> Result<(), ExecutorError> {
        let fetched = self.client.fetch_owned_resources(self.owner).await;
        let mut state = self.state.lock().await;
        state.refill_in_flight = false;
        let result = match fetched {
            Ok(handles) => {
                tracing::debug!(count = handles.len(), "fetched funding resources");
                state.sources_fetched = true;
                state.sources.extend(handles);
                Ok(())
            }
            Err(e) => Err(ExecutorError::PoolExhausted {
                reason: "failed to fetch owned resources".into(),
                source: Some(Box::new(e.into())),
            }),
        };
        drop(state);
        self.wake.notify_waiters();
        result
    }

    /// Split `source` into `coin_batch_size` fragments. The caller has
    /// already reserved a concurrency slot and set `refill_in_flight`.
    async fn refill(&self, source: ResourceHandle) -> Result<(), ExecutorError> {
        let count = self.coin_batch_size;
        // Each fragment gets an equal share; the source keeps one share as a
        // remainder so it can fund future refills.
        let amount_each = source.balance / (u64::from(count) + 1);
        if amount_each == 0 {
            let mut state = self.state.lock().await;
            state.refill_in_flight = false;
            state.outstanding -= 1;
            state.sources.push(source);
            drop(state);
            self.wake.notify_waiters();
            return Err(ExecutorError::PoolExhausted {
                reason: "funding source balance too small to split".into(),
                source: None,
            });
        }

        let data = TransactionData::new(
            self.owner,
            source.reference(),
            TransactionKind::Split { count, amount_each },
        );
        tracing::debug!(source = %source.id, count, amount_each, "refilling pool");
        let outcome = sign_and_submit(self.client.as_ref(), self.signer.as_ref(), &data).await;

        let mut state = self.state.lock().await;
        state.refill_in_flight = false;
        state.outstanding -= 1;
        let result = match outcome {
            Ok(effects) if effects.status.is_success() => {
                let mut source = source;
                if let Some(mutated) = effects.mutated_ref(source.id) {
                    source.advance(mutated);
                }
                state.sources.push(source);
                for created in effects.created {
                    if created.owner != self.owner {
                        continue;
                    }
                    if let Some(fragment) = created.into_handle() {
                        state.available.push_back(fragment);
                    }
                }
                self.refills.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(available = state.available.len(), "pool refilled");
                Ok(())
            }
            Ok(effects) => {
                // Abort: the source version was still consumed.
                let mut source = source;
                if let Some(mutated) = effects.mutated_ref(source.id) {
                    source.advance(mutated);
                }
                state.sources.push(source);
                let reason = match &effects.status {
                    crate::core::transaction::ExecutionStatus::Abort { reason } => reason.clone(),
                    crate::core::transaction::ExecutionStatus::Success => String::new(),
                };
                Err(ExecutorError::PoolExhausted {
                    reason: "refill transaction aborted".into(),
                    source: Some(Box::new(ExecutorError::ExecutionAbort {
                        digest: effects.digest,
                        reason,
                    })),
                })
            }
            Err(e @ ExecutorError::VersionConflict { .. }) => {
                // The source went stale underneath us; drop it rather than
                // retry with a version the ledger has already rejected.
                tracing::warn!(source = %source.id, "refill source stale, dropping");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(ExecutorError::PoolExhausted {
                    reason: "refill rejected with a version conflict".into(),
                    source: Some(Box::new(e)),
                })
            }
            Err(e) => {
                // Transport failure: no version consumed, keep the source.
                state.sources.push(source);
                Err(ExecutorError::PoolExhausted {
                    reason: "refill submission failed".into(),
                    source: Some(Box::new(e)),
                })
            }
        };
        drop(state);
        self.wake.notify_waiters();
        result
    }
}

/// Pop the source with the largest balance.
fn take_largest(sources: &mut Vec<ResourceHandle>) -> Option<ResourceHandle> {
    let idx = sources
        .iter()
        .enumerate()
        .max_by_key(|(_, h)| h.balance)
        .map(|(i, _)| i)?;
    Some(sources.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectDigest, ObjectId, Version};

    fn handle(balance: u64) -> ResourceHandle {
        ResourceHandle {
            id: ObjectId::random(),
            version: Version(1),
            digest: ObjectDigest::random(),
            balance,
        }
    }

    #[test]
    fn take_largest_picks_by_balance() {
        let mut sources = vec![handle(10), handle(500), handle(50)];
        let picked = take_largest(&mut sources).unwrap();
        assert_eq!(picked.balance, 500);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn take_largest_empty() {
        let mut sources: Vec<ResourceHandle> = vec![];
        assert!(take_largest(&mut sources).is_none());
    }
}
