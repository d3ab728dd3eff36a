//! Single-chain executor with local version prediction.
//!
//! Executes a sequence of dependent transactions without a network
//! round-trip before every step: the first step seeds a version cache with
//! one real lookup, and later steps resolve their references from the
//! cache's predictions. Any failure discards the whole cache, because a
//! rejection may mean the predicted world diverged from ground truth in ways
//! not confined to the failing step's inputs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::error::ExecutorError;
use crate::core::ledger::{sign_and_submit, LedgerClient, Signer};
use crate::core::transaction::{ChainTransaction, ExecutionResult, ExecutionStatus};
use crate::core::types::{ObjectId, ObjectRef, OwnerId, ResourceHandle};

/// Predicted object state, advanced only by successful effects.
#[derive(Debug, Default)]
struct VersionCache {
    /// Predicted funding handle, seeded by one ownership fetch.
    gas: Option<ResourceHandle>,
    /// Predicted references for every object this chain has touched.
    refs: HashMap<ObjectId, ObjectRef>,
}

impl VersionCache {
    fn clear(&mut self) {
        self.gas = None;
        self.refs.clear();
    }
}

/// Executes dependent transactions one at a time over a predicted view of
/// the ledger.
///
/// Logically single-threaded: concurrent callers queue on the cache lock and
/// drain in a strict total order, since each step depends on the predicted
/// output of the one before it. Errors propagate without retry; the cleared
/// cache guarantees the next call re-validates against the network.
pub struct SerialChainExecutor<C, S> {
    client: Arc<C>,
    signer: Arc<S>,
    owner: OwnerId,
    cache: Mutex<VersionCache>,
}

impl<C, S> SerialChainExecutor<C, S>
where
    C: LedgerClient,
    S: Signer,
{
    /// Create an executor over a ledger client and signer. The owner address
    /// is taken from the signer.
    pub fn new(client: Arc<C>, signer: Arc<S>) -> Self {
        let owner = signer.owner();
        Self {
            client,
            signer,
            owner,
            cache: Mutex::new(VersionCache::default()),
        }
    }

    /// Address whose objects fund this chain.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Execute one chain step: resolve references (cache first, network on a
    /// miss), submit, and advance the cache from the effects on success.
    ///
    /// On any failure the entire cache is discarded and the error surfaces
    /// to the caller.
    pub async fn execute_transaction_block(
        &self,
        tx: ChainTransaction,
    ) -> Result<ExecutionResult, ExecutorError> {
        let mut cache = self.cache.lock().await;
        match self.execute_step(&mut cache, tx).await {
            Ok(effects) => Ok(effects),
            Err(e) => {
                tracing::warn!(error = %e, "chain step failed, discarding version cache");
                cache.clear();
                Err(e)
            }
        }
    }

    async fn execute_step(
        &self,
        cache: &mut VersionCache,
        tx: ChainTransaction,
    ) -> Result<ExecutionResult, ExecutorError> {
        let mut gas = match cache.gas.take() {
            Some(gas) => gas,
            None => self.seed_gas().await?,
        };

        let (input_ids, builder) = tx.into_parts();
        let missing: Vec<ObjectId> = input_ids
            .iter()
            .copied()
            .filter(|id| !cache.refs.contains_key(id))
            .collect();
        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), "resolving uncached references");
            let found = self.client.lookup_versions(&missing).await?;
            cache.refs.extend(found);
        }
        let mut resolved = Vec::with_capacity(input_ids.len());
        for id in &input_ids {
            let reference = cache
                .refs
                .get(id)
                .copied()
                .ok_or(ExecutorError::VersionConflict { id: *id })?;
            resolved.push(reference);
        }

        let data = builder(&gas, &resolved);
        let effects = sign_and_submit(self.client.as_ref(), self.signer.as_ref(), &data).await?;
        if let ExecutionStatus::Abort { reason } = &effects.status {
            return Err(ExecutorError::ExecutionAbort {
                digest: effects.digest,
                reason: reason.clone(),
            });
        }

        // Advance predictions from the typed effects. Objects that left our
        // ownership are no longer usable as inputs.
        for mutated in &effects.mutated {
            if mutated.reference.id == gas.id {
                gas.advance(mutated);
            }
            if mutated.owner == self.owner {
                cache.refs.insert(mutated.reference.id, mutated.reference);
            } else {
                cache.refs.remove(&mutated.reference.id);
            }
        }
        for created in &effects.created {
            if created.owner == self.owner {
                cache.refs.insert(created.reference.id, created.reference);
            }
        }
        for id in &effects.deleted {
            cache.refs.remove(id);
        }
        cache.gas = Some(gas);
        tracing::debug!(digest = %effects.digest, cached = cache.refs.len(), "chain step applied");
        Ok(effects)
    }

    /// One real ownership fetch; the largest balance-bearing object becomes
    /// the chain's funding handle.
    async fn seed_gas(&self) -> Result<ResourceHandle, ExecutorError> {
        let owned = self.client.fetch_owned_resources(self.owner).await?;
        owned
            .into_iter()
            .max_by_key(|h| h.balance)
            .ok_or_else(|| ExecutorError::PoolExhausted {
                reason: format!("owner {} holds no funding resources", self.owner),
                source: None,
            })
    }
}
