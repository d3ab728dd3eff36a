//! In-memory ledger backend for development and testing.
//!
//! Implements the full [`LedgerClient`] contract against a process-local
//! object store: versions are validated on every submission, effects are
//! reported with the typed mutated/created/deleted split, and call counters
//! are exposed so tests can assert on submission and lookup counts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::ledger::{LedgerClient, LedgerError, Signer};
use crate::core::transaction::{
    ExecutionResult, ExecutionStatus, SignedTransaction, TransactionData, TransactionKind,
};
use crate::core::types::{
    CreatedObject, ObjectDigest, ObjectId, ObjectRef, OwnedRef, OwnerId, ResourceHandle,
    Signature, TransactionDigest, Version,
};

/// One object recorded on the ledger.
#[derive(Debug, Clone)]
struct StoredObject {
    version: Version,
    digest: ObjectDigest,
    owner: OwnerId,
    balance: Option<u64>,
}

impl StoredObject {
    fn reference(&self, id: ObjectId) -> ObjectRef {
        ObjectRef {
            id,
            version: self.version,
            digest: self.digest,
        }
    }

    fn bump(&mut self) {
        self.version = self.version.next();
        self.digest = ObjectDigest::random();
    }

    fn owned_ref(&self, id: ObjectId) -> OwnedRef {
        OwnedRef {
            reference: self.reference(id),
            owner: self.owner,
            balance: self.balance,
        }
    }
}

/// Call counters exposed for assertions and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerStats {
    /// `fetch_owned_resources` calls served.
    pub fetches: u64,
    /// `lookup_versions` calls served.
    pub lookups: u64,
    /// `submit_and_execute` calls served.
    pub submissions: u64,
    /// High-water mark of simultaneously in-flight submissions.
    pub max_in_flight: u64,
}

/// Process-local ledger holding versioned, owned objects.
///
/// Optional artificial latency makes concurrent submissions overlap, which
/// integration tests use to observe concurrency bounds.
pub struct InMemoryLedger {
    objects: Mutex<HashMap<ObjectId, StoredObject>>,
    latency: Duration,
    fetches: AtomicU64,
    lookups: AtomicU64,
    submissions: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            fetches: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
        }
    }

    /// Delay every call by `latency` so submissions overlap in time.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Record a fresh balance-bearing object for `owner` and return a handle
    /// to it.
    pub fn mint(&self, owner: OwnerId, balance: u64) -> ResourceHandle {
        let id = ObjectId::random();
        let object = StoredObject {
            version: Version(1),
            digest: ObjectDigest::random(),
            owner,
            balance: Some(balance),
        };
        let handle = ResourceHandle {
            id,
            version: object.version,
            digest: object.digest,
            balance,
        };
        self.objects.lock().insert(id, object);
        handle
    }

    /// Current recorded version of an object, if it exists.
    pub fn current_version(&self, id: ObjectId) -> Option<Version> {
        self.objects.lock().get(&id).map(|o| o.version)
    }

    /// Current call counters.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            max_in_flight: self.max_in_flight.load(Ordering::Relaxed),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Validate and apply one signed transaction under the store lock.
    fn execute(&self, tx: &SignedTransaction) -> Result<ExecutionResult, LedgerError> {
        if tx.signature.0.is_empty() {
            return Err(LedgerError::Transport("unsigned transaction".into()));
        }
        let data: TransactionData = serde_json::from_slice(&tx.bytes)
            .map_err(|e| LedgerError::Transport(format!("undecodable transaction: {e}")))?;

        let mut objects = self.objects.lock();

        // Every named reference must match the recorded current version.
        for reference in std::iter::once(&data.funding).chain(data.inputs.iter()) {
            match objects.get(&reference.id) {
                None => return Err(LedgerError::VersionConflict { id: reference.id }),
                Some(object) if object.version != reference.version => {
                    return Err(LedgerError::VersionConflict { id: reference.id })
                }
                Some(_) => {}
            }
        }
        // The funding object must belong to the sender.
        if objects
            .get(&data.funding.id)
            .is_some_and(|o| o.owner != data.sender)
        {
            return Err(LedgerError::VersionConflict {
                id: data.funding.id,
            });
        }

        let digest = TransactionDigest::random();
        let mut mutated: Vec<OwnedRef> = Vec::new();
        let mut created: Vec<CreatedObject> = Vec::new();

        let abort = |objects: &mut HashMap<ObjectId, StoredObject>, reason: &str| {
            // An abort still consumes the funding object's version.
            let entry = objects.get_mut(&data.funding.id).map(|o| {
                o.bump();
                o.owned_ref(data.funding.id)
            });
            ExecutionResult {
                digest,
                status: ExecutionStatus::Abort {
                    reason: reason.into(),
                },
                mutated: entry.into_iter().collect(),
                created: Vec::new(),
                deleted: Vec::new(),
            }
        };

        match data.kind {
            TransactionKind::Split { count, amount_each } => {
                let total = u64::from(count).saturating_mul(amount_each);
                let funds = objects
                    .get(&data.funding.id)
                    .and_then(|o| o.balance)
                    .unwrap_or(0);
                if funds < total {
                    return Ok(abort(&mut objects, "insufficient balance for split"));
                }
                if let Some(object) = objects.get_mut(&data.funding.id) {
                    object.balance = Some(funds - total);
                    object.bump();
                    mutated.push(object.owned_ref(data.funding.id));
                }
                for _ in 0..count {
                    let id = ObjectId::random();
                    let object = StoredObject {
                        version: Version(1),
                        digest: ObjectDigest::random(),
                        owner: data.sender,
                        balance: Some(amount_each),
                    };
                    created.push(CreatedObject {
                        reference: object.reference(id),
                        owner: data.sender,
                        balance: object.balance,
                    });
                    objects.insert(id, object);
                }
            }
            TransactionKind::Transfer {
                recipient,
                amount: Some(amount),
            } => {
                let funds = objects
                    .get(&data.funding.id)
                    .and_then(|o| o.balance)
                    .unwrap_or(0);
                if funds < amount {
                    return Ok(abort(&mut objects, "insufficient balance for transfer"));
                }
                if let Some(object) = objects.get_mut(&data.funding.id) {
                    object.balance = Some(funds - amount);
                    object.bump();
                    mutated.push(object.owned_ref(data.funding.id));
                }
                let id = ObjectId::random();
                let object = StoredObject {
                    version: Version(1),
                    digest: ObjectDigest::random(),
                    owner: recipient,
                    balance: Some(amount),
                };
                created.push(CreatedObject {
                    reference: object.reference(id),
                    owner: recipient,
                    balance: object.balance,
                });
                objects.insert(id, object);
            }
            TransactionKind::Transfer {
                recipient,
                amount: None,
            } => {
                // Whole-object transfer of the first input, or of the funding
                // object itself when there are no inputs.
                let target = data.inputs.first().map_or(data.funding.id, |r| r.id);
                if let Some(object) = objects.get_mut(&target) {
                    object.owner = recipient;
                    object.bump();
                    mutated.push(object.owned_ref(target));
                }
                if target != data.funding.id {
                    if let Some(object) = objects.get_mut(&data.funding.id) {
                        object.bump();
                        mutated.push(object.owned_ref(data.funding.id));
                    }
                }
            }
            TransactionKind::Invoke { payload: _ } => {
                if let Some(object) = objects.get_mut(&data.funding.id) {
                    object.bump();
                    mutated.push(object.owned_ref(data.funding.id));
                }
                for input in &data.inputs {
                    if input.id == data.funding.id {
                        continue;
                    }
                    if let Some(object) = objects.get_mut(&input.id) {
                        object.bump();
                        mutated.push(object.owned_ref(input.id));
                    }
                }
            }
        }

        Ok(ExecutionResult {
            digest,
            status: ExecutionStatus::Success,
            mutated,
            created,
            deleted: Vec::new(),
        })
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn fetch_owned_resources(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<ResourceHandle>, LedgerError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        let objects = self.objects.lock();
        Ok(objects
            .iter()
            .filter(|(_, o)| o.owner == owner)
            .filter_map(|(id, o)| {
                o.balance.map(|balance| ResourceHandle {
                    id: *id,
                    version: o.version,
                    digest: o.digest,
                    balance,
                })
            })
            .collect())
    }

    async fn lookup_versions(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, ObjectRef>, LedgerError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        let objects = self.objects.lock();
        Ok(ids
            .iter()
            .filter_map(|id| objects.get(id).map(|o| (*id, o.reference(*id))))
            .collect())
    }

    async fn submit_and_execute(
        &self,
        tx: &SignedTransaction,
    ) -> Result<ExecutionResult, LedgerError> {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight.fetch_max(now, Ordering::Relaxed);
        self.simulate_latency().await;
        let result = self.execute(tx);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        result
    }
}

/// Signer with a fixed owner address that stamps an opaque tag over the
/// bytes. Real deployments plug in a keypair-backed implementation.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    owner: OwnerId,
}

impl StaticSigner {
    /// Create a signer for a known address.
    pub fn new(owner: OwnerId) -> Self {
        Self { owner }
    }

    /// Create a signer for a fresh random address.
    pub fn random() -> Self {
        Self::new(OwnerId::random())
    }
}

impl Signer for StaticSigner {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn sign(&self, bytes: &[u8]) -> Signature {
        Signature(format!("sig:{}:{}", self.owner, bytes.len()).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(signer: &StaticSigner, data: &TransactionData) -> SignedTransaction {
        let bytes = serde_json::to_vec(data).unwrap();
        let signature = signer.sign(&bytes);
        SignedTransaction { bytes, signature }
    }

    #[tokio::test]
    async fn split_creates_fragments_and_advances_source() {
        let ledger = InMemoryLedger::new();
        let signer = StaticSigner::random();
        let source = ledger.mint(signer.owner(), 1_000);

        let data = TransactionData::new(
            signer.owner(),
            source.reference(),
            TransactionKind::Split {
                count: 4,
                amount_each: 100,
            },
        );
        let result = ledger.submit_and_execute(&signed(&signer, &data)).await.unwrap();

        assert!(result.status.is_success());
        assert_eq!(result.created.len(), 4);
        let mutated = result.mutated_ref(source.id).unwrap();
        assert_eq!(mutated.reference.version, Version(2));
        assert_eq!(mutated.balance, Some(600));
    }

    #[tokio::test]
    async fn stale_reference_is_rejected() {
        let ledger = InMemoryLedger::new();
        let signer = StaticSigner::random();
        let source = ledger.mint(signer.owner(), 1_000);

        // Consume the current version once.
        let data = TransactionData::new(
            signer.owner(),
            source.reference(),
            TransactionKind::Invoke { payload: vec![] },
        );
        ledger.submit_and_execute(&signed(&signer, &data)).await.unwrap();

        // Re-submitting against the old version must conflict.
        let err = ledger
            .submit_and_execute(&signed(&signer, &data))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::VersionConflict { id } if id == source.id));
    }

    #[tokio::test]
    async fn overdraw_aborts_but_consumes_the_version() {
        let ledger = InMemoryLedger::new();
        let signer = StaticSigner::random();
        let source = ledger.mint(signer.owner(), 10);

        let data = TransactionData::new(
            signer.owner(),
            source.reference(),
            TransactionKind::Transfer {
                recipient: OwnerId::random(),
                amount: Some(1_000),
            },
        );
        let result = ledger.submit_and_execute(&signed(&signer, &data)).await.unwrap();
        assert!(!result.status.is_success());
        assert_eq!(ledger.current_version(source.id), Some(Version(2)));
    }

    #[tokio::test]
    async fn unsigned_submission_is_a_transport_error() {
        let ledger = InMemoryLedger::new();
        let tx = SignedTransaction {
            bytes: vec![1, 2, 3],
            signature: Signature(vec![]),
        };
        let err = ledger.submit_and_execute(&tx).await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
