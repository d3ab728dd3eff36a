//! Traits for the external ledger and signer collaborators.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::error::ExecutorError;
use crate::core::transaction::{ExecutionResult, SignedTransaction, TransactionData};
use crate::core::types::{ObjectId, ObjectRef, OwnerId, ResourceHandle, Signature};

/// Errors surfaced by a ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A referenced object version is not current, or the object is unknown.
    /// The transaction was rejected without consuming any version.
    #[error("version conflict on object {id}")]
    VersionConflict {
        /// The stale or unknown reference.
        id: ObjectId,
    },
    /// The submission failed before the ledger reached a decision. Safe to
    /// retry with identical inputs.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// System of record holding versioned, owned objects and executing signed
/// transactions against them.
///
/// The crate never retries a submission on the caller's behalf; a transaction
/// already accepted by the ledger cannot be retracted.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// List the balance-bearing objects owned by `owner`.
    async fn fetch_owned_resources(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<ResourceHandle>, LedgerError>;

    /// Resolve current versions for the given objects. Unknown identifiers
    /// are absent from the returned map.
    async fn lookup_versions(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, ObjectRef>, LedgerError>;

    /// Submit a signed transaction and wait for its effects.
    async fn submit_and_execute(
        &self,
        tx: &SignedTransaction,
    ) -> Result<ExecutionResult, LedgerError>;
}

/// Produces signatures over transaction bytes and knows the address whose
/// objects it controls. Signing is opaque to the schedulers.
pub trait Signer: Send + Sync + 'static {
    /// Ledger address controlled by this signer.
    fn owner(&self) -> OwnerId;

    /// Sign raw transaction bytes.
    fn sign(&self, bytes: &[u8]) -> Signature;
}

/// Encode, sign, and submit a transaction, mapping ledger errors into the
/// executor taxonomy.
pub(crate) async fn sign_and_submit<C, S>(
    client: &C,
    signer: &S,
    data: &TransactionData,
) -> Result<ExecutionResult, ExecutorError>
where
    C: LedgerClient,
    S: Signer,
{
    let bytes = serde_json::to_vec(data)
        .map_err(|e| ExecutorError::Transport(format!("failed to encode transaction: {e}")))?;
    let signature = signer.sign(&bytes);
    let signed = SignedTransaction { bytes, signature };
    client.submit_and_execute(&signed).await.map_err(Into::into)
}
