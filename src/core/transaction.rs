//! Transaction payloads, task descriptions, and typed execution effects.

use serde::{Deserialize, Serialize};

use crate::core::types::{
    CreatedObject, ObjectId, ObjectRef, OwnedRef, OwnerId, ResourceHandle, Signature,
    TransactionDigest,
};

/// Operation carried by a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Divide the funding object into `count` new fragments of `amount_each`
    /// balance. The funding object keeps the remainder.
    Split {
        /// Number of fragments to mint.
        count: u32,
        /// Balance carried by each fragment.
        amount_each: u64,
    },
    /// Move balance to another owner. With `amount` set, the funding object's
    /// balance is reduced and a new object is created for the recipient. With
    /// `amount` unset, the first input object (or the funding object itself
    /// when there are no inputs) is transferred whole.
    Transfer {
        /// Receiving owner.
        recipient: OwnerId,
        /// Balance to draw from the funding object, or `None` for a
        /// whole-object transfer.
        amount: Option<u64>,
    },
    /// Application-defined payload interpreted by the ledger. The listed
    /// inputs are consumed and re-versioned.
    Invoke {
        /// Encoded application call.
        payload: Vec<u8>,
    },
}

/// A fully specified transaction naming exact object versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionData {
    /// Account submitting and funding the transaction.
    pub sender: OwnerId,
    /// Funding object consumed for fees and balance operations.
    pub funding: ObjectRef,
    /// Additional objects read or mutated by the transaction.
    pub inputs: Vec<ObjectRef>,
    /// The operation to execute.
    pub kind: TransactionKind,
}

impl TransactionData {
    /// Build a transaction with no additional inputs.
    pub fn new(sender: OwnerId, funding: ObjectRef, kind: TransactionKind) -> Self {
        Self {
            sender,
            funding,
            inputs: Vec::new(),
            kind,
        }
    }

    /// Attach additional input references.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<ObjectRef>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// Transaction bytes plus the authorizing signature, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Serialized [`TransactionData`].
    pub bytes: Vec<u8>,
    /// Signature over `bytes`.
    pub signature: Signature,
}

/// Outcome class of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The transaction executed and its effects were applied.
    Success,
    /// The transaction was accepted but its application logic aborted. The
    /// referenced object versions were still consumed.
    Abort {
        /// Abort reason reported by the ledger.
        reason: String,
    },
}

impl ExecutionStatus {
    /// Whether the transaction fully succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Typed effects of one submission, immutable once returned by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Identifier of the executed transaction.
    pub digest: TransactionDigest,
    /// Outcome class.
    pub status: ExecutionStatus,
    /// Objects whose version advanced, with their post-execution owner.
    pub mutated: Vec<OwnedRef>,
    /// Objects created by the transaction.
    pub created: Vec<CreatedObject>,
    /// Objects removed from the ledger.
    pub deleted: Vec<ObjectId>,
}

impl ExecutionResult {
    /// The mutation entry for `id`, if the transaction touched it.
    #[must_use]
    pub fn mutated_ref(&self, id: ObjectId) -> Option<&OwnedRef> {
        self.mutated.iter().find(|m| m.reference.id == id)
    }
}

/// An independent unit of work for the parallel executor.
///
/// The task owns a payload builder invoked once with the funding handles
/// checked out of the pool; the task is consumed when dispatched.
pub struct TransactionTask {
    builder: Box<dyn FnOnce(&[ResourceHandle]) -> TransactionData + Send>,
    required_handles: usize,
}

impl TransactionTask {
    /// Create a task whose payload is built from one funding handle.
    pub fn new<F>(builder: F) -> Self
    where
        F: FnOnce(&[ResourceHandle]) -> TransactionData + Send + 'static,
    {
        Self {
            builder: Box::new(builder),
            required_handles: 1,
        }
    }

    /// Set the number of funding handles the payload requires (at least one).
    #[must_use]
    pub fn with_required_handles(mut self, count: usize) -> Self {
        self.required_handles = count.max(1);
        self
    }

    pub(crate) fn required_handles(&self) -> usize {
        self.required_handles
    }

    pub(crate) fn build(self, handles: &[ResourceHandle]) -> TransactionData {
        (self.builder)(handles)
    }
}

/// One step of a dependent chain for the serial executor.
///
/// Inputs are declared by identifier; the executor resolves them to exact
/// references from its version cache (or the network, on first use) before
/// invoking the builder.
pub struct ChainTransaction {
    inputs: Vec<ObjectId>,
    builder: Box<dyn FnOnce(&ResourceHandle, &[ObjectRef]) -> TransactionData + Send>,
}

impl ChainTransaction {
    /// Create a chain step over the given input objects.
    pub fn new<F>(inputs: Vec<ObjectId>, builder: F) -> Self
    where
        F: FnOnce(&ResourceHandle, &[ObjectRef]) -> TransactionData + Send + 'static,
    {
        Self {
            inputs,
            builder: Box::new(builder),
        }
    }

    #[allow(clippy::type_complexity)]
    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<ObjectId>,
        Box<dyn FnOnce(&ResourceHandle, &[ObjectRef]) -> TransactionData + Send>,
    ) {
        (self.inputs, self.builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectDigest, Version};

    fn some_ref() -> ObjectRef {
        ObjectRef {
            id: ObjectId::random(),
            version: Version(1),
            digest: ObjectDigest::random(),
        }
    }

    #[test]
    fn transaction_data_roundtrips_through_json() {
        let data = TransactionData::new(
            OwnerId::random(),
            some_ref(),
            TransactionKind::Split {
                count: 4,
                amount_each: 25,
            },
        )
        .with_inputs(vec![some_ref()]);

        let bytes = serde_json::to_vec(&data).unwrap();
        let back: TransactionData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.sender, data.sender);
        assert_eq!(back.funding, data.funding);
        assert_eq!(back.inputs, data.inputs);
    }

    #[test]
    fn status_classification() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(!ExecutionStatus::Abort {
            reason: "nope".into()
        }
        .is_success());
    }

    #[test]
    fn task_requires_at_least_one_handle() {
        let task = TransactionTask::new(|handles| {
            TransactionData::new(
                OwnerId::random(),
                handles[0].reference(),
                TransactionKind::Invoke { payload: vec![] },
            )
        })
        .with_required_handles(0);
        assert_eq!(task.required_handles(), 1);
    }
}
