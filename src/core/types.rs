//! Identifier, version, and reference types shared across the crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a ledger object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Mint a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Address of an account that owns objects on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Mint a fresh random address.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Monotonic version of a ledger object. Advanced by every transaction that
/// mutates the object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Version(pub u64);

impl Version {
    /// The version following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Opaque content digest of one object version, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDigest([u8; 16]);

impl ObjectDigest {
    /// Mint a random digest. Used by ledger backends when recording a mutation.
    pub fn random() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }
}

impl fmt::Display for ObjectDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Opaque identifier of an executed transaction, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionDigest([u8; 16]);

impl TransactionDigest {
    /// Mint a random digest. Used by ledger backends when recording execution.
    pub fn random() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }
}

impl fmt::Display for TransactionDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Reference to one specific version of a ledger object.
///
/// A transaction naming a reference succeeds only if the version is still
/// current on the ledger; otherwise it is rejected with a version conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object identifier.
    pub id: ObjectId,
    /// Referenced version.
    pub version: Version,
    /// Digest of the object contents at that version.
    pub digest: ObjectDigest,
}

/// An exclusively-owned, balance-bearing object usable to fund a transaction.
///
/// A handle is checked out of the [`ResourcePool`](crate::core::ResourcePool)
/// by at most one in-flight task; checkout transfers ownership of the value,
/// so concurrent reuse is prevented by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Object identifier.
    pub id: ObjectId,
    /// Last known version.
    pub version: Version,
    /// Digest at that version.
    pub digest: ObjectDigest,
    /// Remaining balance carried by the object.
    pub balance: u64,
}

impl ResourceHandle {
    /// The exact reference this handle names.
    #[must_use]
    pub fn reference(&self) -> ObjectRef {
        ObjectRef {
            id: self.id,
            version: self.version,
            digest: self.digest,
        }
    }

    /// Advance the handle to the state recorded by a mutation entry.
    pub fn advance(&mut self, mutated: &OwnedRef) {
        self.version = mutated.reference.version;
        self.digest = mutated.reference.digest;
        if let Some(balance) = mutated.balance {
            self.balance = balance;
        }
    }
}

/// A mutated object as reported by transaction effects, with its post-execution
/// owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedRef {
    /// Reference to the new version of the object.
    pub reference: ObjectRef,
    /// Owner after execution. A funding handle whose owner changed was
    /// consumed in full and must not be reused.
    pub owner: OwnerId,
    /// Post-execution balance, when the object is balance-bearing and the
    /// ledger reports it.
    pub balance: Option<u64>,
}

/// An object created by a transaction, as reported by its effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    /// Reference to the initial version of the new object.
    pub reference: ObjectRef,
    /// Owner of the new object.
    pub owner: OwnerId,
    /// Balance carried by the object, when it is balance-bearing.
    pub balance: Option<u64>,
}

impl CreatedObject {
    /// Convert into a funding handle, when the object is balance-bearing.
    #[must_use]
    pub fn into_handle(self) -> Option<ResourceHandle> {
        self.balance.map(|balance| ResourceHandle {
            id: self.reference.id,
            version: self.reference.version,
            digest: self.reference.digest,
            balance,
        })
    }
}

/// Signature over transaction bytes, produced by a [`Signer`](crate::core::Signer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_advances() {
        assert_eq!(Version(3).next(), Version(4));
        assert_eq!(format!("{}", Version(7)), "v7");
    }

    #[test]
    fn handle_reference_matches_fields() {
        let h = ResourceHandle {
            id: ObjectId::random(),
            version: Version(2),
            digest: ObjectDigest::random(),
            balance: 100,
        };
        let r = h.reference();
        assert_eq!(r.id, h.id);
        assert_eq!(r.version, Version(2));
        assert_eq!(r.digest, h.digest);
    }

    #[test]
    fn handle_advance_applies_mutation() {
        let mut h = ResourceHandle {
            id: ObjectId::random(),
            version: Version(1),
            digest: ObjectDigest::random(),
            balance: 100,
        };
        let mutated = OwnedRef {
            reference: ObjectRef {
                id: h.id,
                version: Version(2),
                digest: ObjectDigest::random(),
            },
            owner: OwnerId::random(),
            balance: Some(40),
        };
        h.advance(&mutated);
        assert_eq!(h.version, Version(2));
        assert_eq!(h.balance, 40);
    }

    #[test]
    fn digest_display_is_hex() {
        let d = ObjectDigest::random();
        let s = format!("{d}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
