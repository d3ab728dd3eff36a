//! Infrastructure adapters for ledger backends.

pub mod memory;

pub use memory::{InMemoryLedger, LedgerStats, StaticSigner};
