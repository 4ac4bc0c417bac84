//! Transaction storage
//!
//! The store is the single source of truth for transaction records. The
//! coordinator re-reads it inside every critical section and writes through
//! on every mutation, so any implementation of [`TransactionStore`] can back
//! it, including one shared by several coordinator instances.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::{JsonFileStore, StorageConfig};

use crate::multisig::{Context, Transaction, TransactionStatus};
use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Status conflict on {tx_id}: expected {expected}, found {actual}")]
    Conflict {
        tx_id: String,
        expected: TransactionStatus,
        actual: TransactionStatus,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Durable keyed storage for transaction records
pub trait TransactionStore: Send + Sync {
    /// Insert or replace a record
    fn put(&self, ctx: &Context, tx: &Transaction) -> Result<(), StoreError>;

    fn get(&self, ctx: &Context, tx_id: &str) -> Result<Transaction, StoreError>;

    /// Overwrite an existing record only while its stored status is
    /// `expected`, failing with [`StoreError::Conflict`] otherwise. The whole
    /// record, including any status change on `tx`, is written at once.
    fn replace(
        &self,
        ctx: &Context,
        tx: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), StoreError>;

    /// Move `tx_id` from `expected` to `next`, failing with
    /// [`StoreError::Conflict`] if the stored status is not `expected`.
    /// `reason` is recorded as the failure reason.
    fn update_status(
        &self,
        ctx: &Context,
        tx_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        reason: Option<String>,
    ) -> Result<Transaction, StoreError>;

    /// All records, in no particular order
    fn list(&self, ctx: &Context) -> Result<Vec<Transaction>, StoreError>;
}

/// Shared guard for [`TransactionStore::replace`] in the bundled stores
pub(crate) fn check_replace(
    current: &Transaction,
    next: &Transaction,
    expected: TransactionStatus,
) -> Result<(), StoreError> {
    if current.status != expected || !expected.can_transition_to(next.status) {
        return Err(StoreError::Conflict {
            tx_id: current.id.clone(),
            expected,
            actual: current.status,
        });
    }
    Ok(())
}

/// Shared compare-and-set step used by the bundled stores
pub(crate) fn apply_status(
    tx: &mut Transaction,
    expected: TransactionStatus,
    next: TransactionStatus,
    reason: Option<String>,
) -> Result<(), StoreError> {
    if tx.status != expected || !expected.can_transition_to(next) {
        return Err(StoreError::Conflict {
            tx_id: tx.id.clone(),
            expected,
            actual: tx.status,
        });
    }
    tx.set_status(next, reason);
    Ok(())
}
