//! In-memory transaction store

use super::{apply_status, check_replace, StoreError, TransactionStore};
use crate::multisig::{Context, Transaction, TransactionStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TransactionStore for MemoryStore {
    fn put(&self, _ctx: &Context, tx: &Transaction) -> Result<(), StoreError> {
        self.records.write().insert(tx.id.clone(), tx.clone());
        Ok(())
    }

    fn get(&self, _ctx: &Context, tx_id: &str) -> Result<Transaction, StoreError> {
        self.records
            .read()
            .get(tx_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(tx_id.to_string()))
    }

    fn replace(
        &self,
        _ctx: &Context,
        tx: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let current = records
            .get_mut(&tx.id)
            .ok_or_else(|| StoreError::NotFound(tx.id.clone()))?;
        check_replace(current, tx, expected)?;
        *current = tx.clone();
        Ok(())
    }

    fn update_status(
        &self,
        _ctx: &Context,
        tx_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        reason: Option<String>,
    ) -> Result<Transaction, StoreError> {
        let mut records = self.records.write();
        let tx = records
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::NotFound(tx_id.to_string()))?;
        apply_status(tx, expected, next, reason)?;
        Ok(tx.clone())
    }

    fn list(&self, _ctx: &Context) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::{Amount, SignatureEntry, TransferRequest};

    fn sample() -> Transaction {
        let amount: Amount = "1.5".parse().unwrap();
        Transaction::new("alice", TransferRequest::new("A", "B", amount, 1))
    }

    #[test]
    fn test_put_get() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let tx = sample();

        store.put(&ctx, &tx).unwrap();
        assert_eq!(store.get(&ctx, &tx.id).unwrap(), tx);
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.get(&ctx, "missing"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_status_is_conditional() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let tx = sample();
        store.put(&ctx, &tx).unwrap();

        let ready = store
            .update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Pending,
                TransactionStatus::Ready,
                None,
            )
            .unwrap();
        assert_eq!(ready.status, TransactionStatus::Ready);

        // A second claim loses
        let err = store
            .update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Pending,
                TransactionStatus::Ready,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let failed = store
            .update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Ready,
                TransactionStatus::Failed,
                Some("sink down".into()),
            )
            .unwrap();
        assert_eq!(failed.failure_reason.as_deref(), Some("sink down"));
    }

    #[test]
    fn test_replace_requires_expected_status() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let mut tx = sample();
        store.put(&ctx, &tx).unwrap();

        tx.push_signature(SignatureEntry::new("k1".into(), "aa".into()));
        tx.set_status(TransactionStatus::Ready, None);
        store.replace(&ctx, &tx, TransactionStatus::Pending).unwrap();
        assert_eq!(store.get(&ctx, &tx.id).unwrap(), tx);

        // The stored record is no longer pending
        let err = store
            .replace(&ctx, &tx, TransactionStatus::Pending)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                actual: TransactionStatus::Ready,
                ..
            }
        ));

        let missing = sample();
        assert!(matches!(
            store.replace(&ctx, &missing, TransactionStatus::Pending),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let tx = sample();
        store.put(&ctx, &tx).unwrap();

        let err = store
            .update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Pending,
                TransactionStatus::Executed,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(
            store.get(&ctx, &tx.id).unwrap().status,
            TransactionStatus::Pending
        );
    }
}
