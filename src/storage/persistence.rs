//! JSON file persistence
//!
//! [`JsonFileStore`] keeps every record in a single JSON document. It holds
//! no cache: each call reads the file, and each mutation rewrites it through
//! a temporary file and an atomic rename, so a restarted process sees
//! exactly what the previous one committed.

use super::{apply_status, check_replace, StoreError, TransactionStore};
use crate::multisig::{Context, Transaction, TransactionStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub transactions_file: String,
    pub ledger_file: String,
    pub audit_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            transactions_file: "transactions.json".to_string(),
            ledger_file: "ledger.json".to_string(),
            audit_file: "audit.log".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn transactions_path(&self) -> PathBuf {
        self.data_dir.join(&self.transactions_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_file)
    }
}

type Records = BTreeMap<String, Transaction>;

/// File-backed transaction store
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or prepare) the store described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self::at(config.transactions_path()))
    }

    /// Use an explicit file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Records, StoreError> {
        if !self.path.exists() {
            return Ok(Records::new());
        }
        let file = fs::File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save(&self, records: &Records) -> Result<(), StoreError> {
        let temp_path = self.path.with_extension("tmp");
        {
            let file = fs::File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl TransactionStore for JsonFileStore {
    fn put(&self, _ctx: &Context, tx: &Transaction) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        records.insert(tx.id.clone(), tx.clone());
        self.save(&records)
    }

    fn get(&self, _ctx: &Context, tx_id: &str) -> Result<Transaction, StoreError> {
        self.load()?
            .remove(tx_id)
            .ok_or_else(|| StoreError::NotFound(tx_id.to_string()))
    }

    fn replace(
        &self,
        _ctx: &Context,
        tx: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        let current = records
            .get_mut(&tx.id)
            .ok_or_else(|| StoreError::NotFound(tx.id.clone()))?;
        check_replace(current, tx, expected)?;
        *current = tx.clone();
        self.save(&records)
    }

    fn update_status(
        &self,
        _ctx: &Context,
        tx_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        reason: Option<String>,
    ) -> Result<Transaction, StoreError> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        let tx = records
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::NotFound(tx_id.to_string()))?;
        apply_status(tx, expected, next, reason)?;
        let updated = tx.clone();
        self.save(&records)?;
        Ok(updated)
    }

    fn list(&self, _ctx: &Context) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.load()?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::{Amount, SignatureEntry, TransferRequest};

    fn sample() -> Transaction {
        let amount: Amount = "10.00".parse().unwrap();
        Transaction::new("alice", TransferRequest::new("A", "B", amount, 2))
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = Context::background();

        let mut tx = sample();
        tx.push_signature(SignatureEntry::new("k1".into(), "aa".into()));
        {
            let store = JsonFileStore::open(&config).unwrap();
            store.put(&ctx, &tx).unwrap();
        }

        let reopened = JsonFileStore::open(&config).unwrap();
        let loaded = reopened.get(&ctx, &tx.id).unwrap();
        assert_eq!(loaded, tx);
        assert_eq!(loaded.amount.to_string(), "10");
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::at(temp_dir.path().join("none.json"));
        let ctx = Context::background();

        assert!(store.list(&ctx).unwrap().is_empty());
        assert!(matches!(store.get(&ctx, "x"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_status_update_is_written_through() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tx.json");
        let ctx = Context::background();
        let tx = sample();

        let store = JsonFileStore::at(&path);
        store.put(&ctx, &tx).unwrap();
        store
            .update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Pending,
                TransactionStatus::Ready,
                None,
            )
            .unwrap();

        // A second handle on the same file observes the claim
        let other = JsonFileStore::at(&path);
        assert_eq!(
            other.get(&ctx, &tx.id).unwrap().status,
            TransactionStatus::Ready
        );
        assert!(matches!(
            other.update_status(
                &ctx,
                &tx.id,
                TransactionStatus::Pending,
                TransactionStatus::Ready,
                None
            ),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_replace_is_written_through() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tx.json");
        let ctx = Context::background();
        let mut tx = sample();

        let store = JsonFileStore::at(&path);
        store.put(&ctx, &tx).unwrap();
        tx.push_signature(SignatureEntry::new("k1".into(), "aa".into()));
        store.replace(&ctx, &tx, TransactionStatus::Pending).unwrap();

        let other = JsonFileStore::at(&path);
        assert_eq!(other.get(&ctx, &tx.id).unwrap().signature_count(), 1);
        assert!(matches!(
            other.replace(&ctx, &tx, TransactionStatus::Ready),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tx.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::at(&path);
        let result = store.list(&Context::background());
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }
}
