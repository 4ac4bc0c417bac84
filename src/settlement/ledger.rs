//! Balance ledger
//!
//! A simple account ledger that acts as both the balance source and the
//! execution sink. When opened on a file every mutation is written through.

use super::{BalanceSource, ExecutionSink, SettlementError};
use crate::multisig::{Amount, Context};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Ledger {
    balances: Mutex<BTreeMap<String, Amount>>,
    path: Option<PathBuf>,
    executions: AtomicUsize,
}

impl Ledger {
    /// Create an empty in-memory ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-backed ledger, loading existing balances
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettlementError> {
        let path = path.into();
        let balances = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            balances: Mutex::new(balances),
            path: Some(path),
            executions: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn balance(&self, address: &str) -> Amount {
        self.balances
            .lock()
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Add funds to an address
    pub fn credit(&self, address: &str, amount: Amount) -> Result<Amount, SettlementError> {
        let mut balances = self.balances.lock();
        let current = balances.get(address).copied().unwrap_or(Amount::ZERO);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| SettlementError::Overflow(address.to_string()))?;
        balances.insert(address.to_string(), updated);
        self.persist(&balances)?;
        Ok(updated)
    }

    /// Number of transfers executed through this ledger
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn persist(&self, balances: &BTreeMap<String, Amount>) -> Result<(), SettlementError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let temp_path = path.with_extension("tmp");
            fs::write(&temp_path, serde_json::to_string_pretty(balances)?)?;
            fs::rename(&temp_path, path)?;
        }
        Ok(())
    }
}

impl BalanceSource for Ledger {
    fn balance_of(&self, _ctx: &Context, address: &str) -> Result<Amount, SettlementError> {
        Ok(self.balance(address))
    }
}

impl ExecutionSink for Ledger {
    fn execute_funds(
        &self,
        _ctx: &Context,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), SettlementError> {
        let mut balances = self.balances.lock();
        let available = balances.get(from).copied().unwrap_or(Amount::ZERO);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| SettlementError::InsufficientFunds {
                    address: from.to_string(),
                    available,
                    required: amount,
                })?;
        let received = balances
            .get(to)
            .copied()
            .unwrap_or(Amount::ZERO)
            .checked_add(amount)
            .ok_or_else(|| SettlementError::Overflow(to.to_string()))?;

        // Persist the new balances before committing them in memory
        let mut next = balances.clone();
        next.insert(from.to_string(), remaining);
        next.insert(to.to_string(), received);
        self.persist(&next)?;
        *balances = next;

        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_transfer_moves_funds() {
        let ledger = Ledger::new();
        let ctx = Context::background();
        ledger.credit("A", amount("25")).unwrap();

        ledger.execute_funds(&ctx, "A", "B", amount("10.5")).unwrap();

        assert_eq!(ledger.balance("A"), amount("14.5"));
        assert_eq!(ledger.balance("B"), amount("10.5"));
        assert_eq!(ledger.execution_count(), 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let ledger = Ledger::new();
        let ctx = Context::background();
        ledger.credit("A", amount("5")).unwrap();

        let err = ledger
            .execute_funds(&ctx, "A", "B", amount("6"))
            .unwrap_err();
        assert!(matches!(err, SettlementError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance("A"), amount("5"));
        assert_eq!(ledger.balance("B"), Amount::ZERO);
        assert_eq!(ledger.execution_count(), 0);
    }

    #[test]
    fn test_file_backed_ledger_reloads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let ctx = Context::background();

        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.credit("A", amount("3")).unwrap();
            ledger.execute_funds(&ctx, "A", "B", amount("1")).unwrap();
        }

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.balance("A"), amount("2"));
        assert_eq!(ledger.balance_of(&ctx, "B").unwrap(), amount("1"));
    }
}
