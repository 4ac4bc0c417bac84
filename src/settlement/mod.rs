//! Settlement collaborators
//!
//! Funds only move through an [`ExecutionSink`], and only after quorum.
//! Before calling it the coordinator confirms the sender can cover the
//! transfer through a [`BalanceSource`].

pub mod ledger;

pub use ledger::Ledger;

use crate::multisig::{Amount, Context};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Insufficient funds in {address}: have {available}, need {required}")]
    InsufficientFunds {
        address: String,
        available: Amount,
        required: Amount,
    },
    #[error("Balance overflow crediting {0}")]
    Overflow(String),
    #[error("Settlement rejected: {0}")]
    Rejected(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Reports the spendable balance of an address
pub trait BalanceSource: Send + Sync {
    fn balance_of(&self, ctx: &Context, address: &str) -> Result<Amount, SettlementError>;
}

/// Performs the actual fund movement
pub trait ExecutionSink: Send + Sync {
    fn execute_funds(
        &self,
        ctx: &Context,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), SettlementError>;
}
