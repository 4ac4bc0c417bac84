//! Coordinator error taxonomy

use crate::multisig::amount::AmountError;
use crate::multisig::transaction::{Transaction, TransactionStatus};
use crate::storage::StoreError;
use thiserror::Error;

/// Errors returned by coordinator operations
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Transaction {tx_id} is {status}")]
    InvalidState {
        tx_id: String,
        status: TransactionStatus,
    },
    #[error("Signer {signer} already signed transaction {tx_id}")]
    DuplicateSigner { tx_id: String, signer: String },
    #[error("Signer {signer} is not authorized for transaction {tx_id}")]
    UnauthorizedSigner { tx_id: String, signer: String },
    #[error("Invalid signature from {signer} on transaction {tx_id}: {reason}")]
    InvalidSignature {
        tx_id: String,
        signer: String,
        reason: String,
    },
    /// Execution ran and failed; carries the `failed` record
    #[error("Execution of transaction {} failed: {reason}", .transaction.id)]
    Execution {
        reason: String,
        transaction: Box<Transaction>,
    },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<AmountError> for CoordinatorError {
    fn from(e: AmountError) -> Self {
        CoordinatorError::InvalidRequest(e.to_string())
    }
}

/// Flat error classification for transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    InvalidState,
    DuplicateSigner,
    UnauthorizedSigner,
    InvalidSignature,
    Execution,
    Store,
    Cancelled,
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::DuplicateSigner { .. } => ErrorKind::DuplicateSigner,
            Self::UnauthorizedSigner { .. } => ErrorKind::UnauthorizedSigner,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::Store(_) => ErrorKind::Store,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// The transaction snapshot attached to the error, if any
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Execution { transaction, .. } => Some(transaction),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
