//! Multisig Coordinator: threshold-approved fund transfers in Rust
//!
//! This crate provides:
//! - A transaction coordinator that collects co-signer signatures and
//!   executes a transfer exactly once when its quorum is met
//! - Per-transaction locking, so unrelated transactions never contend
//! - secp256k1 signature validation over a canonical transaction digest
//! - Exact-precision decimal amounts
//! - In-memory and JSON file transaction stores
//! - Audit logging and a balance ledger acting as the settlement sink
//!
//! See [`multisig`] for a complete example.

pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod multisig;
pub mod settlement;
pub mod storage;

// Re-export commonly used types
pub use audit::{AuditAction, AuditLogger, AuditRecord};
pub use config::Config;
pub use crypto::{KeyPair, Secp256k1Validator, SignatureValidator};
pub use multisig::{
    Amount, Collaborators, Context, Coordinator, CoordinatorConfig, CoordinatorError, ErrorKind,
    Transaction, TransactionStatus, TransferRequest,
};
pub use settlement::{BalanceSource, ExecutionSink, Ledger};
pub use storage::{JsonFileStore, MemoryStore, StorageConfig, TransactionStore};
