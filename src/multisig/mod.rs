//! Multi-signature transaction coordination
//!
//! A transfer is proposed with a quorum threshold, co-signers add
//! signatures over its canonical digest, and the transfer executes exactly
//! once when the threshold is met.
//!
//! # Example
//!
//! ```rust
//! use multisig_coordinator::audit::MemoryAuditLog;
//! use multisig_coordinator::crypto::{KeyPair, Secp256k1Validator};
//! use multisig_coordinator::multisig::{
//!     Collaborators, Context, Coordinator, CoordinatorConfig, TransactionStatus, TransferRequest,
//! };
//! use multisig_coordinator::settlement::Ledger;
//! use multisig_coordinator::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(Ledger::new());
//! ledger.credit("A", "100".parse().unwrap()).unwrap();
//!
//! let coordinator = Coordinator::new(
//!     Collaborators {
//!         store: Arc::new(MemoryStore::new()),
//!         validator: Arc::new(Secp256k1Validator),
//!         balances: ledger.clone(),
//!         sink: ledger.clone(),
//!         audit: Arc::new(MemoryAuditLog::new()),
//!     },
//!     CoordinatorConfig::default(),
//! );
//!
//! let ctx = Context::background();
//! let request = TransferRequest::new("A", "B", "10.00".parse().unwrap(), 2);
//! let tx = coordinator.submit(&ctx, "alice", request).unwrap();
//!
//! let signers = [KeyPair::generate(), KeyPair::generate()];
//! let mut status = tx.status;
//! for key in &signers {
//!     let signature = key.sign_hex(&tx.signing_digest()).unwrap();
//!     status = coordinator
//!         .add_signature(&ctx, &tx.id, &key.public_key_hex(), &signature)
//!         .unwrap()
//!         .status;
//! }
//! assert_eq!(status, TransactionStatus::Executed);
//! ```

pub mod amount;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod transaction;

pub use amount::{Amount, AmountError};
pub use context::Context;
pub use coordinator::{Collaborators, Coordinator, CoordinatorConfig, SYSTEM_USER};
pub use error::{CoordinatorError, ErrorKind, Result};
pub use transaction::{SignatureEntry, Transaction, TransactionStatus, TransferRequest};
