//! Audit trail
//!
//! Every coordinator decision produces an [`AuditRecord`]. Records are
//! write-once; loggers only ever append. Audit is best effort: a failing
//! logger is reported through `log` and never fails the operation.

pub mod logger;

pub use logger::{FileAuditLog, LogAuditLogger, MemoryAuditLog};

use crate::multisig::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Kind of audited action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Submit,
    SignatureAdded,
    SignatureRejected,
    Executed,
    ExecutionFailed,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submit => "submit",
            Self::SignatureAdded => "signature_added",
            Self::SignatureRejected => "signature_rejected",
            Self::Executed => "executed",
            Self::ExecutionFailed => "execution_failed",
        };
        f.write_str(s)
    }
}

/// One immutable audit entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    pub details: String,
}

impl AuditRecord {
    pub fn new(action: AuditAction, user_id: &str, tx_id: Option<&str>, details: String) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            user_id: user_id.to_string(),
            tx_id: tx_id.map(str::to_string),
            details,
        }
    }
}

/// Append-only action log
pub trait AuditLogger: Send + Sync {
    fn log_action(&self, ctx: &Context, record: &AuditRecord) -> Result<(), AuditError>;
}
