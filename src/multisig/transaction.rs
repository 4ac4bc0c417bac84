//! Multi-signature transaction records
//!
//! A [`Transaction`] is a proposed transfer collecting co-signer approvals.
//! Records are owned by the transaction store; the coordinator only ever
//! hands out copies.

use crate::crypto::FieldHasher;
use crate::multisig::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Domain tag mixed into every signing digest
pub const SIGNING_DOMAIN: &[u8] = b"multisig-coordinator/transfer/v1";

/// A single accepted signature from a co-signer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// Public key of the signer (hex)
    pub signer: String,
    /// Signature over the signing digest (hex)
    pub signature: String,
    /// When the signature was accepted
    pub signed_at: DateTime<Utc>,
}

impl SignatureEntry {
    pub fn new(signer: String, signature: String) -> Self {
        Self {
            signer,
            signature,
            signed_at: Utc::now(),
        }
    }
}

/// Lifecycle of a transaction
///
/// `Ready` only exists between the quorum claim and the terminal write of
/// the same critical section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting for more signatures
    Pending,
    /// Quorum reached, execution in progress
    Ready,
    /// Funds moved
    Executed,
    /// Execution attempted and did not complete
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Pending) | (Pending, Ready) | (Ready, Executed) | (Ready, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Executed => "executed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "executed" => Ok(Self::Executed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Parameters of a new transfer proposal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub required_signatures: u32,
    /// Signers allowed to approve; empty means anyone with a valid signature
    #[serde(default)]
    pub authorized_signers: Vec<String>,
}

impl TransferRequest {
    pub fn new(from: &str, to: &str, amount: Amount, required_signatures: u32) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            required_signatures,
            authorized_signers: Vec::new(),
        }
    }

    /// Restrict approvals to the given signer keys
    pub fn with_signers(mut self, signers: Vec<String>) -> Self {
        self.authorized_signers = signers;
        self
    }
}

/// A transfer pending or past signature collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: String,
    /// User who submitted the proposal
    pub sender_id: String,
    /// Source address
    pub from: String,
    /// Recipient address
    pub to: String,
    pub amount: Amount,
    /// Quorum threshold
    pub required_signatures: u32,
    #[serde(default)]
    pub authorized_signers: Vec<String>,
    /// Accepted signatures, in acceptance order
    pub signatures: Vec<SignatureEntry>,
    pub status: TransactionStatus,
    /// Why execution failed, set only for `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction with a fresh ID
    pub fn new(sender_id: &str, request: TransferRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            from: request.from,
            to: request.to,
            amount: request.amount,
            required_signatures: request.required_signatures,
            authorized_signers: request.authorized_signers,
            signatures: Vec::new(),
            status: TransactionStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Digest co-signers sign: ID, sender, recipient and amount.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut hasher = FieldHasher::new(SIGNING_DOMAIN);
        hasher
            .field(self.id.as_bytes())
            .field(self.from.as_bytes())
            .field(self.to.as_bytes())
            .field(&self.amount.minor_units().to_be_bytes());
        hasher.finish()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn has_signed(&self, signer: &str) -> bool {
        self.signatures.iter().any(|s| s.signer == signer)
    }

    pub fn is_authorized(&self, signer: &str) -> bool {
        self.authorized_signers.is_empty() || self.authorized_signers.iter().any(|s| s == signer)
    }

    pub fn quorum_reached(&self) -> bool {
        self.signatures.len() >= self.required_signatures as usize
    }

    /// Signers who have already signed
    pub fn signed_by(&self) -> Vec<&str> {
        self.signatures.iter().map(|s| s.signer.as_str()).collect()
    }

    pub(crate) fn push_signature(&mut self, entry: SignatureEntry) {
        self.updated_at = entry.signed_at;
        self.signatures.push(entry);
    }

    pub(crate) fn set_status(&mut self, status: TransactionStatus, reason: Option<String>) {
        self.status = status;
        self.failure_reason = reason;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        let amount: Amount = "10.00".parse().unwrap();
        Transaction::new("alice", TransferRequest::new("A", "B", amount, 2))
    }

    #[test]
    fn test_new_transaction_is_pending() {
        let tx = sample();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.signature_count(), 0);
        assert!(!tx.quorum_reached());
        assert!(Uuid::parse_str(&tx.id).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(sample().id, sample().id);
    }

    #[test]
    fn test_digest_binds_transaction_id() {
        let a = sample();
        let b = sample();
        assert_eq!(a.signing_digest(), a.signing_digest());
        assert_ne!(a.signing_digest(), b.signing_digest());
    }

    #[test]
    fn test_digest_ignores_signatures_and_status() {
        let mut tx = sample();
        let before = tx.signing_digest();
        tx.push_signature(SignatureEntry::new("k1".into(), "00".into()));
        tx.set_status(TransactionStatus::Ready, None);
        assert_eq!(before, tx.signing_digest());
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Executed));
        assert!(Ready.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Executed));
        assert!(!Executed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
        assert!(Executed.is_terminal() && Failed.is_terminal());
        assert!(!Ready.is_terminal());
    }

    #[test]
    fn test_allow_list() {
        let mut tx = sample();
        assert!(tx.is_authorized("anyone"));
        tx.authorized_signers = vec!["k1".into()];
        assert!(tx.is_authorized("k1"));
        assert!(!tx.is_authorized("k2"));
    }

    #[test]
    fn test_serde_status_names() {
        let json = serde_json::to_string(&TransactionStatus::Executed).unwrap();
        assert_eq!(json, "\"executed\"");
        assert_eq!("Failed".parse(), Ok(TransactionStatus::Failed));
        assert!("done".parse::<TransactionStatus>().is_err());
    }
}
