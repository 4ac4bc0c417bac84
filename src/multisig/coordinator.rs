//! Multi-signature transaction coordinator
//!
//! Accepts transfer proposals, collects co-signer signatures and executes a
//! transfer exactly once when its quorum is met.
//!
//! Every signature for a given transaction is applied under that
//! transaction's own lock: re-read from the store, check, then append and
//! persist with a write conditional on the record still being `pending`.
//! The signature that completes the quorum claims the transaction
//! (`pending -> ready`) in that same write, after which it is settled and
//! its terminal status recorded before the lock is released. Signature
//! verification happens before the lock, and audit records are flushed
//! after it.

use crate::audit::{AuditAction, AuditLogger, AuditRecord};
use crate::crypto::SignatureValidator;
use crate::multisig::context::Context;
use crate::multisig::error::{CoordinatorError, Result};
use crate::multisig::locks::{acquire, LockTable};
use crate::multisig::transaction::{
    SignatureEntry, Transaction, TransactionStatus, TransferRequest,
};
use crate::settlement::{BalanceSource, ExecutionSink};
use crate::storage::{StoreError, TransactionStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// User ID recorded on audit entries the coordinator emits on its own behalf
pub const SYSTEM_USER: &str = "system";

/// Coordinator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How often a waiting caller re-checks its context while blocked on a
    /// transaction lock
    pub lock_retry_interval_ms: u64,
    /// Deadline applied to lock waits when the caller sets none
    pub operation_timeout_ms: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_retry_interval_ms: 25,
            operation_timeout_ms: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms.max(1))
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

/// External systems the coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn TransactionStore>,
    pub validator: Arc<dyn SignatureValidator>,
    pub balances: Arc<dyn BalanceSource>,
    pub sink: Arc<dyn ExecutionSink>,
    pub audit: Arc<dyn AuditLogger>,
}

pub struct Coordinator {
    store: Arc<dyn TransactionStore>,
    validator: Arc<dyn SignatureValidator>,
    balances: Arc<dyn BalanceSource>,
    sink: Arc<dyn ExecutionSink>,
    audit: Arc<dyn AuditLogger>,
    locks: LockTable,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(collaborators: Collaborators, config: CoordinatorConfig) -> Self {
        Self {
            store: collaborators.store,
            validator: collaborators.validator,
            balances: collaborators.balances,
            sink: collaborators.sink,
            audit: collaborators.audit,
            locks: LockTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Propose a new transfer. The returned transaction is `pending` with no
    /// signatures.
    pub fn submit(
        &self,
        ctx: &Context,
        sender_id: &str,
        request: TransferRequest,
    ) -> Result<Transaction> {
        if ctx.is_done() {
            return Err(CoordinatorError::Cancelled);
        }
        validate_request(sender_id, &request)?;

        let tx = Transaction::new(sender_id, request);
        self.store.put(ctx, &tx)?;

        log::info!(
            "Submitted transaction {}: {} {} -> {} ({} signatures required)",
            tx.id,
            tx.amount,
            tx.from,
            tx.to,
            tx.required_signatures
        );
        self.record(
            ctx,
            &AuditRecord::new(
                AuditAction::Submit,
                sender_id,
                Some(&tx.id),
                format!(
                    "{} from {} to {}, {} of {} signatures",
                    tx.amount,
                    tx.from,
                    tx.to,
                    tx.required_signatures,
                    if tx.authorized_signers.is_empty() {
                        "any".to_string()
                    } else {
                        tx.authorized_signers.len().to_string()
                    }
                ),
            ),
        );

        Ok(tx)
    }

    /// Add a co-signer's signature.
    ///
    /// If this signature completes the quorum the transfer is executed
    /// before returning; the result then carries `executed`, or the call
    /// fails with [`CoordinatorError::Execution`] holding the `failed`
    /// record.
    pub fn add_signature(
        &self,
        ctx: &Context,
        tx_id: &str,
        signer: &str,
        signature: &str,
    ) -> Result<Transaction> {
        if ctx.is_done() {
            return Err(CoordinatorError::Cancelled);
        }
        if signer.trim().is_empty() || signature.trim().is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "signer and signature are required".to_string(),
            ));
        }

        // Fail fast on a snapshot; repeated under the lock
        let snapshot = self.load(ctx, tx_id)?;
        check_accepts(&snapshot, signer)?;

        let digest = snapshot.signing_digest();
        if let Err(e) = self.validator.validate(signer, &digest, signature) {
            log::warn!("Rejected signature from {} on {}: {}", signer, tx_id, e);
            self.record(
                ctx,
                &AuditRecord::new(
                    AuditAction::SignatureRejected,
                    signer,
                    Some(tx_id),
                    e.to_string(),
                ),
            );
            return Err(CoordinatorError::InvalidSignature {
                tx_id: tx_id.to_string(),
                signer: signer.to_string(),
                reason: e.to_string(),
            });
        }

        let wait_ctx = match self.config.operation_timeout() {
            Some(timeout) if ctx.deadline().is_none() => ctx.bounded(timeout),
            _ => ctx.child(),
        };
        let lock = self.locks.lock_for(tx_id);
        let guard = match acquire(&wait_ctx, &lock, self.config.lock_retry_interval()) {
            Some(guard) => guard,
            None => {
                log::debug!("Gave up waiting for lock on {}", tx_id);
                self.locks.release(tx_id, &lock);
                return Err(CoordinatorError::Cancelled);
            }
        };

        let mut records = Vec::new();
        let outcome = self.sign_locked(ctx, tx_id, signer, signature, &mut records);
        drop(guard);
        self.locks.release(tx_id, &lock);

        for record in &records {
            self.record(ctx, record);
        }
        outcome
    }

    /// Read-only copy of a transaction
    pub fn get_transaction(&self, ctx: &Context, tx_id: &str) -> Result<Transaction> {
        if ctx.is_done() {
            return Err(CoordinatorError::Cancelled);
        }
        self.load(ctx, tx_id)
    }

    /// All transactions, oldest first, optionally filtered by status
    pub fn list_transactions(
        &self,
        ctx: &Context,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>> {
        if ctx.is_done() {
            return Err(CoordinatorError::Cancelled);
        }
        let mut txs: Vec<Transaction> = self
            .store
            .list(ctx)?
            .into_iter()
            .filter(|tx| status.map_or(true, |s| tx.status == s))
            .collect();
        txs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(txs)
    }

    /// The digest co-signers must sign for `tx_id`
    pub fn signing_message(&self, ctx: &Context, tx_id: &str) -> Result<[u8; 32]> {
        Ok(self.get_transaction(ctx, tx_id)?.signing_digest())
    }

    /// Body of `add_signature` that runs while the transaction lock is held
    fn sign_locked(
        &self,
        ctx: &Context,
        tx_id: &str,
        signer: &str,
        signature: &str,
        records: &mut Vec<AuditRecord>,
    ) -> Result<Transaction> {
        let mut tx = self.load(ctx, tx_id)?;
        check_accepts(&tx, signer)?;

        tx.push_signature(SignatureEntry::new(
            signer.to_string(),
            signature.to_string(),
        ));

        // Reaching quorum claims the right to execute in the same write, so
        // a failed write leaves neither the signature nor the claim behind
        let claimed = tx.quorum_reached();
        if claimed {
            tx.set_status(TransactionStatus::Ready, None);
        }
        match self.store.replace(ctx, &tx, TransactionStatus::Pending) {
            Ok(()) => {}
            Err(StoreError::Conflict { actual, .. }) => {
                return Err(CoordinatorError::InvalidState {
                    tx_id: tx_id.to_string(),
                    status: actual,
                })
            }
            Err(e) => return Err(e.into()),
        }

        log::debug!(
            "Signature {}/{} from {} accepted on {}",
            tx.signature_count(),
            tx.required_signatures,
            signer,
            tx_id
        );
        records.push(AuditRecord::new(
            AuditAction::SignatureAdded,
            signer,
            Some(tx_id),
            format!(
                "{}/{} signatures",
                tx.signature_count(),
                tx.required_signatures
            ),
        ));

        if !claimed {
            return Ok(tx);
        }
        self.execute_locked(ctx, tx, records)
    }

    /// Settle a claimed transaction and record its terminal status
    fn execute_locked(
        &self,
        ctx: &Context,
        tx: Transaction,
        records: &mut Vec<AuditRecord>,
    ) -> Result<Transaction> {
        let failure = self.settle(ctx, &tx).err();
        let status = if failure.is_some() {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Executed
        };

        // The terminal write ignores the caller's cancellation
        let finished = self
            .store
            .update_status(
                &Context::background(),
                &tx.id,
                TransactionStatus::Ready,
                status,
                failure.clone(),
            )
            .map_err(|e| {
                log::error!(
                    "Could not record {} for transaction {}, left in ready: {}",
                    status,
                    tx.id,
                    e
                );
                CoordinatorError::from(e)
            })?;

        match failure {
            None => {
                log::info!(
                    "Executed transaction {}: {} {} -> {}",
                    finished.id,
                    finished.amount,
                    finished.from,
                    finished.to
                );
                records.push(AuditRecord::new(
                    AuditAction::Executed,
                    SYSTEM_USER,
                    Some(&finished.id),
                    format!("{} moved from {} to {}", finished.amount, finished.from, finished.to),
                ));
                Ok(finished)
            }
            Some(reason) => {
                log::warn!("Execution of transaction {} failed: {}", finished.id, reason);
                records.push(AuditRecord::new(
                    AuditAction::ExecutionFailed,
                    SYSTEM_USER,
                    Some(&finished.id),
                    reason.clone(),
                ));
                Err(CoordinatorError::Execution {
                    reason,
                    transaction: Box::new(finished),
                })
            }
        }
    }

    /// Balance check, then the fund movement. Never retried.
    fn settle(&self, ctx: &Context, tx: &Transaction) -> std::result::Result<(), String> {
        let available = self
            .balances
            .balance_of(ctx, &tx.from)
            .map_err(|e| format!("balance check failed: {}", e))?;
        if available < tx.amount {
            return Err(format!(
                "insufficient balance in {}: {} available, {} required",
                tx.from, available, tx.amount
            ));
        }
        self.sink
            .execute_funds(ctx, &tx.from, &tx.to, tx.amount)
            .map_err(|e| format!("settlement failed: {}", e))
    }

    fn load(&self, ctx: &Context, tx_id: &str) -> Result<Transaction> {
        self.store.get(ctx, tx_id).map_err(|e| match e {
            StoreError::NotFound(id) => CoordinatorError::NotFound(id),
            other => CoordinatorError::Store(other),
        })
    }

    /// Best effort: audit failures are logged and dropped
    fn record(&self, ctx: &Context, record: &AuditRecord) {
        if let Err(e) = self.audit.log_action(ctx, record) {
            log::warn!(
                "Audit log failed ({}); dropped {} by {} on {}: {}",
                e,
                record.action,
                record.user_id,
                record.tx_id.as_deref().unwrap_or("-"),
                record.details
            );
        }
    }
}

/// Reject malformed proposals before anything is stored
fn validate_request(sender_id: &str, request: &TransferRequest) -> Result<()> {
    let invalid = |msg: &str| Err(CoordinatorError::InvalidRequest(msg.to_string()));

    if sender_id.trim().is_empty() {
        return invalid("sender id is required");
    }
    if request.from.trim().is_empty() || request.to.trim().is_empty() {
        return invalid("from and to addresses are required");
    }
    if request.from == request.to {
        return invalid("from and to addresses must differ");
    }
    if request.amount.is_zero() {
        return invalid("amount must be positive");
    }
    if request.required_signatures < 1 {
        return invalid("at least one signature must be required");
    }

    if !request.authorized_signers.is_empty() {
        let mut seen = HashSet::new();
        for signer in &request.authorized_signers {
            if signer.trim().is_empty() {
                return invalid("authorized signer keys must not be empty");
            }
            if !seen.insert(signer.as_str()) {
                return invalid("authorized signers contain a duplicate");
            }
        }
        if seen.len() < request.required_signatures as usize {
            return Err(CoordinatorError::InvalidRequest(format!(
                "{} signatures required but only {} signers authorized",
                request.required_signatures,
                seen.len()
            )));
        }
    }
    Ok(())
}

/// Whether `signer` may add a signature to `tx` in its current state
fn check_accepts(tx: &Transaction, signer: &str) -> Result<()> {
    if tx.status != TransactionStatus::Pending {
        return Err(CoordinatorError::InvalidState {
            tx_id: tx.id.clone(),
            status: tx.status,
        });
    }
    if tx.has_signed(signer) {
        return Err(CoordinatorError::DuplicateSigner {
            tx_id: tx.id.clone(),
            signer: signer.to_string(),
        });
    }
    if !tx.is_authorized(signer) {
        return Err(CoordinatorError::UnauthorizedSigner {
            tx_id: tx.id.clone(),
            signer: signer.to_string(),
        });
    }
    Ok(())
}
