//! CLI commands for the coordinator
//!
//! Each command maps onto one coordinator operation against file-backed
//! collaborators in the data directory.

use crate::audit::FileAuditLog;
use crate::config::Config;
use crate::crypto::{KeyPair, Secp256k1Validator};
use crate::multisig::{
    Amount, Collaborators, Context, Coordinator, CoordinatorError, ErrorKind, Transaction,
    TransactionStatus, TransferRequest,
};
use crate::settlement::Ledger;
use crate::storage::JsonFileStore;
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub config: Config,
    pub coordinator: Coordinator,
    pub ledger: Arc<Ledger>,
    pub audit: Arc<FileAuditLog>,
}

impl AppState {
    /// Wire the coordinator to the files under `config.storage`
    pub fn new(config: Config) -> CliResult<Self> {
        let store = Arc::new(JsonFileStore::open(&config.storage)?);
        let ledger = Arc::new(Ledger::open(config.storage.ledger_path())?);
        let audit = Arc::new(FileAuditLog::new(config.storage.audit_path())?);

        log::debug!("Using transaction store at {:?}", store.path());

        let coordinator = Coordinator::new(
            Collaborators {
                store,
                validator: Arc::new(Secp256k1Validator),
                balances: ledger.clone(),
                sink: ledger.clone(),
                audit: audit.clone(),
            },
            config.coordinator.clone(),
        );

        Ok(Self {
            config,
            coordinator,
            ledger,
            audit,
        })
    }

    /// Context for one command, honouring the configured timeout
    pub fn context(&self) -> Context {
        match self.config.coordinator.operation_timeout() {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::background(),
        }
    }
}

/// Process exit code for a coordinator error kind
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidRequest => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::InvalidState => 4,
        ErrorKind::DuplicateSigner => 5,
        ErrorKind::UnauthorizedSigner => 6,
        ErrorKind::InvalidSignature => 7,
        ErrorKind::Execution => 8,
        ErrorKind::Store => 9,
        ErrorKind::Cancelled => 10,
    }
}

fn status_icon(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "⏳",
        TransactionStatus::Ready => "🔒",
        TransactionStatus::Executed => "✅",
        TransactionStatus::Failed => "❌",
    }
}

fn print_transaction(tx: &Transaction) {
    println!("{} Transaction {}", status_icon(tx.status), tx.id);
    println!("   ├─ Status: {}", tx.status);
    println!("   ├─ From: {}", tx.from);
    println!("   ├─ To: {}", tx.to);
    println!("   ├─ Amount: {}", tx.amount);
    println!("   ├─ Submitted by: {}", tx.sender_id);
    if !tx.authorized_signers.is_empty() {
        println!("   ├─ Authorized signers: {}", tx.authorized_signers.len());
    }
    if let Some(reason) = &tx.failure_reason {
        println!("   ├─ Failure: {}", reason);
    }
    if tx.status.is_terminal() {
        println!("   ├─ Finished: {}", tx.updated_at.to_rfc3339());
    }
    println!(
        "   └─ Signatures: {}/{}",
        tx.signature_count(),
        tx.required_signatures
    );
    for sig in &tx.signatures {
        println!("      └─ {} at {}", sig.signer, sig.signed_at.to_rfc3339());
    }
}

/// Propose a new transfer
pub fn cmd_submit(
    state: &AppState,
    sender: &str,
    from: &str,
    to: &str,
    amount: &str,
    required: u32,
    signers: Vec<String>,
) -> CliResult<()> {
    let amount: Amount = amount.parse().map_err(CoordinatorError::from)?;
    let request = TransferRequest::new(from, to, amount, required).with_signers(signers);
    let tx = state.coordinator.submit(&state.context(), sender, request)?;

    println!("📝 Transfer proposed!");
    print_transaction(&tx);
    println!("\n   Signing digest: {}", hex::encode(tx.signing_digest()));

    Ok(())
}

/// Add a co-signer's signature
pub fn cmd_sign(state: &AppState, tx_id: &str, signer: &str, signature: &str) -> CliResult<()> {
    match state
        .coordinator
        .add_signature(&state.context(), tx_id, signer, signature)
    {
        Ok(tx) => {
            println!("✍️  Signature accepted");
            print_transaction(&tx);
            Ok(())
        }
        Err(e) => {
            if let Some(tx) = e.transaction() {
                print_transaction(tx);
            }
            Err(e.into())
        }
    }
}

/// Print the digest co-signers must sign
pub fn cmd_digest(state: &AppState, tx_id: &str) -> CliResult<()> {
    let digest = state.coordinator.signing_message(&state.context(), tx_id)?;
    println!("{}", hex::encode(digest));
    Ok(())
}

/// Produce a signature over a transaction's digest with a local key.
/// The key is used once and never stored.
pub fn cmd_sign_digest(state: &AppState, tx_id: &str, secret_key: &str) -> CliResult<()> {
    let key = KeyPair::from_private_key_hex(secret_key)?;
    let digest = state.coordinator.signing_message(&state.context(), tx_id)?;

    println!("🔑 Signer: {}", key.public_key_hex());
    println!("   Signature: {}", key.sign_hex(&digest)?);
    Ok(())
}

/// Show one transaction
pub fn cmd_show(state: &AppState, tx_id: &str) -> CliResult<()> {
    let tx = state.coordinator.get_transaction(&state.context(), tx_id)?;
    print_transaction(&tx);
    Ok(())
}

/// List transactions
pub fn cmd_list(state: &AppState, status: Option<TransactionStatus>) -> CliResult<()> {
    let txs = state
        .coordinator
        .list_transactions(&state.context(), status)?;

    if txs.is_empty() {
        println!("📭 No transactions found.");
        return Ok(());
    }

    println!("📋 Transactions:");
    for tx in &txs {
        println!(
            "   {} {} {} {} -> {} ({}/{})",
            status_icon(tx.status),
            tx.id,
            tx.amount,
            tx.from,
            tx.to,
            tx.signature_count(),
            tx.required_signatures
        );
    }
    Ok(())
}

/// Credit an address in the ledger
pub fn cmd_fund(state: &AppState, address: &str, amount: &str) -> CliResult<()> {
    let amount: Amount = amount.parse()?;
    let balance = state.ledger.credit(address, amount)?;
    println!("💰 Credited {} to {}", amount, address);
    println!("   New balance: {}", balance);
    Ok(())
}

/// Show a ledger balance
pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    println!("💰 Balance for {}: {}", address, state.ledger.balance(address));
    Ok(())
}

/// Print the most recent audit records
pub fn cmd_audit(state: &AppState, limit: usize) -> CliResult<()> {
    let records = state.audit.read_all()?;
    if records.is_empty() {
        println!("📭 Audit log is empty.");
        return Ok(());
    }

    let skip = records.len().saturating_sub(limit);
    println!("📜 Audit log ({} of {}):", records.len() - skip, records.len());
    for record in records.iter().skip(skip) {
        println!(
            "   {} {:<18} {:<12} {} {}",
            record.timestamp.to_rfc3339(),
            record.action.to_string(),
            record.user_id,
            record.tx_id.as_deref().unwrap_or("-"),
            record.details
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;

    fn state_in(dir: &std::path::Path) -> AppState {
        let config = Config {
            storage: StorageConfig {
                data_dir: dir.to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_commands_drive_a_transfer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = state_in(temp_dir.path());
        let key = KeyPair::generate();

        cmd_fund(&state, "A", "10").unwrap();
        cmd_submit(&state, "alice", "A", "B", "4.5", 1, vec![]).unwrap();

        let ctx = Context::background();
        let tx = state.coordinator.list_transactions(&ctx, None).unwrap()[0].clone();
        let sig = key.sign_hex(&tx.signing_digest()).unwrap();
        cmd_sign(&state, &tx.id, &key.public_key_hex(), &sig).unwrap();

        // A fresh state on the same directory sees the committed result
        let reopened = state_in(temp_dir.path());
        let stored = reopened.coordinator.get_transaction(&ctx, &tx.id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Executed);
        assert_eq!(reopened.ledger.balance("B"), "4.5".parse::<Amount>().unwrap());
        assert_eq!(reopened.audit.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_bad_amount_is_invalid_request() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = state_in(temp_dir.path());

        let err = cmd_submit(&state, "alice", "A", "B", "1.5e3", 1, vec![]).unwrap_err();
        let err = err.downcast::<CoordinatorError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(exit_code(err.kind()), 2);
    }
}
