//! Multisig coordinator CLI
//!
//! A command-line interface over the coordinator, backed by files in the
//! data directory.

use clap::{Parser, Subcommand};
use multisig_coordinator::cli::{self, AppState};
use multisig_coordinator::config::Config;
use multisig_coordinator::multisig::{CoordinatorError, TransactionStatus};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Collect co-signer approvals and settle transfers exactly once", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose a new transfer
    Submit {
        /// Identity of the submitting user
        #[arg(long)]
        sender: String,

        /// Source address
        #[arg(short, long)]
        from: String,

        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount as a decimal, e.g. 10.00
        #[arg(short, long)]
        amount: String,

        /// Signatures required before execution
        #[arg(short, long, default_value = "2")]
        required: u32,

        /// Authorized signer public key (repeatable); omit to allow anyone
        #[arg(short, long = "signer")]
        signers: Vec<String>,
    },

    /// Add a co-signer's signature to a transaction
    Sign {
        /// Transaction ID
        tx_id: String,

        /// Signer public key (hex)
        #[arg(short, long)]
        signer: String,

        /// Signature over the transaction digest (hex)
        #[arg(long)]
        signature: String,
    },

    /// Print the digest co-signers must sign
    Digest {
        /// Transaction ID
        tx_id: String,
    },

    /// Sign a transaction digest with a one-off secret key
    SignDigest {
        /// Transaction ID
        tx_id: String,

        /// Secret key (hex); never stored
        #[arg(long)]
        secret_key: String,
    },

    /// Show a transaction
    Show {
        /// Transaction ID
        tx_id: String,
    },

    /// List transactions
    List {
        /// Only show transactions in this status
        #[arg(short, long)]
        status: Option<TransactionStatus>,
    },

    /// Credit an address in the local ledger
    Fund {
        #[arg(short, long)]
        address: String,

        #[arg(long)]
        amount: String,
    },

    /// Show a ledger balance
    Balance {
        address: String,
    },

    /// Show recent audit records
    Audit {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Submit {
            sender,
            from,
            to,
            amount,
            required,
            signers,
        } => cli::cmd_submit(&state, &sender, &from, &to, &amount, required, signers),
        Commands::Sign {
            tx_id,
            signer,
            signature,
        } => cli::cmd_sign(&state, &tx_id, &signer, &signature),
        Commands::Digest { tx_id } => cli::cmd_digest(&state, &tx_id),
        Commands::SignDigest { tx_id, secret_key } => {
            cli::cmd_sign_digest(&state, &tx_id, &secret_key)
        }
        Commands::Show { tx_id } => cli::cmd_show(&state, &tx_id),
        Commands::List { status } => cli::cmd_list(&state, status),
        Commands::Fund { address, amount } => cli::cmd_fund(&state, &address, &amount),
        Commands::Balance { address } => cli::cmd_balance(&state, &address),
        Commands::Audit { limit } => cli::cmd_audit(&state, limit),
    }
}

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            let code = match e.downcast_ref::<CoordinatorError>() {
                Some(err) => cli::exit_code(err.kind()),
                None => 1,
            };
            ExitCode::from(code as u8)
        }
    }
}
