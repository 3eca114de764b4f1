use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use error::AdminResult;

#[derive(Parser)]
#[command(name = "cashubux-admin")]
#[command(about = "CashUBux operator tools - ledger maintenance and withdrawal review")]
#[command(version)]
struct Cli {
    /// Ledger database file
    #[arg(long, global = true, default_value = "cashubux.db")]
    db: PathBuf,

    /// Ledger configuration (YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the ledger schema
    Migrate,

    /// Zero the per-day counters on every account
    DailyReset,

    /// List withdrawals waiting for an operator
    PendingWithdrawals,

    /// Approve a pending withdrawal; the verification service sends the payout
    ApproveWithdrawal {
        /// Transaction id of the withdrawal
        id: i64,
    },

    /// Reject a pending withdrawal and refund its coins
    RejectWithdrawal {
        /// Transaction id of the withdrawal
        id: i64,
    },

    /// Show one transaction
    ShowTransaction {
        /// Transaction id
        id: i64,

        /// Print the raw row as JSON
        #[arg(long)]
        json: bool,
    },

    /// List pending verification work and flag payouts that need review.
    /// Only lists jobs; the running verification service processes them.
    Recover,
}

#[tokio::main]
async fn main() -> AdminResult<()> {
    let cli = Cli::parse();
    let config = config::AdminConfig::load(cli.db, cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate => commands::migrate::execute(&config).await,

        Commands::DailyReset => commands::daily_reset::execute(&config).await,

        Commands::PendingWithdrawals => commands::pending_withdrawals::execute(&config).await,

        Commands::ApproveWithdrawal { id } => {
            commands::approve_withdrawal::execute(&config, id).await
        }

        Commands::RejectWithdrawal { id } => {
            commands::reject_withdrawal::execute(&config, id).await
        }

        Commands::ShowTransaction { id, json } => {
            commands::show_transaction::execute(&config, id, json).await
        }

        Commands::Recover => commands::recover::execute(&config).await,
    }
}
