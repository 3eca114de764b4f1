use cashubux_ledger::VerificationJob;

use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;

    println!("🔍 Scanning for verification work left pending...");
    let jobs = ledger.recover_pending_jobs().await?;
    let unconfirmed = ledger.unconfirmed_payouts().await?;
    for transaction in &unconfirmed {
        if let Some(started) = transaction.payout_started_at {
            println!(
                "   ❗ withdrawal #{} started paying out at {} with no transfer reference; check the hot wallet",
                transaction.id, started
            );
        }
    }
    if jobs.is_empty() {
        println!("✅ Nothing to recover");
        return Ok(());
    }

    for job in &jobs {
        match job {
            VerificationJob::Deposit { transaction_id } => {
                println!("   ⛓️  deposit #{} awaits on-chain verification", transaction_id)
            }
            VerificationJob::Payout { transaction_id } => {
                println!("   💸 withdrawal #{} awaits its payout", transaction_id)
            }
        }
    }
    println!(
        "⚠️  {} job(s) are left for the running verification service",
        jobs.len()
    );
    Ok(())
}
