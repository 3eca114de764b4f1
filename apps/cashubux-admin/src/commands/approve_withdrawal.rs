use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig, id: i64) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;

    println!("👍 Approving withdrawal #{}...", id);
    let transaction = ledger.approve_withdrawal(id).await?;

    println!(
        "✅ Withdrawal #{} approved for account {}",
        transaction.id, transaction.account_id
    );
    println!("   💸 The verification service sends the payout when it next recovers pending work");
    Ok(())
}
