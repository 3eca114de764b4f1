use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig, id: i64) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;

    println!("🚫 Rejecting withdrawal #{}...", id);
    let receipt = ledger.reject_withdrawal(id).await?;

    println!(
        "✅ Withdrawal #{} rejected; account {} now holds {} coins",
        receipt.transaction.id, receipt.account.id, receipt.account.coins
    );
    Ok(())
}
