use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig, id: i64, json: bool) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;
    let transaction = ledger.transaction(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transaction)?);
        return Ok(());
    }

    println!("🧾 Transaction #{}", transaction.id);
    println!("   Account:     {}", transaction.account_id);
    println!("   Kind:        {:?}", transaction.kind);
    println!("   Status:      {:?}", transaction.status);
    println!("   Amount:      {} {:?}", transaction.amount, transaction.currency);
    if let Some(chain_amount) = &transaction.chain_amount {
        println!("   On chain:    {}", chain_amount);
    }
    if let Some(coins) = transaction.reserved_coins {
        println!("   Reserved:    {} coins", coins);
    }
    println!(
        "   Reference:   {}",
        transaction.external_ref.as_deref().unwrap_or("-")
    );
    println!("   Description: {}", transaction.description);
    if let Some(note) = &transaction.note {
        println!("   Note:        {}", note);
    }
    if let Some(approved_at) = transaction.approved_at {
        println!("   Approved:    {}", approved_at);
    }
    if let Some(started) = transaction.payout_started_at {
        println!("   Payout at:   {}", started);
    }
    println!("   Created:     {}", transaction.created_at);
    println!("   Updated:     {}", transaction.updated_at);

    Ok(())
}
