use cashubux_ledger::TransactionExt as _;
use rust_decimal::Decimal;

use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;

    let pending = ledger.pending_withdrawals().await?;
    if pending.is_empty() {
        println!("✅ No withdrawals waiting for review");
        return Ok(());
    }

    println!("📋 {} withdrawal(s) waiting for review:", pending.len());
    let mut total = Decimal::ZERO;
    for withdrawal in &pending {
        let amount = withdrawal
            .expected_chain_amount()
            .map_err(cashubux_ledger::LedgerError::from)?;
        total += amount;

        let account = ledger.account(withdrawal.account_id).await?;
        println!(
            "   #{:<6} account {:<12} {:>12} TON  {:>12} coins  wallet {}  requested {}",
            withdrawal.id,
            withdrawal.account_id,
            amount.to_string(),
            withdrawal.reserved_coins.unwrap_or_default(),
            account.wallet_address.as_deref().unwrap_or("-"),
            withdrawal.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    println!("   Total requested: {} TON", total);

    Ok(())
}
