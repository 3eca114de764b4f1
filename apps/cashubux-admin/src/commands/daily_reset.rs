use crate::config::AdminConfig;
use crate::error::AdminResult;

use super::open_ledger;

pub async fn execute(config: &AdminConfig) -> AdminResult<()> {
    let (ledger, _jobs) = open_ledger(config).await?;

    println!("🔄 Resetting daily counters...");
    let touched = ledger.reset_daily_counters().await?;

    println!("✅ Reset {} account(s)", touched);
    Ok(())
}
