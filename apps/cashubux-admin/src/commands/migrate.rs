use cashubux_ledger::{migrate_ledger_db, open_ledger_db};

use crate::config::AdminConfig;
use crate::error::AdminResult;

pub async fn execute(config: &AdminConfig) -> AdminResult<()> {
    println!("🗄️  Migrating ledger at {}", config.db_path.display());

    let db = open_ledger_db(&config.db_path).await?;
    migrate_ledger_db(&db).await?;

    println!("✅ Schema is up to date");
    Ok(())
}
