use std::sync::Arc;

use async_trait::async_trait;
use cashubux_chain::{CollaboratorResult, MembershipCheck};
use cashubux_entities::sea_orm_active_enums::Currency;
use rust_decimal::Decimal;

use crate::{Ledger, LedgerConfig, NewAccount, new_ephemeral_ledger_db, verification_queue};

/// Every membership lookup succeeds.
pub struct AllowAll;

#[async_trait]
impl MembershipCheck for AllowAll {
    async fn is_member(&self, _channel: &str, _user_id: i64) -> CollaboratorResult<bool> {
        Ok(true)
    }

    async fn has_started_bot(&self, _bot: &str, _user_id: i64) -> CollaboratorResult<bool> {
        Ok(true)
    }
}

/// Ledger on a fresh database. Queued jobs are dropped; pipeline tests call
/// the settle paths directly.
pub async fn test_ledger() -> Ledger {
    let db = new_ephemeral_ledger_db().await.unwrap();
    let (queue, _jobs) = verification_queue(16);
    Ledger::new(db, LedgerConfig::default(), Arc::new(AllowAll), queue)
}

pub async fn ledger_with_accounts(ids: &[i64]) -> Ledger {
    let ledger = test_ledger().await;
    for id in ids {
        register(&ledger, *id, None).await;
    }
    ledger
}

pub async fn register(ledger: &Ledger, id: i64, referred_by: Option<i64>) {
    ledger
        .register_account(NewAccount {
            id,
            name: format!("user{id}"),
            referred_by,
        })
        .await
        .unwrap();
}

pub async fn fund_ad_credit(ledger: &Ledger, id: i64, amount: Decimal) {
    ledger
        .credit(id, Currency::AdCredit, amount, "test funding")
        .await
        .unwrap();
}
