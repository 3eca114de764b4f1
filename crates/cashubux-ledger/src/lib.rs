/*!
# CashUBux Reward Ledger

Balance store, task completion state machine, referral cascade, spin engine,
deposit/withdrawal pipeline and quest tracker for the CashUBux mini app.

Everything hangs off [`Ledger`]. Each public operation takes the acting
account's lock, runs in one database transaction and either commits all of its
balance and bookkeeping changes or none of them. Blockchain verification and
payouts are queued as [`VerificationJob`]s and run by a [`VerificationWorker`]
off the request path.

```rust,no_run
use std::sync::Arc;
use cashubux_ledger::{
    new_ephemeral_ledger_db, spawn_workers, verification_queue, Ledger, LedgerConfig,
    VerificationWorker,
};
# use cashubux_chain::{BlockchainTransfer, BlockchainVerifier, MembershipCheck, RetryConfig};
# async fn example(
#     membership: Arc<dyn MembershipCheck>,
#     verifier: Arc<dyn BlockchainVerifier>,
#     transfer: Arc<dyn BlockchainTransfer>,
# ) -> Result<(), Box<dyn std::error::Error>> {
let config = LedgerConfig::default();
let (queue, jobs) = verification_queue(config.verification.queue_capacity);
let workers = config.verification.workers;

let db = new_ephemeral_ledger_db().await?;
let ledger = Ledger::new(db, config, membership, queue);

let worker = VerificationWorker::new(ledger.clone(), verifier, transfer, RetryConfig::default());
let _pool = spawn_workers(Arc::new(worker), jobs, workers);

ledger.recover_pending_jobs().await?;
# Ok(())
# }
```
*/

mod accounts;
mod amounts;
mod balance;
mod campaigns;
mod clock;
mod config;
mod daily;
mod database;
mod error;
mod journal;
mod ledger;
mod locks;
mod pipeline;
mod quests;
mod referral;
mod response;
mod spin;
#[cfg(test)]
mod test_support;
mod transaction_ext;

pub use accounts::{AccountSnapshot, NewAccount, Registration, is_valid_wallet_address};
pub use amounts::{AD_CREDIT_SCALE, ad_credit_to_units, coins_for, units_to_ad_credit};
pub use campaigns::{
    Campaign, CampaignKind, ClaimReceipt, LevelProgress, NewCampaign, NewCampaignKind,
    StartOutcome, channel_from_link, task_reward,
};
pub use clock::{Clock, SystemClock};
pub use config::{LedgerConfig, Prize, SpinPackage, VerificationSettings, WithdrawalSettings};
pub use daily::{DailyClaimReceipt, NewDailyTask};
pub use database::{
    DatabaseError, DatabaseResult, connect_ledger_db, migrate_ledger_db, new_ephemeral_ledger_db,
    open_ledger_db,
};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use locks::AccountLocks;
pub use pipeline::{
    DepositMethod, DepositReceipt, JobOutcome, VerificationJob, VerificationQueue,
    VerificationWorker, WithdrawalReceipt, spawn_workers, verification_queue,
};
pub use quests::{NewQuest, QuestClaim, QuestView};
pub use referral::{ReferralClaim, ReferralFriend};
pub use response::{Envelope, Reportable};
pub use spin::{SpinOutcome, SpinPayment, SpinPurchase, draw_prize};
pub use transaction_ext::TransactionExt;
