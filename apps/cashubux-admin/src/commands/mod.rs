use std::sync::Arc;

use async_trait::async_trait;
use cashubux_chain::{CollaboratorError, CollaboratorResult, MembershipCheck};
use cashubux_ledger::{Ledger, VerificationJob, open_ledger_db, verification_queue};
use tokio::sync::mpsc;

use crate::config::AdminConfig;
use crate::error::AdminResult;

pub mod approve_withdrawal;
pub mod daily_reset;
pub mod migrate;
pub mod pending_withdrawals;
pub mod recover;
pub mod reject_withdrawal;
pub mod show_transaction;

/// Operator commands never claim tasks, so membership lookups are refused.
struct NoMembership;

#[async_trait]
impl MembershipCheck for NoMembership {
    async fn is_member(&self, _channel: &str, _user_id: i64) -> CollaboratorResult<bool> {
        Err(CollaboratorError::Config(
            "membership checks are not available in cashubux-admin".to_string(),
        ))
    }

    async fn has_started_bot(&self, _bot_username: &str, _user_id: i64) -> CollaboratorResult<bool> {
        Err(CollaboratorError::Config(
            "membership checks are not available in cashubux-admin".to_string(),
        ))
    }
}

/// A ledger over an existing database. Jobs the ledger queues land in the
/// returned receiver; nothing in the admin tool processes them.
pub(crate) async fn open_ledger(
    config: &AdminConfig,
) -> AdminResult<(Ledger, mpsc::Receiver<VerificationJob>)> {
    let path = config.existing_db_path()?;
    let db = open_ledger_db(path).await?;
    let (queue, jobs) = verification_queue(config.ledger.verification.queue_capacity);
    let ledger = Ledger::new(db, config.ledger.clone(), Arc::new(NoMembership), queue);
    Ok((ledger, jobs))
}
