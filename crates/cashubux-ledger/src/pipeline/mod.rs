//! Deposit/withdrawal pipeline.
//!
//! Balance changes tied to the blockchain are applied optimistically and
//! journaled as `PENDING`; a [`VerificationJob`] is queued after commit and a
//! [`VerificationWorker`] settles the row later. Deposits end `COMPLETED` or
//! are reversed and marked `FAILED`. Withdrawals reserve coins up front and
//! are paid out once approved (or at once with auto-withdrawals).

mod deposit;
mod queue;
mod withdraw;
mod worker;

use cashubux_entities::{
    sea_orm_active_enums::{TransactionKind, TransactionStatus},
    transactions,
};
use sea_orm::{
    ColumnTrait as _, Condition, EntityTrait as _, QueryFilter as _, QueryOrder as _,
    TransactionTrait as _,
};
use tracing::{info, warn};

use crate::{Ledger, LedgerResult, journal};

pub use deposit::{DepositMethod, DepositReceipt};
pub use queue::{VerificationJob, VerificationQueue, verification_queue};
pub use withdraw::WithdrawalReceipt;
pub use worker::{JobOutcome, VerificationWorker, spawn_workers};

impl Ledger {
    /// Re-queue every job a restart may have lost: pending on-chain deposits
    /// and withdrawals whose payout was never claimed. Payouts that were
    /// claimed but never recorded are flagged for an operator instead.
    pub async fn recover_pending_jobs(&self) -> LedgerResult<Vec<VerificationJob>> {
        let candidates = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::Status.eq(TransactionStatus::Pending))
                    .add(
                        Condition::all()
                            .add(transactions::Column::Kind.eq(TransactionKind::Withdrawal))
                            .add(transactions::Column::Status.eq(TransactionStatus::Completed))
                            .add(transactions::Column::ExternalRef.is_null()),
                    ),
            )
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?;

        let jobs: Vec<VerificationJob> = candidates
            .into_iter()
            .filter_map(|t| match t.kind {
                TransactionKind::Deposit if t.external_ref.is_some() => {
                    Some(VerificationJob::Deposit {
                        transaction_id: t.id,
                    })
                }
                TransactionKind::Withdrawal if awaits_payout(&t) => Some(VerificationJob::Payout {
                    transaction_id: t.id,
                }),
                _ => None,
            })
            .collect();

        for job in &jobs {
            self.enqueue(*job);
        }

        let unconfirmed = self.unconfirmed_payouts().await?;
        for transaction in &unconfirmed {
            warn!(
                "Payout for withdrawal {} was started but never recorded",
                transaction.id
            );
            if transaction.note.is_none() {
                let txn = self.db.begin().await?;
                journal::annotate(
                    &txn,
                    transaction.id,
                    UNCONFIRMED_PAYOUT_NOTE.to_string(),
                    self.now(),
                )
                .await?;
                txn.commit().await?;
            }
        }

        info!(
            "Recovered {} pending verification jobs, {} payouts need review",
            jobs.len(),
            unconfirmed.len()
        );
        Ok(jobs)
    }

    /// Withdrawals whose payout was claimed by a worker but never got a
    /// transfer reference. The transfer may or may not have gone out.
    pub async fn unconfirmed_payouts(&self) -> LedgerResult<Vec<transactions::Model>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::Kind.eq(TransactionKind::Withdrawal))
            .filter(transactions::Column::Status.ne(TransactionStatus::Failed))
            .filter(transactions::Column::ExternalRef.is_null())
            .filter(transactions::Column::PayoutStartedAt.is_not_null())
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows)
    }
}

const UNCONFIRMED_PAYOUT_NOTE: &str =
    "Payout started but no transfer reference recorded; check the hot wallet";

fn awaits_payout(transaction: &transactions::Model) -> bool {
    transaction.external_ref.is_none()
        && transaction.payout_started_at.is_none()
        && match transaction.status {
            TransactionStatus::Pending => transaction.approved_at.is_some(),
            TransactionStatus::Completed => true,
            TransactionStatus::Failed => false,
        }
}
