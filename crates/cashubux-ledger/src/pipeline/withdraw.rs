use cashubux_entities::{
    sea_orm_active_enums::{Currency, TransactionKind, TransactionStatus},
    transactions,
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait as _, EntityTrait as _, QueryFilter as _, QueryOrder as _, Set,
    TransactionTrait as _,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult, TransactionExt as _, VerificationJob,
    WithdrawalSettings,
    amounts::{coins_for, require_positive, whole_units},
    balance::{BalanceField, credit_units, debit_units, load_account},
    journal::{self, JournalEntry},
};

use super::JobOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalReceipt {
    pub transaction: transactions::Model,
    /// True while the withdrawal waits for an operator.
    pub requires_approval: bool,
    pub account: AccountSnapshot,
}

fn not_withdrawal(transaction: &transactions::Model) -> LedgerError {
    LedgerError::Validation(format!("transaction {} is not a withdrawal", transaction.id))
}

impl Ledger {
    /// Reserve the coin equivalent of `amount` and record the withdrawal.
    ///
    /// With auto-withdrawals the row is `COMPLETED` at once and the payout is
    /// queued; otherwise it stays `PENDING` until approved or rejected.
    pub async fn withdraw(
        &self,
        account_id: i64,
        amount: Decimal,
        settings: &WithdrawalSettings,
    ) -> LedgerResult<WithdrawalReceipt> {
        let amount = require_positive(amount)?;
        let coins_needed = coins_for(amount, self.config.conversion_rate)?;
        if coins_needed <= 0 {
            return Err(LedgerError::Validation(format!(
                "{amount} is below the smallest withdrawable amount"
            )));
        }

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let account = load_account(&txn, account_id).await?;
        let Some(wallet) = account.wallet_address.clone() else {
            return Err(LedgerError::NoWalletAddress);
        };
        if account.coins < coins_needed {
            return Err(LedgerError::InsufficientCoins {
                required: coins_needed,
                available: account.coins,
            });
        }

        debit_units(&txn, account_id, BalanceField::Coins, coins_needed).await?;

        let status = if settings.auto_withdrawals {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Pending
        };
        let transaction = journal::record(
            &txn,
            JournalEntry::completed(
                account_id,
                -Decimal::from(coins_needed),
                Currency::Coins,
                TransactionKind::Withdrawal,
                format!("Withdrawal of {amount} TON to {wallet}"),
            )
            .with_status(status)
            .with_chain_amount(amount)
            .with_reserved_coins(coins_needed),
            self.now(),
        )
        .await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        if settings.auto_withdrawals {
            self.enqueue(VerificationJob::Payout {
                transaction_id: transaction.id,
            });
        }

        info!(
            "Account {} requested withdrawal {} of {} ({} coins, {:?})",
            account_id, transaction.id, amount, coins_needed, status
        );
        Ok(WithdrawalReceipt {
            requires_approval: !settings.auto_withdrawals,
            transaction,
            account: account.into(),
        })
    }

    pub async fn transaction(&self, transaction_id: i64) -> LedgerResult<transactions::Model> {
        journal::find(&self.db, transaction_id).await
    }

    /// Withdrawals waiting for an operator, oldest first.
    pub async fn pending_withdrawals(&self) -> LedgerResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::Kind.eq(TransactionKind::Withdrawal))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .filter(transactions::Column::ApprovedAt.is_null())
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Approve a pending withdrawal and queue its payout. The transfer itself
    /// runs in a verification worker.
    pub async fn approve_withdrawal(&self, transaction_id: i64) -> LedgerResult<transactions::Model> {
        let existing = journal::find(&self.db, transaction_id).await?;
        if !existing.is_withdrawal() {
            return Err(not_withdrawal(&existing));
        }

        let _guard = self.locks.lock(existing.account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        let approved = transactions::Entity::update_many()
            .set(transactions::ActiveModel {
                approved_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .filter(transactions::Column::ApprovedAt.is_null())
            .exec(&txn)
            .await?;
        let transaction = journal::find(&txn, transaction_id).await?;
        if approved.rows_affected == 0 {
            return Err(LedgerError::InvalidTransition {
                id: transaction_id,
                status: transaction.status,
                expected: "PENDING and not yet approved",
            });
        }
        txn.commit().await?;

        self.enqueue(VerificationJob::Payout { transaction_id });

        info!("Withdrawal {} approved, payout queued", transaction_id);
        Ok(transaction)
    }

    /// Refuse a pending withdrawal and refund the reserved coins.
    pub async fn reject_withdrawal(&self, transaction_id: i64) -> LedgerResult<WithdrawalReceipt> {
        let existing = journal::find(&self.db, transaction_id).await?;
        if !existing.is_withdrawal() {
            return Err(not_withdrawal(&existing));
        }

        let _guard = self.locks.lock(existing.account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        let rejected = transactions::Entity::update_many()
            .set(transactions::ActiveModel {
                status: Set(TransactionStatus::Failed),
                note: Set(Some("Rejected by operator".to_string())),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .filter(transactions::Column::ApprovedAt.is_null())
            .exec(&txn)
            .await?;
        let transaction = journal::find(&txn, transaction_id).await?;
        if rejected.rows_affected == 0 {
            return Err(LedgerError::InvalidTransition {
                id: transaction_id,
                status: transaction.status,
                expected: "PENDING and not yet approved",
            });
        }

        let refund = match transaction.reserved_coins {
            Some(coins) => coins,
            None => whole_units(transaction.amount_decimal()?.abs().floor())?,
        };
        credit_units(&txn, transaction.account_id, BalanceField::Coins, refund).await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                transaction.account_id,
                Decimal::from(refund),
                Currency::Coins,
                TransactionKind::Deposit,
                format!("Refund of rejected withdrawal #{transaction_id}"),
            ),
            now,
        )
        .await?;

        let account = load_account(&txn, transaction.account_id).await?;
        txn.commit().await?;

        info!(
            "Withdrawal {} rejected, refunded {} coins to account {}",
            transaction_id, refund, transaction.account_id
        );
        Ok(WithdrawalReceipt {
            transaction,
            requires_approval: false,
            account: account.into(),
        })
    }

    /// Claim the right to send a withdrawal's payout. False when another
    /// worker holds the claim or the row no longer awaits payout.
    pub(crate) async fn claim_payout(&self, transaction_id: i64) -> LedgerResult<bool> {
        let txn = self.db.begin().await?;
        let claimed = journal::claim_payout(&txn, transaction_id, self.now()).await?;
        txn.commit().await?;
        Ok(claimed)
    }

    /// Attach the transfer reference of a sent payout.
    pub(crate) async fn record_payout(
        &self,
        transaction_id: i64,
        external_ref: &str,
    ) -> LedgerResult<JobOutcome> {
        let txn = self.db.begin().await?;
        journal::attach_payout(&txn, transaction_id, external_ref, self.now()).await?;
        txn.commit().await?;

        info!("Withdrawal {} paid out as {}", transaction_id, external_ref);
        Ok(JobOutcome::PayoutSent {
            external_ref: external_ref.to_owned(),
        })
    }

    /// A payout that could not be sent. Approved withdrawals fail without a
    /// refund; auto-completed ones keep their status and get a note.
    pub(crate) async fn fail_payout(
        &self,
        transaction: &transactions::Model,
        reason: String,
    ) -> LedgerResult<JobOutcome> {
        if transaction.is_pending() {
            self.fail_transaction(transaction.id, reason.clone()).await?;
        } else {
            let txn = self.db.begin().await?;
            journal::annotate(&txn, transaction.id, format!("Payout failed: {reason}"), self.now())
                .await?;
            txn.commit().await?;
            warn!("Payout for withdrawal {} failed: {}", transaction.id, reason);
        }
        Ok(JobOutcome::PayoutFailed { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};
    use rust_decimal::dec;

    async fn funded(ledger: &Ledger, account_id: i64, coins: i64) {
        register(ledger, account_id, None).await;
        ledger
            .set_wallet_address(account_id, "UQ-test-wallet")
            .await
            .unwrap();
        ledger
            .credit(account_id, Currency::Coins, Decimal::from(coins), "seed")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_withdraw_requires_wallet_and_coins() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let settings = WithdrawalSettings::default();

        assert!(matches!(
            ledger.withdraw(1, dec!(0.5), &settings).await,
            Err(LedgerError::NoWalletAddress)
        ));

        ledger.set_wallet_address(1, "EQabc").await.unwrap();
        assert!(matches!(
            ledger.withdraw(1, dec!(0.5), &settings).await,
            Err(LedgerError::InsufficientCoins {
                required: 500_000,
                available: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_manual_withdrawal_reject_refunds() {
        let ledger = test_ledger().await;
        funded(&ledger, 1, 2_000_000).await;

        let receipt = ledger
            .withdraw(1, dec!(1.5), &WithdrawalSettings::default())
            .await
            .unwrap();
        assert!(receipt.requires_approval);
        assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
        assert_eq!(receipt.transaction.reserved_coins, Some(1_500_000));
        assert_eq!(receipt.account.coins, 500_000);
        assert_eq!(ledger.pending_withdrawals().await.unwrap().len(), 1);

        let rejected = ledger.reject_withdrawal(receipt.transaction.id).await.unwrap();
        assert_eq!(rejected.transaction.status, TransactionStatus::Failed);
        assert_eq!(rejected.account.coins, 2_000_000);
        assert!(ledger.pending_withdrawals().await.unwrap().is_empty());

        let err = ledger
            .reject_withdrawal(receipt.transaction.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(ledger.account(1).await.unwrap().coins, 2_000_000);
    }

    #[tokio::test]
    async fn test_approved_withdrawal_cannot_be_rejected() {
        let ledger = test_ledger().await;
        funded(&ledger, 1, 1_000_000).await;

        let receipt = ledger
            .withdraw(1, dec!(1), &WithdrawalSettings::default())
            .await
            .unwrap();
        let approved = ledger.approve_withdrawal(receipt.transaction.id).await.unwrap();
        assert!(approved.approved_at.is_some());
        assert_eq!(approved.status, TransactionStatus::Pending);

        assert!(ledger.approve_withdrawal(receipt.transaction.id).await.is_err());
        assert!(ledger.reject_withdrawal(receipt.transaction.id).await.is_err());
    }

    #[tokio::test]
    async fn test_auto_withdrawal_completes_at_once() {
        let ledger = test_ledger().await;
        funded(&ledger, 1, 1_000_000).await;

        let receipt = ledger
            .withdraw(
                1,
                dec!(0.25),
                &WithdrawalSettings {
                    auto_withdrawals: true,
                },
            )
            .await
            .unwrap();
        assert!(!receipt.requires_approval);
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        assert_eq!(receipt.account.coins, 750_000);
    }
}
