use cashubux_entities::{
    sea_orm_active_enums::{Currency, TransactionKind, TransactionStatus},
    transactions,
};
use rust_decimal::Decimal;
use sea_orm::TransactionTrait as _;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult, TransactionExt as _, VerificationJob,
    amounts::{ad_credit_to_units, require_positive},
    balance::{BalanceField, credit_units, debit_units, load_account},
    journal::{self, JournalEntry},
};

use super::JobOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositMethod {
    Manual,
    Blockchain { external_ref: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    pub transaction: transactions::Model,
    pub account: AccountSnapshot,
}

impl Ledger {
    /// Credit ad-credit now. Blockchain deposits stay `PENDING` until the
    /// verifier confirms them and are reversed otherwise.
    pub async fn deposit(
        &self,
        account_id: i64,
        amount: Decimal,
        method: DepositMethod,
    ) -> LedgerResult<DepositReceipt> {
        let amount = require_positive(amount)?;
        let units = ad_credit_to_units(amount)?;

        let entry = JournalEntry::completed(
            account_id,
            amount,
            Currency::AdCredit,
            TransactionKind::Deposit,
            format!("Ad-credit deposit of {amount}"),
        );
        let entry = match &method {
            DepositMethod::Manual => entry,
            DepositMethod::Blockchain { external_ref } => {
                let external_ref = external_ref.trim();
                if external_ref.is_empty() {
                    return Err(LedgerError::Validation(
                        "transaction reference is required".to_string(),
                    ));
                }
                entry
                    .with_status(TransactionStatus::Pending)
                    .with_external_ref(external_ref)
                    .with_chain_amount(amount)
            }
        };

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        credit_units(&txn, account_id, BalanceField::AdCredit, units).await?;
        let transaction = journal::record(&txn, entry, self.now()).await?;
        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        if transaction.is_pending() {
            self.enqueue(VerificationJob::Deposit {
                transaction_id: transaction.id,
            });
        }

        info!(
            "Account {} deposited {} ad-credit via {:?} (transaction {})",
            account_id, amount, method, transaction.id
        );
        Ok(DepositReceipt {
            transaction,
            account: account.into(),
        })
    }

    /// Mark a verified deposit `COMPLETED`, unless another live transaction
    /// claimed the same reference in the meantime.
    pub(crate) async fn confirm_deposit(&self, transaction_id: i64) -> LedgerResult<JobOutcome> {
        let pending = journal::find(&self.db, transaction_id).await?;
        let guard = self.locks.lock(pending.account_id).await;
        let txn = self.db.begin().await?;

        let transaction = journal::find(&txn, transaction_id).await?;
        if !transaction.is_pending() {
            return Ok(JobOutcome::Skipped);
        }
        if let Some(reference) = transaction.external_ref.as_deref() {
            if let Some(holder) = journal::live_holder(&txn, reference, transaction_id).await? {
                drop(txn);
                drop(guard);
                return self
                    .reverse_deposit(
                        transaction_id,
                        format!("Double spend: reference also used by transaction #{}", holder.id),
                    )
                    .await;
            }
        }

        if !journal::settle(&txn, transaction_id, TransactionStatus::Completed, None, self.now())
            .await?
        {
            return Ok(JobOutcome::Skipped);
        }
        txn.commit().await?;
        drop(guard);

        info!("Deposit {} verified", transaction_id);
        Ok(JobOutcome::Completed)
    }

    /// Claw back an optimistic credit and mark the deposit `FAILED`.
    ///
    /// The claw-back never takes a balance below zero; whatever could not be
    /// recovered is recorded in the transaction note.
    pub(crate) async fn reverse_deposit(
        &self,
        transaction_id: i64,
        reason: String,
    ) -> LedgerResult<JobOutcome> {
        let pending = journal::find(&self.db, transaction_id).await?;
        let _guard = self.locks.lock(pending.account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        let transaction = journal::find(&txn, transaction_id).await?;
        if !transaction.is_pending() {
            return Ok(JobOutcome::Skipped);
        }

        let field = BalanceField::for_currency(transaction.currency);
        let credited = field.units(transaction.amount_decimal()?.abs())?;
        let account = load_account(&txn, transaction.account_id).await?;
        let clawback = credited.min(field.read(&account)).max(0);
        let shortfall = credited - clawback;

        if clawback > 0 {
            debit_units(&txn, transaction.account_id, field, clawback).await?;
            journal::record(
                &txn,
                JournalEntry::completed(
                    transaction.account_id,
                    -field.human(clawback),
                    transaction.currency,
                    TransactionKind::Reversal,
                    format!("Reversal of transaction #{transaction_id}"),
                ),
                now,
            )
            .await?;
        }

        let note = if shortfall > 0 {
            format!(
                "{reason}; cannot reverse {} - insufficient user balance",
                field.human(shortfall)
            )
        } else {
            reason
        };
        if !journal::settle(&txn, transaction_id, TransactionStatus::Failed, Some(note.clone()), now)
            .await?
        {
            return Ok(JobOutcome::Skipped);
        }
        txn.commit().await?;

        warn!("Deposit {} reversed: {}", transaction_id, note);
        Ok(JobOutcome::Reversed {
            reversed: field.human(clawback),
            shortfall: field.human(shortfall),
        })
    }

    /// Mark a pending transaction `FAILED` without touching balances.
    pub(crate) async fn fail_transaction(
        &self,
        transaction_id: i64,
        reason: String,
    ) -> LedgerResult<JobOutcome> {
        let txn = self.db.begin().await?;
        if !journal::settle(
            &txn,
            transaction_id,
            TransactionStatus::Failed,
            Some(reason.clone()),
            self.now(),
        )
        .await?
        {
            return Ok(JobOutcome::Skipped);
        }
        txn.commit().await?;

        warn!("Transaction {} failed: {}", transaction_id, reason);
        Ok(JobOutcome::Failed { reason })
    }
}
