use std::sync::Arc;

use cashubux_chain::{BlockchainTransfer, BlockchainVerifier, RetryConfig, with_retry};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    Ledger, LedgerResult, TransactionExt as _, VerificationJob, is_valid_wallet_address,
    journal,
};

use super::awaits_payout;

/// Terminal result of one verification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    Reversed { reversed: Decimal, shortfall: Decimal },
    Failed { reason: String },
    /// The transaction was already terminal or not ready.
    Skipped,
    PayoutSent { external_ref: String },
    PayoutFailed { reason: String },
}

pub struct VerificationWorker {
    ledger: Ledger,
    verifier: Arc<dyn BlockchainVerifier>,
    transfer: Arc<dyn BlockchainTransfer>,
    retry: RetryConfig,
}

impl VerificationWorker {
    pub fn new(
        ledger: Ledger,
        verifier: Arc<dyn BlockchainVerifier>,
        transfer: Arc<dyn BlockchainTransfer>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            ledger,
            verifier,
            transfer,
            retry,
        }
    }

    pub async fn process(&self, job: VerificationJob) -> LedgerResult<JobOutcome> {
        match job {
            VerificationJob::Deposit { transaction_id } => self.verify_deposit(transaction_id).await,
            VerificationJob::Payout { transaction_id } => self.send_payout(transaction_id).await,
        }
    }

    async fn verify_deposit(&self, transaction_id: i64) -> LedgerResult<JobOutcome> {
        let transaction = journal::find(self.ledger.db(), transaction_id).await?;
        if !transaction.is_pending() || !transaction.is_deposit() {
            debug!("Deposit {} is not pending, skipping", transaction_id);
            return Ok(JobOutcome::Skipped);
        }
        let Some(reference) = transaction.external_ref.clone() else {
            return self
                .ledger
                .fail_transaction(transaction_id, "Missing transaction reference".to_string())
                .await;
        };

        if let Some(holder) =
            journal::live_holder(self.ledger.db(), &reference, transaction_id).await?
        {
            return self
                .ledger
                .reverse_deposit(
                    transaction_id,
                    format!("Double spend: reference also used by transaction #{}", holder.id),
                )
                .await;
        }

        let expected = transaction.expected_chain_amount()?;
        let verified = with_retry(&self.retry, "verify deposit", || {
            self.verifier.verify(&reference, expected)
        })
        .await;

        match verified {
            Ok(true) => self.ledger.confirm_deposit(transaction_id).await,
            Ok(false) => {
                self.ledger
                    .reverse_deposit(transaction_id, "Verification failed".to_string())
                    .await
            }
            Err(err) => {
                warn!("Verifying deposit {} errored: {}", transaction_id, err);
                self.ledger
                    .reverse_deposit(transaction_id, format!("Verification error: {err}"))
                    .await
            }
        }
    }

    async fn send_payout(&self, transaction_id: i64) -> LedgerResult<JobOutcome> {
        let transaction = journal::find(self.ledger.db(), transaction_id).await?;
        if !transaction.is_withdrawal() || !awaits_payout(&transaction) {
            debug!("Withdrawal {} is not awaiting payout, skipping", transaction_id);
            return Ok(JobOutcome::Skipped);
        }

        let account = self.ledger.account(transaction.account_id).await?;
        let destination = match account.wallet_address {
            Some(address) if is_valid_wallet_address(&address) => address,
            Some(address) => {
                return self
                    .ledger
                    .fail_payout(&transaction, format!("Invalid wallet address {address}"))
                    .await;
            }
            None => {
                return self
                    .ledger
                    .fail_payout(&transaction, "Wallet address not set".to_string())
                    .await;
            }
        };
        let amount = transaction.expected_chain_amount()?;

        let balance = with_retry(&self.retry, "hot wallet balance", || {
            self.transfer.wallet_balance()
        })
        .await;
        match balance {
            Ok(balance) if balance >= amount => {}
            Ok(balance) => {
                return self
                    .ledger
                    .fail_payout(
                        &transaction,
                        format!("Insufficient hot wallet balance: {balance} < {amount}"),
                    )
                    .await;
            }
            Err(err) => {
                return self
                    .ledger
                    .fail_payout(&transaction, format!("Wallet balance unavailable: {err}"))
                    .await;
            }
        }

        if !self.ledger.claim_payout(transaction_id).await? {
            debug!("Payout for withdrawal {} already claimed, skipping", transaction_id);
            return Ok(JobOutcome::Skipped);
        }

        // Sent once; a retry could pay twice.
        let memo = format!("Withdrawal #{transaction_id}");
        match self.transfer.send(&destination, amount, &memo).await {
            Ok(external_ref) => self.ledger.record_payout(transaction_id, &external_ref).await,
            Err(err) => {
                self.ledger
                    .fail_payout(&transaction, format!("Transfer failed: {err}"))
                    .await
            }
        }
    }
}

impl std::fmt::Debug for VerificationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationWorker")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Start `workers` tasks draining `jobs`. Dropping the returned set aborts them.
pub fn spawn_workers(
    worker: Arc<VerificationWorker>,
    jobs: mpsc::Receiver<VerificationJob>,
    workers: usize,
) -> JoinSet<()> {
    let jobs = Arc::new(Mutex::new(jobs));
    let mut pool = JoinSet::new();

    for index in 0..workers.max(1) {
        let worker = Arc::clone(&worker);
        let jobs = Arc::clone(&jobs);
        pool.spawn(async move {
            loop {
                let next = jobs.lock().await.recv().await;
                let Some(job) = next else {
                    debug!("Verification worker {} stopping", index);
                    break;
                };
                match worker.process(job).await {
                    Ok(outcome) => info!("{:?} finished: {:?}", job, outcome),
                    Err(err) => error!("{:?} failed: {}", job, err),
                }
            }
        });
    }

    pool
}
