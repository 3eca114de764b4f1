use std::sync::Arc;

use cashubux_chain::RetryConfig;
use cashubux_entities::sea_orm_active_enums::Currency;
use cashubux_ledger::{
    AccountSnapshot, Campaign, JobOutcome, Ledger, LedgerConfig, LedgerResult, NewAccount,
    NewCampaign, NewCampaignKind, VerificationJob, VerificationWorker, new_ephemeral_ledger_db,
    verification_queue,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{FixedClock, ScriptedMembership, ScriptedTransfer, ScriptedVerifier, TEST_HOT_WALLET_BALANCE};

pub struct TestFixture {
    pub ledger: Ledger,
    pub membership: Arc<ScriptedMembership>,
    pub verifier: Arc<ScriptedVerifier>,
    pub transfer: Arc<ScriptedTransfer>,
    pub clock: Arc<FixedClock>,

    worker: VerificationWorker,
    jobs: mpsc::Receiver<VerificationJob>,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(LedgerConfig::default()).await
    }

    pub async fn with_config(config: LedgerConfig) -> Self {
        let db = new_ephemeral_ledger_db()
            .await
            .expect("Failed to create ephemeral ledger database");
        let (queue, jobs) = verification_queue(config.verification.queue_capacity);

        let membership = Arc::new(ScriptedMembership::default());
        let verifier = Arc::new(ScriptedVerifier::default());
        let transfer = Arc::new(ScriptedTransfer::new(Decimal::from(TEST_HOT_WALLET_BALANCE)));
        let clock = Arc::new(FixedClock::default());

        let ledger = Ledger::new(db, config, membership.clone(), queue).with_clock(clock.clone());
        let worker = VerificationWorker::new(
            ledger.clone(),
            verifier.clone(),
            transfer.clone(),
            RetryConfig::immediate(3),
        );

        Self {
            ledger,
            membership,
            verifier,
            transfer,
            clock,
            worker,
            jobs,
        }
    }

    pub async fn register(&self, id: i64, referred_by: Option<i64>) -> AccountSnapshot {
        self.ledger
            .register_account(NewAccount {
                id,
                name: format!("user{id}"),
                referred_by,
            })
            .await
            .expect("Failed to register account")
            .account
    }

    pub async fn account(&self, id: i64) -> AccountSnapshot {
        self.ledger.account(id).await.expect("Account should exist")
    }

    pub async fn fund(&self, id: i64, currency: Currency, amount: Decimal) -> AccountSnapshot {
        self.ledger
            .credit(id, currency, amount, "test funding")
            .await
            .expect("Failed to fund account")
    }

    /// Fund `creator` with exactly `cost` ad-credit and spend it on a campaign.
    pub async fn create_campaign(
        &self,
        creator: i64,
        kind: NewCampaignKind,
        link: &str,
        goal: i32,
        cost: Decimal,
    ) -> Campaign {
        self.fund(creator, Currency::AdCredit, cost).await;
        self.ledger
            .create_campaign(
                creator,
                NewCampaign {
                    link: link.to_string(),
                    goal,
                    cost,
                    kind,
                },
            )
            .await
            .expect("Failed to create campaign")
    }

    /// Start and claim in one go.
    pub async fn complete_task(&self, account: i64, campaign: &Campaign) -> AccountSnapshot {
        self.ledger
            .start_task(account, campaign.id)
            .await
            .expect("Failed to start task");
        self.ledger
            .claim_task(account, campaign.id)
            .await
            .expect("Failed to claim task")
            .account
    }

    pub fn pending_job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Drop everything queued so far, as a crash would.
    pub fn discard_jobs(&mut self) -> Vec<VerificationJob> {
        let mut dropped = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            dropped.push(job);
        }
        dropped
    }

    /// Run every queued job to completion on the current task, in order.
    pub async fn drain_jobs(&mut self) -> LedgerResult<Vec<(VerificationJob, JobOutcome)>> {
        let mut outcomes = Vec::new();
        loop {
            let job = match self.jobs.try_recv() {
                Ok(job) => job,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let outcome = self.worker.process(job).await?;
            outcomes.push((job, outcome));
        }
        Ok(outcomes)
    }

    /// Drain and return the single outcome, panicking on anything else.
    pub async fn drain_one(&mut self) -> JobOutcome {
        let mut outcomes = self.drain_jobs().await.expect("Verification job failed");
        assert_eq!(outcomes.len(), 1, "expected exactly one job, got {outcomes:?}");
        outcomes.remove(0).1
    }
}
