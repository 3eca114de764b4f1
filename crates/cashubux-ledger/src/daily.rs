use cashubux_entities::{accounts, daily_task_completions, daily_tasks};
use sea_orm::{
    ActiveModelTrait as _, ColumnTrait as _, ConnectionTrait, EntityTrait as _,
    QueryFilter as _, QueryOrder as _, Set, TransactionTrait as _, sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult, StartOutcome,
    balance::{BalanceField, Increments, load_account},
    referral::award_referral_earnings,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDailyTask {
    pub title: String,
    pub task_type: String,
    pub reward: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyClaimReceipt {
    pub task_id: i64,
    pub reward: i64,
    /// False once the account hit today's task spin ceiling.
    pub spin_granted: bool,
    pub referral_bonus: Option<i64>,
    pub account: AccountSnapshot,
}

async fn active_task<C: ConnectionTrait>(conn: &C, task_id: i64) -> LedgerResult<daily_tasks::Model> {
    daily_tasks::Entity::find_by_id(task_id)
        .filter(daily_tasks::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or(LedgerError::DailyTaskNotFound(task_id))
}

impl Ledger {
    pub async fn create_daily_task(&self, new: NewDailyTask) -> LedgerResult<daily_tasks::Model> {
        if new.title.trim().is_empty() {
            return Err(LedgerError::Validation("title is required".to_string()));
        }
        if new.reward < 0 {
            return Err(LedgerError::Validation("reward must be non-negative".to_string()));
        }

        let task = daily_tasks::ActiveModel {
            title: Set(new.title.trim().to_owned()),
            task_type: Set(new.task_type),
            reward: Set(new.reward),
            completions: Set(0),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Created daily task {} ({})", task.id, task.title);
        Ok(task)
    }

    pub async fn daily_tasks(&self) -> LedgerResult<Vec<daily_tasks::Model>> {
        Ok(daily_tasks::Entity::find()
            .filter(daily_tasks::Column::IsActive.eq(true))
            .order_by_asc(daily_tasks::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Start today's run of a daily task. A claimed run blocks until tomorrow.
    pub async fn start_daily_task(&self, account_id: i64, task_id: i64) -> LedgerResult<StartOutcome> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;
        let day = self.today();

        load_account(&txn, account_id).await?;
        active_task(&txn, task_id).await?;

        let existing =
            daily_task_completions::Entity::find_by_id((account_id, task_id, day.clone()))
                .one(&txn)
                .await?;
        let outcome = match existing {
            Some(row) if row.claimed => return Err(LedgerError::AlreadyCompleted),
            Some(_) => StartOutcome::AlreadyStarted,
            None => {
                daily_task_completions::ActiveModel {
                    account_id: Set(account_id),
                    task_id: Set(task_id),
                    day: Set(day),
                    started_at: Set(self.now()),
                    completed_at: Set(None),
                    claimed: Set(false),
                }
                .insert(&txn)
                .await?;
                StartOutcome::Started
            }
        };
        txn.commit().await?;

        Ok(outcome)
    }

    pub async fn claim_daily_task(
        &self,
        account_id: i64,
        task_id: i64,
    ) -> LedgerResult<DailyClaimReceipt> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();
        let day = self.today();

        let task = active_task(&txn, task_id).await?;
        match daily_task_completions::Entity::find_by_id((account_id, task_id, day.clone()))
            .one(&txn)
            .await?
        {
            None => return Err(LedgerError::NotStarted),
            Some(row) if row.claimed => return Err(LedgerError::AlreadyClaimed),
            Some(_) => {}
        }

        let marked = daily_task_completions::Entity::update_many()
            .col_expr(daily_task_completions::Column::Claimed, Expr::value(true))
            .col_expr(daily_task_completions::Column::CompletedAt, Expr::value(now))
            .filter(daily_task_completions::Column::AccountId.eq(account_id))
            .filter(daily_task_completions::Column::TaskId.eq(task_id))
            .filter(daily_task_completions::Column::Day.eq(day))
            .filter(daily_task_completions::Column::Claimed.eq(false))
            .exec(&txn)
            .await?;
        if marked.rows_affected == 0 {
            return Err(LedgerError::AlreadyClaimed);
        }

        daily_tasks::Entity::update_many()
            .col_expr(
                daily_tasks::Column::Completions,
                Expr::col(daily_tasks::Column::Completions).add(1),
            )
            .filter(daily_tasks::Column::Id.eq(task_id))
            .exec(&txn)
            .await?;

        Increments::new(account_id)
            .field(BalanceField::Coins, task.reward)
            .apply(&txn)
            .await?;

        let spin = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::SpinTokens,
                Expr::col(accounts::Column::SpinTokens).add(1),
            )
            .col_expr(
                accounts::Column::TasksCompletedTodayForSpin,
                Expr::col(accounts::Column::TasksCompletedTodayForSpin).add(1),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::TasksCompletedTodayForSpin.lt(self.config.daily_task_spin_cap))
            .exec(&txn)
            .await?;
        let spin_granted = spin.rows_affected == 1;

        let account = load_account(&txn, account_id).await?;
        let award = award_referral_earnings(&txn, &self.config, &account, task.reward).await?;
        txn.commit().await?;

        debug!(
            "Account {} claimed daily task {}: +{} coins, spin granted: {}",
            account_id, task_id, task.reward, spin_granted
        );
        Ok(DailyClaimReceipt {
            task_id,
            reward: task.reward,
            spin_granted,
            referral_bonus: award.map(|a| a.bonus),
            account: account.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};

    async fn seed_task(ledger: &Ledger, reward: i64) -> i64 {
        ledger
            .create_daily_task(NewDailyTask {
                title: "Check in".to_string(),
                task_type: "checkin".to_string(),
                reward,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_daily_lifecycle() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let task_id = seed_task(&ledger, 500).await;

        assert!(matches!(
            ledger.claim_daily_task(1, task_id).await,
            Err(LedgerError::NotStarted)
        ));
        assert_eq!(
            ledger.start_daily_task(1, task_id).await.unwrap(),
            StartOutcome::Started
        );
        assert_eq!(
            ledger.start_daily_task(1, task_id).await.unwrap(),
            StartOutcome::AlreadyStarted
        );

        let receipt = ledger.claim_daily_task(1, task_id).await.unwrap();
        assert_eq!(receipt.reward, 500);
        assert!(receipt.spin_granted);
        assert_eq!(receipt.account.coins, 500);
        assert_eq!(receipt.account.spin_tokens, 11);
        assert_eq!(receipt.account.tasks_completed_today_for_spin, 1);

        assert!(matches!(
            ledger.claim_daily_task(1, task_id).await,
            Err(LedgerError::AlreadyClaimed)
        ));
        assert!(matches!(
            ledger.start_daily_task(1, task_id).await,
            Err(LedgerError::AlreadyCompleted)
        ));
    }

    #[tokio::test]
    async fn test_spin_cap_stops_spins_not_coins() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let task_id = seed_task(&ledger, 10).await;

        accounts::Entity::update_many()
            .col_expr(
                accounts::Column::TasksCompletedTodayForSpin,
                Expr::value(ledger.config().daily_task_spin_cap),
            )
            .filter(accounts::Column::Id.eq(1))
            .exec(ledger.db())
            .await
            .unwrap();

        ledger.start_daily_task(1, task_id).await.unwrap();
        let receipt = ledger.claim_daily_task(1, task_id).await.unwrap();
        assert!(!receipt.spin_granted);
        assert_eq!(receipt.account.coins, 10);
        assert_eq!(receipt.account.spin_tokens, 10);
    }

    #[tokio::test]
    async fn test_daily_claim_pays_referrer() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, Some(1)).await;
        let task_id = seed_task(&ledger, 1_000).await;

        ledger.start_daily_task(2, task_id).await.unwrap();
        let receipt = ledger.claim_daily_task(2, task_id).await.unwrap();
        assert_eq!(receipt.referral_bonus, Some(100));

        let referrer = ledger.account(1).await.unwrap();
        assert_eq!(referrer.referral_earnings, 100);
    }
}
