use cashubux_entities::{
    accounts, campaign_completions, campaigns, game_progress, level_completions,
    sea_orm_active_enums::{CampaignCategory, Currency, QuestType, TransactionKind},
};
use chrono::{DateTime, Utc};
use rand::{Rng as _, distributions::Alphanumeric};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use sea_orm::{
    ActiveModelTrait as _, ColumnTrait as _, ConnectionTrait, EntityTrait as _,
    QueryFilter as _, QueryOrder as _, Set, TransactionTrait as _,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AccountSnapshot, Ledger, LedgerConfig, LedgerError, LedgerResult,
    amounts::{ad_credit_to_units, require_positive},
    balance::{BalanceField, Increments, debit_units, load_account},
    journal::{self, JournalEntry},
    quests::refresh_quest_progress,
    referral::award_referral_earnings,
};

const WEBHOOK_TOKEN_LEN: usize = 32;

/// Category-specific campaign data. Partner campaigns carry the level gate and
/// the token their game uses to report progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignKind {
    Game,
    Social {
        requires_subscription_check: bool,
    },
    Partner {
        required_level: i32,
        webhook_token: String,
    },
    Daily,
}

impl CampaignKind {
    pub fn category(&self) -> CampaignCategory {
        match self {
            CampaignKind::Game => CampaignCategory::Game,
            CampaignKind::Social { .. } => CampaignCategory::Social,
            CampaignKind::Partner { .. } => CampaignCategory::Partner,
            CampaignKind::Daily => CampaignCategory::Daily,
        }
    }

    fn quest_type(&self) -> Option<QuestType> {
        match self {
            CampaignKind::Game => Some(QuestType::Game),
            CampaignKind::Social { .. } => Some(QuestType::Social),
            CampaignKind::Partner { .. } => Some(QuestType::Partner),
            CampaignKind::Daily => None,
        }
    }

    fn lifetime_counter(&self) -> Option<accounts::Column> {
        match self {
            CampaignKind::Game => Some(accounts::Column::TotalGameTasksCompleted),
            CampaignKind::Social { .. } => Some(accounts::Column::TotalSocialTasksCompleted),
            CampaignKind::Partner { .. } => Some(accounts::Column::TotalPartnerTasksCompleted),
            CampaignKind::Daily => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    pub id: i64,
    pub creator_id: i64,
    pub link: String,
    pub goal: i32,
    pub cost: Decimal,
    pub completions: i32,
    #[serde(flatten)]
    pub kind: CampaignKind,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_full(&self) -> bool {
        self.completions >= self.goal
    }
}

impl TryFrom<campaigns::Model> for Campaign {
    type Error = LedgerError;

    fn try_from(m: campaigns::Model) -> LedgerResult<Self> {
        let kind = match m.category {
            CampaignCategory::Game => CampaignKind::Game,
            CampaignCategory::Social => CampaignKind::Social {
                requires_subscription_check: m.requires_subscription_check,
            },
            CampaignCategory::Partner => match (m.required_level, m.webhook_token) {
                (Some(required_level), Some(webhook_token)) => CampaignKind::Partner {
                    required_level,
                    webhook_token,
                },
                _ => {
                    return Err(LedgerError::Validation(format!(
                        "partner campaign {} is missing its level gate",
                        m.id
                    )));
                }
            },
            CampaignCategory::Daily => CampaignKind::Daily,
        };

        Ok(Self {
            id: m.id,
            creator_id: m.creator_id,
            cost: m.cost.parse::<Decimal>()?,
            link: m.link,
            goal: m.goal,
            completions: m.completions,
            kind,
            created_at: m.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewCampaignKind {
    Game,
    Social { requires_subscription_check: bool },
    Partner { required_level: i32 },
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaign {
    pub link: String,
    pub goal: i32,
    /// Total budget in ad-credit.
    pub cost: Decimal,
    pub kind: NewCampaignKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartOutcome {
    Started,
    /// Already started and not yet claimed. Not an error.
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub campaign_id: i64,
    pub reward: i64,
    pub referral_bonus: Option<i64>,
    pub account: AccountSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub current_level: i32,
    pub max_level_reached: i32,
    pub level_completed: bool,
}

/// Channel or bot handle from a `t.me` link or `@handle`.
pub fn channel_from_link(link: &str) -> String {
    let link = link.trim();
    let handle = if let Some(rest) = link.strip_prefix("https://t.me/") {
        rest.split('?').next().unwrap_or(rest)
    } else if let Some(rest) = link.strip_prefix('@') {
        rest
    } else {
        link
    };
    handle.trim_end_matches('/').to_owned()
}

/// `floor(cost / max(goal, 1) * payout_share * conversion_rate)`.
pub fn task_reward(cost: Decimal, goal: i32, config: &LedgerConfig) -> LedgerResult<i64> {
    (cost / Decimal::from(goal.max(1)))
        .checked_mul(config.task_payout_share)
        .and_then(|share| share.checked_mul(Decimal::from(config.conversion_rate)))
        .and_then(|reward| reward.floor().to_i64())
        .ok_or_else(|| LedgerError::Validation(format!("reward for cost {cost} overflows")))
}

fn webhook_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(WEBHOOK_TOKEN_LEN)
        .map(char::from)
        .collect()
}

async fn find_campaign<C: ConnectionTrait>(conn: &C, campaign_id: i64) -> LedgerResult<Campaign> {
    campaigns::Entity::find_by_id(campaign_id)
        .one(conn)
        .await?
        .ok_or(LedgerError::CampaignNotFound(campaign_id))?
        .try_into()
}

impl Ledger {
    pub async fn campaign(&self, campaign_id: i64) -> LedgerResult<Campaign> {
        find_campaign(&self.db, campaign_id).await
    }

    /// Pay for and publish a campaign out of the creator's ad-credit.
    pub async fn create_campaign(&self, creator_id: i64, new: NewCampaign) -> LedgerResult<Campaign> {
        if new.link.trim().is_empty() {
            return Err(LedgerError::Validation("link is required".to_string()));
        }
        if new.goal < 1 {
            return Err(LedgerError::Validation("goal must be at least 1".to_string()));
        }
        let cost = require_positive(new.cost)?;
        let cost_units = ad_credit_to_units(cost)?;

        let (category, requires_subscription_check, required_level, token) = match new.kind {
            NewCampaignKind::Game => (CampaignCategory::Game, false, None, None),
            NewCampaignKind::Social {
                requires_subscription_check,
            } => (CampaignCategory::Social, requires_subscription_check, None, None),
            NewCampaignKind::Partner { required_level } if required_level >= 1 => (
                CampaignCategory::Partner,
                false,
                Some(required_level),
                Some(webhook_token()),
            ),
            NewCampaignKind::Partner { .. } => {
                return Err(LedgerError::Validation(
                    "required level must be at least 1".to_string(),
                ));
            }
            NewCampaignKind::Daily => (CampaignCategory::Daily, false, None, None),
        };

        let _guard = self.locks.lock(creator_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        debit_units(&txn, creator_id, BalanceField::AdCredit, cost_units).await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                creator_id,
                -cost,
                Currency::AdCredit,
                TransactionKind::Withdrawal,
                format!("Campaign creation: {}", new.link.trim()),
            ),
            now,
        )
        .await?;

        let model = campaigns::ActiveModel {
            creator_id: Set(creator_id),
            link: Set(new.link.trim().to_owned()),
            goal: Set(new.goal),
            cost: Set(cost.normalize().to_string()),
            completions: Set(0),
            category: Set(category),
            requires_subscription_check: Set(requires_subscription_check),
            required_level: Set(required_level),
            webhook_token: Set(token),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            "Account {} created {:?} campaign {} (goal {}, cost {})",
            creator_id, category, model.id, model.goal, model.cost
        );
        model.try_into()
    }

    /// Pay the campaign cost again and reset its completions.
    pub async fn reactivate_campaign(
        &self,
        account_id: i64,
        campaign_id: i64,
    ) -> LedgerResult<Campaign> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let campaign = find_campaign(&txn, campaign_id).await?;
        if campaign.creator_id != account_id {
            return Err(LedgerError::Validation(format!(
                "campaign {campaign_id} belongs to another account"
            )));
        }

        debit_units(
            &txn,
            account_id,
            BalanceField::AdCredit,
            ad_credit_to_units(campaign.cost)?,
        )
        .await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                account_id,
                -campaign.cost,
                Currency::AdCredit,
                TransactionKind::Withdrawal,
                format!("Campaign reactivation: {}", campaign.link),
            ),
            self.now(),
        )
        .await?;

        campaigns::Entity::update_many()
            .col_expr(campaigns::Column::Completions, Expr::value(0))
            .filter(campaigns::Column::Id.eq(campaign_id))
            .exec(&txn)
            .await?;

        let campaign = find_campaign(&txn, campaign_id).await?;
        txn.commit().await?;

        info!("Account {} reactivated campaign {}", account_id, campaign_id);
        Ok(campaign)
    }

    /// Campaigns the account can still take: not full, not its own, not already completed.
    pub async fn discover_campaigns(&self, account_id: i64) -> LedgerResult<Vec<Campaign>> {
        load_account(&self.db, account_id).await?;

        let completed: Vec<i64> = campaign_completions::Entity::find()
            .filter(campaign_completions::Column::AccountId.eq(account_id))
            .filter(campaign_completions::Column::CompletedAt.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.campaign_id)
            .collect();

        campaigns::Entity::find()
            .filter(
                Expr::col(campaigns::Column::Completions).lt(Expr::col(campaigns::Column::Goal)),
            )
            .filter(campaigns::Column::CreatorId.ne(account_id))
            .filter(campaigns::Column::Id.is_not_in(completed))
            .order_by_desc(campaigns::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Campaign::try_from)
            .collect()
    }

    /// Level report from a partner game, authenticated by the campaign's webhook token.
    pub async fn record_level_progress(
        &self,
        webhook_token: &str,
        account_id: i64,
        current_level: i32,
    ) -> LedgerResult<LevelProgress> {
        if current_level < 0 {
            return Err(LedgerError::Validation(
                "current level must be non-negative".to_string(),
            ));
        }

        let model = campaigns::Entity::find()
            .filter(campaigns::Column::WebhookToken.eq(webhook_token))
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::Validation("invalid webhook token".to_string()))?;
        let campaign = Campaign::try_from(model)?;
        let CampaignKind::Partner { required_level, .. } = campaign.kind else {
            return Err(LedgerError::Validation("invalid webhook token".to_string()));
        };

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();
        load_account(&txn, account_id).await?;

        let game_id = campaign.link.clone();
        let existing = game_progress::Entity::find_by_id((account_id, game_id.clone()))
            .one(&txn)
            .await?;
        let max_level_reached = match existing {
            Some(progress) => {
                let max_level_reached = progress.max_level_reached.max(current_level);
                let mut progress: game_progress::ActiveModel = progress.into();
                progress.current_level = Set(current_level);
                progress.max_level_reached = Set(max_level_reached);
                progress.updated_at = Set(now);
                progress.update(&txn).await?;
                max_level_reached
            }
            None => {
                game_progress::ActiveModel {
                    account_id: Set(account_id),
                    game_id: Set(game_id),
                    current_level: Set(current_level),
                    max_level_reached: Set(current_level),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                current_level
            }
        };

        let level_completed = current_level >= required_level;
        if level_completed {
            level_completions::Entity::insert(level_completions::ActiveModel {
                account_id: Set(account_id),
                campaign_id: Set(campaign.id),
                required_level: Set(required_level),
                completed_at: Set(now),
            })
            .on_conflict(
                OnConflict::columns([
                    level_completions::Column::AccountId,
                    level_completions::Column::CampaignId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }
        txn.commit().await?;

        debug!(
            "Account {} reached level {} in campaign {}",
            account_id, current_level, campaign.id
        );
        Ok(LevelProgress {
            current_level,
            max_level_reached,
            level_completed,
        })
    }

    /// NOT_STARTED -> STARTED. No prerequisites are checked here; claim does that.
    pub async fn start_task(&self, account_id: i64, campaign_id: i64) -> LedgerResult<StartOutcome> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        load_account(&txn, account_id).await?;
        find_campaign(&txn, campaign_id).await?;

        let existing = campaign_completions::Entity::find_by_id((account_id, campaign_id))
            .one(&txn)
            .await?;
        let outcome = match existing {
            Some(row) if row.completed_at.is_some() => return Err(LedgerError::AlreadyCompleted),
            Some(_) => StartOutcome::AlreadyStarted,
            None => {
                campaign_completions::Entity::insert(campaign_completions::ActiveModel {
                    account_id: Set(account_id),
                    campaign_id: Set(campaign_id),
                    started_at: Set(self.now()),
                    completed_at: Set(None),
                })
                .on_conflict(
                    OnConflict::columns([
                        campaign_completions::Column::AccountId,
                        campaign_completions::Column::CampaignId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
                StartOutcome::Started
            }
        };
        txn.commit().await?;

        debug!(
            "Account {} start campaign {}: {:?}",
            account_id, campaign_id, outcome
        );
        Ok(outcome)
    }

    async fn check_claim_gate(&self, account_id: i64, campaign: &Campaign) -> LedgerResult<()> {
        match &campaign.kind {
            CampaignKind::Social {
                requires_subscription_check: true,
            } => {
                let channel = channel_from_link(&campaign.link);
                if !self.membership.is_member(&channel, account_id).await? {
                    return Err(LedgerError::ValidationFailed(format!(
                        "join @{channel} to claim this task"
                    )));
                }
            }
            CampaignKind::Game => {
                let bot = channel_from_link(&campaign.link);
                if !self.membership.has_started_bot(&bot, account_id).await? {
                    return Err(LedgerError::ValidationFailed(format!(
                        "start @{bot} to claim this task"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// STARTED -> COMPLETED, paying the reward, one spin, the referral
    /// commission and quest progress in one transaction.
    pub async fn claim_task(&self, account_id: i64, campaign_id: i64) -> LedgerResult<ClaimReceipt> {
        let _guard = self.locks.lock(account_id).await;

        let campaign = find_campaign(&self.db, campaign_id).await?;
        match campaign_completions::Entity::find_by_id((account_id, campaign_id))
            .one(&self.db)
            .await?
        {
            None => return Err(LedgerError::NotStarted),
            Some(row) if row.completed_at.is_some() => return Err(LedgerError::AlreadyClaimed),
            Some(_) => {}
        }

        self.check_claim_gate(account_id, &campaign).await?;

        let txn = self.db.begin().await?;
        let now = self.now();

        if let CampaignKind::Partner { required_level, .. } = campaign.kind {
            let proof = level_completions::Entity::find_by_id((account_id, campaign_id))
                .one(&txn)
                .await?;
            if proof.is_none() {
                return Err(LedgerError::LevelNotReached {
                    required: required_level,
                });
            }
        }

        let marked = campaign_completions::Entity::update_many()
            .col_expr(campaign_completions::Column::CompletedAt, Expr::value(now))
            .filter(campaign_completions::Column::AccountId.eq(account_id))
            .filter(campaign_completions::Column::CampaignId.eq(campaign_id))
            .filter(campaign_completions::Column::CompletedAt.is_null())
            .exec(&txn)
            .await?;
        if marked.rows_affected == 0 {
            return Err(LedgerError::AlreadyClaimed);
        }

        campaigns::Entity::update_many()
            .col_expr(
                campaigns::Column::Completions,
                Expr::col(campaigns::Column::Completions).add(1),
            )
            .filter(campaigns::Column::Id.eq(campaign_id))
            .exec(&txn)
            .await?;

        let reward = task_reward(campaign.cost, campaign.goal, &self.config)?;
        let mut increments = Increments::new(account_id)
            .field(BalanceField::Coins, reward)
            .field(BalanceField::SpinTokens, 1)
            .add(accounts::Column::TasksCompletedTodayForSpin, 1);
        if let Some(counter) = campaign.kind.lifetime_counter() {
            increments = increments.add(counter, 1);
        }
        increments.apply(&txn).await?;

        let account = load_account(&txn, account_id).await?;
        let award = award_referral_earnings(&txn, &self.config, &account, reward).await?;
        if let Some(quest_type) = campaign.kind.quest_type() {
            refresh_quest_progress(&txn, &account, Some(quest_type), now).await?;
        }
        txn.commit().await?;

        info!(
            "Account {} claimed campaign {}: +{} coins",
            account_id, campaign_id, reward
        );
        Ok(ClaimReceipt {
            campaign_id,
            reward,
            referral_bonus: award.map(|a| a.bonus),
            account: account.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fund_ad_credit, register, test_ledger};
    use rust_decimal::dec;

    #[test]
    fn test_channel_from_link() {
        assert_eq!(channel_from_link("https://t.me/cashubux?start=1"), "cashubux");
        assert_eq!(channel_from_link("@cashubux"), "cashubux");
        assert_eq!(channel_from_link("cashubux_bot"), "cashubux_bot");
        assert_eq!(channel_from_link("https://t.me/somebot/"), "somebot");
    }

    #[test]
    fn test_task_reward() {
        let config = LedgerConfig::default();
        assert_eq!(task_reward(dec!(100), 10, &config).unwrap(), 4_000_000);
        assert_eq!(task_reward(dec!(1), 3, &config).unwrap(), 133_333);
        assert_eq!(task_reward(dec!(1), 0, &config).unwrap(), 400_000);
        assert!(matches!(
            task_reward(Decimal::MAX, 1, &config),
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_campaign_debits_ad_credit() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        fund_ad_credit(&ledger, 1, dec!(3)).await;

        let campaign = ledger
            .create_campaign(
                1,
                NewCampaign {
                    link: "https://t.me/partner_game".to_string(),
                    goal: 10,
                    cost: dec!(2.5),
                    kind: NewCampaignKind::Partner { required_level: 5 },
                },
            )
            .await
            .unwrap();

        match &campaign.kind {
            CampaignKind::Partner {
                required_level,
                webhook_token,
            } => {
                assert_eq!(*required_level, 5);
                assert_eq!(webhook_token.len(), WEBHOOK_TOKEN_LEN);
                assert!(webhook_token.chars().all(|c| c.is_ascii_alphanumeric()));
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(ledger.account(1).await.unwrap().ad_credit, dec!(0.5));

        let err = ledger
            .create_campaign(
                1,
                NewCampaign {
                    link: "https://t.me/another".to_string(),
                    goal: 1,
                    cost: dec!(1),
                    kind: NewCampaignKind::Game,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_insufficient_balance());
    }

    #[tokio::test]
    async fn test_reactivate_resets_completions() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, None).await;
        fund_ad_credit(&ledger, 1, dec!(2)).await;

        let campaign = ledger
            .create_campaign(
                1,
                NewCampaign {
                    link: "https://t.me/channel".to_string(),
                    goal: 1,
                    cost: dec!(1),
                    kind: NewCampaignKind::Social {
                        requires_subscription_check: false,
                    },
                },
            )
            .await
            .unwrap();

        ledger.start_task(2, campaign.id).await.unwrap();
        ledger.claim_task(2, campaign.id).await.unwrap();
        assert!(ledger.campaign(campaign.id).await.unwrap().is_full());

        let err = ledger.reactivate_campaign(2, campaign.id).await.unwrap_err();
        assert!(err.is_validation());

        let campaign = ledger.reactivate_campaign(1, campaign.id).await.unwrap();
        assert_eq!(campaign.completions, 0);
        assert_eq!(ledger.account(1).await.unwrap().ad_credit, dec!(0));
    }

    #[tokio::test]
    async fn test_discover_excludes_own_full_and_completed() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, None).await;
        fund_ad_credit(&ledger, 1, dec!(10)).await;

        let mut ids = Vec::new();
        for goal in [1, 5] {
            let campaign = ledger
                .create_campaign(
                    1,
                    NewCampaign {
                        link: format!("https://t.me/c{goal}"),
                        goal,
                        cost: dec!(1),
                        kind: NewCampaignKind::Social {
                            requires_subscription_check: false,
                        },
                    },
                )
                .await
                .unwrap();
            ids.push(campaign.id);
        }

        assert!(ledger.discover_campaigns(1).await.unwrap().is_empty());
        assert_eq!(ledger.discover_campaigns(2).await.unwrap().len(), 2);

        ledger.start_task(2, ids[1]).await.unwrap();
        ledger.claim_task(2, ids[1]).await.unwrap();

        register(&ledger, 3, None).await;
        ledger.start_task(3, ids[0]).await.unwrap();
        ledger.claim_task(3, ids[0]).await.unwrap();

        // ids[0] is full, ids[1] already completed by 2.
        assert!(ledger.discover_campaigns(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_level_webhook() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, None).await;
        fund_ad_credit(&ledger, 1, dec!(1)).await;

        let campaign = ledger
            .create_campaign(
                1,
                NewCampaign {
                    link: "https://t.me/game".to_string(),
                    goal: 1,
                    cost: dec!(1),
                    kind: NewCampaignKind::Partner { required_level: 3 },
                },
            )
            .await
            .unwrap();
        let CampaignKind::Partner { webhook_token, .. } = campaign.kind else {
            panic!("partner campaign expected");
        };

        assert!(ledger.record_level_progress("bogus", 2, 1).await.is_err());

        let progress = ledger.record_level_progress(&webhook_token, 2, 2).await.unwrap();
        assert!(!progress.level_completed);

        let progress = ledger.record_level_progress(&webhook_token, 2, 4).await.unwrap();
        assert!(progress.level_completed);
        assert_eq!(progress.max_level_reached, 4);

        let progress = ledger.record_level_progress(&webhook_token, 2, 1).await.unwrap();
        assert_eq!(progress.current_level, 1);
        assert_eq!(progress.max_level_reached, 4);
    }
}
