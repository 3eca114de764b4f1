use cashubux_entities::{
    accounts, claimed_quests, quest_progress, quests, sea_orm_active_enums::QuestType,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, QueryOrder as _, Set,
    TransactionTrait as _, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult,
    balance::{BalanceField, credit_units, load_account},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewQuest {
    pub id: String,
    pub title: String,
    pub reward: i64,
    pub total_progress: i32,
    pub quest_type: QuestType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestView {
    pub id: String,
    pub title: String,
    pub reward: i64,
    pub quest_type: QuestType,
    pub current_progress: i32,
    pub total_progress: i32,
    pub is_completed: bool,
    pub is_claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestClaim {
    pub quest_id: String,
    pub reward: i64,
    pub account: AccountSnapshot,
}

/// Progress towards quests of `quest_type`, derived from lifetime counters.
fn progress_of(quest_type: QuestType, account: &accounts::Model) -> i32 {
    match quest_type {
        QuestType::Game => account.total_game_tasks_completed,
        QuestType::Social => account.total_social_tasks_completed,
        QuestType::Partner => account.total_partner_tasks_completed,
        QuestType::Invite => account.referral_count,
    }
}

/// Recompute stored progress rows for the account's active quests, optionally
/// only those of one type. Returns the refreshed quests with their progress.
pub(crate) async fn refresh_quest_progress<C: ConnectionTrait>(
    conn: &C,
    account: &accounts::Model,
    only: Option<QuestType>,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<(quests::Model, i32)>> {
    let mut query = quests::Entity::find().filter(quests::Column::IsActive.eq(true));
    if let Some(quest_type) = only {
        query = query.filter(quests::Column::QuestType.eq(quest_type));
    }
    let active = query.order_by_asc(quests::Column::Id).all(conn).await?;

    let mut refreshed = Vec::with_capacity(active.len());
    for quest in active {
        let current = progress_of(quest.quest_type, account);
        let row = quest_progress::ActiveModel {
            account_id: Set(account.id),
            quest_id: Set(quest.id.clone()),
            current_progress: Set(current),
            is_completed: Set(current >= quest.total_progress),
            updated_at: Set(now),
        };
        quest_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    quest_progress::Column::AccountId,
                    quest_progress::Column::QuestId,
                ])
                .update_columns([
                    quest_progress::Column::CurrentProgress,
                    quest_progress::Column::IsCompleted,
                    quest_progress::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        refreshed.push((quest, current));
    }
    Ok(refreshed)
}

impl Ledger {
    pub async fn create_quest(&self, new: NewQuest) -> LedgerResult<quests::Model> {
        if new.id.trim().is_empty() || new.title.trim().is_empty() {
            return Err(LedgerError::Validation(
                "quest id and title are required".to_string(),
            ));
        }
        if new.reward < 0 || new.total_progress < 1 {
            return Err(LedgerError::Validation(
                "quest reward must be non-negative and target at least 1".to_string(),
            ));
        }

        let model = quests::ActiveModel {
            id: Set(new.id),
            title: Set(new.title),
            reward: Set(new.reward),
            total_progress: Set(new.total_progress),
            quest_type: Set(new.quest_type),
            is_active: Set(true),
        };
        Ok(quests::Entity::insert(model)
            .exec_with_returning(&self.db)
            .await?)
    }

    /// Active quests with derived progress, minus those already completed and claimed.
    pub async fn list_quests(&self, account_id: i64) -> LedgerResult<Vec<QuestView>> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let account = load_account(&txn, account_id).await?;
        let refreshed = refresh_quest_progress(&txn, &account, None, self.now()).await?;

        let claimed: Vec<String> = claimed_quests::Entity::find()
            .filter(claimed_quests::Column::AccountId.eq(account_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| c.quest_id)
            .collect();
        txn.commit().await?;

        Ok(refreshed
            .into_iter()
            .map(|(quest, current)| QuestView {
                is_completed: current >= quest.total_progress,
                is_claimed: claimed.contains(&quest.id),
                id: quest.id,
                title: quest.title,
                reward: quest.reward,
                quest_type: quest.quest_type,
                current_progress: current,
                total_progress: quest.total_progress,
            })
            .filter(|view| !(view.is_completed && view.is_claimed))
            .collect())
    }

    /// Pay a completed quest's reward exactly once.
    pub async fn claim_quest(&self, account_id: i64, quest_id: &str) -> LedgerResult<QuestClaim> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        let account = load_account(&txn, account_id).await?;
        let quest = quests::Entity::find_by_id(quest_id.to_owned())
            .one(&txn)
            .await?
            .filter(|q| q.is_active)
            .ok_or_else(|| LedgerError::QuestNotFound(quest_id.to_owned()))?;

        let current = progress_of(quest.quest_type, &account);
        if current < quest.total_progress {
            return Err(LedgerError::NotCompleted {
                current,
                target: quest.total_progress,
            });
        }

        let claim = claimed_quests::ActiveModel {
            account_id: Set(account_id),
            quest_id: Set(quest.id.clone()),
            reward_received: Set(quest.reward),
            claimed_at: Set(now),
        };
        let inserted = claimed_quests::Entity::insert(claim)
            .on_conflict(
                OnConflict::columns([
                    claimed_quests::Column::AccountId,
                    claimed_quests::Column::QuestId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        if inserted == 0 {
            return Err(LedgerError::AlreadyClaimed);
        }

        credit_units(&txn, account_id, BalanceField::Coins, quest.reward).await?;
        refresh_quest_progress(&txn, &account, Some(quest.quest_type), now).await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        info!(
            "Account {} claimed quest {} for {} coins",
            account_id, quest.id, quest.reward
        );
        Ok(QuestClaim {
            quest_id: quest.id,
            reward: quest.reward,
            account: account.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};

    fn invite_quest(target: i32) -> NewQuest {
        NewQuest {
            id: "invite-2".to_string(),
            title: "Invite two friends".to_string(),
            reward: 5_000,
            total_progress: target,
            quest_type: QuestType::Invite,
        }
    }

    #[tokio::test]
    async fn test_invite_quest_lifecycle() {
        let ledger = test_ledger().await;
        ledger.create_quest(invite_quest(2)).await.unwrap();
        register(&ledger, 1, None).await;
        register(&ledger, 2, Some(1)).await;

        let quests = ledger.list_quests(1).await.unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].current_progress, 1);
        assert!(!quests[0].is_completed);

        let err = ledger.claim_quest(1, "invite-2").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::NotCompleted {
                current: 1,
                target: 2
            }
        ));

        register(&ledger, 3, Some(1)).await;
        let claim = ledger.claim_quest(1, "invite-2").await.unwrap();
        assert_eq!(claim.reward, 5_000);
        assert_eq!(claim.account.coins, 5_000);

        let err = ledger.claim_quest(1, "invite-2").await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClaimed));
        assert_eq!(ledger.account(1).await.unwrap().coins, 5_000);

        // Completed and claimed quests drop out of the listing.
        assert!(ledger.list_quests(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_quest() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let err = ledger.claim_quest(1, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
