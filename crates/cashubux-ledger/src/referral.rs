use cashubux_entities::{accounts, referrals};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use sea_orm::{
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, QueryOrder as _, Set,
    TransactionTrait as _,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AccountSnapshot, Ledger, LedgerConfig, LedgerError, LedgerResult,
    amounts::out_of_range,
    balance::{Increments, load_account},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReferralAward {
    pub referrer_id: i64,
    pub bonus: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferralClaim {
    pub claimed: i64,
    pub account: AccountSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferralFriend {
    pub id: i64,
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub earnings_generated: i64,
}

/// Commission owed on `reward`, rounded down.
pub(crate) fn commission(config: &LedgerConfig, reward: i64) -> LedgerResult<i64> {
    let bonus = Decimal::from(reward)
        .checked_mul(config.referral_commission)
        .and_then(|bonus| bonus.floor().to_i64())
        .ok_or_else(|| out_of_range(reward))?;
    Ok(bonus.max(0))
}

/// Create the (referrer, referred) edge once and credit the referrer for the invite.
/// Returns false when the edge already existed.
pub(crate) async fn link_referral<C: ConnectionTrait>(
    conn: &C,
    referrer_id: i64,
    referred_id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<bool> {
    let existing = referrals::Entity::find()
        .filter(referrals::Column::ReferredId.eq(referred_id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let edge = referrals::ActiveModel {
        referrer_id: Set(referrer_id),
        referred_id: Set(referred_id),
        earnings_generated: Set(0),
        created_at: Set(now),
        ..Default::default()
    };
    let inserted = referrals::Entity::insert(edge)
        .on_conflict(
            OnConflict::column(referrals::Column::ReferredId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    if inserted == 0 {
        return Ok(false);
    }

    Increments::new(referrer_id)
        .add(accounts::Column::ReferralCount, 1)
        .add(accounts::Column::SpinTokens, 1)
        .add(accounts::Column::FriendsInvitedTodayForSpin, 1)
        .apply(conn)
        .await?;

    debug!("Linked referral {} -> {}", referrer_id, referred_id);
    Ok(true)
}

/// Pay the one-level commission for a reward earned by `account`.
///
/// Runs inside the caller's transaction. No-op when the account has no
/// referrer or the referrer is gone.
pub(crate) async fn award_referral_earnings<C: ConnectionTrait>(
    conn: &C,
    config: &LedgerConfig,
    account: &accounts::Model,
    reward: i64,
) -> LedgerResult<Option<ReferralAward>> {
    let Some(referrer_id) = account.referred_by else {
        return Ok(None);
    };
    if accounts::Entity::find_by_id(referrer_id).one(conn).await?.is_none() {
        return Ok(None);
    }

    let bonus = commission(config, reward)?;

    Increments::new(referrer_id)
        .add(accounts::Column::ReferralEarnings, bonus)
        .add(accounts::Column::TotalReferralEarnings, bonus)
        .add(accounts::Column::SpinTokens, 1)
        .apply(conn)
        .await?;

    if bonus > 0 {
        referrals::Entity::update_many()
            .col_expr(
                referrals::Column::EarningsGenerated,
                Expr::col(referrals::Column::EarningsGenerated).add(bonus),
            )
            .filter(referrals::Column::ReferrerId.eq(referrer_id))
            .filter(referrals::Column::ReferredId.eq(account.id))
            .exec(conn)
            .await?;
    }

    debug!(
        "Referral bonus: {} earned {} coins + 1 spin from {}",
        referrer_id, bonus, account.id
    );
    Ok(Some(ReferralAward { referrer_id, bonus }))
}

impl Ledger {
    /// Move all claimable referral earnings into coins.
    pub async fn claim_referral_earnings(&self, account_id: i64) -> LedgerResult<ReferralClaim> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let before = load_account(&txn, account_id).await?;
        if before.referral_earnings <= 0 {
            return Err(LedgerError::NoEarnings);
        }

        // SQLite evaluates every SET expression against the old row.
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Coins,
                Expr::col(accounts::Column::Coins).add(Expr::col(accounts::Column::ReferralEarnings)),
            )
            .col_expr(accounts::Column::ReferralEarnings, Expr::value(0i64))
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::ReferralEarnings.eq(before.referral_earnings))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::NoEarnings);
        }

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        info!(
            "Account {} claimed {} coins of referral earnings",
            account_id, before.referral_earnings
        );
        Ok(ReferralClaim {
            claimed: before.referral_earnings,
            account: account.into(),
        })
    }

    pub async fn referral_friends(&self, account_id: i64) -> LedgerResult<Vec<ReferralFriend>> {
        load_account(&self.db, account_id).await?;

        let edges = referrals::Entity::find()
            .filter(referrals::Column::ReferrerId.eq(account_id))
            .order_by_asc(referrals::Column::Id)
            .all(&self.db)
            .await?;

        let friends = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(edges.iter().map(|e| e.referred_id)))
            .all(&self.db)
            .await?;

        Ok(edges
            .into_iter()
            .filter_map(|edge| {
                friends
                    .iter()
                    .find(|f| f.id == edge.referred_id)
                    .map(|friend| ReferralFriend {
                        id: friend.id,
                        name: friend.name.clone(),
                        joined_at: friend.created_at,
                        earnings_generated: edge.earnings_generated,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};

    #[test]
    fn test_commission_rounds_down() {
        let config = LedgerConfig::default();
        assert_eq!(commission(&config, 4_000_000).unwrap(), 400_000);
        assert_eq!(commission(&config, 19).unwrap(), 1);
        assert_eq!(commission(&config, 9).unwrap(), 0);
    }

    #[test]
    fn test_commission_out_of_range() {
        let config = LedgerConfig {
            referral_commission: Decimal::MAX,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            commission(&config, i64::MAX),
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_award_and_claim() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, Some(1)).await;

        let txn = ledger.db.begin().await.unwrap();
        let friend = load_account(&txn, 2).await.unwrap();
        let award = award_referral_earnings(&txn, &ledger.config, &friend, 1_000)
            .await
            .unwrap();
        txn.commit().await.unwrap();
        assert_eq!(
            award,
            Some(ReferralAward {
                referrer_id: 1,
                bonus: 100
            })
        );

        let referrer = ledger.account(1).await.unwrap();
        assert_eq!(referrer.referral_earnings, 100);
        assert_eq!(referrer.total_referral_earnings, 100);
        assert_eq!(referrer.spin_tokens, 10 + 1 + 1);

        let claim = ledger.claim_referral_earnings(1).await.unwrap();
        assert_eq!(claim.claimed, 100);
        assert_eq!(claim.account.coins, 100);
        assert_eq!(claim.account.referral_earnings, 0);
        assert_eq!(claim.account.total_referral_earnings, 100);

        let err = ledger.claim_referral_earnings(1).await.unwrap_err();
        assert!(matches!(err, LedgerError::NoEarnings));

        let friends = ledger.referral_friends(1).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, 2);
        assert_eq!(friends[0].earnings_generated, 100);
    }

    #[tokio::test]
    async fn test_award_without_referrer_is_noop() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;

        let account = load_account(&ledger.db, 1).await.unwrap();
        let award = award_referral_earnings(&ledger.db, &ledger.config, &account, 500)
            .await
            .unwrap();
        assert_eq!(award, None);
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        register(&ledger, 2, Some(1)).await;

        let linked = link_referral(&ledger.db, 1, 2, ledger.now()).await.unwrap();
        assert!(!linked);
        assert_eq!(ledger.account(1).await.unwrap().referral_count, 1);
    }
}
