use cashubux_entities::{accounts, referrals};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait as _, EntityTrait as _, QueryFilter as _, Set, TransactionTrait as _,
    sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Ledger, LedgerError, LedgerResult,
    amounts::units_to_ad_credit,
    balance::load_account,
    referral::link_referral,
};

/// Serialized balances and counters returned with every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub id: i64,
    pub name: String,
    pub wallet_address: Option<String>,
    pub coins: i64,
    pub spin_tokens: i64,
    pub ad_credit: Decimal,
    pub referred_by: Option<i64>,
    pub referral_count: i32,
    pub referral_earnings: i64,
    pub total_referral_earnings: i64,
    pub ads_watched_today: i32,
    pub tasks_completed_today_for_spin: i32,
    pub friends_invited_today_for_spin: i32,
    pub total_game_tasks_completed: i32,
    pub total_social_tasks_completed: i32,
    pub total_partner_tasks_completed: i32,
    pub created_at: DateTime<Utc>,
}

impl From<accounts::Model> for AccountSnapshot {
    fn from(m: accounts::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            wallet_address: m.wallet_address,
            coins: m.coins,
            spin_tokens: m.spin_tokens,
            ad_credit: units_to_ad_credit(m.ad_credit),
            referred_by: m.referred_by,
            referral_count: m.referral_count,
            referral_earnings: m.referral_earnings,
            total_referral_earnings: m.total_referral_earnings,
            ads_watched_today: m.ads_watched_today,
            tasks_completed_today_for_spin: m.tasks_completed_today_for_spin,
            friends_invited_today_for_spin: m.friends_invited_today_for_spin,
            total_game_tasks_completed: m.total_game_tasks_completed,
            total_social_tasks_completed: m.total_social_tasks_completed,
            total_partner_tasks_completed: m.total_partner_tasks_completed,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Telegram user id.
    pub id: i64,
    pub name: String,
    pub referred_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub account: AccountSnapshot,
    pub is_new: bool,
}

/// TON user-friendly (`EQ`, `UQ`) or raw (`0:`) address.
pub fn is_valid_wallet_address(address: &str) -> bool {
    let address = address.trim();
    address.len() > 2 && ["EQ", "UQ", "0:"].iter().any(|p| address.starts_with(p))
}

impl Ledger {
    pub async fn account(&self, account_id: i64) -> LedgerResult<AccountSnapshot> {
        Ok(load_account(&self.db, account_id).await?.into())
    }

    /// First-authentication upsert.
    ///
    /// The insert itself decides whether the account is new: when a row with
    /// the id already exists, written earlier or by another process sharing
    /// the database, that row is returned unchanged with `is_new: false`.
    pub async fn register_account(&self, new: NewAccount) -> LedgerResult<Registration> {
        if new.name.trim().is_empty() {
            return Err(LedgerError::Validation("name is required".to_string()));
        }

        let _guard = self.locks.lock(new.id).await;
        let txn = self.db.begin().await?;

        let referrer = match new.referred_by {
            Some(referrer_id) if referrer_id != new.id => accounts::Entity::find_by_id(referrer_id)
                .one(&txn)
                .await?
                .map(|r| r.id),
            _ => None,
        };

        let now = self.now();
        let model = accounts::ActiveModel {
            id: Set(new.id),
            name: Set(new.name.trim().to_owned()),
            wallet_address: Set(None),
            coins: Set(0),
            spin_tokens: Set(self.config.welcome_spins),
            ad_credit: Set(0),
            referred_by: Set(referrer),
            referral_count: Set(0),
            referral_earnings: Set(0),
            total_referral_earnings: Set(0),
            ads_watched_today: Set(0),
            tasks_completed_today_for_spin: Set(0),
            friends_invited_today_for_spin: Set(0),
            total_game_tasks_completed: Set(0),
            total_social_tasks_completed: Set(0),
            total_partner_tasks_completed: Set(0),
            created_at: Set(now),
        };

        let inserted = accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::column(accounts::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        if inserted == 0 {
            let existing = load_account(&txn, new.id).await?;
            txn.commit().await?;
            debug!("Account {} already registered", new.id);
            return Ok(Registration {
                account: existing.into(),
                is_new: false,
            });
        }

        if let Some(referrer_id) = referrer {
            link_referral(&txn, referrer_id, new.id, now).await?;
        }

        let account = load_account(&txn, new.id).await?;
        txn.commit().await?;

        info!(
            "Registered account {} (referred by {:?})",
            account.id, account.referred_by
        );
        Ok(Registration {
            account: account.into(),
            is_new: true,
        })
    }

    pub async fn set_wallet_address(
        &self,
        account_id: i64,
        address: &str,
    ) -> LedgerResult<AccountSnapshot> {
        let address = address.trim();
        if !is_valid_wallet_address(address) {
            return Err(LedgerError::Validation(format!(
                "invalid wallet address {address}"
            )));
        }

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::WalletAddress, Expr::value(address))
            .filter(accounts::Column::Id.eq(account_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;
        Ok(account.into())
    }

    /// Zero the per-day counters on every account and drop idle account locks.
    /// Returns the number of accounts touched.
    pub async fn reset_daily_counters(&self) -> LedgerResult<u64> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::AdsWatchedToday, Expr::value(0))
            .col_expr(accounts::Column::TasksCompletedTodayForSpin, Expr::value(0))
            .col_expr(accounts::Column::FriendsInvitedTodayForSpin, Expr::value(0))
            .exec(&self.db)
            .await?;

        self.locks.prune();
        info!("Reset daily counters on {} accounts", result.rows_affected);
        Ok(result.rows_affected)
    }

    /// Whether `referred_id` has a referral edge from `referrer_id`.
    pub async fn is_referred_by(&self, referred_id: i64, referrer_id: i64) -> LedgerResult<bool> {
        let edge = referrals::Entity::find()
            .filter(referrals::Column::ReferrerId.eq(referrer_id))
            .filter(referrals::Column::ReferredId.eq(referred_id))
            .one(&self.db)
            .await?;
        Ok(edge.is_some())
    }
}
