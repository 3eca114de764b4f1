use cashubux_entities::{
    accounts,
    sea_orm_active_enums::{Currency, PrizeType, TransactionKind, TransactionStatus},
    spin_history,
};
use rand::{Rng, SeedableRng as _, rngs::StdRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use sea_orm::{
    ActiveModelTrait as _, ColumnTrait as _, EntityTrait as _, QueryFilter as _,
    QueryOrder as _, QuerySelect as _, Set, TransactionTrait as _, sea_query::Expr,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult, Prize, SpinPackage, VerificationJob,
    amounts::{ad_credit_to_units, coins_for, out_of_range, whole_units},
    balance::{BalanceField, Increments, debit_units, load_account},
    journal::{self, JournalEntry},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinOutcome {
    pub prize: Prize,
    /// Extra spins on top of the prize itself (jackpot).
    pub bonus_spins: i64,
    pub account: AccountSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinPayment {
    Coins,
    AdCredit,
    /// Paid on chain; credited now and verified later.
    Blockchain { external_ref: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinPurchase {
    pub spins_added: i64,
    pub transaction_id: i64,
    pub pending_verification: bool,
    pub account: AccountSnapshot,
}

/// Weighted draw: an integer in `1..=total_weight`, won by the first prize
/// whose running weight sum reaches it. `None` when every weight is zero.
pub fn draw_prize<'a, R: Rng + ?Sized>(table: &'a [Prize], rng: &mut R) -> Option<&'a Prize> {
    let total: u64 = table.iter().map(|p| u64::from(p.weight)).sum();
    if total == 0 {
        return None;
    }

    let draw = rng.gen_range(1..=total);
    let mut cumulative = 0u64;
    table.iter().find(|prize| {
        cumulative += u64::from(prize.weight);
        cumulative >= draw
    })
}

fn blockchain_bonus(package: &SpinPackage, share: Decimal) -> LedgerResult<i64> {
    let bonus = Decimal::from(package.spins)
        .checked_mul(share)
        .and_then(|bonus| bonus.floor().to_i64())
        .ok_or_else(|| out_of_range(package.spins))?;
    Ok(bonus.max(0))
}

impl Ledger {
    pub async fn spin(&self, account_id: i64) -> LedgerResult<SpinOutcome> {
        let mut rng = StdRng::from_entropy();
        self.spin_with_rng(account_id, &mut rng).await
    }

    /// Spend one token and pay out a prize drawn with `rng`.
    pub async fn spin_with_rng<R: Rng + Send>(
        &self,
        account_id: i64,
        rng: &mut R,
    ) -> LedgerResult<SpinOutcome> {
        let prize = draw_prize(&self.config.prize_table, rng)
            .cloned()
            .ok_or_else(|| LedgerError::Validation("prize table is empty".to_string()))?;

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let spent = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::SpinTokens,
                Expr::col(accounts::Column::SpinTokens).sub(1),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::SpinTokens.gte(1))
            .exec(&txn)
            .await?;
        if spent.rows_affected == 0 {
            load_account(&txn, account_id).await?;
            return Err(LedgerError::NoSpinsLeft);
        }

        let bonus_spins = if prize.label == self.config.jackpot_label {
            self.config.jackpot_bonus_spins
        } else {
            0
        };
        let payout = match prize.prize_type {
            PrizeType::Coins => Increments::new(account_id)
                .field(BalanceField::Coins, whole_units(prize.value)?)
                .field(BalanceField::SpinTokens, bonus_spins),
            PrizeType::Spins => Increments::new(account_id)
                .field(BalanceField::SpinTokens, whole_units(prize.value)? + bonus_spins),
            PrizeType::Ton => Increments::new(account_id)
                .field(BalanceField::AdCredit, ad_credit_to_units(prize.value)?)
                .field(BalanceField::SpinTokens, bonus_spins),
            PrizeType::Nothing => {
                Increments::new(account_id).field(BalanceField::SpinTokens, bonus_spins)
            }
        };
        payout.apply(&txn).await?;

        spin_history::ActiveModel {
            account_id: Set(account_id),
            prize_label: Set(prize.label.clone()),
            prize_type: Set(prize.prize_type),
            prize_value: Set(prize.value.normalize().to_string()),
            created_at: Set(self.now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        debug!("Account {} spun {}", account_id, prize.label);
        Ok(SpinOutcome {
            prize,
            bonus_spins,
            account: account.into(),
        })
    }

    /// One spin per rewarded ad, up to the daily ad cap.
    pub async fn watch_ad_for_spin(&self, account_id: i64) -> LedgerResult<AccountSnapshot> {
        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        let granted = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::SpinTokens,
                Expr::col(accounts::Column::SpinTokens).add(1),
            )
            .col_expr(
                accounts::Column::AdsWatchedToday,
                Expr::col(accounts::Column::AdsWatchedToday).add(1),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::AdsWatchedToday.lt(self.config.daily_ad_cap))
            .exec(&txn)
            .await?;
        if granted.rows_affected == 0 {
            load_account(&txn, account_id).await?;
            return Err(LedgerError::DailyLimitReached {
                what: "ad",
                limit: self.config.daily_ad_cap,
            });
        }

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;
        Ok(account.into())
    }

    pub async fn buy_spins(
        &self,
        account_id: i64,
        package_id: &str,
        payment: SpinPayment,
    ) -> LedgerResult<SpinPurchase> {
        let package = self
            .config
            .spin_package(package_id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownPackage(package_id.to_owned()))?;

        if let SpinPayment::Blockchain { external_ref } = &payment {
            if external_ref.trim().is_empty() {
                return Err(LedgerError::Validation(
                    "transaction reference is required".to_string(),
                ));
            }
        }

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;
        let now = self.now();
        let description = format!("Bought {} spins ({})", package.spins, package.id);

        let (spins_added, entry) = match &payment {
            SpinPayment::Coins => {
                let coins = coins_for(package.cost, self.config.conversion_rate)?;
                let account = load_account(&txn, account_id).await?;
                if account.coins < coins {
                    return Err(LedgerError::InsufficientCoins {
                        required: coins,
                        available: account.coins,
                    });
                }
                debit_units(&txn, account_id, BalanceField::Coins, coins).await?;
                journal::record(
                    &txn,
                    JournalEntry::completed(
                        account_id,
                        -Decimal::from(coins),
                        Currency::Coins,
                        TransactionKind::Withdrawal,
                        description.clone(),
                    ),
                    now,
                )
                .await?;
                (
                    package.spins,
                    JournalEntry::completed(
                        account_id,
                        Decimal::from(package.spins),
                        Currency::Spins,
                        TransactionKind::Deposit,
                        description,
                    ),
                )
            }
            SpinPayment::AdCredit => {
                debit_units(
                    &txn,
                    account_id,
                    BalanceField::AdCredit,
                    ad_credit_to_units(package.cost)?,
                )
                .await?;
                journal::record(
                    &txn,
                    JournalEntry::completed(
                        account_id,
                        -package.cost,
                        Currency::AdCredit,
                        TransactionKind::Withdrawal,
                        description.clone(),
                    ),
                    now,
                )
                .await?;
                (
                    package.spins,
                    JournalEntry::completed(
                        account_id,
                        Decimal::from(package.spins),
                        Currency::Spins,
                        TransactionKind::Deposit,
                        description,
                    ),
                )
            }
            SpinPayment::Blockchain { external_ref } => {
                load_account(&txn, account_id).await?;
                let bonus = blockchain_bonus(&package, self.config.blockchain_spin_bonus)?;
                let total = package
                    .spins
                    .checked_add(bonus)
                    .ok_or_else(|| out_of_range(package.spins))?;
                (
                    total,
                    JournalEntry::completed(
                        account_id,
                        Decimal::from(total),
                        Currency::Spins,
                        TransactionKind::Deposit,
                        description,
                    )
                    .with_status(TransactionStatus::Pending)
                    .with_external_ref(external_ref.trim())
                    .with_chain_amount(package.cost),
                )
            }
        };

        Increments::new(account_id)
            .field(BalanceField::SpinTokens, spins_added)
            .apply(&txn)
            .await?;
        let pending_verification = entry.status == TransactionStatus::Pending;
        let transaction = journal::record(&txn, entry, now).await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        if pending_verification {
            self.enqueue(VerificationJob::Deposit {
                transaction_id: transaction.id,
            });
        }

        info!(
            "Account {} bought {} spins with {:?} (transaction {})",
            account_id, spins_added, payment, transaction.id
        );
        Ok(SpinPurchase {
            spins_added,
            transaction_id: transaction.id,
            pending_verification,
            account: account.into(),
        })
    }

    /// Most recent spins first.
    pub async fn spin_history(
        &self,
        account_id: i64,
        limit: u64,
    ) -> LedgerResult<Vec<spin_history::Model>> {
        Ok(spin_history::Entity::find()
            .filter(spin_history::Column::AccountId.eq(account_id))
            .order_by_desc(spin_history::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{register, test_ledger};
    use rand::SeedableRng as _;
    use rust_decimal::dec;

    fn table() -> Vec<Prize> {
        [("a", 1u32), ("b", 3), ("c", 0), ("d", 6)]
            .into_iter()
            .map(|(label, weight)| Prize {
                label: label.to_string(),
                prize_type: PrizeType::Coins,
                value: dec!(1),
                weight,
            })
            .collect()
    }

    #[test]
    fn test_draw_prize_distribution() {
        let table = table();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 4];
        let draws = 100_000;
        for _ in 0..draws {
            let prize = draw_prize(&table, &mut rng).unwrap();
            let idx = table.iter().position(|p| p.label == prize.label).unwrap();
            counts[idx] += 1;
        }

        assert_eq!(counts[2], 0);
        for (idx, expected) in [(0, 0.1), (1, 0.3), (3, 0.6)] {
            let observed = counts[idx] as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "prize {idx}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_draw_prize_empty_table() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(draw_prize(&[], &mut rng).is_none());
    }

    #[tokio::test]
    async fn test_spin_spends_token_and_records_history() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..3 {
            ledger.spin_with_rng(1, &mut rng).await.unwrap();
        }

        let history = ledger.spin_history(1, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id);
        assert_eq!(ledger.spin_history(1, 50).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_spins_left() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let mut rng = StdRng::seed_from_u64(1);

        // Drain by repeatedly spinning until the engine refuses.
        let mut refused = false;
        for _ in 0..10_000 {
            match ledger.spin_with_rng(1, &mut rng).await {
                Ok(outcome) => assert!(outcome.account.spin_tokens >= 0),
                Err(LedgerError::NoSpinsLeft) => {
                    refused = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(refused);
        assert_eq!(ledger.account(1).await.unwrap().spin_tokens, 0);
    }

    #[tokio::test]
    async fn test_watch_ad_cap() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;
        let cap = ledger.config().daily_ad_cap;

        for _ in 0..cap {
            ledger.watch_ad_for_spin(1).await.unwrap();
        }
        let err = ledger.watch_ad_for_spin(1).await.unwrap_err();
        assert!(matches!(err, LedgerError::DailyLimitReached { what: "ad", .. }));

        let account = ledger.account(1).await.unwrap();
        assert_eq!(account.spin_tokens, 10 + i64::from(cap));
        assert_eq!(account.ads_watched_today, cap);
    }

    #[tokio::test]
    async fn test_buy_spins_with_coins() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;

        let err = ledger.buy_spins(1, "sp10", SpinPayment::Coins).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientCoins {
                required: 20_000,
                available: 0
            }
        ));

        ledger
            .credit(1, Currency::Coins, dec!(25000), "seed")
            .await
            .unwrap();
        let purchase = ledger.buy_spins(1, "sp10", SpinPayment::Coins).await.unwrap();
        assert_eq!(purchase.spins_added, 10);
        assert!(!purchase.pending_verification);
        assert_eq!(purchase.account.coins, 5_000);
        assert_eq!(purchase.account.spin_tokens, 20);

        assert!(matches!(
            ledger.buy_spins(1, "sp7", SpinPayment::Coins).await,
            Err(LedgerError::UnknownPackage(_))
        ));
    }

    #[tokio::test]
    async fn test_buy_spins_on_chain_adds_bonus() {
        let ledger = test_ledger().await;
        register(&ledger, 1, None).await;

        let purchase = ledger
            .buy_spins(
                1,
                "sp100",
                SpinPayment::Blockchain {
                    external_ref: "tx-abc".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(purchase.spins_added, 110);
        assert!(purchase.pending_verification);
        assert_eq!(purchase.account.spin_tokens, 120);
    }

    #[test]
    fn test_blockchain_bonus_out_of_range() {
        let package = SpinPackage {
            id: "huge".to_string(),
            spins: i64::MAX,
            cost: dec!(1),
        };
        assert_eq!(blockchain_bonus(&package, dec!(0)).unwrap(), 0);
        assert!(matches!(
            blockchain_bonus(&package, Decimal::MAX),
            Err(LedgerError::Validation(_))
        ));
    }
}
