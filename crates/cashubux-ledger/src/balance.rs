use cashubux_entities::{
    accounts,
    sea_orm_active_enums::{Currency, TransactionKind},
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait as _, ConnectionTrait, EntityTrait as _, QueryFilter as _, TransactionTrait as _,
    sea_query::Expr,
};
use tracing::debug;

use crate::{
    AccountSnapshot, Ledger, LedgerError, LedgerResult,
    amounts::{ad_credit_to_units, require_positive, units_to_ad_credit, whole_units},
    journal::{self, JournalEntry},
};

/// Integer balance columns that move through guarded arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BalanceField {
    Coins,
    SpinTokens,
    AdCredit,
    ReferralEarnings,
}

impl BalanceField {
    pub fn for_currency(currency: Currency) -> Self {
        match currency {
            Currency::Coins => BalanceField::Coins,
            Currency::Spins => BalanceField::SpinTokens,
            Currency::AdCredit => BalanceField::AdCredit,
        }
    }

    pub fn column(self) -> accounts::Column {
        match self {
            BalanceField::Coins => accounts::Column::Coins,
            BalanceField::SpinTokens => accounts::Column::SpinTokens,
            BalanceField::AdCredit => accounts::Column::AdCredit,
            BalanceField::ReferralEarnings => accounts::Column::ReferralEarnings,
        }
    }

    pub fn currency(self) -> Currency {
        match self {
            BalanceField::Coins | BalanceField::ReferralEarnings => Currency::Coins,
            BalanceField::SpinTokens => Currency::Spins,
            BalanceField::AdCredit => Currency::AdCredit,
        }
    }

    pub fn units(self, amount: Decimal) -> LedgerResult<i64> {
        match self {
            BalanceField::AdCredit => ad_credit_to_units(amount),
            _ => whole_units(amount),
        }
    }

    pub fn human(self, units: i64) -> Decimal {
        match self {
            BalanceField::AdCredit => units_to_ad_credit(units),
            _ => Decimal::from(units),
        }
    }

    pub fn read(self, account: &accounts::Model) -> i64 {
        match self {
            BalanceField::Coins => account.coins,
            BalanceField::SpinTokens => account.spin_tokens,
            BalanceField::AdCredit => account.ad_credit,
            BalanceField::ReferralEarnings => account.referral_earnings,
        }
    }
}

pub(crate) async fn load_account<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> LedgerResult<accounts::Model> {
    accounts::Entity::find_by_id(account_id)
        .one(conn)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))
}

/// Several non-negative increments applied to one account in a single statement.
#[derive(Debug, Clone)]
pub(crate) struct Increments {
    account_id: i64,
    columns: Vec<(accounts::Column, i64)>,
}

impl Increments {
    pub fn new(account_id: i64) -> Self {
        Self {
            account_id,
            columns: Vec::new(),
        }
    }

    pub fn add(mut self, column: accounts::Column, amount: i64) -> Self {
        debug_assert!(amount >= 0, "increments never subtract");
        if amount > 0 {
            self.columns.push((column, amount));
        }
        self
    }

    pub fn field(self, field: BalanceField, amount: i64) -> Self {
        self.add(field.column(), amount)
    }

    pub async fn apply<C: ConnectionTrait>(self, conn: &C) -> LedgerResult<()> {
        if self.columns.is_empty() {
            return Ok(());
        }

        let mut update = accounts::Entity::update_many();
        for (column, amount) in self.columns {
            update = update.col_expr(column, Expr::col(column).add(amount));
        }

        let result = update
            .filter(accounts::Column::Id.eq(self.account_id))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::AccountNotFound(self.account_id));
        }
        Ok(())
    }
}

pub(crate) async fn credit_units<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    field: BalanceField,
    units: i64,
) -> LedgerResult<()> {
    Increments::new(account_id).field(field, units).apply(conn).await
}

/// Subtract `units`, refusing to go below zero.
pub(crate) async fn debit_units<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    field: BalanceField,
    units: i64,
) -> LedgerResult<()> {
    if units == 0 {
        return Ok(());
    }
    let column = field.column();

    let result = accounts::Entity::update_many()
        .col_expr(column, Expr::col(column).sub(units))
        .filter(accounts::Column::Id.eq(account_id))
        .filter(column.gte(units))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let account = load_account(conn, account_id).await?;
        return Err(LedgerError::InsufficientBalance {
            currency: field.currency(),
            required: field.human(units),
            available: field.human(field.read(&account)),
        });
    }
    Ok(())
}

impl Ledger {
    /// Credit `amount` of `currency` and journal it as a completed deposit.
    pub async fn credit(
        &self,
        account_id: i64,
        currency: Currency,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<AccountSnapshot> {
        let amount = require_positive(amount)?;
        let field = BalanceField::for_currency(currency);
        let units = field.units(amount)?;

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        credit_units(&txn, account_id, field, units).await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                account_id,
                amount,
                currency,
                TransactionKind::Deposit,
                description,
            ),
            self.now(),
        )
        .await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        debug!("Credited {} {:?} to account {}", amount, currency, account_id);
        Ok(account.into())
    }

    /// Debit `amount` of `currency`; fails without side effects on underflow.
    pub async fn debit(
        &self,
        account_id: i64,
        currency: Currency,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<AccountSnapshot> {
        let amount = require_positive(amount)?;
        let field = BalanceField::for_currency(currency);
        let units = field.units(amount)?;

        let _guard = self.locks.lock(account_id).await;
        let txn = self.db.begin().await?;

        debit_units(&txn, account_id, field, units).await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                account_id,
                -amount,
                currency,
                TransactionKind::Withdrawal,
                description,
            ),
            self.now(),
        )
        .await?;

        let account = load_account(&txn, account_id).await?;
        txn.commit().await?;

        debug!("Debited {} {:?} from account {}", amount, currency, account_id);
        Ok(account.into())
    }

    /// Atomic debit of `from` and credit of `to`.
    pub async fn transfer(
        &self,
        from: i64,
        to: i64,
        currency: Currency,
        amount: Decimal,
        description: &str,
    ) -> LedgerResult<(AccountSnapshot, AccountSnapshot)> {
        if from == to {
            return Err(LedgerError::Validation(
                "cannot transfer to the same account".to_string(),
            ));
        }
        let amount = require_positive(amount)?;
        let field = BalanceField::for_currency(currency);
        let units = field.units(amount)?;

        let _guards = self.locks.lock_pair(from, to).await;
        let txn = self.db.begin().await?;
        let now = self.now();

        // Existence of the recipient is checked before anything moves.
        load_account(&txn, to).await?;
        debit_units(&txn, from, field, units).await?;
        credit_units(&txn, to, field, units).await?;

        journal::record(
            &txn,
            JournalEntry::completed(
                from,
                -amount,
                currency,
                TransactionKind::Withdrawal,
                format!("{description} (to {to})"),
            ),
            now,
        )
        .await?;
        journal::record(
            &txn,
            JournalEntry::completed(
                to,
                amount,
                currency,
                TransactionKind::Deposit,
                format!("{description} (from {from})"),
            ),
            now,
        )
        .await?;

        let sender = load_account(&txn, from).await?;
        let recipient = load_account(&txn, to).await?;
        txn.commit().await?;

        debug!(
            "Transferred {} {:?} from {} to {}",
            amount, currency, from, to
        );
        Ok((sender.into(), recipient.into()))
    }
}
