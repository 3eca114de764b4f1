//! Append-mostly transaction journal. Rows are written once and afterwards
//! only move out of `PENDING`, guarded on the current status.

use cashubux_entities::{
    sea_orm_active_enums::{Currency, TransactionKind, TransactionStatus},
    transactions,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait as _, ColumnTrait as _, Condition, ConnectionTrait, EntityTrait as _,
    QueryFilter as _, Set, SqlErr,
};

use crate::{LedgerError, LedgerResult};

#[derive(Debug, Clone)]
pub(crate) struct JournalEntry {
    pub account_id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub external_ref: Option<String>,
    pub chain_amount: Option<Decimal>,
    pub reserved_coins: Option<i64>,
    pub description: String,
}

impl JournalEntry {
    pub fn completed(
        account_id: i64,
        amount: Decimal,
        currency: Currency,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            amount,
            currency,
            kind,
            status: TransactionStatus::Completed,
            external_ref: None,
            chain_amount: None,
            reserved_coins: None,
            description: description.into(),
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn with_chain_amount(mut self, chain_amount: Decimal) -> Self {
        self.chain_amount = Some(chain_amount);
        self
    }

    pub fn with_reserved_coins(mut self, coins: i64) -> Self {
        self.reserved_coins = Some(coins);
        self
    }
}

/// Insert a journal row. A live duplicate external reference is a double spend.
pub(crate) async fn record<C: ConnectionTrait>(
    conn: &C,
    entry: JournalEntry,
    now: DateTime<Utc>,
) -> LedgerResult<transactions::Model> {
    let external_ref = entry.external_ref.clone();

    let model = transactions::ActiveModel {
        account_id: Set(entry.account_id),
        amount: Set(entry.amount.normalize().to_string()),
        currency: Set(entry.currency),
        kind: Set(entry.kind),
        status: Set(entry.status),
        external_ref: Set(entry.external_ref),
        chain_amount: Set(entry.chain_amount.map(|a| a.normalize().to_string())),
        reserved_coins: Set(entry.reserved_coins),
        description: Set(entry.description),
        note: Set(None),
        approved_at: Set(None),
        payout_started_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match model.insert(conn).await {
        Ok(model) => Ok(model),
        Err(err) => match (err.sql_err(), external_ref) {
            (Some(SqlErr::UniqueConstraintViolation(_)), Some(reference)) => {
                Err(LedgerError::DoubleSpend(reference))
            }
            _ => Err(err.into()),
        },
    }
}

pub(crate) async fn find<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
) -> LedgerResult<transactions::Model> {
    transactions::Entity::find_by_id(transaction_id)
        .one(conn)
        .await?
        .ok_or(LedgerError::TransactionNotFound(transaction_id))
}

/// Move a `PENDING` row to `status`. Returns false when the row had already left `PENDING`.
pub(crate) async fn settle<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
    status: TransactionStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> LedgerResult<bool> {
    let mut update = transactions::ActiveModel {
        status: Set(status),
        updated_at: Set(now),
        ..Default::default()
    };
    if note.is_some() {
        update.note = Set(note);
    }

    let result = transactions::Entity::update_many()
        .set(update)
        .filter(transactions::Column::Id.eq(transaction_id))
        .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Record a payout reference, completing the row if it is still `PENDING`.
pub(crate) async fn attach_payout<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
    external_ref: &str,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let update = transactions::ActiveModel {
        status: Set(TransactionStatus::Completed),
        external_ref: Set(Some(external_ref.to_owned())),
        updated_at: Set(now),
        ..Default::default()
    };

    transactions::Entity::update_many()
        .set(update)
        .filter(transactions::Column::Id.eq(transaction_id))
        .filter(transactions::Column::Status.ne(TransactionStatus::Failed))
        .filter(transactions::Column::ExternalRef.is_null())
        .exec(conn)
        .await?;
    Ok(())
}

/// Mark a withdrawal's payout as started. Only one caller can win the claim;
/// returns false when the row is already claimed, paid, failed or unapproved.
pub(crate) async fn claim_payout<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<bool> {
    let update = transactions::ActiveModel {
        payout_started_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = transactions::Entity::update_many()
        .set(update)
        .filter(transactions::Column::Id.eq(transaction_id))
        .filter(transactions::Column::Kind.eq(TransactionKind::Withdrawal))
        .filter(transactions::Column::PayoutStartedAt.is_null())
        .filter(transactions::Column::ExternalRef.is_null())
        .filter(
            Condition::any()
                .add(transactions::Column::Status.eq(TransactionStatus::Completed))
                .add(
                    Condition::all()
                        .add(transactions::Column::Status.eq(TransactionStatus::Pending))
                        .add(transactions::Column::ApprovedAt.is_not_null()),
                ),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

pub(crate) async fn annotate<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
    note: String,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let update = transactions::ActiveModel {
        note: Set(Some(note)),
        updated_at: Set(now),
        ..Default::default()
    };

    transactions::Entity::update_many()
        .set(update)
        .filter(transactions::Column::Id.eq(transaction_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Another non-failed transaction carrying `external_ref`, if any.
pub(crate) async fn live_holder<C: ConnectionTrait>(
    conn: &C,
    external_ref: &str,
    exclude_id: i64,
) -> LedgerResult<Option<transactions::Model>> {
    let holder = transactions::Entity::find()
        .filter(transactions::Column::ExternalRef.eq(external_ref))
        .filter(transactions::Column::Id.ne(exclude_id))
        .filter(transactions::Column::Status.ne(TransactionStatus::Failed))
        .one(conn)
        .await?;
    Ok(holder)
}
