use cashubux_entities::{
    sea_orm_active_enums::{TransactionKind, TransactionStatus},
    transactions,
};
use rust_decimal::Decimal;

pub trait TransactionExt {
    fn amount_decimal(&self) -> Result<Decimal, rust_decimal::Error>;
    fn chain_amount_decimal(&self) -> Result<Option<Decimal>, rust_decimal::Error>;
    /// Amount expected on chain: the recorded chain amount, else `|amount|`.
    fn expected_chain_amount(&self) -> Result<Decimal, rust_decimal::Error>;
    fn is_pending(&self) -> bool;
    fn is_withdrawal(&self) -> bool;
    fn is_deposit(&self) -> bool;
}

impl TransactionExt for transactions::Model {
    fn amount_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.amount.parse::<Decimal>()
    }

    fn chain_amount_decimal(&self) -> Result<Option<Decimal>, rust_decimal::Error> {
        self.chain_amount
            .as_deref()
            .map(str::parse::<Decimal>)
            .transpose()
    }

    fn expected_chain_amount(&self) -> Result<Decimal, rust_decimal::Error> {
        match self.chain_amount_decimal()? {
            Some(amount) => Ok(amount),
            None => Ok(self.amount_decimal()?.abs()),
        }
    }

    fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    fn is_withdrawal(&self) -> bool {
        self.kind == TransactionKind::Withdrawal
    }

    fn is_deposit(&self) -> bool {
        self.kind == TransactionKind::Deposit
    }
}
