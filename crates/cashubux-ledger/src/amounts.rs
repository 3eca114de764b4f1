//! Conversions between human decimal amounts and the integer units stored in
//! balance columns. Ad-credit is kept as fixed-point units of 10^-4.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;

use crate::{LedgerError, LedgerResult};

pub const AD_CREDIT_SCALE: u32 = 4;

pub fn ad_credit_to_units(amount: Decimal) -> LedgerResult<i64> {
    if amount.round_dp(AD_CREDIT_SCALE) != amount {
        return Err(LedgerError::Validation(format!(
            "{amount} has more than {AD_CREDIT_SCALE} fractional digits"
        )));
    }
    amount
        .checked_mul(Decimal::from(10_000))
        .and_then(|units| units.to_i64())
        .ok_or_else(|| out_of_range(amount))
}

pub fn units_to_ad_credit(units: i64) -> Decimal {
    Decimal::new(units, AD_CREDIT_SCALE)
}

/// Whole-unit amount for coins and spins.
pub fn whole_units(amount: Decimal) -> LedgerResult<i64> {
    if !amount.fract().is_zero() {
        return Err(LedgerError::Validation(format!(
            "{amount} is not a whole number"
        )));
    }
    amount.to_i64().ok_or_else(|| out_of_range(amount))
}

/// Coins needed for a crypto amount, rounded down.
pub fn coins_for(amount: Decimal, conversion_rate: i64) -> LedgerResult<i64> {
    amount
        .checked_mul(Decimal::from(conversion_rate))
        .and_then(|coins| coins.floor().to_i64())
        .ok_or_else(|| out_of_range(amount))
}

pub(crate) fn out_of_range(amount: impl std::fmt::Display) -> LedgerError {
    LedgerError::Validation(format!("{amount} is out of range"))
}

pub fn require_positive(amount: Decimal) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(amount)
}
