//! Money rounding at the output boundary.
//!
//! All probability and margin math runs in `f64`; amounts become `Decimal`
//! exactly once, here, when they are finalized for display or allocation.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Default number of decimal places for currency amounts.
pub const DEFAULT_MONEY_PRECISION: u32 = 2;

/// Round a full-precision amount to `precision` decimal places.
///
/// Non-finite inputs collapse to zero.
pub fn round_money(amount: f64, precision: u32) -> Decimal {
    Decimal::from_f64(amount)
        .unwrap_or_default()
        .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an existing decimal amount to `precision` decimal places.
pub fn round_decimal(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a decimal amount into `f64` for intermediate math.
pub fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

/// Convert decimal odds into `Decimal` for payout arithmetic.
///
/// `None` when the price has no `Decimal` representation.
pub fn price_to_decimal(price: f64) -> Option<Decimal> {
    Decimal::from_f64(price)
}

/// Payout of `stake` at `price`, or `None` if it overflows.
pub fn checked_payout(stake: Decimal, price: f64) -> Option<Decimal> {
    stake.checked_mul(price_to_decimal(price)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(523.8095, 0), dec!(524));
        assert_eq!(round_money(2.5, 0), dec!(3));
        assert_eq!(round_money(45.4545, 2), dec!(45.45));
        assert_eq!(round_money(0.125, 2), dec!(0.13));
    }

    #[test]
    fn non_finite_becomes_zero() {
        assert_eq!(round_money(f64::NAN, 2), Decimal::ZERO);
        assert_eq!(round_money(f64::INFINITY, 2), Decimal::ZERO);
    }

    #[test]
    fn price_conversion_is_exact_for_quoted_odds() {
        assert_eq!(price_to_decimal(2.2), Some(dec!(2.2)));
        assert_eq!(price_to_decimal(1.95), Some(dec!(1.95)));
    }

    #[test]
    fn unrepresentable_price_and_overflow_are_none() {
        assert_eq!(price_to_decimal(1e30), None);
        assert_eq!(checked_payout(dec!(1000), 1e30), None);
        assert_eq!(checked_payout(dec!(1000), 1e27), None);
        assert_eq!(checked_payout(dec!(476), 2.2), Some(dec!(1047.2)));
    }
}
