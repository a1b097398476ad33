//! Stake allocation across the legs of an arbitrage.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{
    checked_payout, price_to_decimal, round_decimal, round_money, to_f64, DEFAULT_MONEY_PRECISION,
};
use crate::error::ArbitrageError;

/// Stake split for a set of winning odds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeAllocation {
    /// Stake per outcome, in input order. Sums exactly to the total stake.
    pub stakes: Vec<Decimal>,
    /// `total_stake * (1 - total_implied)`, rounded.
    pub guaranteed_profit: Decimal,
    /// Sum of implied probabilities.
    pub total_implied: f64,
    /// Guaranteed profit as a percentage of total stake.
    pub roi_percent: Decimal,
    /// Smallest payout across outcomes using the rounded stakes.
    pub worst_case_payout: Decimal,
}

impl StakeAllocation {
    /// Profit actually locked in after stake rounding.
    pub fn realized_profit(&self) -> Decimal {
        self.worst_case_payout - self.stakes.iter().copied().sum::<Decimal>()
    }
}

/// Split `total_stake` across outcomes so every outcome returns the same payout.
pub fn allocate_stakes(
    outcome_prices: &[f64],
    total_stake: Decimal,
) -> Result<StakeAllocation, ArbitrageError> {
    allocate_stakes_with_precision(outcome_prices, total_stake, DEFAULT_MONEY_PRECISION)
}

/// Split `total_stake` with amounts rounded to `precision` decimal places.
///
/// Stakes are proportional to implied probability. The last stake takes the
/// remainder so the split always sums to `total_stake`.
pub fn allocate_stakes_with_precision(
    outcome_prices: &[f64],
    total_stake: Decimal,
    precision: u32,
) -> Result<StakeAllocation, ArbitrageError> {
    if outcome_prices.is_empty() {
        return Err(ArbitrageError::NoOutcomes);
    }
    if total_stake <= Decimal::ZERO {
        return Err(ArbitrageError::InvalidStake(total_stake));
    }
    if let Some(&bad) = outcome_prices
        .iter()
        .find(|p| !p.is_finite() || **p <= 1.0 || price_to_decimal(**p).is_none())
    {
        return Err(ArbitrageError::InvalidOdds(bad));
    }

    let implied: Vec<f64> = outcome_prices.iter().map(|p| 1.0 / p).collect();
    let total_implied: f64 = implied.iter().sum();
    if total_implied >= 1.0 {
        return Err(ArbitrageError::NoArbitrage { total_implied });
    }

    let stake = to_f64(total_stake);
    let (head, _) = implied.split_at(implied.len() - 1);
    let mut stakes: Vec<Decimal> = head
        .iter()
        .map(|p| round_money(stake * p / total_implied, precision))
        .collect();
    let assigned: Decimal = stakes.iter().copied().sum();
    stakes.push(total_stake - assigned);

    let guaranteed_profit = round_money(stake * (1.0 - total_implied), precision);
    let roi_percent = round_decimal(guaranteed_profit / total_stake * Decimal::ONE_HUNDRED, 2);
    let mut worst_case_payout: Option<Decimal> = None;
    for (&stake, &price) in stakes.iter().zip(outcome_prices) {
        let payout = checked_payout(stake, price)
            .ok_or(ArbitrageError::PayoutOverflow { stake, price })?;
        worst_case_payout = Some(worst_case_payout.map_or(payout, |w| w.min(payout)));
    }
    let worst_case_payout = round_decimal(worst_case_payout.unwrap_or(Decimal::ZERO), precision);

    Ok(StakeAllocation {
        stakes,
        guaranteed_profit,
        total_implied,
        roi_percent,
        worst_case_payout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn two_outcomes_whole_units() {
        let alloc = allocate_stakes_with_precision(&[2.0, 2.2], dec!(1000), 0).unwrap();

        assert_eq!(alloc.stakes, vec![dec!(524), dec!(476)]);
        assert!((alloc.total_implied - 0.954_545_454_5).abs() < 1e-9);
        assert_eq!(alloc.guaranteed_profit, dec!(45));
        // 476 * 2.2 = 1047.2 is the weaker leg.
        assert_eq!(alloc.worst_case_payout, dec!(1047));
        assert_eq!(alloc.realized_profit(), dec!(47));
    }

    #[test]
    fn two_outcomes_cents() {
        let alloc = allocate_stakes(&[2.0, 2.2], dec!(1000)).unwrap();

        assert_eq!(alloc.stakes, vec![dec!(523.81), dec!(476.19)]);
        assert_eq!(alloc.guaranteed_profit, dec!(45.45));
        assert_eq!(alloc.roi_percent, dec!(4.55));
    }

    #[test]
    fn three_outcomes_sum_exactly_to_total() {
        let alloc = allocate_stakes_with_precision(&[3.1, 3.6, 4.2], dec!(777), 0).unwrap();

        assert_eq!(alloc.stakes.len(), 3);
        assert_eq!(alloc.stakes.iter().copied().sum::<Decimal>(), dec!(777));
        // Every leg pays roughly the same.
        let payouts: Vec<f64> = alloc
            .stakes
            .iter()
            .zip([3.1, 3.6, 4.2])
            .map(|(s, p)| to_f64(*s) * p)
            .collect();
        let spread = payouts.iter().cloned().fold(f64::MIN, f64::max)
            - payouts.iter().cloned().fold(f64::MAX, f64::min);
        assert!(spread < 5.0, "payout spread {spread}");
    }

    #[test]
    fn rejects_no_edge() {
        let err = allocate_stakes(&[1.9, 1.9], dec!(1000)).unwrap_err();
        assert!(matches!(err, ArbitrageError::NoArbitrage { .. }));

        // Exactly break-even is not an arbitrage either.
        let err = allocate_stakes(&[2.0, 2.0], dec!(1000)).unwrap_err();
        assert!(matches!(err, ArbitrageError::NoArbitrage { .. }));
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(allocate_stakes(&[], dec!(100)), Err(ArbitrageError::NoOutcomes));
        assert_eq!(
            allocate_stakes(&[2.0, 2.2], dec!(0)),
            Err(ArbitrageError::InvalidStake(dec!(0)))
        );
        assert_eq!(
            allocate_stakes(&[1.0, 5.0], dec!(100)),
            Err(ArbitrageError::InvalidOdds(1.0))
        );
        assert_eq!(
            allocate_stakes(&[1e30, 1e30], dec!(1000)),
            Err(ArbitrageError::InvalidOdds(1e30))
        );
    }

    #[test]
    fn huge_odds_overflow_is_an_error() {
        let err = allocate_stakes(&[1e27, 1e27], dec!(1000)).unwrap_err();
        assert!(matches!(err, ArbitrageError::PayoutOverflow { price, .. } if price == 1e27));
    }
}
