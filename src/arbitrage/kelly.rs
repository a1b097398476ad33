//! Kelly criterion bet sizing for single-sided value bets.
//!
//! Standard formula:
//!   f* = (b·p − q) / b
//! where
//!   b = net odds received (decimal odds − 1)
//!   p = true probability of winning
//!   q = 1 − p
//!
//! Independent of the detector; shares only the money rounding rules.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{round_money, to_f64};
use crate::error::ArbitrageError;

/// Explanation attached when the odds carry no edge.
pub const NO_EDGE_EXPLANATION: &str = "No value bet found";

/// Kelly sizing result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KellyAdvice {
    /// Raw Kelly fraction; negative when there is no edge.
    pub fraction: f64,
    /// Amount to stake, rounded to cents.
    pub stake: Decimal,
    /// Fraction of bankroll in percent, rounded to 2 places.
    pub percentage: Decimal,
    /// Expected profit of the stake, rounded to cents.
    pub expected_value: Decimal,
    /// Present when no bet should be placed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<&'static str>,
}

impl KellyAdvice {
    /// Whether the advice recommends a bet.
    pub fn has_edge(&self) -> bool {
        self.explanation.is_none() && self.stake > Decimal::ZERO
    }
}

/// Optimal stake for a single bet at `decimal_odds` with win probability
/// `true_probability`, given `bankroll`.
pub fn kelly_stake(
    decimal_odds: f64,
    true_probability: f64,
    bankroll: Decimal,
) -> Result<KellyAdvice, ArbitrageError> {
    if !(true_probability > 0.0 && true_probability < 1.0) {
        return Err(ArbitrageError::InvalidProbability(true_probability));
    }
    if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
        return Err(ArbitrageError::InvalidOdds(decimal_odds));
    }
    if bankroll < Decimal::ZERO {
        return Err(ArbitrageError::InvalidBankroll(bankroll));
    }

    let b = decimal_odds - 1.0;
    let p = true_probability;
    let q = 1.0 - p;
    let fraction = (b * p - q) / b;

    if fraction < 0.0 {
        return Ok(KellyAdvice {
            fraction,
            stake: Decimal::ZERO,
            percentage: Decimal::ZERO,
            expected_value: Decimal::ZERO,
            explanation: Some(NO_EDGE_EXPLANATION),
        });
    }

    let stake = round_money(fraction * to_f64(bankroll), 2);
    let expected_value = round_money(to_f64(stake) * (p * decimal_odds - 1.0), 2);

    Ok(KellyAdvice {
        fraction,
        stake,
        percentage: round_money(fraction * 100.0, 2),
        expected_value,
        explanation: None,
    })
}

/// Expected return per unit staked: `p · odds − 1`.
///
/// Positive edge means the price underestimates the true probability.
pub fn edge(true_probability: f64, decimal_odds: f64) -> f64 {
    true_probability * decimal_odds - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn break_even_has_zero_stake() {
        let advice = kelly_stake(2.0, 0.5, dec!(1000)).unwrap();

        assert_eq!(advice.fraction, 0.0);
        assert_eq!(advice.stake, Decimal::ZERO);
        assert!(!advice.has_edge());
    }

    #[test]
    fn positive_edge_sizes_quarter_bankroll() {
        // b = 2, q = 0.5 → f = (2·0.5 − 0.5) / 2 = 0.25
        let advice = kelly_stake(3.0, 0.5, dec!(1000)).unwrap();

        assert!((advice.fraction - 0.25).abs() < 1e-12);
        assert_eq!(advice.stake, dec!(250));
        assert_eq!(advice.percentage, dec!(25));
        // 250 · (0.5 · 3 − 1) = 125
        assert_eq!(advice.expected_value, dec!(125));
        assert!(advice.has_edge());
    }

    #[test]
    fn negative_edge_is_not_an_error() {
        let advice = kelly_stake(1.5, 0.4, dec!(1000)).unwrap();

        assert!(advice.fraction < 0.0);
        assert_eq!(advice.stake, Decimal::ZERO);
        assert_eq!(advice.explanation, Some(NO_EDGE_EXPLANATION));
    }

    #[test]
    fn rejects_out_of_range_probability() {
        for p in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                kelly_stake(2.0, p, dec!(1000)),
                Err(ArbitrageError::InvalidProbability(_))
            ));
        }
    }

    #[test]
    fn rejects_non_decimal_odds_and_negative_bankroll() {
        assert_eq!(
            kelly_stake(1.0, 0.6, dec!(1000)),
            Err(ArbitrageError::InvalidOdds(1.0))
        );
        assert_eq!(
            kelly_stake(2.0, 0.6, dec!(-5)),
            Err(ArbitrageError::InvalidBankroll(dec!(-5)))
        );
    }

    #[test]
    fn edge_calculation() {
        assert!((edge(0.6, 2.0) - 0.2).abs() < 1e-12);
        assert!(edge(0.5, 2.0).abs() < 1e-12);
        assert!(edge(0.3, 2.0) < 0.0);
    }
}
