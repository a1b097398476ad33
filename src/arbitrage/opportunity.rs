//! Detected arbitrage opportunities.

use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;
use strum::Display;
use time::OffsetDateTime;

use crate::odds::{MarketKey, Reliability};

/// One bet of an arbitrage: an outcome backed at one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    /// Outcome name as quoted by the winning bookmaker.
    pub outcome_name: String,
    /// Decimal odds taken.
    pub price: f64,
    /// Bookmaker offering the price.
    pub bookmaker_id: String,
    /// Amount to stake on this leg.
    pub stake_amount: Decimal,
}

impl Leg {
    /// Payout if this leg wins, saturating at `Decimal::MAX`.
    pub fn payout(&self) -> Decimal {
        super::money::checked_payout(self.stake_amount, self.price).unwrap_or(Decimal::MAX)
    }
}

/// How the winning combination was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Two-outcome market, best price per side across the pair.
    BestOfPair,
    /// Outcomes paired by position across the pair.
    PositionPaired,
}

/// Identity of an opportunity for alert suppression.
///
/// Prices are deliberately absent: a price move on the same match, market and
/// bookmaker pair refreshes the opportunity instead of creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Sport key.
    pub sport: String,
    /// Home team.
    pub home_team: String,
    /// Away team.
    pub away_team: String,
    /// Market.
    pub market: MarketKey,
    /// First bookmaker of the pair.
    pub bookmaker_a: String,
    /// Second bookmaker of the pair.
    pub bookmaker_b: String,
}

/// A guaranteed-profit combination found for one event and market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Sport key copied from the snapshot.
    pub sport: String,
    /// Home team.
    pub home_team: String,
    /// Away team.
    pub away_team: String,
    /// Event start.
    #[serde(with = "time::serde::rfc3339")]
    pub commence_time: OffsetDateTime,
    /// Market the legs belong to.
    pub market: MarketKey,
    /// Earlier bookmaker of the winning pair.
    pub bookmaker_a: String,
    /// Later bookmaker of the winning pair.
    pub bookmaker_b: String,
    /// Registry tier of `bookmaker_a`.
    pub reliability_a: Reliability,
    /// Registry tier of `bookmaker_b`.
    pub reliability_b: Reliability,
    /// Detection path that produced the opportunity.
    pub kind: OpportunityKind,
    /// One leg per outcome, in market order.
    pub legs: SmallVec<[Leg; 3]>,
    /// Total amount staked across legs.
    pub total_stake: Decimal,
    /// Sum of implied probabilities of the winning prices.
    pub implied_sum: f64,
    /// Guaranteed return on total stake, in percent.
    pub profit_margin_percent: f64,
    /// `total_stake * profit_margin_percent / 100`, rounded.
    pub guaranteed_profit_amount: Decimal,
    /// When the opportunity was detected.
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
}

impl ArbitrageOpportunity {
    /// Structured key used by the deduplicator.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            sport: self.sport.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            market: self.market,
            bookmaker_a: self.bookmaker_a.clone(),
            bookmaker_b: self.bookmaker_b.clone(),
        }
    }

    /// Sum of leg stakes.
    pub fn staked(&self) -> Decimal {
        self.legs.iter().map(|leg| leg.stake_amount).sum()
    }

    /// Smallest payout across legs after stake rounding.
    pub fn worst_case_payout(&self) -> Decimal {
        self.legs
            .iter()
            .map(Leg::payout)
            .min()
            .unwrap_or(Decimal::ZERO)
    }

    /// `"Home vs Away"`.
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

impl std::fmt::Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | +{:.2}% | profit {} on {}",
            self.matchup(),
            self.market.display_name(),
            self.profit_margin_percent,
            self.guaranteed_profit_amount,
            self.total_stake,
        )?;
        for leg in &self.legs {
            write!(
                f,
                " | {} {} @ {} stake {}",
                leg.bookmaker_id, leg.outcome_name, leg.price, leg.stake_amount
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use smallvec::smallvec;
    use time::macros::datetime;

    pub(crate) fn sample_opportunity() -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            sport: "basketball_nba".to_string(),
            home_team: "Lakers".to_string(),
            away_team: "Celtics".to_string(),
            commence_time: datetime!(2026-10-21 02:00 UTC),
            market: MarketKey::H2h,
            bookmaker_a: "1xBet".to_string(),
            bookmaker_b: "Dafabet".to_string(),
            reliability_a: Reliability::Low,
            reliability_b: Reliability::Medium,
            kind: OpportunityKind::BestOfPair,
            legs: smallvec![
                Leg {
                    outcome_name: "Lakers".to_string(),
                    price: 2.0,
                    bookmaker_id: "1xBet".to_string(),
                    stake_amount: dec!(523.81),
                },
                Leg {
                    outcome_name: "Celtics".to_string(),
                    price: 2.2,
                    bookmaker_id: "Dafabet".to_string(),
                    stake_amount: dec!(476.19),
                },
            ],
            total_stake: dec!(1000),
            implied_sum: 0.5 + 1.0 / 2.2,
            profit_margin_percent: (1.0 - (0.5 + 1.0 / 2.2)) * 100.0,
            guaranteed_profit_amount: dec!(45.45),
            detected_at: datetime!(2026-10-18 12:00 UTC),
        }
    }

    #[test]
    fn dedup_key_ignores_prices() {
        let first = sample_opportunity();
        let mut moved = sample_opportunity();
        moved.legs[0].price = 2.05;
        moved.profit_margin_percent += 1.0;

        assert_eq!(first.dedup_key(), moved.dedup_key());
    }

    #[test]
    fn dedup_key_distinguishes_bookmaker_pairs() {
        let first = sample_opportunity();
        let mut other = sample_opportunity();
        other.bookmaker_b = "Parimatch".to_string();

        assert_ne!(first.dedup_key(), other.dedup_key());
    }

    #[test]
    fn staked_and_worst_case_payout() {
        let opp = sample_opportunity();

        assert_eq!(opp.staked(), dec!(1000));
        // 523.81 * 2.0 = 1047.62, 476.19 * 2.2 = 1047.618
        assert_eq!(opp.worst_case_payout(), dec!(1047.618));
    }

    #[test]
    fn oversized_leg_payout_saturates() {
        let mut opp = sample_opportunity();
        opp.legs[0].price = 1e27;

        assert_eq!(opp.legs[0].payout(), Decimal::MAX);
        assert_eq!(opp.worst_case_payout(), dec!(1047.618));
    }

    #[test]
    fn display_lists_legs() {
        let rendered = sample_opportunity().to_string();

        assert!(rendered.starts_with("Lakers vs Celtics | Match Winner | +4.55%"));
        assert!(rendered.contains("Dafabet Celtics @ 2.2 stake 476.19"));
    }
}
