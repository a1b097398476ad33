//! Arbitrage opportunity detection across bookmaker pairs.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use smallvec::SmallVec;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::allocator::allocate_stakes_with_precision;
use super::money::DEFAULT_MONEY_PRECISION;
use super::opportunity::{ArbitrageOpportunity, Leg, OpportunityKind};
use crate::error::ArbitrageError;
use crate::odds::{BookmakerQuote, BookmakerRegistry, MarketKey, OddsSnapshot, Outcome};

/// Default ceiling on the position-paired implied sum considered at all.
pub const DEFAULT_NEAR_ARB_CEILING: f64 = 1.10;

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Position-paired sums at or above this are discarded without inspection.
    /// Only sums below 1.0 are ever reported.
    pub near_arb_ceiling: f64,
    /// Decimal places for money amounts.
    pub money_precision: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            near_arb_ceiling: DEFAULT_NEAR_ARB_CEILING,
            money_precision: DEFAULT_MONEY_PRECISION,
        }
    }
}

/// Finds the best arbitrage in a snapshot.
///
/// Stateless apart from configuration: safe to share across threads and call
/// concurrently for independent snapshots.
#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    config: DetectorConfig,
    registry: Arc<BookmakerRegistry>,
}

/// Winning leg at one outcome position.
#[derive(Debug, Clone, Copy)]
struct PickedLeg<'a> {
    outcome: &'a Outcome,
    bookmaker: &'a str,
}

/// Best combination found for one bookmaker pair.
#[derive(Debug)]
struct Candidate<'a> {
    bookmaker_a: &'a str,
    bookmaker_b: &'a str,
    kind: OpportunityKind,
    implied_sum: f64,
    profit_margin: f64,
    legs: SmallVec<[PickedLeg<'a>; 3]>,
}

impl Default for OpportunityDetector {
    fn default() -> Self {
        Self::new(
            DetectorConfig::default(),
            Arc::new(BookmakerRegistry::builtin().clone()),
        )
    }
}

impl OpportunityDetector {
    /// Create a detector.
    pub fn new(config: DetectorConfig, registry: Arc<BookmakerRegistry>) -> Self {
        Self { config, registry }
    }

    /// Detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Bookmaker registry used for reliability lookups.
    pub fn registry(&self) -> &BookmakerRegistry {
        &self.registry
    }

    /// Find the highest-margin arbitrage for `market` among eligible bookmakers.
    ///
    /// Returns `None` when nothing qualifies; missing markets and mismatched
    /// outcome counts only skip the affected pair.
    #[instrument(
        skip(self, snapshot, eligible_bookmakers),
        fields(event = %snapshot.home_team(), market = %market)
    )]
    pub fn find_best_opportunity(
        &self,
        snapshot: &OddsSnapshot,
        market: MarketKey,
        eligible_bookmakers: &HashSet<String>,
        stake_amount: Decimal,
    ) -> Option<ArbitrageOpportunity> {
        if stake_amount <= Decimal::ZERO {
            warn!(stake = %stake_amount, "Stake must be positive");
            return None;
        }
        if eligible_bookmakers.is_empty() {
            warn!("No eligible bookmakers selected");
            return None;
        }

        let filtered: Vec<&BookmakerQuote> = snapshot
            .bookmaker_quotes()
            .iter()
            .filter(|q| eligible_bookmakers.contains(q.bookmaker_id()))
            .collect();

        if filtered.len() < 2 {
            debug!(eligible = filtered.len(), "Not enough bookmakers to compare");
            return None;
        }

        let mut best: Option<Candidate<'_>> = None;
        for (i, a) in filtered.iter().enumerate() {
            for b in &filtered[i + 1..] {
                match self.evaluate_pair(a, b, market) {
                    Ok(Some(candidate)) => {
                        let improves = best
                            .as_ref()
                            .map_or(true, |current| candidate.profit_margin > current.profit_margin);
                        if improves {
                            best = Some(candidate);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => debug!(
                        bookmaker_a = %a.bookmaker_id(),
                        bookmaker_b = %b.bookmaker_id(),
                        reason = %e,
                        "Skipping bookmaker pair"
                    ),
                }
            }
        }

        let best = best?;
        let opportunity = self.finalize(snapshot, market, stake_amount, best)?;

        info!(
            matchup = %opportunity.matchup(),
            bookmaker_a = %opportunity.bookmaker_a,
            bookmaker_b = %opportunity.bookmaker_b,
            profit_margin = opportunity.profit_margin_percent,
            guaranteed_profit = %opportunity.guaranteed_profit_amount,
            "Arbitrage opportunity detected"
        );

        Some(opportunity)
    }

    /// Evaluate one bookmaker pair, `a` before `b` in filtered order.
    fn evaluate_pair<'a>(
        &self,
        a: &'a BookmakerQuote,
        b: &'a BookmakerQuote,
        market: MarketKey,
    ) -> Result<Option<Candidate<'a>>, ArbitrageError> {
        let quote_a = a.market(market).ok_or_else(|| ArbitrageError::NoData {
            bookmaker: a.bookmaker_id().to_string(),
            market: market.to_string(),
        })?;
        let quote_b = b.market(market).ok_or_else(|| ArbitrageError::NoData {
            bookmaker: b.bookmaker_id().to_string(),
            market: market.to_string(),
        })?;

        if quote_a.len() != quote_b.len() {
            return Err(ArbitrageError::ShapeMismatch {
                left: quote_a.len(),
                right: quote_b.len(),
            });
        }

        // Per position, back whichever bookmaker pays more; ties go to `a`.
        let legs: SmallVec<[PickedLeg<'a>; 3]> = quote_a
            .outcomes()
            .iter()
            .zip(quote_b.outcomes())
            .map(|(oa, ob)| {
                if ob.price > oa.price {
                    PickedLeg {
                        outcome: ob,
                        bookmaker: b.bookmaker_id(),
                    }
                } else {
                    PickedLeg {
                        outcome: oa,
                        bookmaker: a.bookmaker_id(),
                    }
                }
            })
            .collect();

        let candidate = |kind, implied_sum: f64| Candidate {
            bookmaker_a: a.bookmaker_id(),
            bookmaker_b: b.bookmaker_id(),
            kind,
            implied_sum,
            profit_margin: (1.0 - implied_sum) * 100.0,
            legs: legs.clone(),
        };

        if quote_a.len() == 2 {
            let implied_sum: f64 = legs.iter().map(|leg| 1.0 / leg.outcome.price).sum();
            if implied_sum < 1.0 {
                debug!(implied_sum, "Best-of pair arbitrage");
                return Ok(Some(candidate(OpportunityKind::BestOfPair, implied_sum)));
            }
        }

        let implied_sum: f64 = quote_a
            .outcomes()
            .iter()
            .zip(quote_b.outcomes())
            .map(|(oa, ob)| oa.implied_probability().min(ob.implied_probability()))
            .sum();

        if implied_sum >= self.config.near_arb_ceiling {
            return Ok(None);
        }

        let profit_margin = (1.0 - implied_sum) * 100.0;
        if profit_margin <= 0.0 {
            debug!(implied_sum, "Near-arbitrage without positive margin");
            return Ok(None);
        }

        Ok(Some(candidate(OpportunityKind::PositionPaired, implied_sum)))
    }

    /// Attach the stake split and metadata to the winning candidate.
    fn finalize(
        &self,
        snapshot: &OddsSnapshot,
        market: MarketKey,
        stake_amount: Decimal,
        best: Candidate<'_>,
    ) -> Option<ArbitrageOpportunity> {
        let prices: SmallVec<[f64; 3]> = best.legs.iter().map(|leg| leg.outcome.price).collect();

        let allocation =
            match allocate_stakes_with_precision(&prices, stake_amount, self.config.money_precision) {
                Ok(allocation) => allocation,
                Err(e) => {
                    warn!(error = %e, "Stake allocation failed for detected opportunity");
                    return None;
                }
            };

        let legs = best
            .legs
            .iter()
            .zip(allocation.stakes)
            .map(|(leg, stake)| Leg {
                outcome_name: leg.outcome.name.clone(),
                price: leg.outcome.price,
                bookmaker_id: leg.bookmaker.to_string(),
                stake_amount: stake,
            })
            .collect();

        Some(ArbitrageOpportunity {
            sport: snapshot.sport_key().to_string(),
            home_team: snapshot.home_team().to_string(),
            away_team: snapshot.away_team().to_string(),
            commence_time: snapshot.commence_time(),
            market,
            bookmaker_a: best.bookmaker_a.to_string(),
            bookmaker_b: best.bookmaker_b.to_string(),
            reliability_a: self.registry.reliability(best.bookmaker_a),
            reliability_b: self.registry.reliability(best.bookmaker_b),
            kind: best.kind,
            legs,
            total_stake: stake_amount,
            implied_sum: best.implied_sum,
            profit_margin_percent: best.profit_margin,
            guaranteed_profit_amount: allocation.guaranteed_profit,
            detected_at: OffsetDateTime::now_utc(),
        })
    }
}
