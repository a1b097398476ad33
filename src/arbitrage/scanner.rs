//! Batch scanning of fetched odds.

use std::time::Instant;

use tracing::{debug, info, instrument};

use super::detector::OpportunityDetector;
use super::opportunity::ArbitrageOpportunity;
use super::refresh::{RefreshOutcome, RefreshTarget};
use crate::metrics;
use crate::odds::OddsBatch;
use crate::preferences::UserArbitragePreferences;

/// Runs the detector over every snapshot of every batch.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    detector: OpportunityDetector,
}

impl Scanner {
    /// Create a scanner around a detector.
    pub fn new(detector: OpportunityDetector) -> Self {
        Self { detector }
    }

    /// The wrapped detector.
    pub fn detector(&self) -> &OpportunityDetector {
        &self.detector
    }

    /// Every opportunity meeting the user's threshold, best margin first.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn scan(
        &self,
        batches: &[OddsBatch],
        prefs: &UserArbitragePreferences,
    ) -> Vec<ArbitrageOpportunity> {
        let start = Instant::now();
        let mut scanned = 0u64;
        let mut found = Vec::new();

        for batch in batches {
            for snapshot in batch.snapshots.iter() {
                scanned += 1;
                let Some(opportunity) = self.detector.find_best_opportunity(
                    snapshot,
                    batch.market,
                    &prefs.eligible_bookmakers,
                    prefs.stake_amount,
                ) else {
                    continue;
                };

                if prefs.meets_threshold(opportunity.profit_margin_percent) {
                    found.push(opportunity);
                } else {
                    debug!(
                        matchup = %opportunity.matchup(),
                        margin = opportunity.profit_margin_percent,
                        threshold = prefs.min_profit_threshold_percent,
                        "Opportunity below profit threshold"
                    );
                }
            }
        }

        found.sort_by(|a, b| b.profit_margin_percent.total_cmp(&a.profit_margin_percent));

        metrics::inc_snapshots_scanned(scanned);
        metrics::inc_opportunities_detected(found.len() as u64);
        metrics::record_opportunity_detection_latency(start);

        info!(
            snapshots = scanned,
            opportunities = found.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan complete"
        );

        found
    }

    /// The single best opportunity, if any.
    pub fn scan_best(
        &self,
        batches: &[OddsBatch],
        prefs: &UserArbitragePreferences,
    ) -> Option<ArbitrageOpportunity> {
        self.scan(batches, prefs).into_iter().next()
    }

    /// Re-run detection for one event in a freshly fetched batch.
    #[instrument(skip_all, fields(target = %target))]
    pub fn refresh(
        &self,
        batch: &OddsBatch,
        target: &RefreshTarget,
        prefs: &UserArbitragePreferences,
    ) -> RefreshOutcome {
        let Some(snapshot) = batch.snapshots.iter().find(|s| target.matches(s)) else {
            debug!(events = batch.snapshots.len(), "Refresh target not in fresh odds");
            return RefreshOutcome::MatchNotFound;
        };

        match self.detector.find_best_opportunity(
            snapshot,
            target.market,
            &prefs.eligible_bookmakers,
            prefs.stake_amount,
        ) {
            Some(opportunity) if prefs.meets_threshold(opportunity.profit_margin_percent) => {
                info!(margin = opportunity.profit_margin_percent, "Opportunity still available");
                RefreshOutcome::Found(Box::new(opportunity))
            }
            _ => RefreshOutcome::NoLongerAvailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::{BookmakerQuote, MarketKey, MarketQuote, OddsSnapshot, Outcome};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use time::macros::datetime;

    fn event(home: &str, away: &str, a: (f64, f64), b: (f64, f64)) -> OddsSnapshot {
        let book = |id: &str, (p0, p1): (f64, f64)| {
            BookmakerQuote::new(id).with_market(
                MarketKey::H2h,
                MarketQuote::new(
                    MarketKey::H2h,
                    vec![Outcome::new(home, p0).unwrap(), Outcome::new(away, p1).unwrap()],
                )
                .unwrap(),
            )
        };
        OddsSnapshot::new(
            "soccer_epl",
            home,
            away,
            datetime!(2026-10-24 14:00 UTC),
            vec![book("1xBet", a), book("Dafabet", b)],
        )
    }

    fn batch(snapshots: Vec<OddsSnapshot>) -> OddsBatch {
        OddsBatch::new("soccer_epl", MarketKey::H2h, Arc::new(snapshots))
    }

    #[test]
    fn sorts_by_margin_and_applies_threshold() {
        let batches = vec![batch(vec![
            // ~0.25% margin, below the default threshold.
            event("Arsenal", "Chelsea", (2.01, 1.9), (1.8, 2.0)),
            // ~4.5%.
            event("Liverpool", "Everton", (2.0, 1.8), (1.7, 2.2)),
            // ~9%.
            event("Spurs", "Fulham", (2.2, 1.8), (1.7, 2.2)),
            // None.
            event("Leeds", "Wolves", (1.9, 1.9), (1.9, 1.9)),
        ])];

        let found = Scanner::default().scan(&batches, &UserArbitragePreferences::default());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].home_team, "Spurs");
        assert_eq!(found[1].home_team, "Liverpool");
    }

    #[test]
    fn zero_threshold_keeps_small_margins() {
        let batches = vec![batch(vec![event("Arsenal", "Chelsea", (2.01, 1.9), (1.8, 2.0))])];
        let prefs = UserArbitragePreferences {
            min_profit_threshold_percent: 0.0,
            ..Default::default()
        };

        assert!(Scanner::default().scan_best(&batches, &prefs).is_some());
    }

    #[test]
    fn refresh_reports_each_outcome() {
        let scanner = Scanner::default();
        let prefs = UserArbitragePreferences::default();
        let target = RefreshTarget::new("soccer_epl", MarketKey::H2h, "Liverpool", "Everton");

        let live = batch(vec![
            event("Arsenal", "Chelsea", (1.9, 1.9), (1.9, 1.9)),
            event("Liverpool", "Everton", (2.0, 1.8), (1.7, 2.2)),
        ]);
        let refreshed = scanner.refresh(&live, &target, &prefs);
        let opportunity = refreshed.opportunity().unwrap();
        assert_eq!(opportunity.home_team, "Liverpool");
        assert_eq!(opportunity.bookmaker_b, "Dafabet");

        let closed = batch(vec![event("Liverpool", "Everton", (1.9, 1.9), (1.9, 1.9))]);
        assert_eq!(scanner.refresh(&closed, &target, &prefs), RefreshOutcome::NoLongerAvailable);

        let gone = batch(vec![event("Arsenal", "Chelsea", (2.0, 1.8), (1.7, 2.2))]);
        assert_eq!(scanner.refresh(&gone, &target, &prefs), RefreshOutcome::MatchNotFound);
    }

    #[test]
    fn refresh_applies_profit_threshold() {
        let target = RefreshTarget::new("soccer_epl", MarketKey::H2h, "Arsenal", "Chelsea");
        // ~0.25% margin.
        let thin = batch(vec![event("Arsenal", "Chelsea", (2.01, 1.9), (1.8, 2.0))]);

        let outcome = Scanner::default().refresh(&thin, &target, &UserArbitragePreferences::default());

        assert_eq!(outcome, RefreshOutcome::NoLongerAvailable);
    }

    #[test]
    fn ineligible_bookmakers_yield_nothing() {
        let batches = vec![batch(vec![event("Liverpool", "Everton", (2.0, 1.8), (1.7, 2.2))])];
        let prefs = UserArbitragePreferences::new(dec!(1000), 0.5, ["1xBet", "Melbet"]).unwrap();

        assert!(Scanner::default().scan(&batches, &prefs).is_empty());
    }
}
