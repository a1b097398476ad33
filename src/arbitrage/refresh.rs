//! Re-checking a previously alerted opportunity against fresh odds.

use serde::{Deserialize, Serialize};

use super::opportunity::ArbitrageOpportunity;
use crate::odds::{MarketKey, OddsSnapshot};

/// The event and market an earlier opportunity was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefreshTarget {
    /// Sport key to re-fetch.
    pub sport: String,
    /// Market to re-check.
    pub market: MarketKey,
    /// Home team of the event.
    pub home_team: String,
    /// Away team of the event.
    pub away_team: String,
}

impl RefreshTarget {
    /// Create a target.
    pub fn new(
        sport: impl Into<String>,
        market: MarketKey,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            sport: sport.into(),
            market,
            home_team: home_team.into(),
            away_team: away_team.into(),
        }
    }

    /// Whether `snapshot` is this target's event.
    pub fn matches(&self, snapshot: &OddsSnapshot) -> bool {
        snapshot.home_team() == self.home_team && snapshot.away_team() == self.away_team
    }
}

impl From<&ArbitrageOpportunity> for RefreshTarget {
    fn from(opportunity: &ArbitrageOpportunity) -> Self {
        Self::new(
            opportunity.sport.clone(),
            opportunity.market,
            opportunity.home_team.clone(),
            opportunity.away_team.clone(),
        )
    }
}

impl std::fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} vs {} ({}, {})",
            self.home_team, self.away_team, self.sport, self.market
        )
    }
}

/// Result of re-checking a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "opportunity", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The event still carries an opportunity meeting the threshold.
    Found(Box<ArbitrageOpportunity>),
    /// The event was found but no longer qualifies.
    NoLongerAvailable,
    /// Fresh odds were fetched but the event is not among them.
    MatchNotFound,
    /// Fresh odds could not be fetched.
    OddsUnavailable,
}

impl RefreshOutcome {
    /// The refreshed opportunity, if still available.
    pub fn opportunity(&self) -> Option<&ArbitrageOpportunity> {
        match self {
            RefreshOutcome::Found(opportunity) => Some(&**opportunity),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshOutcome::Found(opportunity) => write!(f, "{opportunity}"),
            RefreshOutcome::NoLongerAvailable => f.write_str("Arbitrage opportunity no longer available"),
            RefreshOutcome::MatchNotFound => f.write_str("Match not found in current odds"),
            RefreshOutcome::OddsUnavailable => f.write_str("Could not fetch updated odds"),
        }
    }
}
