//! Odds snapshot types: one event's quoted markets across bookmakers.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use time::OffsetDateTime;

use crate::error::OddsError;

/// Market keys understood by the engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarketKey {
    /// Match winner.
    #[serde(rename = "h2h")]
    #[strum(to_string = "h2h")]
    H2h,
    /// Handicap.
    Spreads,
    /// Over/under.
    Totals,
    /// Both teams to score.
    Btts,
    /// Draw no bet.
    DrawNoBet,
    /// Double chance.
    DoubleChance,
    /// Alternate handicap lines.
    AlternateSpreads,
    /// Alternate over/under lines.
    AlternateTotals,
    /// Team points.
    TeamTotals,
    /// Margin of victory.
    WinningMargin,
    /// Race to points.
    RaceToPoints,
    /// Player points.
    PlayerPoints,
}

impl MarketKey {
    /// Markets scanned when nothing else is configured.
    pub const DEFAULT_SCAN: [MarketKey; 3] = [MarketKey::H2h, MarketKey::Spreads, MarketKey::Totals];

    /// Human-readable market name.
    pub fn display_name(&self) -> &'static str {
        match self {
            MarketKey::H2h => "Match Winner",
            MarketKey::Spreads => "Handicap",
            MarketKey::Totals => "Over/Under",
            MarketKey::Btts => "Both Teams To Score",
            MarketKey::DrawNoBet => "Draw No Bet",
            MarketKey::DoubleChance => "Double Chance",
            MarketKey::AlternateSpreads => "Alternate Handicap",
            MarketKey::AlternateTotals => "Alternate Over/Under",
            MarketKey::TeamTotals => "Team Points",
            MarketKey::WinningMargin => "Margin of Victory",
            MarketKey::RaceToPoints => "Race to Points",
            MarketKey::PlayerPoints => "Player Points",
        }
    }
}

/// A single priced outcome in decimal odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Outcome name as quoted (team name, "Over", "Draw", ...).
    pub name: String,
    /// Decimal odds, always greater than 1.0.
    pub price: f64,
}

impl Outcome {
    /// Create an outcome, rejecting prices that are not valid decimal odds.
    pub fn new(name: impl Into<String>, price: f64) -> Result<Self, OddsError> {
        let name = name.into();
        if !price.is_finite() || price <= 1.0 {
            return Err(OddsError::InvalidPrice {
                outcome: name,
                price,
            });
        }
        Ok(Self { name, price })
    }

    /// Probability implied by the price, ignoring bookmaker margin.
    pub fn implied_probability(&self) -> f64 {
        1.0 / self.price
    }
}

/// One bookmaker's quote for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    outcomes: Vec<Outcome>,
}

impl MarketQuote {
    /// Create a market quote from already-validated outcomes.
    pub fn new(market: MarketKey, outcomes: Vec<Outcome>) -> Result<Self, OddsError> {
        if outcomes.is_empty() {
            return Err(OddsError::EmptyMarket(market.to_string()));
        }
        Ok(Self { outcomes })
    }

    /// Quoted outcomes in provider order.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the quote has no outcomes (never true for a constructed quote).
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Sum of implied probabilities; below 1.0 means the book alone is an arbitrage.
    pub fn overround(&self) -> f64 {
        self.outcomes.iter().map(Outcome::implied_probability).sum()
    }
}

/// One bookmaker's quotes for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    bookmaker_id: String,
    market_quotes: HashMap<MarketKey, MarketQuote>,
}

impl BookmakerQuote {
    /// Create a bookmaker quote with no markets.
    pub fn new(bookmaker_id: impl Into<String>) -> Self {
        Self {
            bookmaker_id: bookmaker_id.into(),
            market_quotes: HashMap::new(),
        }
    }

    /// Add a market quote, replacing any existing quote for the key.
    pub fn with_market(mut self, market: MarketKey, quote: MarketQuote) -> Self {
        self.market_quotes.insert(market, quote);
        self
    }

    /// Bookmaker identifier (registry name).
    pub fn bookmaker_id(&self) -> &str {
        &self.bookmaker_id
    }

    /// Quote for a market, if this bookmaker prices it.
    pub fn market(&self, market: MarketKey) -> Option<&MarketQuote> {
        self.market_quotes.get(&market)
    }

    /// All market quotes.
    pub fn markets(&self) -> &HashMap<MarketKey, MarketQuote> {
        &self.market_quotes
    }
}

/// One event's odds across bookmakers at one point in time.
///
/// Snapshots are never mutated; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    sport_key: String,
    home_team: String,
    away_team: String,
    #[serde(with = "time::serde::rfc3339")]
    commence_time: OffsetDateTime,
    bookmaker_quotes: Vec<BookmakerQuote>,
}

impl OddsSnapshot {
    /// Create a snapshot.
    pub fn new(
        sport_key: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        commence_time: OffsetDateTime,
        bookmaker_quotes: Vec<BookmakerQuote>,
    ) -> Self {
        Self {
            sport_key: sport_key.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            commence_time,
            bookmaker_quotes,
        }
    }

    /// Sport/league key, e.g. `soccer_epl`.
    pub fn sport_key(&self) -> &str {
        &self.sport_key
    }

    /// Home team.
    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    /// Away team.
    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    /// Event start time.
    pub fn commence_time(&self) -> OffsetDateTime {
        self.commence_time
    }

    /// Bookmaker quotes in provider order.
    pub fn bookmaker_quotes(&self) -> &[BookmakerQuote] {
        &self.bookmaker_quotes
    }

    /// Sport name derived from the key (`soccer_epl` → `Soccer`).
    pub fn sport_name(&self) -> String {
        let head = self.sport_key.split('_').next().unwrap_or_default();
        let mut chars = head.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// League name derived from the key (`soccer_spain_la_liga` → `SPAIN LA LIGA`).
    pub fn league_name(&self) -> String {
        self.sport_key
            .split('_')
            .skip(1)
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decoded snapshots for one (sport, market) request.
#[derive(Debug, Clone)]
pub struct OddsBatch {
    /// Sport key requested.
    pub sport: String,
    /// Market requested.
    pub market: MarketKey,
    /// Events returned, shared with the cache.
    pub snapshots: Arc<Vec<OddsSnapshot>>,
}

impl OddsBatch {
    /// Create a batch.
    pub fn new(sport: impl Into<String>, market: MarketKey, snapshots: Arc<Vec<OddsSnapshot>>) -> Self {
        Self {
            sport: sport.into(),
            market,
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use time::macros::datetime;

    #[test]
    fn market_key_round_trips_provider_names() {
        assert_eq!(MarketKey::from_str("h2h").unwrap(), MarketKey::H2h);
        assert_eq!(MarketKey::from_str("draw_no_bet").unwrap(), MarketKey::DrawNoBet);
        assert_eq!(MarketKey::H2h.to_string(), "h2h");
        assert_eq!(MarketKey::AlternateTotals.to_string(), "alternate_totals");
        assert!(MarketKey::from_str("outrights").is_err());
    }

    #[test]
    fn market_key_display_names() {
        assert_eq!(MarketKey::H2h.display_name(), "Match Winner");
        assert_eq!(MarketKey::Spreads.display_name(), "Handicap");
        assert_eq!(MarketKey::Totals.display_name(), "Over/Under");
    }

    #[test]
    fn outcome_rejects_non_decimal_odds() {
        assert!(Outcome::new("Arsenal", 1.0).is_err());
        assert!(Outcome::new("Arsenal", 0.5).is_err());
        assert!(Outcome::new("Arsenal", f64::NAN).is_err());
        assert!(Outcome::new("Arsenal", 1.01).is_ok());
    }

    #[test]
    fn market_quote_rejects_empty_outcomes() {
        assert!(MarketQuote::new(MarketKey::H2h, vec![]).is_err());
    }

    #[test]
    fn overround_sums_implied_probabilities() {
        let quote = MarketQuote::new(
            MarketKey::H2h,
            vec![
                Outcome::new("A", 2.0).unwrap(),
                Outcome::new("B", 4.0).unwrap(),
            ],
        )
        .unwrap();

        assert!((quote.overround() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn sport_and_league_names_from_key() {
        let snapshot = OddsSnapshot::new(
            "soccer_spain_la_liga",
            "Real Madrid",
            "Barcelona",
            datetime!(2026-10-20 19:00 UTC),
            vec![],
        );

        assert_eq!(snapshot.sport_name(), "Soccer");
        assert_eq!(snapshot.league_name(), "SPAIN LA LIGA");
    }
}
