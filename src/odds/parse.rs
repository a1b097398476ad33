//! Decoding of odds provider documents into snapshots.
//!
//! A provider document is a JSON array of events. Anything that cannot be
//! decoded is dropped with a warning: a malformed document means "no data for
//! this sport/market", never a failure of the whole batch.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::types::{BookmakerQuote, MarketKey, MarketQuote, OddsSnapshot, Outcome};
use crate::error::OddsError;

#[derive(Debug, Deserialize)]
struct RawEvent {
    sport_key: Option<String>,
    home_team: Option<String>,
    away_team: Option<String>,
    commence_time: Option<String>,
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Deserialize)]
struct RawBookmaker {
    key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    markets: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    name: String,
    price: f64,
}

/// Parse a provider response body.
pub fn parse_odds_document(body: &str) -> Vec<OddsSnapshot> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => parse_odds_value(value),
        Err(e) => {
            warn!(error = %e, "Odds document is not valid JSON");
            Vec::new()
        }
    }
}

/// Parse an already-decoded provider response.
pub fn parse_odds_value(value: Value) -> Vec<OddsSnapshot> {
    let Value::Array(events) = value else {
        warn!("Odds document is not an array of events");
        return Vec::new();
    };

    events
        .into_iter()
        .filter_map(|event| {
            let raw: RawEvent = match serde_json::from_value(event) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed event");
                    return None;
                }
            };
            match snapshot_from_raw(raw) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(error = %e, "Skipping incomplete event");
                    None
                }
            }
        })
        .collect()
}

/// Parse an ISO-8601 commence time such as `2026-10-20T19:00:00Z`.
pub fn parse_commence_time(raw: &str) -> Result<OffsetDateTime, OddsError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| OddsError::InvalidTimestamp(raw.to_string()))
}

fn snapshot_from_raw(raw: RawEvent) -> Result<OddsSnapshot, OddsError> {
    let sport_key = raw.sport_key.ok_or(OddsError::MissingField("sport_key"))?;
    let home_team = raw.home_team.ok_or(OddsError::MissingField("home_team"))?;
    let away_team = raw.away_team.ok_or(OddsError::MissingField("away_team"))?;
    let commence_time = raw
        .commence_time
        .as_deref()
        .ok_or(OddsError::MissingField("commence_time"))
        .and_then(parse_commence_time)?;

    let quotes = raw
        .bookmakers
        .into_iter()
        .filter_map(bookmaker_from_raw)
        .collect();

    Ok(OddsSnapshot::new(
        sport_key,
        home_team,
        away_team,
        commence_time,
        quotes,
    ))
}

fn bookmaker_from_raw(raw: RawBookmaker) -> Option<BookmakerQuote> {
    let Some(id) = raw.title.or(raw.key) else {
        debug!("Skipping bookmaker without id");
        return None;
    };

    let quote = raw
        .markets
        .into_iter()
        .fold(BookmakerQuote::new(id), |quote, market| {
            let Ok(key) = MarketKey::from_str(&market.key) else {
                debug!(market = %market.key, "Ignoring unsupported market");
                return quote;
            };
            match market_from_raw(key, market.outcomes) {
                Ok(market_quote) => quote.with_market(key, market_quote),
                Err(e) => {
                    debug!(bookmaker = %quote.bookmaker_id(), error = %e, "Dropping market quote");
                    quote
                }
            }
        });

    Some(quote)
}

fn market_from_raw(key: MarketKey, outcomes: Vec<RawOutcome>) -> Result<MarketQuote, OddsError> {
    let outcomes = outcomes
        .into_iter()
        .map(|o| Outcome::new(o.name, o.price))
        .collect::<Result<Vec<_>, _>>()?;
    MarketQuote::new(key, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const DOCUMENT: &str = r#"[
        {
            "id": "e1",
            "sport_key": "soccer_epl",
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "commence_time": "2026-10-20T19:00:00Z",
            "bookmakers": [
                {
                    "key": "onexbet",
                    "title": "1xBet",
                    "markets": [
                        {"key": "h2h", "outcomes": [
                            {"name": "Arsenal", "price": 2.1},
                            {"name": "Chelsea", "price": 3.4},
                            {"name": "Draw", "price": 3.3}
                        ]},
                        {"key": "outrights", "outcomes": [{"name": "x", "price": 5.0}]}
                    ]
                },
                {
                    "key": "dafabet",
                    "markets": [
                        {"key": "h2h", "outcomes": [
                            {"name": "Arsenal", "price": 0.9},
                            {"name": "Chelsea", "price": 3.5}
                        ]},
                        {"key": "totals", "outcomes": [
                            {"name": "Over", "price": 1.9},
                            {"name": "Under", "price": 1.95}
                        ]}
                    ]
                }
            ]
        },
        {"sport_key": "soccer_epl", "home_team": "Spurs"},
        "garbage"
    ]"#;

    #[test]
    fn parses_events_and_skips_broken_ones() {
        let snapshots = parse_odds_document(DOCUMENT);

        assert_eq!(snapshots.len(), 1);
        let snapshot = &snapshots[0];
        assert_eq!(snapshot.sport_key(), "soccer_epl");
        assert_eq!(snapshot.home_team(), "Arsenal");
        assert_eq!(snapshot.commence_time(), datetime!(2026-10-20 19:00 UTC));
        assert_eq!(snapshot.bookmaker_quotes().len(), 2);
    }

    #[test]
    fn bookmaker_id_prefers_title_then_key() {
        let snapshots = parse_odds_document(DOCUMENT);
        let quotes = snapshots[0].bookmaker_quotes();

        assert_eq!(quotes[0].bookmaker_id(), "1xBet");
        assert_eq!(quotes[1].bookmaker_id(), "dafabet");
    }

    #[test]
    fn unsupported_and_invalid_markets_are_dropped() {
        let snapshots = parse_odds_document(DOCUMENT);
        let quotes = snapshots[0].bookmaker_quotes();

        assert_eq!(quotes[0].markets().len(), 1);
        assert_eq!(quotes[0].market(MarketKey::H2h).unwrap().len(), 3);
        // Price 0.9 invalidates the whole h2h quote, totals survives.
        assert!(quotes[1].market(MarketKey::H2h).is_none());
        assert!(quotes[1].market(MarketKey::Totals).is_some());
    }

    #[test]
    fn non_array_documents_yield_no_data() {
        assert!(parse_odds_document(r#"{"message": "quota exceeded"}"#).is_empty());
        assert!(parse_odds_document("not json").is_empty());
        assert!(parse_odds_document("[]").is_empty());
    }

    #[test]
    fn commence_time_accepts_offsets() {
        let parsed = parse_commence_time("2026-10-20T21:00:00+02:00").unwrap();
        assert_eq!(parsed, datetime!(2026-10-20 19:00 UTC));
        assert!(parse_commence_time("20 Oct 2026").is_err());
    }
}
