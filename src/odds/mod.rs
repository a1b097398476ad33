//! Odds snapshot model.
//!
//! This module handles:
//! - Snapshot, bookmaker quote and market quote types
//! - The bookmaker registry with reliability tiers
//! - Decoding provider JSON documents into snapshots

pub mod parse;
pub mod registry;
pub mod types;

pub use parse::{parse_commence_time, parse_odds_document, parse_odds_value};
pub use registry::{BookmakerInfo, BookmakerKind, BookmakerRegistry, Reliability};
pub use types::{BookmakerQuote, MarketKey, MarketQuote, OddsBatch, OddsSnapshot, Outcome};
