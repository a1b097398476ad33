//! Odds provider access.
//!
//! This module handles:
//! - HTTP requests to The Odds API, one per (sport, market)
//! - A short-lived cache of decoded responses
//! - Cache-bypassing refetches for re-checking one event

pub mod cache;
pub mod client;

use std::future::Future;

pub use cache::OddsCache;
pub use client::OddsApiClient;

use tracing::warn;

use crate::metrics;
use crate::odds::{MarketKey, OddsBatch};

/// Anything that can produce fresh odds batches for the monitor.
pub trait OddsSource: Send + Sync + 'static {
    /// Fetch every (sport, market) pair; failures yield no batch.
    fn fetch_all(
        &self,
        sports: &[String],
        markets: &[MarketKey],
    ) -> impl Future<Output = Vec<OddsBatch>> + Send;

    /// Fetch one (sport, market) without serving cached data.
    fn fetch_fresh(
        &self,
        sport: &str,
        market: MarketKey,
    ) -> impl Future<Output = Option<OddsBatch>> + Send;
}

impl OddsSource for OddsApiClient {
    fn fetch_all(
        &self,
        sports: &[String],
        markets: &[MarketKey],
    ) -> impl Future<Output = Vec<OddsBatch>> + Send {
        self.fetch_batches(sports, markets)
    }

    fn fetch_fresh(
        &self,
        sport: &str,
        market: MarketKey,
    ) -> impl Future<Output = Option<OddsBatch>> + Send {
        async move {
            match self.refresh_odds(sport, market).await {
                Ok(snapshots) => Some(OddsBatch::new(sport, market, snapshots)),
                Err(e) => {
                    metrics::inc_odds_fetch_failures();
                    warn!(sport = %sport, market = %market, error = %e, "Odds refresh failed");
                    None
                }
            }
        }
    }
}
