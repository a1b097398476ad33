//! HTTP client for The Odds API.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, instrument, warn};
use url::Url;

use super::cache::OddsCache;
use crate::config::Config;
use crate::error::ProviderError;
use crate::metrics;
use crate::odds::{parse_odds_document, MarketKey, OddsBatch, OddsSnapshot};

/// The Odds API client with a response cache.
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Provider base URL, always ending in `/`.
    base_url: Url,
    /// API key sent as `apiKey`.
    api_key: String,
    /// Comma-separated regions.
    regions: String,
    /// Decoded responses shared across scans.
    cache: Arc<OddsCache>,
}

impl OddsApiClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(std::time::Duration::from_secs(5))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        let mut base = config.odds_api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            api_key: config.odds_api_key.clone(),
            regions: config.odds_regions.clone(),
            cache: Arc::new(OddsCache::new(config.odds_cache_ttl())),
        })
    }

    /// Share an existing cache instead of the client's own.
    pub fn with_cache(mut self, cache: Arc<OddsCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The response cache.
    pub fn cache(&self) -> &Arc<OddsCache> {
        &self.cache
    }

    /// Fetch odds for one (sport, market), serving from cache when fresh.
    #[instrument(skip(self), fields(sport = %sport, market = %market))]
    pub async fn fetch_odds(
        &self,
        sport: &str,
        market: MarketKey,
    ) -> Result<Arc<Vec<OddsSnapshot>>, ProviderError> {
        if let Some(cached) = self.cache.get(sport, market) {
            debug!(events = cached.len(), "Odds cache hit");
            return Ok(cached);
        }

        let url = self.base_url.join(&format!("v4/sports/{sport}/odds"))?;
        let start = Instant::now();

        let timed_out = |e: reqwest::Error| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    sport: sport.to_string(),
                    market: market.to_string(),
                }
            } else {
                ProviderError::Http(e)
            }
        };

        let response = self
            .http
            .get(url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("markets", market.as_ref()),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await
            .map_err(timed_out)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                sport: sport.to_string(),
                market: market.to_string(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                sport: sport.to_string(),
                market: market.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(timed_out)?;
        metrics::record_odds_fetch_latency(start, sport);

        let snapshots = Arc::new(parse_odds_document(&body));
        debug!(events = snapshots.len(), "Fetched odds");
        self.cache.insert(sport, market, Arc::clone(&snapshots));

        Ok(snapshots)
    }

    /// Fetch odds for one (sport, market), bypassing any cached response.
    pub async fn refresh_odds(
        &self,
        sport: &str,
        market: MarketKey,
    ) -> Result<Arc<Vec<OddsSnapshot>>, ProviderError> {
        self.cache.invalidate(sport, market);
        self.fetch_odds(sport, market).await
    }

    /// Fetch every (sport, market) concurrently. Failed requests are skipped.
    #[instrument(skip_all, fields(sports = sports.len(), markets = markets.len()))]
    pub async fn fetch_batches(&self, sports: &[String], markets: &[MarketKey]) -> Vec<OddsBatch> {
        let requests = sports.iter().flat_map(|sport| {
            markets.iter().map(move |&market| async move {
                let result = self.fetch_odds(sport, market).await;
                (sport, market, result)
            })
        });

        join_all(requests)
            .await
            .into_iter()
            .filter_map(|(sport, market, result)| match result {
                Ok(snapshots) => Some(OddsBatch::new(sport.as_str(), market, snapshots)),
                Err(e) => {
                    metrics::inc_odds_fetch_failures();
                    warn!(sport = %sport, market = %market, error = %e, "Odds fetch failed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OddsSource;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, Query, State};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;

    const FIXTURE: &str = r#"[{
        "sport_key": "soccer_epl",
        "home_team": "Arsenal",
        "away_team": "Chelsea",
        "commence_time": "2026-10-24T14:00:00Z",
        "bookmakers": [
            {"key": "onexbet", "title": "1xBet", "markets": [
                {"key": "h2h", "outcomes": [
                    {"name": "Arsenal", "price": 2.0},
                    {"name": "Chelsea", "price": 1.8}
                ]}
            ]},
            {"key": "dafabet", "title": "Dafabet", "markets": [
                {"key": "h2h", "outcomes": [
                    {"name": "Arsenal", "price": 1.7},
                    {"name": "Chelsea", "price": 2.2}
                ]}
            ]}
        ]
    }]"#;

    async fn odds(
        State(hits): State<Arc<AtomicUsize>>,
        Path(sport): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        hits.fetch_add(1, Ordering::SeqCst);
        if params.get("apiKey").map(String::as_str) != Some("test-key") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if params.get("oddsFormat").map(String::as_str) != Some("decimal") {
            return StatusCode::BAD_REQUEST.into_response();
        }
        match sport.as_str() {
            "soccer_epl" => ([(header::CONTENT_TYPE, "application/json")], FIXTURE).into_response(),
            "throttled" => StatusCode::TOO_MANY_REQUESTS.into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn serve() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/v4/sports/:sport/odds", get(odds))
            .with_state(Arc::clone(&hits));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn client(base_url: String, api_key: &str) -> OddsApiClient {
        OddsApiClient::new(&Config {
            odds_api_key: api_key.to_string(),
            odds_api_url: base_url,
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_caches_odds() {
        let (base, hits) = serve().await;
        let client = client(base, "test-key");

        let first = client.fetch_odds("soccer_epl", MarketKey::H2h).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].home_team(), "Arsenal");
        assert_eq!(first[0].bookmaker_quotes()[0].bookmaker_id(), "1xBet");

        let second = client.fetch_odds("soccer_epl", MarketKey::H2h).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_bypasses_cache() {
        let (base, hits) = serve().await;
        let client = client(base, "test-key");

        client.fetch_odds("soccer_epl", MarketKey::H2h).await.unwrap();
        let fresh = client.refresh_odds("soccer_epl", MarketKey::H2h).await.unwrap();

        assert_eq!(fresh.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(client.cache().len(), 1);

        let batch = client.fetch_fresh("soccer_epl", MarketKey::H2h).await.unwrap();
        assert_eq!(batch.sport, "soccer_epl");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(client.fetch_fresh("throttled", MarketKey::H2h).await.is_none());
    }

    #[tokio::test]
    async fn maps_provider_status_codes() {
        let (base, _) = serve().await;

        let bad_key = client(base.clone(), "wrong");
        assert!(matches!(
            bad_key.fetch_odds("soccer_epl", MarketKey::H2h).await,
            Err(ProviderError::Unauthorized)
        ));

        let good = client(base, "test-key");
        assert!(matches!(
            good.fetch_odds("throttled", MarketKey::H2h).await,
            Err(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            good.fetch_odds("cricket_ipl", MarketKey::H2h).await,
            Err(ProviderError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn fetch_batches_skips_failures() {
        let (base, _) = serve().await;
        let client = client(base, "test-key");

        let batches = client
            .fetch_batches(
                &["soccer_epl".to_string(), "throttled".to_string()],
                &[MarketKey::H2h],
            )
            .await;

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].sport, "soccer_epl");
        assert_eq!(batches[0].market, MarketKey::H2h);
    }
}
