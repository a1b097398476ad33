//! Application configuration loaded from environment variables.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::odds::{BookmakerRegistry, MarketKey};
use crate::preferences::{MAX_STAKE, MIN_STAKE};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Provider ===
    /// The Odds API key.
    #[serde(default)]
    pub odds_api_key: String,

    /// Provider base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Comma-separated provider regions.
    #[serde(default = "default_odds_regions")]
    pub odds_regions: String,

    /// Comma-separated sport keys to scan.
    #[serde(default = "default_sports")]
    pub sports: String,

    /// Comma-separated market keys to scan.
    #[serde(default = "default_markets")]
    pub markets: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Arbitrage Parameters ===
    /// Total stake split across legs.
    #[serde(default = "default_stake_amount")]
    pub stake_amount: Decimal,

    /// Minimum profit margin to report, in percent.
    #[serde(default = "default_min_profit_threshold")]
    pub min_profit_threshold_percent: f64,

    /// Comma-separated bookmaker ids; empty means the whole registry.
    #[serde(default)]
    pub eligible_bookmakers: String,

    /// Position-paired sums at or above this are ignored.
    #[serde(default = "default_near_arb_ceiling")]
    pub near_arb_ceiling: f64,

    /// Decimal places for money amounts.
    #[serde(default = "default_money_precision")]
    pub money_precision: u32,

    // === Caches & Limits ===
    /// Alert suppression window in seconds.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Odds cache TTL in seconds.
    #[serde(default = "default_odds_cache_ttl_secs")]
    pub odds_cache_ttl_secs: u64,

    /// Requests allowed per rate-limit window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,

    /// Rate-limit window in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    // === Monitor ===
    /// Seconds between scans per subject.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Comma-separated monitor subject ids.
    #[serde(default = "default_subjects")]
    pub subjects: String,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/".to_string()
}

fn default_odds_regions() -> String {
    "eu,us,uk,au".to_string()
}

fn default_sports() -> String {
    "soccer_epl,basketball_nba".to_string()
}

fn default_markets() -> String {
    "h2h,spreads,totals".to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_stake_amount() -> Decimal {
    Decimal::new(1000, 0)
}

fn default_min_profit_threshold() -> f64 {
    0.5
}

fn default_near_arb_ceiling() -> f64 {
    1.10
}

fn default_money_precision() -> u32 {
    2
}

fn default_dedup_window_secs() -> u64 {
    3600
}

fn default_odds_cache_ttl_secs() -> u64 {
    300
}

fn default_rate_limit_requests() -> usize {
    30
}

fn default_rate_limit_window_secs() -> u64 {
    30
}

fn default_scan_interval_secs() -> u64 {
    60
}

fn default_subjects() -> String {
    "default".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odds_api_key: String::new(),
            odds_api_url: default_odds_api_url(),
            odds_regions: default_odds_regions(),
            sports: default_sports(),
            markets: default_markets(),
            http_timeout_ms: default_http_timeout_ms(),
            stake_amount: default_stake_amount(),
            min_profit_threshold_percent: default_min_profit_threshold(),
            eligible_bookmakers: String::new(),
            near_arb_ceiling: default_near_arb_ceiling(),
            money_precision: default_money_precision(),
            dedup_window_secs: default_dedup_window_secs(),
            odds_cache_ttl_secs: default_odds_cache_ttl_secs(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            scan_interval_secs: default_scan_interval_secs(),
            subjects: default_subjects(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.odds_api_key.trim().is_empty() {
            return Err("ODDS_API_KEY is required".to_string());
        }

        if url::Url::parse(&self.odds_api_url).is_err() {
            return Err(format!("ODDS_API_URL is not a valid URL: {}", self.odds_api_url));
        }

        if self.sport_list().is_empty() {
            return Err("SPORTS must name at least one sport".to_string());
        }

        let markets = self.market_list()?;
        if markets.is_empty() {
            return Err("MARKETS must name at least one market".to_string());
        }

        if self.stake_amount < MIN_STAKE || self.stake_amount > MAX_STAKE {
            return Err(format!("STAKE_AMOUNT must be between {MIN_STAKE} and {MAX_STAKE}"));
        }

        if !self.min_profit_threshold_percent.is_finite() || self.min_profit_threshold_percent < 0.0 {
            return Err("MIN_PROFIT_THRESHOLD_PERCENT must not be negative".to_string());
        }

        if !self.near_arb_ceiling.is_finite() || self.near_arb_ceiling <= 1.0 {
            return Err("NEAR_ARB_CEILING must be greater than 1.0".to_string());
        }

        if self.money_precision > 8 {
            return Err("MONEY_PRECISION must be at most 8".to_string());
        }

        if self.rate_limit_requests == 0 || self.rate_limit_window_secs == 0 {
            return Err("RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW_SECS must be positive".to_string());
        }

        if self.scan_interval_secs == 0 {
            return Err("SCAN_INTERVAL_SECS must be positive".to_string());
        }

        Ok(())
    }

    /// Sport keys to scan.
    pub fn sport_list(&self) -> Vec<String> {
        split_list(&self.sports).map(String::from).collect()
    }

    /// Market keys to scan.
    pub fn market_list(&self) -> Result<Vec<MarketKey>, String> {
        split_list(&self.markets)
            .map(|raw| MarketKey::from_str(raw).map_err(|_| format!("unknown market key: {raw}")))
            .collect()
    }

    /// Monitor subject ids.
    pub fn subject_list(&self) -> Vec<String> {
        split_list(&self.subjects).map(String::from).collect()
    }

    /// Eligible bookmakers; the whole registry when none are configured.
    pub fn eligible_bookmaker_set(&self) -> HashSet<String> {
        let configured: HashSet<String> = split_list(&self.eligible_bookmakers).map(String::from).collect();
        if configured.is_empty() {
            BookmakerRegistry::builtin().ids().map(String::from).collect()
        } else {
            configured
        }
    }

    /// Provider request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Alert suppression window.
    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    /// Odds cache TTL.
    pub fn odds_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.odds_cache_ttl_secs)
    }

    /// Rate-limit window.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Interval between scans.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}
