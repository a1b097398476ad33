//! Cross-bookmaker sports odds arbitrage engine.
//!
//! Compares decimal odds for the same event across bookmakers and finds
//! combinations whose implied probabilities sum below 1, so that backing every
//! outcome returns a profit whatever the result.
//!
//! # Strategy
//!
//! For a two-way market, take the best price per outcome across a bookmaker
//! pair. If the implied probabilities sum below 1, split the stake in
//! proportion to them:
//!
//! ```text
//! Lakers  @ 2.00 (1xBet)    → 1/2.00 = 0.5000
//! Celtics @ 2.20 (Dafabet)  → 1/2.20 = 0.4545
//! ───────────────────────────────────────────
//! Total:                      0.9545 < 1 ✅
//! Margin:                     4.55% of total stake
//! ```
//!
//! # Modules
//!
//! - [`odds`]: Snapshot model, bookmaker registry and provider JSON decoding
//! - [`arbitrage`]: Detection, stake allocation, Kelly sizing, deduplication and refresh
//! - [`preferences`]: Per-user stake, threshold and bookmaker selection
//! - [`provider`]: The Odds API client and response cache
//! - [`monitor`]: Per-subject background scanning and re-checks of the last alert
//! - [`rate_limit`]: Sliding-window request limiter
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`metrics`]: Prometheus metric names and recorders
//! - [`api`]: HTTP API for health, status and calculators
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod odds;
pub mod preferences;
pub mod provider;
pub mod rate_limit;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
