//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arbitrage::{allocate_stakes_with_precision, kelly_stake, KellyAdvice, StakeAllocation};
use crate::monitor::{ScanStats, SharedStats};
use crate::preferences::validate_stake;
use crate::rate_limit::RateLimiter;

/// Header identifying the caller for rate limiting.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the first scan has completed.
    pub ready: Arc<AtomicBool>,
    /// Scan statistics from the monitor.
    pub stats: SharedStats,
    /// Per-client limiter for the calculation endpoints.
    pub limiter: Arc<RateLimiter>,
    /// Decimal places for money amounts.
    pub money_precision: u32,
    /// Prometheus exporter handle, when installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(stats: SharedStats, limiter: Arc<RateLimiter>, money_precision: u32) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            stats,
            limiter,
            money_precision,
            prometheus: None,
        }
    }

    /// Attach the Prometheus handle served at `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            SharedStats::default(),
            Arc::new(RateLimiter::default()),
            crate::arbitrage::DEFAULT_MONEY_PRECISION,
        )
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Handler failure mapped to a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(message: impl ToString) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.to_string(),
        }
    }

    fn rate_limited() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limit exceeded".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Scan statistics.
    pub stats: ScanStats,
}

/// Stake allocation request.
#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    /// Winning decimal odds, one per outcome.
    pub prices: Vec<f64>,
    /// Total amount to split.
    pub total_stake: Decimal,
}

/// Stake allocation response.
#[derive(Debug, Serialize)]
pub struct AllocateResponse {
    /// The allocation.
    #[serde(flatten)]
    pub allocation: StakeAllocation,
    /// Profit locked in after stake rounding.
    pub realized_profit: Decimal,
}

/// Kelly sizing request.
#[derive(Debug, Deserialize)]
pub struct KellyRequest {
    /// Decimal odds offered.
    pub odds: f64,
    /// Estimated true win probability.
    pub probability: f64,
    /// Available bankroll.
    pub bankroll: Decimal,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scan statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.stats.read().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse { status, stats })
}

/// Prometheus scrape handler.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn check_rate_limit(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let client = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    if state.limiter.check(client) {
        debug!(client, "Rejecting rate-limited request");
        return Err(ApiError::rate_limited());
    }
    Ok(())
}

/// Split a stake across winning odds.
pub async fn allocate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AllocateRequest>,
) -> Result<Json<AllocateResponse>, ApiError> {
    check_rate_limit(&state, &headers)?;

    validate_stake(request.total_stake).map_err(ApiError::unprocessable)?;

    let allocation =
        allocate_stakes_with_precision(&request.prices, request.total_stake, state.money_precision)
            .map_err(ApiError::unprocessable)?;

    Ok(Json(AllocateResponse {
        realized_profit: allocation.realized_profit(),
        allocation,
    }))
}

/// Kelly sizing for a single bet.
pub async fn kelly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<KellyRequest>,
) -> Result<Json<KellyAdvice>, ApiError> {
    check_rate_limit(&state, &headers)?;

    kelly_stake(request.odds, request.probability, request.bankroll)
        .map(Json)
        .map_err(ApiError::unprocessable)
}
