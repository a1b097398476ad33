//! Unified error types for the odds arbitrage engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration or preferences failed validation.
    #[error("invalid preferences: {0}")]
    Preferences(#[from] PreferencesError),

    /// Odds snapshot decoding error.
    #[error("odds error: {0}")]
    Odds(#[from] OddsError),

    /// Odds provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Stake allocation or Kelly sizing error.
    #[error("arbitrage error: {0}")]
    Arbitrage(#[from] ArbitrageError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building odds snapshots from provider data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OddsError {
    /// A quoted price is not valid decimal odds.
    #[error("invalid price {price} for outcome {outcome}: decimal odds must exceed 1.0")]
    InvalidPrice {
        /// Outcome name.
        outcome: String,
        /// Offending price.
        price: f64,
    },

    /// A market quote carried no outcomes.
    #[error("market {0} has no outcomes")]
    EmptyMarket(String),

    /// A required event field was missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Commence time could not be parsed.
    #[error("invalid commence time {0:?}")]
    InvalidTimestamp(String),
}

/// Stake allocation and bet sizing errors.
///
/// `NoData` and `ShapeMismatch` are produced inside the detector and recovered
/// there by skipping the bookmaker pair; they never reach callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArbitrageError {
    /// A bookmaker pair is missing the requested market.
    #[error("no {market} data for {bookmaker}")]
    NoData {
        /// Bookmaker lacking the market.
        bookmaker: String,
        /// Requested market key.
        market: String,
    },

    /// Two quotes for the same market have different outcome counts.
    #[error("outcome count mismatch: {left} vs {right}")]
    ShapeMismatch {
        /// Outcome count of the first quote.
        left: usize,
        /// Outcome count of the second quote.
        right: usize,
    },

    /// Allocation requested for odds that carry no edge.
    #[error("no arbitrage: total implied probability {total_implied:.4} >= 1")]
    NoArbitrage {
        /// Sum of implied probabilities.
        total_implied: f64,
    },

    /// Kelly advisor given an out-of-range probability.
    #[error("invalid probability {0}: must be strictly between 0 and 1")]
    InvalidProbability(f64),

    /// Price is not valid decimal odds.
    #[error("invalid odds {0}: decimal odds must exceed 1.0")]
    InvalidOdds(f64),

    /// Stake must be positive.
    #[error("invalid stake: {0}")]
    InvalidStake(Decimal),

    /// Bankroll must not be negative.
    #[error("invalid bankroll: {0}")]
    InvalidBankroll(Decimal),

    /// Stake times odds does not fit in a money amount.
    #[error("payout overflow: stake {stake} at odds {price}")]
    PayoutOverflow {
        /// Stake on the overflowing leg.
        stake: Decimal,
        /// Odds of the overflowing leg.
        price: f64,
    },

    /// Allocation requested for an empty set of outcomes.
    #[error("no outcomes to allocate")]
    NoOutcomes,
}

/// Odds provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider rejected the request rate.
    #[error("rate limit exceeded for {sport}/{market}")]
    RateLimited {
        /// Sport key requested.
        sport: String,
        /// Market key requested.
        market: String,
    },

    /// API key rejected.
    #[error("invalid API key")]
    Unauthorized,

    /// Non-success HTTP status.
    #[error("odds request for {sport}/{market} failed: HTTP {status}")]
    Status {
        /// Sport key requested.
        sport: String,
        /// Market key requested.
        market: String,
        /// HTTP status code.
        status: u16,
    },

    /// Request exceeded the configured timeout.
    #[error("odds request for {sport}/{market} timed out")]
    Timeout {
        /// Sport key requested.
        sport: String,
        /// Market key requested.
        market: String,
    },

    /// Base URL could not be parsed or extended.
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// User preference validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreferencesError {
    /// Stake outside the accepted range.
    #[error("stake amount {amount} outside {min}..={max}")]
    StakeOutOfRange {
        /// Requested stake.
        amount: Decimal,
        /// Minimum stake.
        min: Decimal,
        /// Maximum stake.
        max: Decimal,
    },

    /// Negative profit threshold.
    #[error("minimum profit threshold must not be negative: {0}")]
    NegativeThreshold(f64),

    /// No bookmakers selected.
    #[error("at least one eligible bookmaker is required")]
    NoBookmakers,

    /// Any other invalid setting.
    #[error("{0}")]
    Invalid(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn preferences() -> Result<()> {
        let checked: std::result::Result<(), PreferencesError> = Err(PreferencesError::NoBookmakers);
        checked?;
        Ok(())
    }

    #[test]
    fn domain_errors_convert_with_context() {
        let err = preferences().unwrap_err();
        assert!(matches!(err, AppError::Preferences(PreferencesError::NoBookmakers)));
        assert_eq!(
            err.to_string(),
            "invalid preferences: at least one eligible bookmaker is required"
        );

        let err: AppError = ProviderError::Unauthorized.into();
        assert_eq!(err.to_string(), "provider error: invalid API key");
    }
}
