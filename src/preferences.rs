//! Per-user arbitrage preferences.

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::PreferencesError;
use crate::odds::BookmakerRegistry;

/// Smallest accepted total stake.
pub const MIN_STAKE: Decimal = dec!(100);
/// Largest accepted total stake.
pub const MAX_STAKE: Decimal = dec!(100000);
/// Default total stake.
pub const DEFAULT_STAKE: Decimal = dec!(1000);
/// Default minimum profit margin in percent.
pub const DEFAULT_MIN_PROFIT_THRESHOLD: f64 = 0.5;

/// Check a total stake against [`MIN_STAKE`]..=[`MAX_STAKE`].
pub fn validate_stake(amount: Decimal) -> Result<(), PreferencesError> {
    if amount < MIN_STAKE || amount > MAX_STAKE {
        return Err(PreferencesError::StakeOutOfRange {
            amount,
            min: MIN_STAKE,
            max: MAX_STAKE,
        });
    }
    Ok(())
}

/// Settings read once per scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserArbitragePreferences {
    /// Total amount split across the legs.
    pub stake_amount: Decimal,
    /// Opportunities below this margin are not reported.
    pub min_profit_threshold_percent: f64,
    /// Bookmakers the user can bet with.
    pub eligible_bookmakers: HashSet<String>,
}

impl Default for UserArbitragePreferences {
    fn default() -> Self {
        Self {
            stake_amount: DEFAULT_STAKE,
            min_profit_threshold_percent: DEFAULT_MIN_PROFIT_THRESHOLD,
            eligible_bookmakers: BookmakerRegistry::builtin().ids().map(String::from).collect(),
        }
    }
}

impl UserArbitragePreferences {
    /// Build validated preferences.
    pub fn new(
        stake_amount: Decimal,
        min_profit_threshold_percent: f64,
        eligible_bookmakers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, PreferencesError> {
        let prefs = Self {
            stake_amount,
            min_profit_threshold_percent,
            eligible_bookmakers: eligible_bookmakers.into_iter().map(Into::into).collect(),
        };
        prefs.validate()?;
        Ok(prefs)
    }

    /// Preferences from the process configuration.
    pub fn from_config(config: &Config) -> Result<Self, PreferencesError> {
        Self::new(
            config.stake_amount,
            config.min_profit_threshold_percent,
            config.eligible_bookmaker_set(),
        )
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), PreferencesError> {
        validate_stake(self.stake_amount)?;
        if !self.min_profit_threshold_percent.is_finite() || self.min_profit_threshold_percent < 0.0 {
            return Err(PreferencesError::NegativeThreshold(self.min_profit_threshold_percent));
        }
        if self.eligible_bookmakers.is_empty() {
            return Err(PreferencesError::NoBookmakers);
        }
        Ok(())
    }

    /// Whether a margin clears the threshold.
    pub fn meets_threshold(&self, profit_margin_percent: f64) -> bool {
        profit_margin_percent >= self.min_profit_threshold_percent
    }
}
