//! Arbitrage detection, stake allocation and bet sizing.
//!
//! This module handles:
//! - Finding the best cross-bookmaker arbitrage in an odds snapshot
//! - Splitting a total stake so every outcome pays the same
//! - Kelly sizing for single value bets
//! - Suppressing repeat alerts for the same opportunity
//! - Scanning batches of snapshots against user preferences
//! - Re-checking an alerted event against fresh odds

pub mod allocator;
pub mod dedup;
pub mod detector;
pub mod kelly;
pub mod money;
pub mod opportunity;
pub mod refresh;
pub mod scanner;

pub use allocator::{allocate_stakes, allocate_stakes_with_precision, StakeAllocation};
pub use dedup::{OpportunityDeduplicator, DEFAULT_DEDUP_WINDOW};
pub use detector::{DetectorConfig, OpportunityDetector, DEFAULT_NEAR_ARB_CEILING};
pub use kelly::{edge, kelly_stake, KellyAdvice, NO_EDGE_EXPLANATION};
pub use money::{round_money, DEFAULT_MONEY_PRECISION};
pub use opportunity::{ArbitrageOpportunity, DedupKey, Leg, OpportunityKind};
pub use refresh::{RefreshOutcome, RefreshTarget};
pub use scanner::Scanner;
