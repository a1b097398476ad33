//! Suppression of repeat alerts for the same opportunity.
//!
//! Entries expire after a fixed window. Expired entries are evicted lazily on
//! lookup, and in bulk by [`OpportunityDeduplicator::purge_expired`].

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::opportunity::{ArbitrageOpportunity, DedupKey};

/// Default suppression window: one hour.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(3600);

/// Thread-safe record of recently alerted opportunities.
#[derive(Debug)]
pub struct OpportunityDeduplicator {
    seen: DashMap<DedupKey, Instant>,
    window: Duration,
}

impl Default for OpportunityDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl OpportunityDeduplicator {
    /// Create a deduplicator with the given suppression window.
    pub fn new(window: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            window,
        }
    }

    /// Suppression window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the opportunity was remembered within the window.
    pub fn is_duplicate(&self, opportunity: &ArbitrageOpportunity) -> bool {
        self.is_duplicate_at(opportunity, Instant::now())
    }

    /// [`Self::is_duplicate`] against an explicit clock reading.
    pub fn is_duplicate_at(&self, opportunity: &ArbitrageOpportunity, now: Instant) -> bool {
        let key = opportunity.dedup_key();
        let expired = match self.seen.get(&key) {
            Some(seen_at) if self.is_fresh(*seen_at, now) => return true,
            Some(_) => true,
            None => false,
        };
        // The read guard is released above; removing while holding it deadlocks.
        if expired {
            self.seen
                .remove_if(&key, |_, seen_at| !self.is_fresh(*seen_at, now));
        }
        false
    }

    /// Record the opportunity as alerted now.
    pub fn remember(&self, opportunity: &ArbitrageOpportunity) {
        self.remember_at(opportunity, Instant::now());
    }

    /// [`Self::remember`] against an explicit clock reading.
    pub fn remember_at(&self, opportunity: &ArbitrageOpportunity, now: Instant) {
        self.seen.insert(opportunity.dedup_key(), now);
    }

    /// Atomically test and record. Returns `true` when the opportunity is new.
    ///
    /// A suppressed duplicate does not extend its window.
    pub fn check_and_remember(&self, opportunity: &ArbitrageOpportunity) -> bool {
        self.check_and_remember_at(opportunity, Instant::now())
    }

    /// [`Self::check_and_remember`] against an explicit clock reading.
    pub fn check_and_remember_at(&self, opportunity: &ArbitrageOpportunity, now: Instant) -> bool {
        match self.seen.entry(opportunity.dedup_key()) {
            Entry::Occupied(mut entry) => {
                if self.is_fresh(*entry.get(), now) {
                    debug!(matchup = %opportunity.matchup(), "Suppressing duplicate opportunity");
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop every entry older than the window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`Self::purge_expired`] against an explicit clock reading.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, seen_at| self.is_fresh(*seen_at, now));
        let removed = before.saturating_sub(self.seen.len());
        if removed > 0 {
            debug!(removed, "Purged expired dedup entries");
        }
        removed
    }

    /// Number of remembered entries, expired ones included.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.seen.clear();
    }

    fn is_fresh(&self, seen_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(seen_at) < self.window
    }
}
