//! Short-lived cache of decoded provider responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::odds::{MarketKey, OddsSnapshot};

/// Default time-to-live: five minutes.
pub const DEFAULT_ODDS_CACHE_TTL: Duration = Duration::from_secs(300);

type CacheKey = (String, MarketKey);

/// TTL cache keyed by (sport, market).
#[derive(Debug)]
pub struct OddsCache {
    entries: DashMap<CacheKey, (Instant, Arc<Vec<OddsSnapshot>>)>,
    ttl: Duration,
}

impl Default for OddsCache {
    fn default() -> Self {
        Self::new(DEFAULT_ODDS_CACHE_TTL)
    }
}

impl OddsCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh snapshots for (sport, market), if cached.
    pub fn get(&self, sport: &str, market: MarketKey) -> Option<Arc<Vec<OddsSnapshot>>> {
        self.get_at(sport, market, Instant::now())
    }

    /// [`Self::get`] against an explicit clock reading.
    pub fn get_at(&self, sport: &str, market: MarketKey, now: Instant) -> Option<Arc<Vec<OddsSnapshot>>> {
        let key = (sport.to_string(), market);
        let hit = self.entries.get(&key).and_then(|entry| {
            let (stored_at, snapshots) = &*entry;
            (now.saturating_duration_since(*stored_at) < self.ttl).then(|| Arc::clone(snapshots))
        });
        if hit.is_none() {
            self.entries
                .remove_if(&key, |_, (stored_at, _)| now.saturating_duration_since(*stored_at) >= self.ttl);
        }
        hit
    }

    /// Store snapshots for (sport, market).
    pub fn insert(&self, sport: &str, market: MarketKey, snapshots: Arc<Vec<OddsSnapshot>>) {
        self.insert_at(sport, market, snapshots, Instant::now());
    }

    /// [`Self::insert`] against an explicit clock reading.
    pub fn insert_at(&self, sport: &str, market: MarketKey, snapshots: Arc<Vec<OddsSnapshot>>, now: Instant) {
        self.entries.insert((sport.to_string(), market), (now, snapshots));
    }

    /// Drop the entry for (sport, market). Returns whether one existed.
    pub fn invalidate(&self, sport: &str, market: MarketKey) -> bool {
        self.entries.remove(&(sport.to_string(), market)).is_some()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`Self::purge_expired`] against an explicit clock reading.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) < self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired odds cache entries");
        }
        removed
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl_and_miss_after() {
        let cache = OddsCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.insert_at("soccer_epl", MarketKey::H2h, Arc::new(Vec::new()), t0);

        assert!(cache
            .get_at("soccer_epl", MarketKey::H2h, t0 + Duration::from_secs(299))
            .is_some());
        assert!(cache.get_at("soccer_epl", MarketKey::Totals, t0).is_none());
        assert!(cache
            .get_at("soccer_epl", MarketKey::H2h, t0 + Duration::from_secs(300))
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_drops_one_entry() {
        let cache = OddsCache::default();
        cache.insert("soccer_epl", MarketKey::H2h, Arc::new(Vec::new()));
        cache.insert("soccer_epl", MarketKey::Totals, Arc::new(Vec::new()));

        assert!(cache.invalidate("soccer_epl", MarketKey::H2h));
        assert!(!cache.invalidate("soccer_epl", MarketKey::H2h));
        assert!(cache.get("soccer_epl", MarketKey::H2h).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn purge_keeps_fresh_entries() {
        let cache = OddsCache::default();
        let t0 = Instant::now();
        cache.insert_at("soccer_epl", MarketKey::H2h, Arc::new(Vec::new()), t0);
        cache.insert_at(
            "basketball_nba",
            MarketKey::H2h,
            Arc::new(Vec::new()),
            t0 + Duration::from_secs(200),
        );

        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(400)), 1);
        assert_eq!(cache.len(), 1);
    }
}
