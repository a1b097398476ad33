//! Sliding-window request limiter keyed by subject.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Default requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: usize = 30;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Per-subject sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    requests: DashMap<String, Vec<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    /// Allow `max_requests` per `window` for each subject.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Returns `true` if `subject` is over the limit. Allowed requests are recorded.
    pub fn check(&self, subject: &str) -> bool {
        self.check_at(subject, Instant::now())
    }

    /// [`Self::check`] against an explicit clock reading.
    pub fn check_at(&self, subject: &str, now: Instant) -> bool {
        let window = self.window;
        let mut entry = self.requests.entry(subject.to_string()).or_default();
        entry.retain(|at| now.saturating_duration_since(*at) < window);

        if entry.len() >= self.max_requests {
            debug!(subject, requests = entry.len(), "Rate limit exceeded");
            return true;
        }

        entry.push(now);
        false
    }

    /// Drop subjects with no request inside the window. Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    /// [`Self::purge_idle`] against an explicit clock reading.
    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let window = self.window;
        let before = self.requests.len();
        self.requests.retain(|_, times| {
            times.retain(|at| now.saturating_duration_since(*at) < window);
            !times.is_empty()
        });
        before.saturating_sub(self.requests.len())
    }

    /// Number of tracked subjects.
    pub fn tracked_subjects(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_max_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(30));
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(!limiter.check_at("alice", t0 + Duration::from_secs(i)));
        }
        assert!(limiter.check_at("alice", t0 + Duration::from_secs(5)));
        // Other subjects are independent.
        assert!(!limiter.check_at("bob", t0 + Duration::from_secs(5)));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(!limiter.check_at("alice", t0));
        assert!(!limiter.check_at("alice", t0 + Duration::from_secs(10)));
        assert!(limiter.check_at("alice", t0 + Duration::from_secs(20)));
        // First request has left the window.
        assert!(!limiter.check_at("alice", t0 + Duration::from_secs(31)));
    }

    #[test]
    fn limited_requests_are_not_recorded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(!limiter.check_at("alice", t0));
        for i in 1..10 {
            assert!(limiter.check_at("alice", t0 + Duration::from_secs(i)));
        }
        assert!(!limiter.check_at("alice", t0 + Duration::from_secs(30)));
    }

    #[test]
    fn purge_drops_idle_subjects() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();

        limiter.check_at("alice", t0);
        limiter.check_at("bob", t0 + Duration::from_secs(20));

        assert_eq!(limiter.purge_idle_at(t0 + Duration::from_secs(40)), 1);
        assert_eq!(limiter.tracked_subjects(), 1);
    }
}
