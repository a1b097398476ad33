//! Prometheus metrics for scan throughput and provider latency.
//!
//! Recorded through the `metrics` facade; the exporter is installed by the
//! binary. Without an installed recorder every call is a no-op.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Snapshots scanned counter metric name.
pub const METRIC_SNAPSHOTS_SCANNED: &str = "snapshots_scanned_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Opportunities suppressed as duplicates counter metric name.
pub const METRIC_OPPORTUNITIES_SUPPRESSED: &str = "opportunities_suppressed_total";
/// Failed odds fetches counter metric name.
pub const METRIC_ODDS_FETCH_FAILURES: &str = "odds_fetch_failures_total";
/// Odds fetch latency metric name.
pub const METRIC_ODDS_FETCH_LATENCY: &str = "odds_fetch_latency_ms";
/// Opportunity detection latency metric name.
pub const METRIC_OPPORTUNITY_DETECTION_LATENCY: &str = "opportunity_detection_latency_ms";
/// Monitor scan cycle latency metric name.
pub const METRIC_SCAN_CYCLE_LATENCY: &str = "scan_cycle_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_ODDS_FETCH_LATENCY,
        "Odds provider request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_OPPORTUNITY_DETECTION_LATENCY,
        "Time to scan a batch of snapshots in milliseconds"
    );
    describe_histogram!(
        METRIC_SCAN_CYCLE_LATENCY,
        "Time for one monitor cycle, fetch and alert delivery included, in milliseconds"
    );

    describe_counter!(
        METRIC_SNAPSHOTS_SCANNED,
        "Total number of event snapshots scanned"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_SUPPRESSED,
        "Total number of opportunities suppressed as duplicates"
    );
    describe_counter!(
        METRIC_ODDS_FETCH_FAILURES,
        "Total number of failed odds provider requests"
    );

    debug!("Metrics initialized");
}

/// Record odds fetch latency.
pub fn record_odds_fetch_latency(start: Instant, sport: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ODDS_FETCH_LATENCY, "sport" => sport.to_string()).record(latency_ms);
}

/// Record opportunity detection latency.
pub fn record_opportunity_detection_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_OPPORTUNITY_DETECTION_LATENCY).record(latency_ms);
}

/// Add to the snapshots scanned counter.
pub fn inc_snapshots_scanned(count: u64) {
    counter!(METRIC_SNAPSHOTS_SCANNED).increment(count);
}

/// Add to the opportunities detected counter.
pub fn inc_opportunities_detected(count: u64) {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(count);
}

/// Increment the suppressed duplicates counter.
pub fn inc_opportunities_suppressed() {
    counter!(METRIC_OPPORTUNITIES_SUPPRESSED).increment(1);
}

/// Increment the failed fetches counter.
pub fn inc_odds_fetch_failures() {
    counter!(METRIC_ODDS_FETCH_FAILURES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for one monitor scan cycle.
pub fn timer_scan_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_SCAN_CYCLE_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }

    #[test]
    fn cycle_timer_is_separate_from_scan_latency() {
        let timer = timer_scan_cycle();
        assert_eq!(timer.metric_name, METRIC_SCAN_CYCLE_LATENCY);
        assert_ne!(METRIC_SCAN_CYCLE_LATENCY, METRIC_OPPORTUNITY_DETECTION_LATENCY);
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        inc_snapshots_scanned(3);
        inc_opportunities_detected(1);
        inc_opportunities_suppressed();
        inc_odds_fetch_failures();
        record_odds_fetch_latency(Instant::now(), "soccer_epl");
    }
}
