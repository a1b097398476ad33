//! Background re-scanning per subject.
//!
//! Each subject gets one task that awaits its own scan before the next tick, so
//! scans for a subject never overlap. Every task owns its deduplicator: an
//! alert sent to one subject never suppresses the same alert for another.
//!
//! The last alert per subject is remembered so it can be re-checked against
//! fresh odds on request.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::arbitrage::{
    ArbitrageOpportunity, OpportunityDeduplicator, RefreshOutcome, RefreshTarget, Scanner,
};
use crate::metrics;
use crate::odds::MarketKey;
use crate::preferences::UserArbitragePreferences;
use crate::provider::{OddsCache, OddsSource};
use crate::rate_limit::RateLimiter;

/// A recipient of alerts with their own preferences.
#[derive(Debug, Clone)]
pub struct Subject {
    /// Subject id, e.g. a chat or account id.
    pub id: String,
    /// Preferences applied to this subject's scans.
    pub prefs: UserArbitragePreferences,
}

/// A new opportunity for one subject.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Subject the alert is for.
    pub subject: String,
    /// The opportunity.
    pub opportunity: ArbitrageOpportunity,
}

/// Running totals across all subjects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Scan cycles completed.
    pub scans_completed: u64,
    /// Snapshots examined.
    pub snapshots_scanned: u64,
    /// Opportunities meeting thresholds, duplicates included.
    pub opportunities_found: u64,
    /// Alerts emitted.
    pub alerts_sent: u64,
    /// Opportunities suppressed as duplicates.
    pub duplicates_suppressed: u64,
    /// End of the most recent scan.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_scan_at: Option<OffsetDateTime>,
}

/// Stats shared with the HTTP API.
pub type SharedStats = Arc<RwLock<ScanStats>>;

/// What to scan and how often.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Sport keys.
    pub sports: Vec<String>,
    /// Markets per sport.
    pub markets: Vec<MarketKey>,
    /// Time between scans for one subject.
    pub interval: Duration,
    /// Alert suppression window.
    pub dedup_window: Duration,
}

/// Periodic scanner fanning alerts out to subjects.
pub struct Monitor<S> {
    source: Arc<S>,
    scanner: Scanner,
    settings: MonitorSettings,
    stats: SharedStats,
    last_alerts: DashMap<String, RefreshTarget>,
}

/// Re-fetch `target`'s odds bypassing caches and re-run detection for its event.
#[instrument(skip_all, fields(target = %target))]
pub async fn refresh_opportunity<S: OddsSource>(
    source: &S,
    scanner: &Scanner,
    target: &RefreshTarget,
    prefs: &UserArbitragePreferences,
) -> RefreshOutcome {
    match source.fetch_fresh(&target.sport, target.market).await {
        Some(batch) => scanner.refresh(&batch, target, prefs),
        None => RefreshOutcome::OddsUnavailable,
    }
}

impl<S: OddsSource> Monitor<S> {
    /// Create a monitor.
    pub fn new(source: Arc<S>, scanner: Scanner, settings: MonitorSettings) -> Self {
        Self {
            source,
            scanner,
            settings,
            stats: SharedStats::default(),
            last_alerts: DashMap::new(),
        }
    }

    /// Shared scan statistics.
    pub fn stats(&self) -> SharedStats {
        Arc::clone(&self.stats)
    }

    /// Monitor settings.
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Run one scan for `subject`, returning only opportunities not seen recently.
    #[instrument(skip_all, fields(subject = %subject.id))]
    pub async fn scan_once(
        &self,
        subject: &Subject,
        dedup: &OpportunityDeduplicator,
    ) -> Vec<ArbitrageOpportunity> {
        let batches = self
            .source
            .fetch_all(&self.settings.sports, &self.settings.markets)
            .await;
        let snapshots: usize = batches.iter().map(|b| b.snapshots.len()).sum();

        let found = self.scanner.scan(&batches, &subject.prefs);
        let total = found.len();

        let fresh: Vec<ArbitrageOpportunity> = found
            .into_iter()
            .filter(|opp| {
                let new = dedup.check_and_remember(opp);
                if !new {
                    metrics::inc_opportunities_suppressed();
                }
                new
            })
            .collect();

        let mut stats = self.stats.write().await;
        stats.scans_completed += 1;
        stats.snapshots_scanned += snapshots as u64;
        stats.opportunities_found += total as u64;
        stats.duplicates_suppressed += (total - fresh.len()) as u64;
        stats.last_scan_at = Some(OffsetDateTime::now_utc());

        debug!(found = total, fresh = fresh.len(), "Subject scan finished");
        fresh
    }

    /// Event of the most recent alert sent to `subject_id`.
    pub fn last_alert(&self, subject_id: &str) -> Option<RefreshTarget> {
        self.last_alerts.get(subject_id).map(|entry| entry.value().clone())
    }

    /// Re-check `target` against fresh odds with `subject`'s preferences.
    pub async fn refresh(&self, subject: &Subject, target: &RefreshTarget) -> RefreshOutcome {
        let outcome = refresh_opportunity(&*self.source, &self.scanner, target, &subject.prefs).await;
        if let Some(opportunity) = outcome.opportunity() {
            self.last_alerts
                .insert(subject.id.clone(), RefreshTarget::from(opportunity));
        }
        outcome
    }

    /// Re-check the subject's most recent alert. `None` if nothing was alerted yet.
    pub async fn refresh_last(&self, subject: &Subject) -> Option<RefreshOutcome> {
        let target = self.last_alert(&subject.id)?;
        Some(self.refresh(subject, &target).await)
    }

    /// Spawn the scan loop for one subject.
    pub fn spawn_subject(
        self: &Arc<Self>,
        subject: Subject,
        alerts: mpsc::Sender<Alert>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let dedup = OpportunityDeduplicator::new(monitor.settings.dedup_window);
            let mut ticker = tokio::time::interval(monitor.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(subject = %subject.id, "Monitor started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }

                let _timer = metrics::timer_scan_cycle();
                dedup.purge_expired();
                for opportunity in monitor.scan_once(&subject, &dedup).await {
                    let target = RefreshTarget::from(&opportunity);
                    let alert = Alert {
                        subject: subject.id.clone(),
                        opportunity,
                    };
                    if alerts.send(alert).await.is_err() {
                        warn!(subject = %subject.id, "Alert receiver dropped, stopping monitor");
                        return;
                    }
                    monitor.last_alerts.insert(subject.id.clone(), target);
                    monitor.stats.write().await.alerts_sent += 1;
                }
            }
            info!(subject = %subject.id, "Monitor stopped");
        })
    }

    /// Spawn one loop per subject.
    pub fn spawn_all(
        self: &Arc<Self>,
        subjects: Vec<Subject>,
        alerts: mpsc::Sender<Alert>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        subjects
            .into_iter()
            .map(|subject| self.spawn_subject(subject, alerts.clone(), shutdown.clone()))
            .collect()
    }
}

/// Periodically purge expired cache entries and idle rate-limit subjects.
pub fn spawn_cleanup(
    cache: Arc<OddsCache>,
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            let expired = cache.purge_expired();
            let idle = limiter.purge_idle();
            if expired + idle > 0 {
                debug!(expired, idle, "Cleanup pass");
            }
        }
    })
}
