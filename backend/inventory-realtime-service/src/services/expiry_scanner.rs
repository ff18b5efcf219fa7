/// Expiry Scanner Background Job
///
/// Periodically looks for inventory about to expire and pushes an alert per
/// record to the owner's `expiry:<user>` channel.
///
/// Each cycle:
/// 1. Computes the window `[now, now + window_days]`
/// 2. Queries the store for active records expiring inside it
/// 3. Classifies each record by days remaining
/// 4. Publishes one `expiry-alert` per record (no batching, no dedup)
///
/// A cycle that fails, times out or panics is logged and abandoned; the next
/// tick runs regardless. There is no persisted schedule state, so the same
/// record is alerted again on every cycle until it leaves the window.
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::publisher::EventPublisher;
use super::store::InventoryStore;
use crate::config::ScannerConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ChannelKey, ExpiryAlertEvent, ScanWindow, UserId};
use crate::websocket::OutboundEvent;

#[derive(Debug, Clone)]
pub struct ExpiryScannerConfig {
    /// Time between cycles
    pub interval: Duration,
    /// Look-ahead window in days
    pub window_days: i64,
    /// Upper bound on one store query
    pub query_timeout: Duration,
}

impl Default for ExpiryScannerConfig {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for ExpiryScannerConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            interval: config.interval(),
            window_days: config.window_days,
            query_timeout: config.query_timeout(),
        }
    }
}

/// Summary of one completed cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the store
    pub matched: usize,
    /// Alerts published (one per usable record)
    pub published: usize,
    /// Records dropped for falling outside the window or lacking an owner
    pub skipped: usize,
    /// Total sessions the alerts were queued for
    pub delivered: usize,
}

pub struct ExpiryScanner {
    store: Arc<dyn InventoryStore>,
    publisher: Arc<dyn EventPublisher>,
    config: ExpiryScannerConfig,
}

impl ExpiryScanner {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        publisher: Arc<dyn EventPublisher>,
        config: ExpiryScannerConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &ExpiryScannerConfig {
        &self.config
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One scan against an explicit clock. Stops at the first query or
    /// publish error.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let window = ScanWindow::starting_at(now, self.config.window_days);

        let items = tokio::time::timeout(self.config.query_timeout, self.store.find_expiring(&window))
            .await
            .map_err(|_| AppError::StoreTimeout(self.config.query_timeout.as_secs()))??;

        let mut report = CycleReport {
            matched: items.len(),
            ..CycleReport::default()
        };

        for item in &items {
            if !window.contains(item.expiry_date) {
                report.skipped += 1;
                continue;
            }
            let Some(user_id) = UserId::parse(&item.user_id) else {
                warn!(product_id = %item.product_id, "Expiring record has no owner, skipping");
                report.skipped += 1;
                continue;
            };

            let alert = ExpiryAlertEvent::for_item(item, now);
            let alert_level = alert.alert_level;
            let channel = ChannelKey::Expiry(user_id);

            let delivered = self
                .publisher
                .publish(channel, OutboundEvent::ExpiryAlert(alert))
                .await?;

            metrics::record_expiry_alert(alert_level.as_str());
            report.published += 1;
            report.delivered += delivered;
        }

        Ok(report)
    }

    /// Run one cycle behind an error boundary. Never fails and never panics.
    pub async fn supervised_cycle(&self) -> Option<CycleReport> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(report)) => {
                metrics::record_scan_cycle("ok");
                if report.matched > 0 {
                    info!(
                        matched = report.matched,
                        published = report.published,
                        delivered = report.delivered,
                        "Expiry scan cycle completed"
                    );
                } else {
                    debug!("Expiry scan cycle found nothing to alert");
                }
                Some(report)
            }
            Ok(Err(e)) => {
                metrics::record_scan_cycle("error");
                error!(error = %e, "Expiry notification error, cycle abandoned");
                None
            }
            Err(_) => {
                metrics::record_scan_cycle("panic");
                error!("Expiry scan cycle panicked, cycle abandoned");
                None
            }
        }
    }

    /// Fixed-interval loop. The first cycle fires one interval after start;
    /// every tick is re-armed whatever the previous cycle did.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs(),
            window_days = self.config.window_days,
            "Starting expiry scanner"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.supervised_cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Received shutdown signal, stopping expiry scanner");
                    break;
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
