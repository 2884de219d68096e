use crate::notice::TracingNoticeSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use ttlink_core::settings::MAX_CLEANUP_INTERVAL_SECONDS;
use ttlink_core::{Clock, LinkRepository, Notice, NoticeSink, SystemClock};

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired links found by the scan.
    pub found: usize,
    /// Links this sweep removed.
    pub evicted: usize,
    /// Links whose removal failed; they are retried on the next sweep.
    pub failed: usize,
}

/// Periodically removes links that expired by TTL or by click quota.
pub struct ExpirySweeper<R, C = SystemClock> {
    repository: Arc<R>,
    clock: C,
    notices: Arc<dyn NoticeSink>,
    interval: Duration,
}

impl<R: LinkRepository> ExpirySweeper<R, SystemClock> {
    /// # Panics
    ///
    /// Panics if `interval` is zero or longer than
    /// [`MAX_CLEANUP_INTERVAL_SECONDS`].
    pub fn new(repository: Arc<R>, interval: Duration) -> Self {
        Self::with_clock(repository, interval, SystemClock)
    }
}

impl<R: LinkRepository, C: Clock> ExpirySweeper<R, C> {
    pub fn with_clock(repository: Arc<R>, interval: Duration, clock: C) -> Self {
        assert!(!interval.is_zero(), "sweep interval must be positive");
        assert!(
            interval <= Duration::from_secs(MAX_CLEANUP_INTERVAL_SECONDS),
            "sweep interval must be at most {} seconds",
            MAX_CLEANUP_INTERVAL_SECONDS
        );

        Self {
            repository,
            clock,
            notices: Arc::new(TracingNoticeSink),
            interval,
        }
    }

    pub fn with_notice_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.notices = sink;
        self
    }

    /// Runs a single sweep.
    ///
    /// Failures are logged and counted, never returned: one link that cannot
    /// be removed does not stop the others.
    pub async fn sweep_once(&self) -> SweepReport {
        let now = self.clock.now();
        let expired = match self.repository.find_expired(now).await {
            Ok(links) => links,
            Err(err) => {
                error!(error = %err, "failed to scan for expired links");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            found: expired.len(),
            ..SweepReport::default()
        };

        for link in expired {
            match self.repository.delete_by_key(link.short_key()).await {
                Ok(true) => {
                    report.evicted += 1;
                    self.notices.notify(&Notice::Evicted {
                        key: link.short_key().clone(),
                        status: link.status(),
                        owner_id: link.owner_id().to_string(),
                    });
                }
                Ok(false) => {
                    trace!(key = %link.short_key(), "expired link already gone");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(key = %link.short_key(), error = %err, "failed to evict expired link");
                }
            }
        }

        report
    }

    /// Starts sweeping in the background, first one `interval` from now.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "expiry sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    if report.found > 0 {
                        debug!(
                            found = report.found,
                            evicted = report.evicted,
                            failed = report.failed,
                            "expiry sweep finished"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("expiry sweeper stopped");
    }
}

/// Owns a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Asks the sweeper to stop and waits for it. A sweep already in progress
    /// runs to completion first.
    pub async fn shutdown(self) {
        // An error means the task is already gone.
        let _ = self.shutdown.send(true);

        if let Err(err) = self.task.await {
            error!(error = %err, "expiry sweeper task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
