use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SyncConfig;

use super::sync::IndexSynchronizer;

/// Triggers index resyncs on a cron expression or a fixed interval.
pub struct SyncScheduler {
    synchronizer: Arc<IndexSynchronizer>,
    config: SyncConfig,
    running: Arc<RwLock<bool>>,
    shutdown: Notify,
}

async fn run_job(synchronizer: &IndexSynchronizer) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "resync_index", "Starting scheduled index resync");

    match synchronizer.resync().await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = "resync_index",
            indexed = report.indexed,
            failed = report.failed.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled index resync finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = "resync_index",
            error = %e,
            "Scheduled index resync failed"
        ),
    }
}

impl SyncScheduler {
    #[must_use]
    pub fn new(synchronizer: Arc<IndexSynchronizer>, config: SyncConfig) -> Self {
        Self {
            synchronizer,
            config,
            running: Arc::new(RwLock::new(false)),
            shutdown: Notify::new(),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Index resync scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting index resync scheduler");

        if self.config.run_on_startup {
            run_job(&self.synchronizer).await;
        }

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let synchronizer = Arc::clone(&self.synchronizer);
        let running = Arc::clone(&self.running);
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let synchronizer = Arc::clone(&synchronizer);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_job(&synchronizer).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!("Index resync scheduled with cron: {}", cron_expr);

        self.shutdown.notified().await;

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.interval_minutes.max(1);
        info!("Index resync running every {}m", interval_mins);

        let mut ticker = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        // The first tick fires immediately; startup runs are governed by config.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.shutdown.notified() => break,
            }
            if !self.is_running().await {
                break;
            }
            run_job(&self.synchronizer).await;
        }

        info!("Index resync scheduler stopped");
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping index resync scheduler...");
        *self.running.write().await = false;
        self.shutdown.notify_one();
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
