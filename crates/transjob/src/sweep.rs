//! Periodic check sweep over submitted jobs.
//!
//! Runs `JobService::check_all_submitted` on an interval and on demand via
//! a trigger channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::SweepConfig;
use crate::service::{JobService, SweepSummary};

pub struct CheckSweep {
    service: Arc<JobService>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    trigger: broadcast::Sender<()>,
    summary: Arc<watch::Sender<Option<SweepSummary>>>,
}

impl CheckSweep {
    pub fn new(service: Arc<JobService>, interval: Duration) -> Self {
        let (trigger, _) = broadcast::channel(16);
        let (summary, _) = watch::channel(None);
        Self {
            service,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            trigger,
            summary: Arc::new(summary),
        }
    }

    pub fn from_config(service: Arc<JobService>, config: &SweepConfig) -> Self {
        Self::new(service, Duration::from_secs(config.interval_secs))
    }

    /// Starts the sweep loop on the current tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let mut trigger_rx = self.trigger.subscribe();
        let summary_tx = Arc::clone(&self.summary);

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await; // first tick fires immediately

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = timer.tick() => {},
                    Ok(()) = trigger_rx.recv() => {
                        log::info!("Manual check sweep triggered");
                    },
                }

                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                match service.check_all_submitted().await {
                    Ok(summary) => {
                        summary_tx.send_replace(Some(summary));
                    }
                    Err(e) => log::error!("Check sweep failed: {}", e),
                }
            }
            log::info!("Check sweep stopped");
        })
    }

    /// Runs a sweep as soon as possible.
    pub fn trigger(&self) {
        let _ = self.trigger.send(());
    }

    /// Receiver for the summary of the most recent pass.
    pub fn summaries(&self) -> watch::Receiver<Option<SweepSummary>> {
        self.summary.subscribe()
    }

    /// Signals the loop to stop and wakes it up.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.trigger.send(());
    }
}
