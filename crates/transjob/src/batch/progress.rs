use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

/// Snapshot of a running batch.
///
/// `resolved` counts every group that has finished one way or another and
/// only ever grows; `done` flips once it reaches `total`. `percentage` and
/// `last_group` follow completed groups only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub total: usize,
    pub resolved: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_group: Option<String>,
    pub done: bool,
}

impl BatchProgress {
    fn start(total: usize) -> Self {
        Self {
            total,
            percentage: if total == 0 { 100 } else { 0 },
            done: total == 0,
            ..Default::default()
        }
    }
}

/// Push listener for batch snapshots. Delivery is best effort.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &BatchProgress);
}

/// No-op reporter.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _progress: &BatchProgress) {}
}

/// Forwards snapshots to a broadcast channel.
pub struct BroadcastProgress {
    sender: broadcast::Sender<BatchProgress>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchProgress> {
        self.sender.subscribe()
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, progress: &BatchProgress) {
        // No receivers is fine.
        let _ = self.sender.send(progress.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Completed,
    Failed,
    Skipped,
}

/// Shared tally updated by every group task.
pub(crate) struct ProgressTally {
    total: usize,
    resolved: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    sender: watch::Sender<BatchProgress>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ProgressTally {
    pub(crate) fn new(total: usize, reporter: Arc<dyn ProgressReporter>) -> Self {
        let (sender, _) = watch::channel(BatchProgress::start(total));
        Self {
            total,
            resolved: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            sender,
            reporter,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.sender.subscribe()
    }

    pub(crate) fn snapshot(&self) -> BatchProgress {
        self.sender.borrow().clone()
    }

    /// Counts one resolved group and publishes the new snapshot.
    ///
    /// The counters are bumped while the watch value is held, so snapshots
    /// are published in counter order.
    pub(crate) fn record(&self, group: &str, resolution: Resolution) {
        self.sender.send_modify(|snapshot| {
            let last_group = match resolution {
                Resolution::Completed => Some(group.to_string()),
                Resolution::Failed | Resolution::Skipped => snapshot.last_group.take(),
            };
            let counter = match resolution {
                Resolution::Completed => &self.completed,
                Resolution::Failed => &self.failed,
                Resolution::Skipped => &self.skipped,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let resolved = (self.resolved.fetch_add(1, Ordering::SeqCst) + 1).min(self.total);
            let completed = self.completed.load(Ordering::SeqCst);

            *snapshot = BatchProgress {
                total: self.total,
                resolved,
                completed,
                failed: self.failed.load(Ordering::SeqCst),
                skipped: self.skipped.load(Ordering::SeqCst),
                percentage: percentage(completed, self.total),
                last_group,
                done: resolved == self.total,
            };
            self.reporter.report(snapshot);
        });
    }
}

fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (completed * 100 / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<BatchProgress>>,
    }

    impl ProgressReporter for Recorder {
        fn report(&self, progress: &BatchProgress) {
            self.seen.lock().unwrap().push(progress.clone());
        }
    }

    #[test]
    fn test_tally_counts_and_completes_once() {
        let recorder = Arc::new(Recorder::default());
        let tally = ProgressTally::new(3, recorder.clone());
        let rx = tally.subscribe();

        tally.record("fr-FR", Resolution::Completed);
        tally.record("de-DE", Resolution::Failed);
        assert!(!rx.borrow().done);
        assert_eq!(rx.borrow().percentage, 33);
        assert_eq!(rx.borrow().last_group.as_deref(), Some("fr-FR"));

        tally.record("es-ES", Resolution::Skipped);
        let last = tally.snapshot();
        assert_eq!(
            (last.completed, last.failed, last.skipped, last.resolved),
            (1, 1, 1, 3)
        );
        assert!(last.done);
        assert_eq!(last.percentage, 33);
        assert_eq!(last.last_group.as_deref(), Some("fr-FR"));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.iter().filter(|p| p.done).count(), 1);
    }

    #[test]
    fn test_failures_do_not_advance_percentage() {
        let tally = ProgressTally::new(2, Arc::new(NoopProgress));

        tally.record("de-DE", Resolution::Failed);
        let snapshot = tally.snapshot();
        assert_eq!((snapshot.resolved, snapshot.percentage), (1, 0));
        assert!(snapshot.last_group.is_none());

        tally.record("fr-FR", Resolution::Completed);
        let snapshot = tally.snapshot();
        assert_eq!(snapshot.percentage, 50);
        assert_eq!(snapshot.last_group.as_deref(), Some("fr-FR"));
        assert!(snapshot.done);
    }

    #[test]
    fn test_empty_batch_starts_done() {
        let tally = ProgressTally::new(0, Arc::new(NoopProgress));
        let snapshot = tally.snapshot();
        assert!(snapshot.done);
        assert_eq!(snapshot.percentage, 100);
    }

    #[tokio::test]
    async fn test_broadcast_progress_forwards() {
        let broadcast = Arc::new(BroadcastProgress::new(8));
        let mut rx = broadcast.subscribe();
        let tally = ProgressTally::new(1, broadcast.clone());

        tally.record("fr-FR", Resolution::Completed);
        let received = rx.recv().await.unwrap();
        assert!(received.done);
        assert_eq!(received.completed, 1);
    }
}
