//! Periodic discovery over every configured pattern.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::attach::Attacher;
use crate::discovery::discover;
use crate::reader::FileWatch;

/// Delay between two discovery passes.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Runs discovery passes and hands new files to the [`Attacher`].
#[derive(Debug)]
pub struct Scheduler<W> {
    patterns: Vec<String>,
    interval: Duration,
    attacher: Attacher<W>,
}

impl<W: FileWatch> Scheduler<W> {
    pub fn new(patterns: Vec<String>, interval: Duration, attacher: Attacher<W>) -> Self {
        Scheduler {
            patterns,
            interval,
            attacher,
        }
    }

    /// One discovery pass over all patterns, in order. Returns the number of
    /// watchers started.
    ///
    /// A pattern that fails to expand is logged and skipped; the remaining
    /// patterns are still processed.
    pub async fn pass(&mut self) -> usize {
        let mut started = 0;

        for pattern in &self.patterns {
            let found = match discover(pattern).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "skipping pattern");
                    continue;
                }
            };

            for file in found {
                tracing::trace!(path = %file.path().display(), size = file.size(), "discovered");
                let (path, size) = file.into_inner();
                if self.attacher.attach(path, size) {
                    started += 1;
                }
            }
        }

        started
    }

    /// Repeats [`pass`](Self::pass) every interval until `cancel` fires. The
    /// first pass is expected to have been run by the caller.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = self.pass().await;
            if started > 0 {
                tracing::debug!(started, watched = self.attacher.watched().len(), "rescan attached new files");
            }
        }

        tracing::debug!("discovery stopped");
    }

    pub fn attacher(&self) -> &Attacher<W> {
        &self.attacher
    }
}
