//! Starting one watcher task per newly discovered file.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task;

use futures_util::ready;
use futures_util::stream::{Stream as FuturesStream, StreamExt};
use pin_project_lite::pin_project;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::mux::{Event, Sender};
use crate::position::StartPosition;
use crate::reader::{FileWatch, Line, TailConfig};
use crate::watched::WatchedSet;

pin_project! {
/// Drops the first line of a stream that was opened in the middle of a line.
///
/// A seek to a byte offset usually lands inside a line, so the first record
/// is the tail end of a line that was already partly written. Only one text
/// record is ever dropped; if the first record is an error it is passed
/// through and nothing is dropped.
#[derive(Debug)]
pub struct SkipFragment<S> {
    #[pin]
    inner: S,
    pending: bool,
}
}

impl<S> SkipFragment<S> {
    pub fn new(inner: S, skip: bool) -> Self {
        SkipFragment {
            inner,
            pending: skip,
        }
    }
}

impl<S: FuturesStream<Item = Line>> FuturesStream for SkipFragment<S> {
    type Item = Line;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(line) if *this.pending => {
                    *this.pending = false;
                    if line.is_err() {
                        return task::Poll::Ready(Some(line));
                    }
                    tracing::trace!(fragment = %line, "dropping partial line");
                }
                other => return task::Poll::Ready(other),
            }
        }
    }
}

/// Starts watchers for files not seen before.
///
/// Owns the [`WatchedSet`]; only the discovery loop calls into it, so the set
/// needs no locking.
#[derive(Debug)]
pub struct Attacher<W> {
    watch: Arc<W>,
    config: Config,
    watched: WatchedSet,
    tx: Sender,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl<W: FileWatch> Attacher<W> {
    pub fn new(
        watch: Arc<W>,
        config: Config,
        tx: Sender,
        tracker: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        Attacher {
            watch,
            config,
            watched: WatchedSet::new(),
            tx,
            tracker,
            cancel,
        }
    }

    /// Starts a watcher for `path` unless one was started before. `len` is the
    /// file size seen by discovery. Returns whether a watcher was started.
    ///
    /// The path is recorded before the watcher opens the file, so a file that
    /// then fails to open is not tried again.
    pub fn attach(&mut self, path: PathBuf, len: u64) -> bool {
        if !self.watched.insert(path.clone()) {
            return false;
        }

        let start = StartPosition::for_size(len, self.config.window);
        let config = self.config.tail_config(start);
        tracing::debug!(
            path = %path.display(),
            offset = start.offset(len),
            "attaching"
        );

        self.tracker.spawn(watch_file(
            Arc::clone(&self.watch),
            path,
            config,
            start.starts_mid_line(),
            self.tx.clone(),
            self.cancel.clone(),
        ));

        true
    }

    pub fn watched(&self) -> &WatchedSet {
        &self.watched
    }
}

/// Body of a watcher task: forwards every line of one file to the fan-in
/// channel until the file's stream ends, the consumer goes away, or the run is
/// cancelled.
async fn watch_file<W: FileWatch>(
    watch: Arc<W>,
    path: PathBuf,
    config: TailConfig,
    skip_fragment: bool,
    tx: Sender,
    cancel: CancellationToken,
) {
    let lines = match watch.open(&path, &config).await {
        Ok(lines) => lines,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "error tailing file");
            return;
        }
    };
    let mut lines = SkipFragment::new(lines, skip_fragment);

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next() => line,
        };
        let Some(line) = line else {
            break;
        };

        let sent = tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(Event::new(path.clone(), line)) => sent,
        };
        if sent.is_err() {
            break;
        }
    }

    tracing::debug!(path = %path.display(), "watcher finished");
}
