//! Filesystem change notifications for a single followed file.

use std::fmt::{self, Debug, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

/// Wakes a follower up when its file (or its parent directory) changes.
///
/// Internally, `FileEvents` contains a [`notify::RecommendedWatcher`] on the
/// parent directory of the followed file, so that creation and removal of the
/// file are seen as well as modification. Events for unrelated entries of the
/// directory are dropped. When no watcher could be registered, waiting falls
/// back to plain polling.
pub struct FileEvents {
    path: PathBuf,
    inner: Option<notify::RecommendedWatcher>,
    event_stream: mpsc::UnboundedReceiver<Result<notify::Event, notify::Error>>,
}

impl Debug for FileEvents {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("FileEvents")
            .field("path", &self.path)
            .field("watching", &self.inner.is_some())
            .finish()
    }
}

impl FileEvents {
    /// Registers a watch for `path`. Never fails: if the platform watcher
    /// cannot be set up, the returned instance only polls.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = absolutify(path.as_ref());
        let (tx, rx) = mpsc::unbounded_channel();

        let inner = match Self::watch_parent(&path, tx) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "falling back to polling");
                None
            }
        };

        FileEvents {
            path,
            inner,
            event_stream: rx,
        }
    }

    fn watch_parent(
        path: &Path,
        tx: mpsc::UnboundedSender<Result<notify::Event, notify::Error>>,
    ) -> notify::Result<notify::RecommendedWatcher> {
        let parent = path
            .parent()
            .ok_or_else(|| notify::Error::path_not_found().add_path(path.to_path_buf()))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // Only fails once the receiver is gone, which means the follower
            // itself was dropped.
            let _ = tx.send(res);
        })?;
        notify::Watcher::watch(&mut watcher, parent, notify::RecursiveMode::NonRecursive)?;

        Ok(watcher)
    }

    /// Whether a platform watcher is active (as opposed to polling only).
    pub fn is_watching(&self) -> bool {
        self.inner.is_some()
    }

    fn is_relevant(&self, event: &notify::Event) -> bool {
        // Some backends report directory-level events without paths.
        event.paths.is_empty() || event.paths.iter().any(|p| p == &self.path)
    }

    /// Waits until the followed file changes or `poll` elapses, whichever is
    /// first. Returns an error only for watcher failures; these are not fatal
    /// and callers may keep waiting.
    pub async fn wait(&mut self, poll: Duration) -> io::Result<()> {
        if self.inner.is_none() {
            time::sleep(poll).await;
            return Ok(());
        }

        let deadline = time::Instant::now() + poll;
        loop {
            let res = match time::timeout_at(deadline, self.event_stream.recv()).await {
                Err(_elapsed) => return Ok(()),
                Ok(None) => {
                    // Watcher thread went away; keep the caller on polling.
                    self.inner = None;
                    time::sleep_until(deadline).await;
                    return Ok(());
                }
                Ok(Some(res)) => res,
            };

            match res {
                Ok(event) if self.is_relevant(&event) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(into_io_error(e)),
            }
        }
    }
}

fn into_io_error(e: notify::Error) -> io::Error {
    match e.kind {
        notify::ErrorKind::Io(io_err) => io_err,
        // Runtime event errors should only be std::io, but need to handle
        // this case anyway.
        kind => io::Error::new(io::ErrorKind::Other, format!("Event error: {:?}", kind)),
    }
}

/// Resolves `path` to an absolute path so that it matches the paths carried
/// by `notify::Event`s. The file itself need not exist.
fn absolutify(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if p != Path::new("") => p.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let parent = parent.canonicalize().unwrap_or(parent);

    match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    }
}
