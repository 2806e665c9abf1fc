//! Follow every file matching a set of glob patterns, as one multiplexed
//! line stream.
//!
//! Patterns are expanded once at start-up and again on every rescan interval,
//! so files created later are picked up as they appear. Each file gets exactly
//! one watcher for the life of the run; existing files are shown from their
//! last few hundred bytes, new content is followed as it is appended.
//!
//! ## Example
//!
//! ```no_run
//! use globtail::{Config, LineReader};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), globtail::Error> {
//!     let config = Config {
//!         follow: true,
//!         ..Config::new(["/var/log/*.log", "/var/log/app/*.log"])
//!     };
//!
//!     // Runs until the token is cancelled, since `follow` is set.
//!     globtail::run(config, LineReader::new(), std::io::stdout(), CancellationToken::new()).await
//! }
//! ```
//!
//! ## Caveats
//!
//! A file whose watcher fails to start (for instance because it vanished
//! between discovery and open) is not retried by later discovery passes.
//! Recreation at the same path is handled by the reader when `reopen` is set.

mod attach;
mod config;
mod discovery;
mod error;
mod events;
mod mux;
mod position;
mod presenter;
mod reader;
mod scheduler;
mod watched;

#[cfg(test)]
mod testing;

use std::io::{self, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use attach::{Attacher, SkipFragment};
pub use config::Config;
pub use discovery::{discover, Discovered};
pub use error::Error;
pub use events::FileEvents;
pub use mux::{channel, Event, MuxedLines, Sender};
pub use position::{StartPosition, DEFAULT_WINDOW};
pub use presenter::Presenter;
pub use reader::{FileWatch, Line, LineReader, TailConfig, DEFAULT_POLL_INTERVAL};
pub use scheduler::{Scheduler, DEFAULT_RESCAN_INTERVAL};
pub use watched::WatchedSet;

/// Tails `config.patterns` into `out` until `cancel` fires or, without
/// `config.follow`, until every watcher has finished.
///
/// With `config.follow` set this only returns after cancellation, even when
/// nothing matches yet or every watcher has ended; discovery keeps running.
/// Without it, it returns once every file attached so far has been read to
/// its end.
pub async fn run<W, O>(config: Config, watch: W, out: O, cancel: CancellationToken) -> Result<(), Error>
where
    W: FileWatch,
    O: Write + Send + 'static,
{
    config.validate()?;

    let (tx, lines) = mux::channel();
    let tracker = TaskTracker::new();
    let discovery_cancel = cancel.child_token();

    let attacher = Attacher::new(
        Arc::new(watch),
        config.clone(),
        tx,
        tracker.clone(),
        cancel.clone(),
    );
    let mut scheduler = Scheduler::new(config.patterns.clone(), config.rescan_interval, attacher);

    let presenter_cancel = cancel.clone();
    let presenter = tokio::spawn(async move {
        let res = Presenter::new(out).drain(lines).await;
        if res.is_err() {
            // Nobody to write to; stop everything else too.
            presenter_cancel.cancel();
        }
        res
    });

    let started = scheduler.pass().await;
    tracing::info!(
        patterns = ?config.patterns,
        started,
        follow = config.follow,
        reopen = config.reopen,
        "tailing"
    );

    if scheduler.attacher().watched().is_empty() {
        tracing::info!("no file matches yet, waiting for one to appear");
    }

    // Tasks spawned after this still count; `wait` returns once none is left.
    tracker.close();
    let discovery = tokio::spawn(scheduler.run(discovery_cancel.clone()));

    if config.follow {
        cancel.cancelled().await;
    } else {
        tokio::select! {
            _ = tracker.wait() => {}
            _ = cancel.cancelled() => {}
        }
    }

    discovery_cancel.cancel();
    discovery.await.map_err(join_error)?;
    tracker.wait().await;

    // All senders are gone now, so the presenter sees the end of the stream.
    presenter.await.map_err(join_error)??;

    tracing::info!("all watchers finished");
    Ok(())
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
