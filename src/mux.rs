//! Fan-in of every watcher's lines into one consumer-facing stream.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task;

use futures_util::stream::Stream as FuturesStream;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::reader::Line;

/// Watchers block on send until the consumer takes the previous event.
const CHANNEL_CAPACITY: usize = 1;

/// A line captured for a given source path.
#[derive(Debug)]
pub struct Event {
    /// The path from where the line was read, as discovery produced it.
    source: PathBuf,
    line: Line,
}

impl Event {
    pub fn new(source: impl Into<PathBuf>, line: Line) -> Self {
        Event {
            source: source.into(),
            line,
        }
    }

    /// Returns a reference to the file from where the line was read.
    pub fn source(&self) -> &Path {
        self.source.as_path()
    }

    pub fn text(&self) -> &str {
        self.line.text()
    }

    pub fn err(&self) -> Option<&Error> {
        self.line.err()
    }

    /// Returns the internal components that make up an `Event`.
    pub fn into_inner(self) -> (PathBuf, Line) {
        (self.source, self.line)
    }
}

/// Producer half of the fan-in channel. Cloned once per watcher task.
pub type Sender = mpsc::Sender<Event>;

/// Creates the fan-in channel.
pub fn channel() -> (Sender, MuxedLines) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (tx, MuxedLines { rx })
}

/// Merged line stream of all attached files.
///
/// Lines of one file keep their file order; lines of different files are
/// interleaved in whatever order their watchers delivered them. The stream
/// ends once every [`Sender`] is dropped.
#[derive(Debug)]
pub struct MuxedLines {
    rx: mpsc::Receiver<Event>,
}

impl FuturesStream for MuxedLines {
    type Item = Event;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
