//! Everything related to reading lines from a single followed file.
//!
//! The aggregator only relies on the [`FileWatch`] contract. [`LineReader`] is
//! the implementation used by the binary: a tokio file handle woken up by
//! [`FileEvents`](crate::FileEvents), with truncation and recreation handling.

use std::fmt;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::fs::{metadata, File};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use crate::error::Error;
use crate::events::FileEvents;

/// Default delay between checks of a followed file when no filesystem event
/// arrives.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How a single file is followed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TailConfig {
    /// Keep waiting for appended lines after reaching the end of the file.
    pub follow: bool,
    /// Reattach when the file is removed and recreated at the same path.
    pub reopen: bool,
    /// Where to start reading, relative to the start or end of the file.
    pub location: SeekFrom,
}

impl Default for TailConfig {
    fn default() -> Self {
        TailConfig {
            follow: false,
            reopen: false,
            location: SeekFrom::Start(0),
        }
    }
}

/// One record produced while following a file: a line of text, or an error
/// met while reading.
#[derive(Debug)]
pub struct Line {
    text: String,
    err: Option<Error>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Self {
        Line {
            text: text.into(),
            err: None,
        }
    }

    /// A record carrying only an error.
    pub fn error(err: Error) -> Self {
        Line {
            text: String::new(),
            err: Some(err),
        }
    }

    /// The line, without its trailing newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }

    pub fn into_inner(self) -> (String, Option<Error>) {
        (self.text, self.err)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Source of per-file line streams.
///
/// `open` fails only when the stream cannot start at all (typically the file
/// vanished between discovery and open). Problems met afterwards are
/// delivered in-band as [`Line::err`].
pub trait FileWatch: Send + Sync + 'static {
    type Lines: Stream<Item = Line> + Send + Unpin + 'static;

    fn open(
        &self,
        path: &Path,
        config: &TailConfig,
    ) -> impl Future<Output = Result<Self::Lines, Error>> + Send;
}

/// Follows files on the local filesystem.
#[derive(Clone, Debug)]
pub struct LineReader {
    poll_interval: Duration,
}

impl LineReader {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Sets how long a follower waits for a filesystem event before checking
    /// its file anyway.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        LineReader { poll_interval }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatch for LineReader {
    type Lines = BoxStream<'static, Line>;

    fn open(
        &self,
        path: &Path,
        config: &TailConfig,
    ) -> impl Future<Output = Result<Self::Lines, Error>> + Send {
        let path = path.to_path_buf();
        let config = config.clone();
        let poll_interval = self.poll_interval;

        async move {
            let tail = Tail::open(path, config, poll_interval).await?;
            let lines = stream::unfold(tail, |mut tail| async move {
                tail.next_line().await.map(|line| (line, tail))
            });
            Ok(lines.boxed())
        }
    }
}

fn shift(base: u64, delta: i64) -> u64 {
    if delta < 0 {
        base.saturating_sub(delta.unsigned_abs())
    } else {
        base.saturating_add(delta.unsigned_abs())
    }
}

type FileId = (u64, u64);

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<FileId> {
    None
}

/// What the file at the followed path looks like once the reader hit EOF.
#[derive(Debug, Eq, PartialEq)]
enum FileState {
    Unchanged,
    Truncated,
    Replaced,
    Missing,
}

/// Follow state for one file.
struct Tail {
    path: PathBuf,
    config: TailConfig,
    poll_interval: Duration,
    /// `None` while waiting for a removed file to reappear.
    reader: Option<BufReader<File>>,
    id: Option<FileId>,
    pos: u64,
    /// Bytes of a line whose newline has not been written yet.
    partial: Vec<u8>,
    events: Option<FileEvents>,
    /// Set after a read error so the next read waits first.
    backoff: bool,
    done: bool,
}

impl Tail {
    async fn open(path: PathBuf, config: TailConfig, poll_interval: Duration) -> Result<Self, Error> {
        let open_err = |source| Error::Open {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).await.map_err(open_err)?;
        let meta = file.metadata().await.map_err(open_err)?;
        let len = meta.len();

        // Clamp so that a window larger than the file starts at byte 0.
        let pos = match config.location {
            SeekFrom::Start(n) => n,
            SeekFrom::End(n) => shift(len, n),
            SeekFrom::Current(n) => shift(0, n),
        };
        file.seek(SeekFrom::Start(pos)).await.map_err(open_err)?;

        Ok(Tail {
            id: file_id(&meta),
            reader: Some(BufReader::new(file)),
            path,
            config,
            poll_interval,
            pos,
            partial: Vec::new(),
            events: None,
            backoff: false,
            done: false,
        })
    }

    fn take_line(&mut self) -> Line {
        let mut bytes = std::mem::take(&mut self.partial);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        Line::new(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Hands out a held-back partial line, if any, before switching files.
    fn flush_partial(&mut self) -> Option<Line> {
        if self.partial.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    async fn next_line(&mut self) -> Option<Line> {
        loop {
            if self.done {
                return None;
            }
            if std::mem::take(&mut self.backoff) {
                self.wait().await;
            }

            let reader = match self.reader.as_mut() {
                Some(reader) => reader,
                None => {
                    if !self.try_reopen().await {
                        self.wait().await;
                    }
                    continue;
                }
            };

            match reader.read_until(b'\n', &mut self.partial).await {
                Ok(0) => {}
                Ok(n) => {
                    self.pos += n as u64;
                    if self.partial.last() == Some(&b'\n') {
                        return Some(self.take_line());
                    }
                    // Reached EOF in the middle of a line; the next read
                    // returns 0 and decides what to do with it.
                    continue;
                }
                Err(source) => {
                    if self.config.follow {
                        self.backoff = true;
                    } else {
                        self.done = true;
                    }
                    let err = Error::Read {
                        path: self.path.clone(),
                        source,
                    };
                    return Some(Line::error(err));
                }
            }

            if !self.config.follow {
                self.done = true;
                return self.flush_partial();
            }

            match self.check_file().await {
                FileState::Unchanged => self.wait().await,
                FileState::Truncated => {
                    tracing::debug!(path = %self.path.display(), "file truncated");
                    self.partial.clear();
                    self.pos = 0;
                    if let Some(reader) = self.reader.as_mut() {
                        if let Err(source) = reader.seek(SeekFrom::Start(0)).await {
                            self.reader = None;
                            let err = Error::Read {
                                path: self.path.clone(),
                                source,
                            };
                            return Some(Line::error(err));
                        }
                    }
                }
                FileState::Replaced if self.config.reopen => {
                    tracing::debug!(path = %self.path.display(), "file recreated");
                    self.reader = None;
                    if let Some(line) = self.flush_partial() {
                        return Some(line);
                    }
                }
                FileState::Replaced => self.wait().await,
                FileState::Missing if self.config.reopen => {
                    tracing::debug!(path = %self.path.display(), "file removed, waiting for it");
                    self.reader = None;
                    if let Some(line) = self.flush_partial() {
                        return Some(line);
                    }
                }
                FileState::Missing => {
                    self.done = true;
                    return Some(Line::error(Error::Removed(self.path.clone())));
                }
            }
        }
    }

    async fn check_file(&self) -> FileState {
        match metadata(&self.path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => FileState::Missing,
            // Anything else is treated as transient; check again later.
            Err(_) => FileState::Unchanged,
            Ok(meta) => {
                let id = file_id(&meta);
                if id.is_some() && self.id.is_some() && id != self.id {
                    FileState::Replaced
                } else if meta.len() < self.pos {
                    FileState::Truncated
                } else {
                    FileState::Unchanged
                }
            }
        }
    }

    /// Opens the file again from byte 0. Returns `false` if it is not there
    /// yet.
    async fn try_reopen(&mut self) -> bool {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(_) => return false,
        };
        let id = match file.metadata().await {
            Ok(meta) => file_id(&meta),
            Err(_) => return false,
        };

        tracing::debug!(path = %self.path.display(), "reopened");
        self.reader = Some(BufReader::new(file));
        self.id = id;
        self.pos = 0;
        self.partial.clear();
        true
    }

    async fn wait(&mut self) {
        let path = &self.path;
        let events = self.events.get_or_insert_with(|| FileEvents::new(path));
        if let Err(e) = events.wait(self.poll_interval).await {
            tracing::debug!(path = %self.path.display(), error = %e, "watch error");
        }
    }
}
