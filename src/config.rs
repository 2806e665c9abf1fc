//! Run-time settings of the aggregator.

use std::time::Duration;

use crate::error::Error;
use crate::position::{StartPosition, DEFAULT_WINDOW};
use crate::reader::{TailConfig, DEFAULT_POLL_INTERVAL};
use crate::scheduler::DEFAULT_RESCAN_INTERVAL;

/// Settings for one aggregator run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Glob patterns or literal paths, in the order given.
    pub patterns: Vec<String>,
    /// Keep following files after their current end.
    pub follow: bool,
    /// Reattach files recreated at the same path.
    pub reopen: bool,
    /// Trailing bytes shown from files that already exist when attached.
    pub window: u64,
    /// Delay between discovery passes.
    pub rescan_interval: Duration,
    /// Delay between checks of a followed file absent filesystem events.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            patterns: Vec::new(),
            follow: false,
            reopen: false,
            window: DEFAULT_WINDOW,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Config {
            patterns: patterns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.patterns.is_empty() {
            return Err(Error::Config("at least one file or pattern is required".into()));
        }
        if self.rescan_interval.is_zero() {
            return Err(Error::Config("rescan interval must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    /// Follow settings for one file starting at `start`.
    pub fn tail_config(&self, start: StartPosition) -> TailConfig {
        TailConfig {
            follow: self.follow,
            reopen: self.reopen,
            location: start.seek_from(),
        }
    }
}
