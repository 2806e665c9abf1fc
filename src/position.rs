//! Initial read position for a newly attached file.

use std::io::SeekFrom;

/// Number of trailing bytes replayed from a file when it is first attached.
pub const DEFAULT_WINDOW: u64 = 500;

/// Where reading of a newly attached file begins.
///
/// Computed once from the file size seen at discovery time and never
/// revisited.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartPosition {
    /// The file is smaller than the window; read all of it.
    Beginning,
    /// Start this many bytes before the end of the file.
    BeforeEnd(u64),
}

impl StartPosition {
    /// Picks the start position for a file of `size` bytes.
    pub fn for_size(size: u64, window: u64) -> Self {
        if size < window {
            StartPosition::Beginning
        } else {
            StartPosition::BeforeEnd(window)
        }
    }

    /// The seek the line reader should apply after opening the file.
    pub fn seek_from(self) -> SeekFrom {
        match self {
            StartPosition::Beginning => SeekFrom::Start(0),
            StartPosition::BeforeEnd(n) => SeekFrom::End(-(i64::try_from(n).unwrap_or(i64::MAX))),
        }
    }

    /// Byte offset of the first byte read, for a file of `size` bytes.
    pub fn offset(self, size: u64) -> u64 {
        match self {
            StartPosition::Beginning => 0,
            StartPosition::BeforeEnd(n) => size.saturating_sub(n),
        }
    }

    /// Whether the first delivered line is likely a fragment of a line that
    /// was cut by the seek. A zero window starts at the end of the file, which
    /// is never inside a written line.
    pub fn starts_mid_line(self) -> bool {
        matches!(self, StartPosition::BeforeEnd(n) if n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_reads_from_start() {
        let pos = StartPosition::for_size(50, DEFAULT_WINDOW);
        assert_eq!(pos, StartPosition::Beginning);
        assert_eq!(pos.offset(50), 0);
        assert_eq!(pos.seek_from(), SeekFrom::Start(0));
        assert!(!pos.starts_mid_line());
    }

    #[test]
    fn test_large_file_reads_window() {
        let pos = StartPosition::for_size(2000, DEFAULT_WINDOW);
        assert_eq!(pos, StartPosition::BeforeEnd(500));
        assert_eq!(pos.offset(2000), 1500);
        assert_eq!(pos.seek_from(), SeekFrom::End(-500));
        assert!(pos.starts_mid_line());
    }

    #[test]
    fn test_exact_window_size() {
        // A file of exactly the window size seeks to byte 0 but is still
        // treated as a window seek, like any other file of size >= window.
        let pos = StartPosition::for_size(500, DEFAULT_WINDOW);
        assert_eq!(pos, StartPosition::BeforeEnd(500));
        assert_eq!(pos.offset(500), 0);
        assert!(pos.starts_mid_line());
    }

    #[test]
    fn test_zero_window_keeps_first_line() {
        let pos = StartPosition::for_size(100, 0);
        assert_eq!(pos.offset(100), 100);
        assert_eq!(pos.seek_from(), SeekFrom::End(0));
        assert!(!pos.starts_mid_line());
    }

    #[test]
    fn test_empty_file() {
        let pos = StartPosition::for_size(0, DEFAULT_WINDOW);
        assert_eq!(pos, StartPosition::Beginning);
    }
}
