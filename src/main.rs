//! globtail - follow every file matching a set of glob patterns.

use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use globtail::{Config, LineReader, DEFAULT_WINDOW};

#[derive(Debug, Parser)]
#[command(name = "globtail", about = "Follow every file matching a set of glob patterns", version)]
struct Cli {
    /// Continue looking for new lines
    #[arg(short = 'f')]
    follow: bool,

    /// Reopen recreated files
    #[arg(short = 'F')]
    reopen: bool,

    /// Trailing bytes shown from files that already exist
    #[arg(short = 'c', long = "bytes", default_value_t = DEFAULT_WINDOW)]
    window: u64,

    /// Milliseconds between discovery passes
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    rescan_ms: u64,

    /// Milliseconds between checks of a quiet file
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    poll_ms: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Files or glob patterns to follow
    #[arg(value_name = "FILE|PATTERN", required = true)]
    patterns: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            patterns: self.patterns.clone(),
            follow: self.follow,
            reopen: self.reopen,
            window: self.window,
            rescan_interval: Duration::from_millis(self.rescan_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    let reader = LineReader::with_poll_interval(config.poll_interval);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, shutting down");
        }
        on_signal.cancel();
    });

    let out = BufWriter::new(io::stdout());
    match globtail::run(config, reader, out, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "globtail failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["globtail", "-f", "-F", "*.log", "/tmp/x.log"]).unwrap();
        let config = cli.config();
        assert!(config.follow);
        assert!(config.reopen);
        assert_eq!(config.patterns, vec!["*.log", "/tmp/x.log"]);
        assert_eq!(config.window, 500);
        assert_eq!(config.rescan_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["globtail", "a.log"]).unwrap();
        assert!(!cli.follow);
        assert!(!cli.reopen);
        assert_eq!(cli.poll_ms, 250);
    }

    #[test]
    fn test_cli_requires_pattern() {
        let err = Cli::try_parse_from(["globtail", "-f"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["globtail", "--rescan-ms", "0", "a.log"]).is_err());
    }
}
