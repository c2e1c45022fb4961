//! Logging infrastructure for tilesweep.
//!
//! Structured `tracing` output goes to a log file that is cleared at the
//! start of every run, and optionally to stdout. `RUST_LOG` overrides the
//! default level.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Logging options chosen on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingOptions {
    /// Log at `debug`, ignoring `RUST_LOG`
    pub debug: bool,
    /// Mirror log output to stdout
    pub stdout: bool,
}

impl LoggingOptions {
    fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// `--debug` wins, then `RUST_LOG`, then `info`.
    fn env_filter(&self, rust_log: Option<&str>) -> EnvFilter {
        let from_env = rust_log
            .filter(|_| !self.debug)
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| EnvFilter::try_new(d).ok());
        from_env.unwrap_or_else(|| EnvFilter::new(self.default_directive()))
    }
}

/// Initialize the global subscriber.
///
/// Creates the log file's directory if needed and truncates the previous
/// log before attaching a non-blocking writer to it.
///
/// # Errors
///
/// Returns error if the directory cannot be created or the file cannot be cleared
pub fn init_logging(
    log_file: &Path,
    options: LoggingOptions,
) -> Result<LoggingGuard, io::Error> {
    let (dir, name) = prepare_log_file(log_file)?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = options.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = options.env_filter(rust_log.as_deref());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Create the parent directory and clear the file. Returns the directory and
/// file name the appender is opened with.
fn prepare_log_file(log_file: &Path) -> io::Result<(PathBuf, OsString)> {
    let name = log_file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path has no file name: {}", log_file.display()),
        )
    })?;
    let dir = log_dir(log_file);

    fs::create_dir_all(&dir)?;
    fs::write(log_file, "")?;

    Ok((dir, name.to_os_string()))
}

fn log_dir(log_file: &Path) -> PathBuf {
    match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let log_file = temp.path().join("logs").join("tilesweep.log");

        let (dir, name) = prepare_log_file(&log_file).unwrap();

        assert_eq!(dir, temp.path().join("logs"));
        assert_eq!(name, OsString::from("tilesweep.log"));
        assert_eq!(fs::read_to_string(&log_file).unwrap(), "");
    }

    #[test]
    fn test_clears_existing_file() {
        let temp = TempDir::new().unwrap();
        let log_file = temp.path().join("tilesweep.log");
        fs::write(&log_file, "old log data").unwrap();

        prepare_log_file(&log_file).unwrap();

        assert_eq!(fs::read_to_string(&log_file).unwrap(), "");
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        assert_eq!(log_dir(Path::new("only-a-name.log")), PathBuf::from("."));
        assert_eq!(log_dir(Path::new("/var/log/t.log")), PathBuf::from("/var/log"));
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        let err = prepare_log_file(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(LoggingOptions::default().default_directive(), "info");
        let debug = LoggingOptions {
            debug: true,
            stdout: false,
        };
        assert_eq!(debug.default_directive(), "debug");
    }

    #[test]
    fn test_debug_flag_overrides_rust_log() {
        let debug = LoggingOptions {
            debug: true,
            stdout: false,
        };
        assert_eq!(debug.env_filter(Some("warn")).to_string(), "debug");
        assert_eq!(debug.env_filter(None).to_string(), "debug");
    }

    #[test]
    fn test_rust_log_used_without_debug_flag() {
        let options = LoggingOptions::default();
        assert_eq!(options.env_filter(Some("warn")).to_string(), "warn");
        assert_eq!(options.env_filter(Some("")).to_string(), "info");
        assert_eq!(options.env_filter(None).to_string(), "info");
    }
}
