//! Logging setup for the command line tools.
//!
//! Events go to stdout and to a log file that is truncated at the start of
//! every run. `RUST_LOG` selects the level; `--verbose` forces debug for
//! this crate.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Filter directives: `RUST_LOG` when set, otherwise `info`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("info,wallmap=debug,wallmap_cli=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Creates the log directory and truncates the log file.
///
/// Returns the directory and file name for the appender.
pub(crate) fn prepare_log_file(path: &Path) -> io::Result<(PathBuf, OsString)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?;

    fs::create_dir_all(&dir)?;
    fs::write(dir.join(&name), "")?;
    Ok((dir, name))
}

/// Installs the global subscriber writing to stdout and `log_file`.
pub fn init_logging(log_file: &Path, verbose: bool) -> io::Result<LoggingGuard> {
    let (dir, name) = prepare_log_file(log_file)?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
