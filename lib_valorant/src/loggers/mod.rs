//! # Logging Setup
//!
//! Installs a global `tracing` subscriber: human-readable output on stdout
//! and, when a log directory is given, JSON lines in a timestamped file there.
//! Only the newest previous log file is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// File name prefix of every log file this module writes or prunes.
pub const LOG_FILE_PREFIX: &str = "valorant_";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log directory error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `log_level`. The returned
/// guard flushes the file writer on drop and must be held for the life of
/// the program.
pub fn setup_logging(log_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level).map_err(|source| LoggingError::Filter {
            filter: log_level.to_string(),
            source,
        })?,
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            cleanup_old_logs(dir)?;
            let appender = tracing_appender::rolling::never(dir, log_file_name());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}

/// `valorant_<local timestamp>.log`; names sort chronologically.
pub fn log_file_name() -> String {
    format!("{}{}.log", LOG_FILE_PREFIX, chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Deletes all but the newest of this module's log files in `log_dir` and
/// returns how many were removed. Other files are left alone.
pub fn cleanup_old_logs(log_dir: &Path) -> io::Result<usize> {
    let mut logs: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_own_log(path))
        .collect();

    // Newest first
    logs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old in logs.iter().skip(1) {
        match fs::remove_file(old) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {}: {}", old.display(), e),
        }
    }
    Ok(removed)
}

fn is_own_log(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == "log")
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_keeps_only_the_newest_log() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "valorant_2024-01-01_00-00-00.log",
            "valorant_2024-03-01_00-00-00.log",
            "valorant_2024-02-01_00-00-00.log",
            "other_2023-01-01_00-00-00.log",
            "valorant_notes.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 2);

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(
            left,
            ["other_2023-01-01_00-00-00.log", "valorant_2024-03-01_00-00-00.log", "valorant_notes.txt"]
        );
    }

    #[test]
    fn cleanup_of_an_empty_directory_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
    }

    #[test]
    fn file_names_carry_the_prefix() {
        let name = log_file_name();
        assert!(name.starts_with(LOG_FILE_PREFIX));
        assert!(name.ends_with(".log"));
    }
}
