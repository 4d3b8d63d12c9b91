//! FILENAME: app/src/logging.rs
// PURPOSE: Unified logging for the command line front end.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;

use crate::AppError;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter shared by every log line
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Optional mirror file for log lines
pub static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

static LOGGER: UnifiedLogger = UnifiedLogger;

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Formats one line as `seq|LEVEL|category|message`.
pub fn format_line(seq: u64, level: &str, category: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level, category, message)
}

/// Opens (and truncates) the log mirror file.
pub fn init_log_file(path: &Path) -> Result<(), AppError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| AppError::Logging(format!("Failed to create log file {:?}: {}", path, e)))?;

    let mut log_file = LOG_FILE
        .lock()
        .map_err(|e| AppError::Logging(format!("Lock error: {}", e)))?;
    *log_file = Some(file);

    Ok(())
}

/// Write a log line in unified format to stderr and the mirror file, if any.
pub fn write_log(level: &str, category: &str, message: &str) {
    let line = format_line(next_seq(), level, category, message);

    eprintln!("{}", line);

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            if let Err(e) = writeln!(file, "{}", line) {
                eprintln!("[LOG_ERROR] Failed to write: {}", e);
            }
            let _ = file.flush();
        }
    }
}

/// `log` facade backend routing every record through `write_log`.
struct UnifiedLogger;

impl Log for UnifiedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            write_log(
                record.level().as_str(),
                record.target(),
                &record.args().to_string(),
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Maps the number of `-v` flags to a level filter. Warnings always show.
pub fn verbosity_level(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the logger. Calling it again only updates the level and file.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), AppError> {
    if let Some(path) = log_file {
        init_log_file(path)?;
    }

    if log::set_logger(&LOGGER).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);

    log::debug!(
        "logging initialized at {} (file: {})",
        level,
        log_file.map_or("none".to_string(), |p| p.display().to_string())
    );
    Ok(())
}
