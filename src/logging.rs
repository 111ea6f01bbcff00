//! Process-wide logger: the systemd user journal when it is reachable, plus a
//! plain log file in the data directory that starts empty on every launch.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether debug logging is active for this crate's targets.
static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

pub fn set_debug_logging(enabled: bool) {
    DEBUG_LOGGING.store(enabled, Ordering::Relaxed);
}

pub fn debug_logging() -> bool {
    DEBUG_LOGGING.load(Ordering::Relaxed)
}

/// Crate targets at info (debug when toggled), everything else at warn.
fn target_enabled(metadata: &log::Metadata) -> bool {
    if metadata.target().starts_with("taskplanner") || metadata.target().starts_with("reminder_sweep") {
        let max = if debug_logging() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        metadata.level() <= max
    } else {
        metadata.level() <= log::LevelFilter::Warn
    }
}

struct FilteredLogger {
    journal: Option<systemd_journal_logger::JournalLog>,
    file: Option<Mutex<File>>,
}

impl log::Log for FilteredLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        target_enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(journal) = &self.journal {
            journal.log(record);
        }
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = writeln!(
                file,
                "[{}] {} {}: {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Some(journal) = &self.journal {
            journal.flush();
        }
        if let Some(file) = &self.file {
            let _ = file.lock().unwrap_or_else(|e| e.into_inner()).flush();
        }
    }
}

/// Install the global logger. Safe to call more than once; later calls only
/// update the debug toggle.
pub fn init(identifier: &str, log_file: Option<&Path>, debug: bool) {
    set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => Some(journal.with_syslog_identifier(identifier.to_string())),
        Err(e) => {
            eprintln!("systemd journal unavailable ({}), logging to file only", e);
            None
        }
    };

    // Truncated at startup so the file only covers the current run.
    let file = log_file.and_then(|path| match File::create(path) {
        Ok(file) => Some(Mutex::new(file)),
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", path.display(), e);
            None
        }
    });

    if log::set_boxed_logger(Box::new(FilteredLogger { journal, file })).is_ok() {
        // Global max must be Debug so crate debug logs pass once toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}
