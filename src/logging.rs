use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct SimpleLogger {
    level: LevelFilter,
    log_file: Option<PathBuf>,
}

static LOGGER: OnceCell<SimpleLogger> = OnceCell::new();

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let log_entry = format_entry(record);
        eprint!("{log_entry}");

        if let Some(log_file) = &self.log_file {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
                let _ = file.write_all(log_entry.as_bytes());
            }
        }
    }

    fn flush(&self) {}
}

fn format_entry(record: &Record) -> String {
    format!(
        "{} {:<5} {} - {}\n",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Parses a textual level ("info", "DEBUG", "off"...). Unknown names fall back to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

// Creates the directory a log file will be appended to.
fn prepare_log_dir(log_file: &Path) -> std::io::Result<()> {
    match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

pub fn init(level: LevelFilter, log_file: Option<PathBuf>) -> Result<(), SetLoggerError> {
    if let Some(path) = &log_file {
        if let Err(e) = prepare_log_dir(path) {
            eprintln!(
                "Warning: cannot create log directory for {}: {e}; logging to stderr only",
                path.display()
            );
        }
    }

    let logger = LOGGER.get_or_init(|| SimpleLogger { level, log_file });
    log::set_logger(logger).map(|()| log::set_max_level(logger.level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("chatty"), LevelFilter::Info);
    }

    #[test]
    fn test_prepare_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("game.log");
        prepare_log_dir(&nested).unwrap();
        assert!(dir.path().join("logs").is_dir());
        prepare_log_dir(Path::new("game.log")).unwrap();

        // A regular file where the directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        assert!(prepare_log_dir(&blocker.join("game.log")).is_err());
    }
}
