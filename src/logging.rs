use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::io::{self, Write};

// Writes progress lines to stderr; stdout is reserved for the decision.
#[derive(Debug)]
struct StderrLogger {
    level: LevelFilter,
}

static LOGGER: OnceCell<StderrLogger> = OnceCell::new();

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let timestamp = Local::now().format("%H:%M:%S");
            let _ = writeln!(
                io::stderr().lock(),
                "[{}] {} - {}",
                timestamp,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Installs the process logger. Only the first call takes effect.
pub fn init(verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = LOGGER.get_or_init(|| StderrLogger { level });
    log::set_logger(logger).map(|()| log::set_max_level(logger.level))
}
