use chrono::{DateTime, Local};
use log::{LevelFilter, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;

use chatsapp::ChatError;

// Logger for the binary: one line per record, to a file when given, else stdout.

pub struct SimpleLogger {
    log_file: Option<File>,
}

impl SimpleLogger {
    pub fn new(log_file_path: Option<&str>) -> std::io::Result<Self> {
        let log_file = match log_file_path {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };

        Ok(SimpleLogger { log_file })
    }
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now: DateTime<Local> = Local::now();
            let log_message = format!(
                "[{}] {} [{}:{}] {}\n",
                now.format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            );

            match &self.log_file {
                Some(file) => {
                    if let Ok(mut file) = file.try_clone() {
                        let _ = file.write_all(log_message.as_bytes());
                    }
                }
                None => print!("{}", log_message),
            }
        }
    }

    fn flush(&self) {
        match &self.log_file {
            Some(file) => {
                if let Ok(mut file) = file.try_clone() {
                    let _ = file.flush();
                }
            }
            None => {
                let _ = std::io::stdout().flush();
            }
        }
    }
}

/// Install the logger. Failure here is a non-critical setup error: the caller
/// reports it and carries on without logging.
pub fn setup_logging(log_file: Option<&str>, level: LevelFilter) -> Result<(), ChatError> {
    let logger = SimpleLogger::new(log_file)
        .map_err(|e| ChatError::MetadataSetup(format!("cannot open log file: {}", e)))?;
    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))
        .map_err(|e| ChatError::MetadataSetup(e.to_string()))?;

    log::info!("Logging initialized at level: {}", level);
    log::info!("{} version {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Ok(())
}
