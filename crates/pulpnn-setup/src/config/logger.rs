use super::GlobalConfig;
use core::fmt::Display;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration for logging the generation plan.
///
/// Note that you can use multiple loggers at the same time.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoggerConfig {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level, determining verbosity.
    #[serde(default)]
    pub level: SetupLogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: SetupLogLevel::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

/// How much of the generation plan is reported.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum SetupLogLevel {
    /// Nothing is reported.
    #[serde(rename = "disabled")]
    Disabled,

    /// One line per generated test case.
    #[default]
    #[serde(rename = "basic")]
    Basic,

    /// Test cases plus buffer sizes and skipped variants.
    #[serde(rename = "full")]
    Full,
}

fn append_default() -> bool {
    true
}

/// Writes plan reports to every sink enabled in the [logger config](LoggerConfig).
#[derive(Debug)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
    level: SetupLogLevel,
}

impl Logger {
    /// Creates a logger for the given configuration.
    ///
    /// A log file that can't be opened is reported through the `log` crate and skipped.
    pub fn from_config(config: &GlobalConfig) -> Self {
        let settings = &config.logger;
        let mut loggers = Vec::new();

        if let Some(path) = &settings.file {
            match FileLogger::new(path, settings.append) {
                Ok(logger) => loggers.push(LoggerKind::File(logger)),
                Err(err) => log::warn!("Unable to open log file {}: {err}", path.display()),
            }
        }
        if settings.stdout {
            loggers.push(LoggerKind::Stdout);
        }
        if settings.stderr {
            loggers.push(LoggerKind::Stderr);
        }
        if let Some(level) = settings.log {
            loggers.push(LoggerKind::Log(level));
        }

        Self {
            loggers,
            level: settings.level,
        }
    }

    /// Logs a message when the level is at least [basic](SetupLogLevel::Basic).
    pub fn log_basic<S: Display>(&mut self, msg: &S) {
        if self.level != SetupLogLevel::Disabled {
            self.log(msg);
        }
    }

    /// Logs a message when the level is [full](SetupLogLevel::Full).
    pub fn log_full<S: Display>(&mut self, msg: &S) {
        if self.level == SetupLogLevel::Full {
            self.log(msg);
        }
    }

    fn log<S: Display>(&mut self, msg: &S) {
        for logger in self.loggers.iter_mut() {
            logger.log(msg);
        }
    }
}

#[derive(Debug)]
enum LoggerKind {
    File(FileLogger),
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    fn new(path: &PathBuf, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    // Flushes after every message so a failed run still leaves a complete log.
    fn log<S: Display>(&mut self, msg: &S) {
        let result = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
        if let Err(err) = result {
            log::warn!("Unable to write to the log file: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(logger: LoggerConfig) -> GlobalConfig {
        GlobalConfig {
            logger,
            ..Default::default()
        }
    }

    #[test]
    fn file_logger_respects_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.log");
        let config = config_with(LoggerConfig {
            file: Some(path.clone()),
            log: None,
            level: SetupLogLevel::Basic,
            ..Default::default()
        });

        let mut logger = Logger::from_config(&config);
        logger.log_basic(&"pulp_nn_conv_u8_u8_i8");
        logger.log_full(&"im2col: 1152 bytes");
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "pulp_nn_conv_u8_u8_i8\n");
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.log");
        let config = config_with(LoggerConfig {
            file: Some(path.clone()),
            level: SetupLogLevel::Disabled,
            ..Default::default()
        });

        let mut logger = Logger::from_config(&config);
        logger.log_basic(&"ignored");
        drop(logger);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn overwrite_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.log");
        std::fs::write(&path, "previous run\n").unwrap();
        let config = config_with(LoggerConfig {
            file: Some(path.clone()),
            append: false,
            log: None,
            ..Default::default()
        });

        let mut logger = Logger::from_config(&config);
        logger.log_basic(&"fresh");
        drop(logger);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn unopenable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(LoggerConfig {
            file: Some(dir.path().to_path_buf()),
            stderr: true,
            ..Default::default()
        });

        let logger = Logger::from_config(&config);

        assert_eq!(logger.loggers.len(), 1);
        assert!(matches!(logger.loggers[0], LoggerKind::Stderr));
    }
}
