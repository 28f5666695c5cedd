//! Bridges `log` records from the core to a logger supplied by the host app.

use std::sync::{Arc, OnceLock};

/// Trait representing a logger that can log messages at various levels.
///
/// Implemented by the host app (Kotlin or Swift) and exported via `UniFFI`.
///
/// # Examples
///
/// ```rust
/// use greencard_core::logger::{Logger, LogLevel};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// class GreenCardLogger : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Timber.tag("greencard").d("[$level] $message")
///     }
/// }
///
/// setLogger(GreenCardLogger()) // once, from Application.onCreate
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Designates potentially harmful situations.
    Warn,
    /// Designates error events that might still allow the application to continue running.
    Error,
}

/// Forwards `log` records to the host logger.
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // Debug and trace output from reqwest, hyper and rustls is noise for the host app.
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            let level = log_level(record.level());
            let message = format!("{}", record.args());
            logger.log(level, message);
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_record_from_greencard =
        module_path.is_some_and(|module_path| module_path.starts_with("greencard"));
    let is_debug_or_trace_level = level == log::Level::Debug || level == log::Level::Trace;
    !is_debug_or_trace_level || is_record_from_greencard
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Should be called once, before any other call into the core. Later calls are ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        println!("Logger already set");
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
