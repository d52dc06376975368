use std::sync::{Arc, OnceLock};

/// Trait representing a logger that can log messages at various levels.
///
/// This trait should be implemented by the host application that wants to
/// receive log messages from the registration model. With the `ffi` feature
/// it is exported via `UniFFI` for use in foreign languages.
///
/// # Examples
///
/// ```rust
/// use accountkit_core::logger::{Logger, LogLevel};
///
/// struct MyLogger;
///
/// impl Logger for MyLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// class AccountKitLoggerBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Timber.tag("AccountKit").log(level.toPriority(), message)
///     }
/// }
///
/// setLogger(AccountKitLoggerBridge()) // Call this only once!
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity level of the log message.
    /// * `message` - The log message to be recorded.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
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

/// Forwards `log` records to the host-provided [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // Debug and trace chatter from other crates is dropped; ours is kept.
        if is_debug_or_trace(record.level()) && !is_from_accountkit(record.module_path())
        {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

fn is_debug_or_trace(level: log::Level) -> bool {
    level == log::Level::Debug || level == log::Level::Trace
}

fn is_from_accountkit(module_path: Option<&str>) -> bool {
    module_path.is_some_and(|path| path.starts_with("accountkit"))
}

/// Maps a `log::Level` onto the exported [`LogLevel`].
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
/// Installs the `log` facade bridge on first use. Calling it again keeps the
/// first logger and prints a notice.
#[cfg_attr(feature = "ffi", uniffi::export)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_filter() {
        assert!(is_from_accountkit(Some("accountkit_core::registration")));
        assert!(!is_from_accountkit(Some("hyper::client")));
        assert!(!is_from_accountkit(None));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
        assert!(is_debug_or_trace(log::Level::Debug));
        assert!(!is_debug_or_trace(log::Level::Info));
    }
}
