//! Injectable logging capability shared by the pool, its workers and drivers.
//!
//! The pool never special-cases an absent logger: it starts out with a
//! [`NoopLogger`] and callers replace it with [`ProcessPool::set_logger`].
//! With the `tracing` feature enabled, [`TracingLogger`] forwards every record
//! to the `tracing` ecosystem.
//!
//! [`ProcessPool::set_logger`]: crate::ProcessPool::set_logger

use core::fmt;
use std::sync::Arc;

/// Severity of a [`Logger`] record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(level)
    }
}

/// A logging sink handed to every worker and to the pool driver.
///
/// Implementations must tolerate concurrent use from multiple threads.
pub trait Logger: Send + Sync {
    /// Records a single message at the given level.
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Shared handle to a [`Logger`].
pub type SharedLogger = Arc<dyn Logger>;

/// A logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Returns a fresh shared [`NoopLogger`].
pub fn noop_logger() -> SharedLogger {
    Arc::new(NoopLogger)
}

/// A logger that forwards records to `tracing` under the `zsw_pool` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "zsw_pool", "{message}"),
            LogLevel::Info => tracing::info!(target: "zsw_pool", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "zsw_pool", "{message}"),
            LogLevel::Error => tracing::error!(target: "zsw_pool", "{message}"),
        }
    }
}
