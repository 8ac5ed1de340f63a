//! Core types for the kinetics bindings library
//!
//! This module defines the log message types emitted by the native logging
//! callback and the error type used throughout the bindings.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::os::raw::c_int;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, KineticsError>;

/// Boxed error type produced by log observers.
pub type ObserverError = Box<dyn Error + Send + Sync + 'static>;

/// Severity of a log message raised by the native library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Map a native level code to a `LogLevel`.
    ///
    /// The native library uses 0 = info, 1 = warning, 2 = error. Codes this
    /// build does not know about are treated as errors so they are never
    /// silently downgraded.
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => LogLevel::Info,
            1 => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }

    /// Native level code for this level
    pub fn code(self) -> c_int {
        match self {
            LogLevel::Info => 0,
            LogLevel::Warning => 1,
            LogLevel::Error => 2,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single log event raised by the native library
///
/// Constructed by the logging bridge from the raw callback arguments and
/// handed to every registered observer. Immutable once constructed; the
/// category and message are owned copies, the native buffers are only valid
/// for the duration of the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Message severity
    pub level: LogLevel,
    /// Subsystem that produced the message (e.g. "ThermoPhase")
    pub category: String,
    /// Message text
    pub message: String,
}

impl LogMessage {
    /// Create a new log message
    pub fn new(level: LogLevel, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            category: category.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.level, self.category, self.message)
    }
}

/// Errors that can occur in the bindings
#[derive(Debug, thiserror::Error)]
pub enum KineticsError {
    /// A log observer failed during callback dispatch.
    ///
    /// The failure is captured while native frames are still on the stack
    /// and re-raised by the first entry point that checks for pending
    /// callback errors after the native call returns. The observer's own
    /// error is reachable through `source()`.
    #[error("a log observer failed during callback dispatch")]
    Callback {
        #[source]
        source: ObserverError,
    },

    /// A native entry point signaled failure through its return code
    #[error("native call failed: {message}")]
    NativeCall { message: String },

    /// A string passed to native code contained an interior NUL byte
    #[error("invalid string for native call: {0}")]
    Nul(#[from] std::ffi::NulError),
}

impl KineticsError {
    /// Wrap an observer error as a deferred callback error
    pub(crate) fn callback(source: ObserverError) -> Self {
        KineticsError::Callback { source }
    }
}

/// Error representing a panic that escaped a log observer
///
/// Panics cannot be allowed to unwind into native frames, so the bridge
/// converts the payload into this error and defers it like any other
/// observer failure.
#[derive(Debug)]
pub struct ObserverPanic {
    payload: String,
}

impl ObserverPanic {
    pub(crate) fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl fmt::Display for ObserverPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log observer panicked: {}", self.payload)
    }
}

impl Error for ObserverPanic {}
