//! Process-wide binding surface
//!
//! The native library reports log output through a single registered
//! callback with no user-data pointer, so the bridge wired to it is
//! process-wide. This module owns that instance and exposes the public
//! observer API plus safe wrappers over the solver's metadata and
//! housekeeping entry points.
//!
//! Every wrapper that calls into native code follows the same contract:
//! check the native return code, then check for (and re-raise) any callback
//! error an observer produced while the native call was on the stack.

use crate::logging::{console_observer, LogBridge, Observer, ObserverId};
use crate::types::Result;
use std::sync::{Mutex, OnceLock, PoisonError};

#[cfg(feature = "native")]
use crate::ffi;
#[cfg(feature = "native")]
use crate::types::KineticsError;
#[cfg(feature = "native")]
use std::ffi::CString;
#[cfg(feature = "native")]
use std::os::raw::c_int;
#[cfg(feature = "native")]
use std::path::{Path, PathBuf};

struct AppState {
    bridge: LogBridge,
    console: Option<ObserverId>,
}

static APP: OnceLock<Mutex<AppState>> = OnceLock::new();

fn state() -> &'static Mutex<AppState> {
    APP.get_or_init(|| {
        Mutex::new(AppState {
            bridge: LogBridge::new(),
            console: None,
        })
    })
}

/// Run a closure against the process-wide bridge.
///
/// A poisoned lock is recovered rather than propagated: the bridge holds
/// only plain data and a half-finished dispatch leaves it consistent.
pub(crate) fn with_bridge<R>(f: impl FnOnce(&mut LogBridge) -> R) -> R {
    let mut guard = state().lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard.bridge)
}

/// Register an observer on the process-wide logging bridge.
///
/// Observers fire synchronously, in registration order, on whichever thread
/// triggers a native log event. See [`crate::logging::LogBridge::register`].
pub fn register_log_observer(observer: Observer) -> ObserverId {
    with_bridge(|bridge| bridge.register(observer))
}

/// Remove a previously registered observer; no-op if already removed
pub fn unregister_log_observer(id: ObserverId) -> bool {
    with_bridge(|bridge| bridge.unregister(id))
}

/// Install the built-in stdout observer.
///
/// Calling this again while console logging is active is a no-op.
pub fn add_console_logging() {
    let mut guard = state().lock().unwrap_or_else(PoisonError::into_inner);
    if guard.console.is_none() {
        let id = guard.bridge.register(console_observer());
        guard.console = Some(id);
    }
}

/// Remove the built-in stdout observer; no-op if not installed
pub fn remove_console_logging() {
    let mut guard = state().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(id) = guard.console.take() {
        guard.bridge.unregister(id);
    }
}

/// Re-raise the oldest pending callback error, if any.
///
/// The native-calling wrappers in this module do this automatically; call
/// it directly after driving the raw callback yourself (for example through
/// [`crate::ffi::log_callback`]).
pub fn check_callback_errors() -> Result<()> {
    with_bridge(|bridge| bridge.take_pending())
}

#[cfg(feature = "native")]
fn check_return(code: c_int) -> Result<()> {
    if code < 0 {
        return Err(KineticsError::NativeCall {
            message: ffi::last_native_error(),
        });
    }
    Ok(())
}

/// Register the logging callback with the native library.
///
/// Wrappers call this lazily; it runs the registration once per process.
#[cfg(feature = "native")]
fn ensure_native_logging() -> Result<()> {
    static HOOKED: OnceLock<c_int> = OnceLock::new();
    let code = *HOOKED.get_or_init(|| unsafe { ffi::kin_setLogCallback(ffi::log_callback) });
    check_return(code)
}

/// Version string of the native library
#[cfg(feature = "native")]
pub fn version() -> Result<String> {
    ensure_native_logging()?;
    let version = ffi::get_string(|len, buf| unsafe { ffi::kin_getVersion(len, buf) })?;
    check_callback_errors()?;
    Ok(version)
}

/// Git commit the native library was built from
#[cfg(feature = "native")]
pub fn git_commit() -> Result<String> {
    ensure_native_logging()?;
    let commit = ffi::get_string(|len, buf| unsafe { ffi::kin_getGitCommit(len, buf) })?;
    check_callback_errors()?;
    Ok(commit)
}

/// Directories the native library searches for input data files
#[cfg(feature = "native")]
pub fn data_directories() -> Result<Vec<PathBuf>> {
    ensure_native_logging()?;
    let sep = CString::new(";")?;
    let joined = ffi::get_string(|len, buf| unsafe {
        ffi::kin_getDataDirectories(sep.as_ptr(), len, buf)
    })?;
    check_callback_errors()?;
    Ok(joined
        .split(';')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Append a directory to the native library's data search path
#[cfg(feature = "native")]
pub fn add_data_directory(dir: &Path) -> Result<()> {
    ensure_native_logging()?;
    let c_dir = CString::new(dir.to_string_lossy().into_owned())?;
    let code = unsafe { ffi::kin_addDataDirectory(c_dir.as_ptr()) };
    check_return(code)?;
    check_callback_errors()
}

/// Send a message through the native library's own log machinery.
///
/// The native side hands the message straight back to the registered
/// callback, so every observer sees it.
#[cfg(feature = "native")]
pub fn write_log(message: &str) -> Result<()> {
    ensure_native_logging()?;
    let c_msg = CString::new(message)?;
    let code = unsafe { ffi::kin_writeLog(c_msg.as_ptr()) };
    check_return(code)?;
    check_callback_errors()
}

/// Enable or disable the solver's thermodynamics warnings
#[cfg(feature = "native")]
pub fn suppress_thermo_warnings(suppress: bool) -> Result<()> {
    ensure_native_logging()?;
    let code = unsafe { ffi::kin_suppressThermoWarnings(suppress as c_int) };
    check_return(code)?;
    check_callback_errors()
}

/// Enable or disable the solver's deprecation warnings
#[cfg(feature = "native")]
pub fn suppress_deprecation_warnings(suppress: bool) -> Result<()> {
    ensure_native_logging()?;
    let code = unsafe { ffi::kin_suppressDeprecationWarnings(suppress as c_int) };
    check_return(code)?;
    check_callback_errors()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::log_callback;
    use crate::types::{KineticsError, LogLevel, LogMessage};
    use std::ffi::CString;
    use std::sync::{Arc, Mutex as StdMutex};

    // Tests below share the process-wide bridge; serialize them.
    static TEST_GUARD: StdMutex<()> = StdMutex::new(());

    fn drive_callback(level: LogLevel, category: &str, message: &str) {
        let category = CString::new(category).unwrap();
        let message = CString::new(message).unwrap();
        log_callback(level.code(), category.as_ptr(), message.as_ptr());
    }

    fn drain_pending() {
        while check_callback_errors().is_err() {}
    }

    #[test]
    fn test_observer_sees_callback_event() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        let seen: Arc<StdMutex<Vec<LogMessage>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        let id = register_log_observer(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        }));

        drive_callback(LogLevel::Warning, "Testing", "This is a test message.");
        unregister_log_observer(id);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![LogMessage::new(
                LogLevel::Warning,
                "Testing",
                "This is a test message."
            )]
        );
        assert!(check_callback_errors().is_ok());
    }

    #[test]
    fn test_callback_error_raised_at_check_point() {
        #[derive(Debug)]
        struct FooError;
        impl std::fmt::Display for FooError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "foo")
            }
        }
        impl std::error::Error for FooError {}

        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        drain_pending();

        let id = register_log_observer(Box::new(|_| Err(Box::new(FooError))));
        drive_callback(LogLevel::Warning, "Testing", "This is a test message.");
        unregister_log_observer(id);

        let err = check_callback_errors().unwrap_err();
        match err {
            KineticsError::Callback { source } => {
                assert!(source.downcast_ref::<FooError>().is_some());
            }
            other => panic!("expected Callback error, got {other:?}"),
        }
        assert!(check_callback_errors().is_ok());
    }

    #[test]
    fn test_console_logging_add_remove() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        let before = with_bridge(|b| b.observer_count());

        add_console_logging();
        add_console_logging();
        assert_eq!(with_bridge(|b| b.observer_count()), before + 1);

        remove_console_logging();
        remove_console_logging();
        assert_eq!(with_bridge(|b| b.observer_count()), before);
    }

    #[test]
    fn test_utf8_round_trip_through_raw_callback() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        let seen: Arc<StdMutex<Vec<LogMessage>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        let id = register_log_observer(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        }));

        let category = "Kinétics™";
        let message = "Δ温度 → ∞ (μmol)";
        drive_callback(LogLevel::Info, category, message);
        unregister_log_observer(id);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].category, category);
        assert_eq!(seen[0].message, message);
    }
}
