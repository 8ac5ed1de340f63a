//! FFI surface for the native kinetics solver's C API
//!
//! This module declares the raw entry points of the solver's C API and
//! defines the logging callback handed to it. The extern declarations are
//! only compiled with the `native` feature; the callback itself is plain
//! Rust and is exercised directly by tests, with no solver installed.

use crate::application;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};

/// Signature of the logging callback registered with the native library.
///
/// `category` and `message` are NUL-terminated UTF-8 buffers owned by the
/// native caller for the duration of the call only.
pub type LogCallback = extern "C" fn(level: c_int, category: *const c_char, message: *const c_char);

#[cfg(feature = "native")]
#[link(name = "kinetics_capi")]
extern "C" {
    pub fn kin_setLogCallback(writer: LogCallback) -> c_int;
    pub fn kin_writeLog(msg: *const c_char) -> c_int;
    pub fn kin_getVersion(buflen: c_int, buf: *mut c_char) -> c_int;
    pub fn kin_getGitCommit(buflen: c_int, buf: *mut c_char) -> c_int;
    pub fn kin_getDataDirectories(sep: *const c_char, buflen: c_int, buf: *mut c_char) -> c_int;
    pub fn kin_addDataDirectory(dir: *const c_char) -> c_int;
    pub fn kin_suppressThermoWarnings(suppress: c_int) -> c_int;
    pub fn kin_suppressDeprecationWarnings(suppress: c_int) -> c_int;
    pub fn kin_getLastErrorMessage(buflen: c_int, buf: *mut c_char) -> c_int;
}

/// The callback registered with the native library for log output.
///
/// Copies both text buffers into owned strings before dispatching, and must
/// never unwind: observer failures are captured by the bridge and re-raised
/// after the enclosing native call returns.
pub extern "C" fn log_callback(level: c_int, category: *const c_char, message: *const c_char) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let category = owned_text(category);
        let message = owned_text(message);
        application::with_bridge(|bridge| bridge.dispatch_raw(level, category, message));
    }));

    if result.is_err() {
        // Nothing can be raised here; the native frames above us cannot
        // handle a Rust unwind.
        eprintln!("kinetics-bindings: log callback panicked outside observer dispatch");
    }
}

/// Copy a NUL-terminated UTF-8 buffer into an owned `String`.
///
/// A null pointer yields an empty string. Invalid UTF-8 is replaced rather
/// than rejected so a malformed native message can still be observed.
fn owned_text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

/// Fetch the native library's last error message
#[cfg(feature = "native")]
pub(crate) fn last_native_error() -> String {
    let mut buf = vec![0u8; 512];
    let code =
        unsafe { kin_getLastErrorMessage(buf.len() as c_int, buf.as_mut_ptr() as *mut c_char) };
    if code < 0 {
        return String::from("unknown native error");
    }
    c_buffer_to_string(&buf)
}

/// Read a string-returning native entry point.
///
/// The C API's string getters report the required buffer length when called
/// with a too-small buffer, so this queries the length first and then reads
/// into an exactly-sized buffer.
#[cfg(feature = "native")]
pub(crate) fn get_string(
    f: impl Fn(c_int, *mut c_char) -> c_int,
) -> crate::types::Result<String> {
    use crate::types::KineticsError;

    let needed = f(0, std::ptr::null_mut());
    if needed < 0 {
        return Err(KineticsError::NativeCall {
            message: last_native_error(),
        });
    }

    let mut buf = vec![0u8; needed as usize + 1];
    let code = f(buf.len() as c_int, buf.as_mut_ptr() as *mut c_char);
    if code < 0 {
        return Err(KineticsError::NativeCall {
            message: last_native_error(),
        });
    }

    Ok(c_buffer_to_string(&buf))
}

/// Convert a NUL-terminated byte buffer into a `String`
#[cfg(feature = "native")]
fn c_buffer_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
