//! Kinetics Bindings Library
//!
//! Safe Rust bindings to a native chemical-kinetics solver exposed through a
//! C API. The solver itself stays on the native side; this crate provides
//! the boundary layer:
//!
//! - A logging bridge that turns the solver's push-style log callback into
//!   registered observers, and defers observer failures so they never unwind
//!   through native stack frames
//! - Safe wrappers over the solver's metadata and housekeeping entry points
//!   (behind the `native` feature)
//! - Read-only views pairing species with per-species scalar data
//!
//! # Example Usage
//!
//! ```
//! use kinetics_bindings::application;
//!
//! // Observe everything the solver logs.
//! let id = application::register_log_observer(Box::new(|event| {
//!     println!("{event}");
//!     Ok(())
//! }));
//!
//! // ... call into the solver ...
//!
//! application::unregister_log_observer(id);
//!
//! // Entry points that cross into native code re-raise observer failures
//! // after the native call returns; when driving the callback manually,
//! // check explicitly:
//! application::check_callback_errors().unwrap();
//! ```

// Public modules
pub mod application;
pub mod collections;
pub mod ffi;
pub mod logging;
pub mod types;

// Re-export main types for convenience
pub use collections::{Species, SpeciesCollection, SpeciesScalars};
pub use logging::{LogBridge, Observer, ObserverId};
pub use types::{KineticsError, LogLevel, LogMessage, ObserverError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a standalone bridge starts empty
        let bridge = LogBridge::new();
        assert_eq!(bridge.observer_count(), 0);
        assert!(!bridge.has_pending());
    }
}
