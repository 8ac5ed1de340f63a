//! Logging bridge
//!
//! The native library reports progress through a registered logging callback.
//! [`LogBridge`] adapts that push-style callback into an observer model:
//! observers are invoked synchronously, in registration order, on the thread
//! that triggered the native log event.
//!
//! An observer failure must never unwind through native stack frames, so the
//! bridge captures it and holds it as a *pending callback error*. Every
//! public entry point that calls into native code checks for pending errors
//! after the native call returns and re-raises the oldest one there (see
//! [`LogBridge::take_pending`]).

use crate::types::{KineticsError, LogLevel, LogMessage, ObserverError, ObserverPanic, Result};
use chrono::{Local, SecondsFormat};
use std::collections::VecDeque;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};

/// Maximum number of deferred observer errors held at once.
///
/// Errors beyond this are dropped (with a `log` warning) rather than grown
/// without bound; pending errors are re-raised oldest first.
pub const PENDING_ERROR_CAPACITY: usize = 16;

/// Handle identifying a registered observer.
///
/// Registering the same closure twice yields two distinct ids and two
/// deliveries per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A log observer.
///
/// Returning `Err` stops dispatch for the current event and defers the error
/// to the caller of the enclosing native entry point.
pub type Observer = Box<dyn FnMut(&LogMessage) -> std::result::Result<(), ObserverError> + Send>;

/// Adapter between the native logging callback and registered observers
///
/// A `LogBridge` is an ordinary value; unit tests construct their own. The
/// instance wired to the real native callback is process-wide (the native
/// callback signature carries no user-data pointer) and lives behind a mutex
/// in the [`crate::application`] module.
#[derive(Default)]
pub struct LogBridge {
    observers: Vec<(ObserverId, Observer)>,
    pending: VecDeque<ObserverError>,
    next_id: u64,
}

impl LogBridge {
    /// Create an empty bridge with no observers and no pending errors
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer to be notified on each log event.
    ///
    /// Observers fire in registration order. There is no uniqueness
    /// constraint; each registration fires once per event.
    pub fn register(&mut self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove a previously registered observer.
    ///
    /// Returns `false` (not an error) if the id is not currently registered.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Number of currently registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver one log event to every registered observer.
    ///
    /// Invoked from the native callback with text already decoded into owned
    /// strings. Never returns an error and never panics: an observer failure
    /// (or panic) stops dispatch for this event and is queued as a pending
    /// callback error instead, to be re-raised once the native call that
    /// triggered it has returned.
    pub fn dispatch(&mut self, event: &LogMessage) {
        let mut failure = None;
        for (_, observer) in self.observers.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer(event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => {
                    Box::new(ObserverPanic::new(panic_message(&payload))) as ObserverError
                }
            };
            // Dispatch aborts on the first failing observer; later observers
            // do not see this event.
            failure = Some(error);
            break;
        }
        if let Some(error) = failure {
            self.push_pending(error);
        }
    }

    /// Decode raw callback arguments and dispatch the event.
    pub fn dispatch_raw(&mut self, level: c_int, category: String, message: String) {
        let event = LogMessage {
            level: LogLevel::from_code(level),
            category,
            message,
        };
        self.dispatch(&event);
    }

    /// True if at least one observer error is waiting to be re-raised
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Re-raise the oldest pending callback error, if any.
    ///
    /// Called by every public entry point after the native call it wraps has
    /// returned. The error is wrapped in [`KineticsError::Callback`] with the
    /// observer's original error as its source, and removed from the queue;
    /// remaining errors surface on subsequent checks, oldest first.
    pub fn take_pending(&mut self) -> Result<()> {
        match self.pending.pop_front() {
            Some(source) => Err(KineticsError::callback(source)),
            None => Ok(()),
        }
    }

    fn push_pending(&mut self, error: ObserverError) {
        if self.pending.len() >= PENDING_ERROR_CAPACITY {
            log::warn!(
                "dropping observer error, {} already pending: {}",
                self.pending.len(),
                error
            );
            return;
        }
        self.pending.push_back(error);
    }
}

/// Render a console log line: `LEVEL (Category) <ISO-8601 local time> message`
pub fn format_console_line(event: &LogMessage) -> String {
    let now = Local::now().to_rfc3339_opts(SecondsFormat::Millis, false);
    format!(
        "{} ({}) {} {}",
        event.level, event.category, now, event.message
    )
}

/// Built-in observer that prints each event to stdout
pub fn console_observer() -> Observer {
    Box::new(|event| {
        println!("{}", format_console_line(event));
        Ok(())
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_observer(sink: Arc<Mutex<Vec<LogMessage>>>) -> Observer {
        Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        })
    }

    #[test]
    fn test_single_delivery_preserves_fields() {
        let mut bridge = LogBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bridge.register(collecting_observer(seen.clone()));

        let event = LogMessage::new(LogLevel::Warning, "Testing", "This is a test message.");
        bridge.dispatch(&event);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, LogLevel::Warning);
        assert_eq!(seen[0].category, "Testing");
        assert_eq!(seen[0].message, "This is a test message.");
        assert!(!bridge.has_pending());
    }

    #[test]
    fn test_unregistered_observer_not_notified() {
        let mut bridge = LogBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = bridge.register(collecting_observer(seen.clone()));

        assert!(bridge.unregister(id));
        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "dropped"));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let mut bridge = LogBridge::new();
        let id = bridge.register(Box::new(|_| Ok(())));
        assert!(bridge.unregister(id));
        assert!(!bridge.unregister(id));
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let mut bridge = LogBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bridge.register(collecting_observer(seen.clone()));
        bridge.register(collecting_observer(seen.clone()));

        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "twice"));

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_observers_fire_in_registration_order() {
        let mut bridge = LogBridge::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            bridge.register(Box::new(move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            }));
        }

        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "order"));

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_observer_error_is_deferred_not_raised() {
        let mut bridge = LogBridge::new();
        bridge.register(Box::new(|_| Err("observer failed".into())));

        // Dispatch itself must not fail; this runs under native frames.
        bridge.dispatch(&LogMessage::new(LogLevel::Error, "Testing", "boom"));
        assert!(bridge.has_pending());

        let err = bridge.take_pending().unwrap_err();
        match err {
            KineticsError::Callback { source } => {
                assert_eq!(source.to_string(), "observer failed");
            }
            other => panic!("expected Callback error, got {other:?}"),
        }

        // The slot is cleared once raised.
        assert!(bridge.take_pending().is_ok());
    }

    #[test]
    fn test_failing_observer_stops_dispatch() {
        let mut bridge = LogBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        bridge.register(Box::new(|_| Err("first fails".into())));
        bridge.register(collecting_observer(seen.clone()));

        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "halted"));

        assert!(seen.lock().unwrap().is_empty());
        assert!(bridge.has_pending());
    }

    #[test]
    fn test_panicking_observer_is_captured() {
        let mut bridge = LogBridge::new();
        bridge.register(Box::new(|_| panic!("observer blew up")));

        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "panic"));

        let err = bridge.take_pending().unwrap_err();
        match err {
            KineticsError::Callback { source } => {
                assert!(source.to_string().contains("observer blew up"));
                assert!(source.downcast_ref::<ObserverPanic>().is_some());
            }
            other => panic!("expected Callback error, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_errors_drain_oldest_first() {
        let mut bridge = LogBridge::new();
        let mut n = 0u32;
        bridge.register(Box::new(move |_| {
            n += 1;
            Err(format!("failure {n}").into())
        }));

        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "one"));
        bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "two"));

        let first = bridge.take_pending().unwrap_err();
        let second = bridge.take_pending().unwrap_err();
        let src = |e: KineticsError| match e {
            KineticsError::Callback { source } => source.to_string(),
            other => panic!("expected Callback error, got {other:?}"),
        };
        assert_eq!(src(first), "failure 1");
        assert_eq!(src(second), "failure 2");
        assert!(bridge.take_pending().is_ok());
    }

    #[test]
    fn test_pending_queue_is_bounded() {
        let mut bridge = LogBridge::new();
        bridge.register(Box::new(|_| Err("overflow".into())));

        for _ in 0..PENDING_ERROR_CAPACITY + 5 {
            bridge.dispatch(&LogMessage::new(LogLevel::Info, "Testing", "full"));
        }

        let mut drained = 0;
        while bridge.take_pending().is_err() {
            drained += 1;
        }
        assert_eq!(drained, PENDING_ERROR_CAPACITY);
    }

    #[test]
    fn test_console_line_format() {
        let event = LogMessage::new(LogLevel::Warning, "Testing", "This is a test message.");
        let line = format_console_line(&event);

        let prefix = "WARNING (Testing) ";
        assert!(line.starts_with(prefix), "unexpected line: {line}");

        // Timestamp is RFC 3339 with millisecond precision and an offset,
        // e.g. 2024-01-02T03:04:05.678+00:00 (29 characters).
        let stamp = &line[prefix.len()..prefix.len() + 29];
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "bad stamp: {stamp}");

        assert!(line.ends_with(" This is a test message."));
    }
}
