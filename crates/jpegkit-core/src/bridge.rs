//! Single recovery point for decode and encode.
//!
//! Each top-level decode or encode call runs its body through [`recover`].
//! The body reports codec failures as ordinary `Err` values; anything it
//! allocated (scratch rows, the half-built raster, a memory sink) is owned
//! by the body and dropped on the way out. On top of that, `recover`
//! guarantees:
//!
//! - the per-thread diagnostic message is cleared when the call starts and
//!   holds the codec's message when the call fails fatally;
//! - a panic raised inside the codec is caught and turned into a fatal
//!   error of the operation instead of unwinding into the caller.
//!
//! The diagnostic is thread-local, so operations on different threads never
//! see each other's messages.

use std::cell::RefCell;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Message of the most recent fatal codec error on this thread.
///
/// Empty when the last decode/encode succeeded, or failed for a reason the
/// codec did not report (bad header, invalid input, allocation failure).
/// Only meaningful after an operation has returned an error.
pub fn last_error_message() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

fn clear() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

fn record(message: &str) {
    LAST_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.clear();
        slot.push_str(message);
    });
}

/// Errors that can pass through the bridge.
pub(crate) trait Recoverable: Display {
    /// The codec's message if this error came from a fatal codec report.
    fn diagnostic(&self) -> Option<&str>;

    /// Build the fatal error for a panic caught inside the operation.
    fn from_panic(message: String) -> Self;
}

/// Run one top-level operation with the bridge armed.
pub(crate) fn recover<T, E, F>(operation: &str, body: F) -> Result<T, E>
where
    E: Recoverable,
    F: FnOnce() -> Result<T, E>,
{
    clear();

    let result = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(E::from_panic(panic_message(payload.as_ref()))),
    };

    if let Err(err) = &result {
        match err.diagnostic() {
            Some(message) => {
                record(message);
                warn!("{} aborted: {}", operation, message);
            }
            None => debug!("{} failed: {}", operation, err),
        }
    }
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("codec panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("codec panicked: {}", s)
    } else {
        "codec panicked".to_string()
    }
}
