//! Panic containment for observer callbacks.
//!
//! Monitors are reporting sinks: whatever they do must not abort the
//! operation they observe. Panics are caught here and reported best-effort
//! to stderr, since the logging sink may be the thing that failed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Runs a monitor callback, swallowing any panic.
pub(crate) fn notify<F>(event: &'static str, f: F)
where
    F: FnOnce(),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        fallback(event, payload.as_ref());
    }
}

/// Runs a substituting monitor callback, falling back to `original` if it panics.
pub(crate) fn substitute<T, F>(event: &'static str, original: T, f: F) -> T
where
    T: Clone,
    F: FnOnce(T) -> T,
{
    let kept = original.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| f(original))) {
        Ok(replacement) => replacement,
        Err(payload) => {
            fallback(event, payload.as_ref());
            kept
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn fallback(event: &str, payload: &(dyn Any + Send)) {
    eprintln!(
        "ferrous-adapters: monitor panicked during {}: {}",
        event,
        panic_message(payload)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_swallows_panics() {
        notify("test", || panic!("boom"));
    }

    #[test]
    fn substitute_keeps_original_on_panic() {
        let value = substitute("test", 7, |_| panic!("boom"));
        assert_eq!(value, 7);
        assert_eq!(substitute("test", 7, |v| v + 1), 8);
    }

    #[test]
    fn panic_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
