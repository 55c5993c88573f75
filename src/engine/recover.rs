//! Panic capture at the dispatch boundary.
//!
//! A process-wide panic hook records a backtrace at the panic site, but only
//! on threads currently inside [`catch`]. Panics elsewhere go to the hook
//! that was installed before.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// A panic caught by [`catch`].
#[derive(Debug, Clone)]
pub struct Caught {
    pub message: String,
    pub trace: String,
}

/// Install the capturing hook. Idempotent.
pub fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.with(Cell::get) {
                previous(info);
                return;
            }
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "<unknown>".to_string());
            let trace = format!("panicked at {location}\n{}", Backtrace::force_capture());
            TRACE.with(|t| *t.borrow_mut() = Some(trace));
        }));
    });
}

/// Run `f`, turning a panic into [`Caught`].
pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, Caught> {
    install_hook();
    let outer = CAPTURING.with(|c| c.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(outer));

    result.map_err(|payload| Caught {
        message: panic_message(payload.as_ref()),
        trace: take_trace().unwrap_or_default(),
    })
}

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

fn take_trace() -> Option<String> {
    TRACE.with(|t| t.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_captures_message_and_trace() {
        let caught = catch(|| -> () { panic!("boom {}", 7) }).unwrap_err();
        assert_eq!(caught.message, "boom 7");
        assert!(caught.trace.starts_with("panicked at "));
        assert!(caught.trace.contains("recover.rs"));
    }

    #[test]
    fn test_catch_passes_values_through() {
        assert_eq!(catch(|| 42).unwrap(), 42);
    }

    #[test]
    fn test_nested_catch() {
        let outer = catch(|| {
            let inner = catch(|| -> () { panic!("inner") });
            assert_eq!(inner.unwrap_err().message, "inner");
            panic!("outer");
        });
        assert_eq!(outer.unwrap_err().message, "outer");
    }
}
