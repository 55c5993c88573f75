//! Free-list of reusable request contexts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::ctx::{Context, Phase};

/// Bounded pool of idle contexts.
///
/// The lock is held only to push or pop, never while a handler runs.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Context>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl ContextPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Take an idle context, or build one if the pool is empty.
    pub fn acquire(&self) -> Context {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut cx = reused.unwrap_or_else(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            Context::new()
        });
        cx.phase = Phase::Acquired;
        cx
    }

    /// Clear `cx` and return it to the pool. Dropped when the pool is full.
    pub fn release(&self, mut cx: Context) {
        cx.reset();
        cx.phase = Phase::Idle;

        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(cx);
        }
    }

    /// Contexts currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Contexts ever constructed by this pool.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{Request, StatusCode};

    #[test]
    fn test_reuse_clears_state() {
        let pool = ContextPool::new(8);

        let mut cx = pool.acquire();
        assert_eq!(cx.phase(), Phase::Acquired);
        cx.populate(Request::builder().uri("/a?x=1").body(Bytes::new()).unwrap());
        cx.params.push("id", "42");
        cx.writer.write_header(StatusCode::IM_A_TEAPOT);
        cx.writer.write_str("short and stout");
        pool.release(cx);
        assert_eq!(pool.idle(), 1);

        let cx = pool.acquire();
        assert_eq!(pool.created(), 1);
        assert!(cx.params().is_empty());
        assert!(cx.errors().is_empty());
        assert!(!cx.writer().written());
        assert_eq!(cx.writer().status(), StatusCode::OK);
        assert_eq!(cx.request().uri(), "/");
    }

    #[test]
    fn test_max_idle() {
        let pool = ContextPool::new(2);
        let contexts: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        assert_eq!(pool.created(), 4);

        for cx in contexts {
            pool.release(cx);
        }
        assert_eq!(pool.idle(), 2);
    }
}
