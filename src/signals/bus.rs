//! Non-blocking signal bus.
//!
//! # Responsibilities
//! - Accept signals from request handlers without blocking them
//! - Route each signal to its named queue, or to the default sink
//! - Bound the amount of pending work and count what gets dropped
//!
//! # Design Decisions
//! - A dedicated thread owns a current-thread runtime, so the bus works
//!   with or without an ambient tokio runtime
//! - Every signal runs as its own blocking task; a slow queue only delays itself
//! - When `backlog` signals are pending, new ones are dropped and counted

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::observability::metrics;

/// A queue's processing function.
pub type QueueFn = Arc<dyn Fn(Bytes) + Send + Sync>;

/// One notification.
#[derive(Debug, Clone)]
pub struct Signal {
    pub queue: String,
    pub payload: Bytes,
}

struct Shared {
    queues: DashMap<String, QueueFn>,
    pending: AtomicUsize,
    delivered: AtomicU64,
    dropped: AtomicU64,
    backlog: usize,
}

impl Shared {
    fn deliver(&self, signal: Signal) {
        let _in_flight = InFlight(&self.pending);

        // Clone out so the map shard is not locked while the queue runs.
        let queue = self.queues.get(&signal.queue).map(|q| Arc::clone(q.value()));
        match queue {
            Some(run) => run(signal.payload),
            None => tracing::debug!(
                queue = %signal.queue,
                payload = %String::from_utf8_lossy(&signal.payload),
                "Signal for unregistered queue"
            ),
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn drop_signal(&self, queue: &str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::record_signal_dropped(queue);
    }
}

/// Decrements the pending count even if the queue function panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle to the bus. Cheap to clone.
#[derive(Clone)]
pub struct SignalBus {
    tx: Option<mpsc::UnboundedSender<Signal>>,
    shared: Arc<Shared>,
}

impl SignalBus {
    /// Start the bus worker. At most `backlog` signals are pending at once.
    pub fn new(backlog: usize) -> Self {
        let shared = Arc::new(Shared {
            queues: DashMap::new(),
            pending: AtomicUsize::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            backlog,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let tx = match spawn_worker(rx, Arc::clone(&shared)) {
            Ok(()) => Some(tx),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start signal bus, signals will be dropped");
                None
            }
        };

        Self { tx, shared }
    }

    /// Register or replace the function for `name`.
    pub fn register<F>(&self, name: impl Into<String>, queue: F)
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.shared.queues.insert(name.into(), Arc::new(queue));
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.shared.queues.contains_key(name)
    }

    /// Hand `payload` to `queue` without waiting for it to run.
    ///
    /// Returns false if the signal was dropped.
    pub fn send(&self, queue: &str, payload: impl Into<Bytes>) -> bool {
        let Some(tx) = &self.tx else {
            self.shared.drop_signal(queue);
            return false;
        };

        if self.shared.pending.fetch_add(1, Ordering::AcqRel) >= self.shared.backlog {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(queue, backlog = self.shared.backlog, "Signal backlog full, dropping");
            self.shared.drop_signal(queue);
            return false;
        }

        let signal = Signal {
            queue: queue.to_string(),
            payload: payload.into(),
        };
        if tx.send(signal).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            self.shared.drop_signal(queue);
            return false;
        }
        true
    }

    /// Signals accepted but not yet processed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Block until nothing is pending or `timeout` passes.
    ///
    /// Returns true if the bus drained.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("running", &self.tx.is_some())
            .field("queues", &self.shared.queues.len())
            .field("pending", &self.pending())
            .field("backlog", &self.shared.backlog)
            .finish()
    }
}

fn spawn_worker(mut rx: mpsc::UnboundedReceiver<Signal>, shared: Arc<Shared>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("signal-queue")
        .build()?;

    thread::Builder::new()
        .name("signal-bus".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                while let Some(signal) = rx.recv().await {
                    let shared = Arc::clone(&shared);
                    tokio::task::spawn_blocking(move || shared.deliver(signal));
                }
            });
            tracing::debug!("Signal bus stopped");
        })?;
    Ok(())
}
