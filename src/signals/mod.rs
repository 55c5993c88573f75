//! Signal bus and panic reporting.
//!
//! # Data Flow
//! ```text
//! Ctx::send / Engine::send
//!        │ (non-blocking)
//!        ▼
//! SignalBus ──▶ signal-bus thread ──▶ spawn_blocking ──▶ queue fn
//!                                                   └──▶ default sink (debug log)
//!
//! Engine::panic_notify ──▶ PanicSink (synchronous, always on)
//!                     └──▶ "panic" queue (best effort)
//! ```

pub mod bus;
pub mod queues;
pub mod sink;

pub use bus::{QueueFn, Signal, SignalBus};
pub use queues::{MESSAGE_QUEUE, PANIC_QUEUE, RECORDER_QUEUE};
pub use sink::{PanicSink, StderrSink};
