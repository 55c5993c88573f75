//! Per-request state.
//!
//! # Data Flow
//! ```text
//! ContextPool::acquire ──▶ Context (Acquired)
//!        │
//!        ▼ populate(request)
//! Context (Populated) ──▶ Ctx { engine, &mut Context } ──▶ handlers
//!        │
//!        ▼ recorder finish, signals
//! ContextPool::release ──▶ Context::reset ──▶ Idle
//! ```

pub mod ctx;
pub mod errors;
pub mod pool;
pub mod recorder;

pub use ctx::{handler, Context, Ctx, Handler, Phase};
pub use errors::{ErrorMsg, ErrorMsgs, ErrorType};
pub use pool::ContextPool;
pub use recorder::{Record, Recorder};
