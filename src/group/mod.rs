//! Path-prefix groups and status escalation.
//!
//! # Data Flow
//! ```text
//! Ctx::status(code)
//!        │
//!        ▼
//! GroupTree::resolve(group, code) ── miss ──▶ parent ──▶ .. ──▶ root
//!        │ hit
//!        ▼
//! StatusChain [before, ..custom, after] ──▶ ResponseWriter
//! ```

pub mod status;
pub mod tree;

pub use status::{default_statuses, escape_html, panic_handler, StatusChain, STANDARD_CODES};
pub use tree::{Group, GroupId, GroupTree, StatusError};
