//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase):
//!     (method, pattern, route)
//!     → table.rs (pick the per-method tree)
//!     → tree.rs (validate wildcards, insert into radix tree)
//!
//! Incoming Request (method, path)
//!     → table.rs (method lookup)
//!     → tree.rs (descend: literal → parameter → catch-all)
//!     → Return: route + params, or a miss with a trailing-slash hint
//!
//! Near-miss correction:
//!     path.rs (clean_path) → tree.rs (case-insensitive descent)
//!     → corrected literal path for a redirect
//! ```
//!
//! # Design Decisions
//! - Trees are built during setup and only read while serving (no locks)
//! - Literal children are tried before the parameter child, which is tried
//!   before the catch-all child; the order falls out of the node layout
//! - Malformed patterns are rejected at registration, never at request time
//! - Case correction is ASCII-only and only ever produces a redirect target

pub mod params;
pub mod path;
pub mod table;
pub mod tree;

pub use params::{Param, Params};
pub use path::{clean_path, decode_path, encode_path, join_paths};
pub use table::{Lookup, RouteTable};
pub use tree::{Node, RouteError};
