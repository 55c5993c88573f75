//! HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body collection)
//!     → request.rs (peer address, requester, form values)
//!     → Engine::dispatch
//!     → response.rs (write-once status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{FormError, RemoteAddr, X_REQUEST_ID};
pub use response::ResponseWriter;
pub use server::{AppState, HttpServer};
