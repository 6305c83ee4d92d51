//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → dispatch (resolve path and method on the current router snapshot)
//!     → 200 JSON | 404 | 405 + Allow
//!
//! Route table reload:
//!     watcher → mpsc channel → server.rs (build router, atomic swap)
//! ```

pub mod server;

pub use server::{HttpServer, MatchedBody};
