//! Path routing engine.
//!
//! Routes are registered as patterns with typed placeholders, finalized once
//! into a fast-failing decision procedure, and resolved to a handler plus
//! typed parameters on every request.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::RoutingConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Resolution, RouteOptions, Router, RouterError};
