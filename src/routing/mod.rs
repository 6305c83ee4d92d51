//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (build phase):
//!     add(path, handler, options)
//!     → pattern.rs (strip delimiters, parse placeholders)
//!     → registry.rs (static table | dynamic table, merge by parts)
//!
//! finalize(compile):
//!     dynamic routes
//!     → tree.rs (group by segment count, merge guards, collapse chains)
//!     → matcher.rs (render procedure, fast-fail pass, compile closures)
//!     → router.rs (CompiledRouter, frozen)
//!
//! resolve(path, method):
//!     → cache.rs (hit: return)
//!     → matcher.rs (static lookup, then tree) → RouteId + raw captures
//!     → codec.rs (typed params, canonical path)
//!     → route.rs (handler by canonical path and method)
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Deterministic: literals before typed guards, then registration order
//! - A committed branch never falls back to its siblings
//! - Parameter conversion failures surface as `RouteNotFound`

pub mod cache;
pub mod codec;
pub mod error;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod registry;
pub mod route;
pub mod router;
pub mod tree;

pub use error::{RouterError, RouterResult};
pub use params::{ParamKind, ParamValue, Params, Requirement, Ymd};
pub use route::{Methods, Route, RouteId, RouteOptions};
pub use router::{CompiledRouter, Resolution, Router};
