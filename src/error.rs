//! Crate-level error types
//!
//! The guard pipeline itself never surfaces an error to its caller — a
//! guard rejecting, panicking, or timing out always resolves to a
//! `GuardResult` (or is caught and treated as one), never a `Result` that
//! bubbles past [`crate::engine::GuardedRouter::parse`]. The error types
//! here belong to the two places in the crate that *do* legitimately
//! surface `Result`: compiling a route pattern, and extracting a typed
//! argument out of a [`crate::params::HashArguments`] tree.

pub use crate::params::ArgumentsError;
pub use crate::route::RoutePatternError;
