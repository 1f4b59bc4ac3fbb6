//! A navigation guard engine for hash-routed single-page applications
//!
//! Intercepts hash changes, runs a three-phase guard pipeline (leave,
//! global-enter, route-enter) against a pool of registered guards, and
//! commits, blocks, or redirects based on the outcome — all while tolerating
//! guards that answer asynchronously, supersede each other mid-flight, or
//! panic outright.
//!
//! See [`engine::GuardedRouter`] for the entry point.

pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod guard;
pub mod memory;
pub mod params;
pub mod route;

pub use config::RouterConfig;
pub use contract::{HashSource, HostRouter};
pub use engine::{AttemptState, CurrentHash, GuardedRouter};
pub use guard::*;
pub use params::*;
pub use route::*;
