//! External Collaborator Contracts
//!
//! The guarded router intercepts hash changes and drives the guard
//! pipeline, but it does not own browser history or the host routing
//! framework's own path matching and view rendering — those responsibilities
//! live behind these two traits. An embedding application supplies its own
//! implementations; [`crate::memory`] ships minimal reference ones used by
//! this crate's own test suite.

use crate::params::HashArguments;
use crate::route::RouteMatch;
use std::sync::Arc;

/// Reads and writes the host environment's location hash (e.g. the
/// browser's `window.location.hash`, or an in-memory stand-in for tests and
/// headless embeddings).
pub trait HashSource: Send + Sync {
    /// Returns the current hash, if one has ever been set.
    fn current_hash(&self) -> Option<String>;

    /// Sets the hash, creating a new history entry and firing
    /// `on_hash_changed` listeners.
    fn set_hash(&self, hash: &str);

    /// Replaces the current hash in place, without creating a new history
    /// entry. Implementations that can't distinguish "replace" from "set"
    /// may fire `on_hash_changed` listeners anyway; the engine tolerates
    /// this (see [`crate::engine::GuardedRouter`]'s restoration logic).
    fn replace_hash(&self, hash: &str);

    /// Registers a callback to be invoked whenever the hash changes,
    /// whether by `set_hash`/`replace_hash` or by an external actor (e.g.
    /// the user editing the address bar, or the back/forward buttons).
    fn on_hash_changed(&self, callback: Arc<dyn Fn(String) + Send + Sync>);
}

/// The host routing framework: resolves a hash into a route match, performs
/// the actual navigation (component swap, lifecycle hooks, browser history)
/// once a guard pipeline has committed, and owns route registration.
pub trait HostRouter: Send + Sync {
    /// Resolves a hash into a route match, if any registered route claims
    /// it.
    fn resolve(&self, hash: &str) -> Option<RouteMatch>;

    /// Resolves a route by name into a concrete hash, substituting
    /// `parameters` into its pattern. Returns `None` if no route with that
    /// name is registered, or a required parameter is missing.
    fn resolve_by_name(&self, name: &str, parameters: Option<&HashArguments>) -> Option<String>;

    /// Commits a navigation to the given route match (swaps views, updates
    /// history) after the guard pipeline has allowed it.
    fn navigate(&self, route_match: &RouteMatch, arguments: &HashArguments);

    /// Parses a raw hash string into its path and argument components,
    /// without consulting the route table.
    fn parse(&self, hash: &str) -> (String, HashArguments);

    /// Releases any resources the host router holds for the current guarded
    /// session. Called from [`crate::engine::GuardedRouter::destroy`].
    fn teardown(&self);
}
