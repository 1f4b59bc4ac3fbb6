//! Minimal Reference Implementations of the External Contracts
//!
//! These are not part of the guard engine's own responsibility — they are
//! kept at arm's length the way `oxide-router`'s own tests keep its route
//! pattern matcher separate from guard logic. Useful directly in tests, and
//! as a starting point for small embedding applications that don't have a
//! host router of their own yet.

use crate::contract::{HashSource, HostRouter};
use crate::params::HashArguments;
use crate::route::{Route, RouteMatch};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryHashSourceState {
    hash: Option<String>,
    listeners: Vec<Arc<dyn Fn(String) + Send + Sync>>,
}

/// An in-memory [`HashSource`], usable in tests or headless embeddings
/// where there is no browser location bar to observe.
#[derive(Default)]
pub struct MemoryHashSource {
    state: Mutex<MemoryHashSourceState>,
}

impl MemoryHashSource {
    /// Creates a new, empty hash source.
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, hash: &str) {
        let listeners = self.state.lock().unwrap().listeners.clone();
        for listener in listeners {
            listener(hash.to_string());
        }
    }
}

impl HashSource for MemoryHashSource {
    fn current_hash(&self) -> Option<String> {
        self.state.lock().unwrap().hash.clone()
    }

    fn set_hash(&self, hash: &str) {
        self.state.lock().unwrap().hash = Some(hash.to_string());
        self.notify(hash);
    }

    fn replace_hash(&self, hash: &str) {
        // Per the `HashSource` contract, `replace_hash` fires its change
        // notification synchronously — unless the value doesn't actually
        // change, in which case it's a no-op and nothing fires.
        let changed = {
            let mut state = self.state.lock().unwrap();
            if state.hash.as_deref() == Some(hash) {
                false
            } else {
                state.hash = Some(hash.to_string());
                true
            }
        };

        if changed {
            self.notify(hash);
        }
    }

    fn on_hash_changed(&self, callback: Arc<dyn Fn(String) + Send + Sync>) {
        self.state.lock().unwrap().listeners.push(callback);
    }
}

/// A reference [`HostRouter`] backed by a flat list of [`Route`]s, matched
/// in priority order exactly as `RoutePattern` does for any other consumer.
pub struct SimpleHostRouter {
    routes: Vec<Route>,
}

impl SimpleHostRouter {
    /// Creates a router over the given routes, sorted by match priority.
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { routes }
    }

    /// Returns the route registered under the given name, if any.
    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name.as_deref() == Some(name))
    }
}

impl HostRouter for SimpleHostRouter {
    fn resolve(&self, hash: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| route.match_path(hash))
    }

    fn resolve_by_name(&self, name: &str, parameters: Option<&HashArguments>) -> Option<String> {
        let route = self.route_by_name(name)?;
        let empty = HashArguments::new();
        route
            .pattern
            .generate(parameters.unwrap_or(&empty))
            .ok()
    }

    fn navigate(&self, route_match: &RouteMatch, _arguments: &HashArguments) {
        tracing::debug!(
            route = route_match.name().unwrap_or("<unnamed>"),
            path = %route_match.matched_path,
            "navigating"
        );
    }

    fn parse(&self, hash: &str) -> (String, HashArguments) {
        (hash.to_string(), HashArguments::new())
    }

    fn teardown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memory_hash_source_set_and_get() {
        let source = MemoryHashSource::new();
        assert!(source.current_hash().is_none());
        source.set_hash("/home");
        assert_eq!(source.current_hash(), Some("/home".to_string()));
    }

    #[test]
    fn test_memory_hash_source_notifies_on_set() {
        let source = MemoryHashSource::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        source.on_hash_changed(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        source.set_hash("/a");
        source.set_hash("/b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memory_hash_source_replace_notifies_on_change() {
        let source = MemoryHashSource::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        source.on_hash_changed(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        source.replace_hash("/a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.current_hash(), Some("/a".to_string()));
    }

    #[test]
    fn test_memory_hash_source_replace_same_value_is_a_silent_noop() {
        let source = MemoryHashSource::new();
        source.set_hash("/a");

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        source.on_hash_changed(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        source.replace_hash("/a");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.current_hash(), Some("/a".to_string()));
    }

    #[test]
    fn test_simple_host_router_resolve() {
        let routes = vec![Route::new("/users/:id").unwrap().name("user-detail")];
        let router = SimpleHostRouter::new(routes);

        let matched = router.resolve("/users/42").unwrap();
        assert_eq!(matched.name(), Some("user-detail"));
        assert_eq!(matched.arguments.get("id"), Some("42"));
    }

    #[test]
    fn test_simple_host_router_resolve_by_name() {
        let routes = vec![Route::new("/users/:id").unwrap().name("user-detail")];
        let router = SimpleHostRouter::new(routes);

        let mut params = HashArguments::new();
        params.insert("id", "42");

        let hash = router.resolve_by_name("user-detail", Some(&params)).unwrap();
        assert_eq!(hash, "/users/42");
    }

    #[test]
    fn test_simple_host_router_resolve_by_name_missing_route() {
        let router = SimpleHostRouter::new(vec![]);
        assert!(router.resolve_by_name("missing", None).is_none());
    }

    #[test]
    fn test_simple_host_router_priority_ordering() {
        let routes = vec![
            Route::new("/*").unwrap().name("catch-all"),
            Route::new("/users/:id").unwrap().name("user-detail"),
            Route::new("/users/new").unwrap().name("new-user"),
        ];
        let router = SimpleHostRouter::new(routes);

        assert_eq!(router.resolve("/users/new").unwrap().name(), Some("new-user"));
        assert_eq!(router.resolve("/users/42").unwrap().name(), Some("user-detail"));
        assert_eq!(router.resolve("/anything").unwrap().name(), Some("catch-all"));
    }
}
