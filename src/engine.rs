//! The Guarded Router
//!
//! This is the pipeline driver, concurrency controller, and result applier:
//! it intercepts hash changes, runs the three-phase guard pipeline (leave,
//! global-enter, route-enter), and commits, blocks, or redirects based on
//! the guards' collective verdict.
//!
//! `GuardedRouter::parse` is the one entry point an embedding application
//! calls (directly, or indirectly via a `HashSource` wired up at
//! construction time). It is a plain synchronous method: it never returns a
//! future, so a caller cannot mistake it for, or accidentally await,
//! asynchronous work. Internally, the moment a guard actually suspends, the
//! remainder of the pipeline is handed to the ambient Tokio runtime — see
//! [`GuardedRouter::drive`].

use crate::config::RouterConfig;
use crate::contract::{HashSource, HostRouter};
use crate::guard::{GuardContext, GuardOutcome, GuardRegistry, GuardResult, RouteGuardSpec};
use crate::params::HashArguments;
use crate::route::RouteId;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// The committed hash, distinguishing "no navigation has ever committed"
/// from "committed to the empty-string hash". Collapsing this into a bare
/// `Option<String>` (or, worse, treating `""` as "unset") would make the
/// very first navigation indistinguishable from a no-op repeat of an empty
/// initial hash — so the distinction is kept explicit end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentHash {
    /// No navigation has ever committed.
    Unset,
    /// The engine has committed to this hash.
    Set(String),
}

impl CurrentHash {
    /// Returns the committed hash, or `None` if nothing has ever committed.
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            CurrentHash::Unset => None,
            CurrentHash::Set(s) => Some(s.as_str()),
        }
    }
}

/// A documentation/tracing-facing view of the attempt state machine. The
/// authoritative state is the primitive fields on [`RouterState`]
/// (`generation`, `pending_hash`, `redirecting`) — this enum is derived
/// from them for logging, never consulted for control flow, so the two can
/// never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No navigation attempt is in flight.
    Idle,
    /// A navigation attempt is running the guard pipeline.
    Evaluating(u64),
    /// A navigation attempt committed.
    Committed(u64),
    /// A navigation attempt was blocked.
    Blocked(u64),
    /// A navigation attempt is being redirected.
    Redirecting(u64),
}

struct RouterState {
    registry: GuardRegistry,
    current_route: Option<RouteId>,
    current_hash: CurrentHash,
    pending_hash: Option<String>,
    redirecting: bool,
    suppress_next_parse: bool,
    generation: u64,
    cancel_token: Option<CancellationToken>,
    attempt_state: AttemptState,
}

impl RouterState {
    fn new() -> Self {
        Self {
            registry: GuardRegistry::new(),
            current_route: None,
            current_hash: CurrentHash::Unset,
            pending_hash: None,
            redirecting: false,
            suppress_next_parse: false,
            generation: 0,
            cancel_token: None,
            attempt_state: AttemptState::Idle,
        }
    }
}

/// The navigation guard engine: a pipeline that intercepts hash changes
/// through a [`HashSource`] and decides, via a [`HostRouter`]'s route
/// table and a pool of registered guards, whether each one commits, is
/// blocked, or is redirected elsewhere.
///
/// `RouterState` lives behind a single `Mutex`, taken only for the
/// duration of a synchronous state transition and never held across an
/// `.await`. Multiple Tokio worker threads may poll suspended pipeline
/// futures concurrently, but only one holds the lock at a time, and the
/// generation check performed immediately after acquiring it is what
/// enforces "at most one pipeline run is the active one" even under a
/// genuinely multi-threaded executor — the generation number, not the
/// absence of parallelism, is the actual correctness primitive.
pub struct GuardedRouter<H, S> {
    host: Arc<H>,
    hash_source: Arc<S>,
    config: RouterConfig,
    state: Mutex<RouterState>,
    /// A weak reference to this router's own `Arc`, populated once in
    /// `new`. `parse` needs an owned `Arc<Self>` to hand to `tokio::spawn`
    /// for pipeline work that outlives the call, but takes `&self` for
    /// ergonomic call sites — stable Rust has no `self: &Arc<Self>`
    /// receiver, so the `Arc` is recovered from this `Weak` instead.
    self_weak: OnceLock<Weak<Self>>,
}

impl<H, S> GuardedRouter<H, S>
where
    H: HostRouter + 'static,
    S: HashSource + 'static,
{
    /// Creates a new guarded router over the given host router and hash
    /// source, and wires up the hash source's change notifications to
    /// drive `parse`.
    pub fn new(host: Arc<H>, hash_source: Arc<S>, config: RouterConfig) -> Arc<Self> {
        if let Some(initial) = &config.initial_hash {
            hash_source.replace_hash(initial);
        }

        let router = Arc::new(Self {
            host,
            hash_source,
            config,
            state: Mutex::new(RouterState::new()),
            self_weak: OnceLock::new(),
        });

        let weak = Arc::downgrade(&router);
        let _ = router.self_weak.set(weak.clone());

        router.hash_source.on_hash_changed(Arc::new(move |hash| {
            if let Some(router) = weak.upgrade() {
                router.parse(&hash);
            }
        }));

        router
    }

    /// Registers a global enter guard, run before every navigation.
    pub fn add_guard(&self, guard: Arc<dyn crate::guard::EnterGuard>) {
        self.state.lock().unwrap().registry.add_global(guard);
    }

    /// Removes a previously registered global enter guard by identity.
    pub fn remove_guard(&self, guard: &Arc<dyn crate::guard::EnterGuard>) {
        self.state.lock().unwrap().registry.remove_global(guard);
    }

    /// Registers a guard (or guard pair) against a specific route.
    pub fn add_route_guard(&self, route: RouteId, spec: RouteGuardSpec) {
        self.state.lock().unwrap().registry.add_route_guard(route, spec);
    }

    /// Removes a guard (or guard pair) previously registered against a
    /// route.
    pub fn remove_route_guard(&self, route: RouteId, spec: &RouteGuardSpec) {
        self.state
            .lock()
            .unwrap()
            .registry
            .remove_route_guard(route, spec);
    }

    /// Registers a leave guard against a specific route.
    pub fn add_leave_guard(&self, route: RouteId, guard: Arc<dyn crate::guard::LeaveGuard>) {
        self.state.lock().unwrap().registry.add_leave_guard(route, guard);
    }

    /// Removes a leave guard previously registered against a route.
    pub fn remove_leave_guard(&self, route: RouteId, guard: &Arc<dyn crate::guard::LeaveGuard>) {
        self.state
            .lock()
            .unwrap()
            .registry
            .remove_leave_guard(route, guard);
    }

    /// Resolves a hash against the host router's route table without
    /// navigating to it, for callers that need a route's identity ahead of
    /// time in order to register a guard against it.
    pub fn resolve_route_id(&self, hash: &str) -> Option<RouteId> {
        self.host.resolve(hash).map(|m| m.id())
    }

    /// Resolves a route name against the host router's route table without
    /// navigating to it.
    pub fn resolve_route_id_by_name(&self, name: &str) -> Option<RouteId> {
        let hash = self.host.resolve_by_name(name, None)?;
        self.resolve_route_id(&hash)
    }

    /// The currently committed route, if any.
    pub fn current_route(&self) -> Option<RouteId> {
        self.state.lock().unwrap().current_route
    }

    /// The currently committed hash, if any navigation has ever committed.
    pub fn current_hash(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .current_hash
            .as_deref()
            .map(|s| s.to_string())
    }

    /// The current attempt state, for diagnostics.
    pub fn attempt_state(&self) -> AttemptState {
        self.state.lock().unwrap().attempt_state
    }

    /// Whether per-guard/per-transition `tracing::debug!` output is enabled,
    /// per [`RouterConfig::trace_pipeline`]. Warnings and errors are always
    /// logged regardless of this setting — only the chatty step-by-step
    /// pipeline trace is gated.
    fn trace_enabled(&self) -> bool {
        self.config.trace_pipeline
    }

    /// Tears down this router: cancels any in-flight pipeline, clears all
    /// registered guards, and tears down the host router.
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(token) = state.cancel_token.take() {
            token.cancel();
        }
        state.registry = GuardRegistry::new();
        drop(state);
        self.host.teardown();
    }

    /// Intercepts a hash change. Never returns a future, and never blocks on
    /// asynchronous guard work past the point a guard first suspends — at
    /// that point the remainder of the pipeline continues on the ambient
    /// Tokio runtime.
    pub fn parse(&self, new_hash: &str) {
        let new_hash = new_hash.to_string();

        // Step 1: a hash change caused by our own restoration after a
        // block/failure is never a real navigation attempt.
        {
            let mut state = self.state.lock().unwrap();
            if state.suppress_next_parse {
                state.suppress_next_parse = false;
                if self.trace_enabled() {
                    tracing::debug!(hash = %new_hash, "suppressing self-inflicted hash change");
                }
                return;
            }
        }

        // Step 2: a hash change that is itself the result of a
        // guard-initiated redirect has already been decided; commit it
        // directly without re-running guards against it.
        {
            let mut state = self.state.lock().unwrap();
            if state.redirecting {
                state.redirecting = false;
                if self.trace_enabled() {
                    tracing::debug!(hash = %new_hash, "completing guard-initiated redirect");
                }
                self.commit(&mut state, &new_hash);
                return;
            }
        }

        let route_match = self.host.resolve(&new_hash);
        let to_route = route_match.as_ref().map(|m| m.id());

        // Step 3: arrival at the already-committed hash, except the very
        // first parse ever, which must run even if it happens to match a
        // hash seeded into the HashSource before any guard ran. This also
        // cancels any in-flight async guard pipeline targeting a *different*
        // hash — the user navigating back to the current hash supersedes
        // whatever was still being evaluated, per §5's cancellation case (b).
        {
            let mut state = self.state.lock().unwrap();
            if let CurrentHash::Set(current) = &state.current_hash {
                if current == &new_hash {
                    if self.trace_enabled() {
                        tracing::debug!(hash = %new_hash, "no-op navigation, skipping guard pipeline");
                    }
                    state.pending_hash = None;
                    state.generation += 1;
                    if let Some(old_token) = state.cancel_token.take() {
                        old_token.cancel();
                    }
                    return;
                }
            }
        }

        // Step 4: a parse for the hash already in flight is a duplicate of
        // an attempt already running its guard pipeline; do not restart it.
        {
            let state = self.state.lock().unwrap();
            if state.pending_hash.as_deref() == Some(new_hash.as_str()) {
                if self.trace_enabled() {
                    tracing::debug!(hash = %new_hash, "duplicate in-flight navigation, not restarting guards");
                }
                return;
            }
        }

        // Step 5/6: a new attempt supersedes whatever came before it.
        let (generation, token, from_route, from_hash) = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            let generation = state.generation;
            if let Some(old_token) = state.cancel_token.take() {
                old_token.cancel();
            }
            let token = CancellationToken::new();
            state.cancel_token = Some(token.clone());
            state.pending_hash = Some(new_hash.clone());
            state.attempt_state = AttemptState::Evaluating(generation);
            let from_route = state.current_route;
            let from_hash = state.current_hash.as_deref().map(|s| s.to_string());
            (generation, token, from_route, from_hash)
        };

        // Step 7: determine whether any guard could possibly object.
        let has_guards = {
            let state = self.state.lock().unwrap();
            !state.registry.global_enter_guards().is_empty()
                || to_route
                    .map(|r| !state.registry.enter_guards_for(r).is_empty())
                    .unwrap_or(false)
                || from_route
                    .map(|r| !state.registry.leave_guards_for(r).is_empty())
                    .unwrap_or(false)
        };

        // Step 8: fast path. Nothing is registered that could object, so
        // commit directly without constructing a guard context.
        if !has_guards {
            let mut state = self.state.lock().unwrap();
            if state.generation != generation {
                return;
            }
            if self.trace_enabled() {
                tracing::debug!(hash = %new_hash, "no guards registered, committing directly");
            }
            self.commit(&mut state, &new_hash);
            return;
        }

        let mut ctx = GuardContext::new(new_hash.clone(), token.clone());
        if let Some(route) = to_route {
            ctx = ctx.with_to_route(route);
        }
        if let Some(route_match) = &route_match {
            ctx = ctx.with_to_arguments(route_match.arguments.clone());
        }
        if let Some(route) = from_route {
            ctx = ctx.with_from_route(route);
        }
        if let Some(hash) = from_hash {
            ctx = ctx.with_from_hash(hash);
        }

        let router = self
            .self_weak
            .get()
            .and_then(Weak::upgrade)
            .expect("GuardedRouter must be constructed via GuardedRouter::new");
        let pipeline_hash = new_hash.clone();
        let fut: BoxFuture<'static, ()> = Box::pin(async move {
            router.run_pipeline(generation, token, ctx, pipeline_hash).await;
        });

        self.drive(fut);
    }

    /// Runs `fut` with a single poll using a no-op waker. If it resolves
    /// immediately, the whole pipeline ran synchronously inside `parse` —
    /// this is the literal encoding of "stays synchronous while possible".
    /// If it suspends, the same (already partially-driven) future is handed
    /// to `tokio::spawn`, which will re-poll it to completion as guards
    /// wake it.
    fn drive(&self, mut fut: BoxFuture<'static, ()>) {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {}
            Poll::Pending => {
                tokio::spawn(async move {
                    fut.await;
                });
            }
        }
    }

    async fn run_pipeline(
        self: Arc<Self>,
        generation: u64,
        token: CancellationToken,
        ctx: GuardContext,
        new_hash: String,
    ) {
        // Leave phase.
        if let Some(from_route) = ctx.from_route {
            let leave_guards: Vec<_> = {
                let state = self.state.lock().unwrap();
                state.registry.leave_guards_for(from_route).to_vec()
            };

            for guard in leave_guards {
                if self.trace_enabled() {
                    tracing::debug!(guard = guard.name(), phase = "leave", hash = %new_hash, "running leave guard");
                }
                let allowed = run_guard(guard.name(), false, || guard.check(&ctx)).await;
                if self.superseded(generation, &token) {
                    return;
                }
                if !allowed {
                    if self.trace_enabled() {
                        tracing::debug!(guard = guard.name(), "leave guard blocked navigation");
                    }
                    self.apply_result(generation, GuardResult::Block, &new_hash).await;
                    return;
                }
            }
        }

        // Global-enter phase.
        let global_guards: Vec<_> = {
            let state = self.state.lock().unwrap();
            state.registry.global_enter_guards().to_vec()
        };

        for guard in global_guards {
            if self.trace_enabled() {
                tracing::debug!(guard = guard.name(), phase = "global-enter", hash = %new_hash, "running enter guard");
            }
            let result = run_guard(guard.name(), GuardResult::Block, || guard.check(&ctx)).await;
            if self.superseded(generation, &token) {
                return;
            }
            if !result.is_allow() {
                if self.trace_enabled() {
                    tracing::debug!(guard = guard.name(), result = ?result, "global enter guard rejected navigation");
                }
                self.apply_result(generation, result, &new_hash).await;
                return;
            }
        }

        // Route-enter phase.
        if let Some(to_route) = ctx.to_route {
            let route_guards: Vec<_> = {
                let state = self.state.lock().unwrap();
                state.registry.enter_guards_for(to_route).to_vec()
            };

            for guard in route_guards {
                if self.trace_enabled() {
                    tracing::debug!(guard = guard.name(), phase = "route-enter", hash = %new_hash, "running enter guard");
                }
                let result = run_guard(guard.name(), GuardResult::Block, || guard.check(&ctx)).await;
                if self.superseded(generation, &token) {
                    return;
                }
                if !result.is_allow() {
                    if self.trace_enabled() {
                        tracing::debug!(guard = guard.name(), result = ?result, "route enter guard rejected navigation");
                    }
                    self.apply_result(generation, result, &new_hash).await;
                    return;
                }
            }
        }

        self.apply_result(generation, GuardResult::Allow, &new_hash).await;
    }

    fn superseded(&self, generation: u64, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            if self.trace_enabled() {
                tracing::debug!(generation, "navigation attempt cancelled, discarding result");
            }
            return true;
        }
        let state = self.state.lock().unwrap();
        if state.generation != generation {
            if self.trace_enabled() {
                tracing::debug!(
                    generation,
                    current = state.generation,
                    "navigation attempt superseded, discarding result"
                );
            }
            true
        } else {
            false
        }
    }

    async fn apply_result(&self, generation: u64, result: GuardResult, new_hash: &str) {
        match result {
            GuardResult::Allow => {
                let mut state = self.state.lock().unwrap();
                if state.generation != generation {
                    return;
                }
                self.commit(&mut state, new_hash);
            }
            GuardResult::Block => {
                let mut state = self.state.lock().unwrap();
                if state.generation != generation {
                    return;
                }
                state.attempt_state = AttemptState::Blocked(generation);
                state.pending_hash = None;
                drop(state);
                self.restore_hash();
            }
            GuardResult::RedirectByName(name) => {
                self.redirect(generation, &name, None, None).await;
            }
            GuardResult::RedirectWithParams {
                route,
                parameters,
                component_target_info,
            } => {
                self.redirect(generation, &route, parameters, component_target_info)
                    .await;
            }
        }
    }

    fn commit(&self, state: &mut RouterState, new_hash: &str) {
        let route_match = self.host.resolve(new_hash);
        state.current_hash = CurrentHash::Set(new_hash.to_string());
        state.current_route = route_match.as_ref().map(|m| m.id());
        state.pending_hash = None;
        state.attempt_state = AttemptState::Committed(state.generation);

        if let Some(route_match) = route_match {
            let arguments = route_match.arguments.clone();
            self.host.navigate(&route_match, &arguments);
        }
    }

    async fn redirect(
        &self,
        generation: u64,
        route_name: &str,
        parameters: Option<HashArguments>,
        _component_target_info: Option<serde_json::Value>,
    ) {
        if self.stale(generation) {
            return;
        }

        let target = self.host.resolve_by_name(route_name, parameters.as_ref());

        let Some(new_hash) = target else {
            tracing::warn!(route = route_name, "redirect target route not found; treating as blocked");
            let mut state = self.state.lock().unwrap();
            if state.generation == generation {
                state.attempt_state = AttemptState::Blocked(generation);
                state.pending_hash = None;
                drop(state);
                self.restore_hash();
            }
            return;
        };

        {
            let mut state = self.state.lock().unwrap();
            if state.generation != generation {
                return;
            }
            state.redirecting = true;
            state.attempt_state = AttemptState::Redirecting(generation);
        }

        // §4.5: the redirect's programmatic navigation uses replace
        // semantics so no history entry is created for the route the guard
        // rejected; `replace_hash` must fire `on_hash_changed` synchronously
        // (the `HashSource` contract, §6) for this to re-enter `parse` and
        // commit via the `redirecting` short-circuit at step 2.
        self.hash_source.replace_hash(&new_hash);
    }

    fn stale(&self, generation: u64) -> bool {
        self.state.lock().unwrap().generation != generation
    }

    /// Restores the hash source back to the last committed hash after a
    /// block, implementing the three-step sequence: mark the next parse as
    /// self-inflicted, ask the hash source to revert in place, then check
    /// whether that revert actually produced a change. If it didn't (a
    /// same-value `replace_hash` that never fires `on_hash_changed`), the
    /// suppress flag would otherwise leak into the *next* real navigation
    /// and silently swallow it — so it's cleared here instead.
    fn restore_hash(&self) {
        let (previous, generation) = {
            let mut state = self.state.lock().unwrap();
            state.suppress_next_parse = true;
            let generation = state.generation;
            let previous = state.current_hash.as_deref().unwrap_or("").to_string();
            (previous, generation)
        };

        self.hash_source.replace_hash(&previous);

        // If the hash source already held `previous` before this call, a
        // same-value `replace_hash` may be a no-op that never fires
        // `on_hash_changed` — nothing will consume `suppress_next_parse`, so
        // it would otherwise swallow the *next* real navigation. Clear it
        // pre-emptively in that case; a genuine revert-triggered `parse`
        // call (if one does fire) simply finds the flag already cleared and
        // proceeds as a normal attempt, which is harmless since the hash
        // did not actually change.
        let mut state = self.state.lock().unwrap();
        if state.generation == generation {
            state.suppress_next_parse = false;
        }
    }
}

/// Runs a guard's `check`, catching panics from both the synchronous call
/// and, if it suspends, the resulting future — a hostile or buggy
/// third-party guard must not be able to take down the whole pipeline.
/// Treated identically to a guard returning a rejecting result, per the
/// pipeline's failure semantics.
async fn run_guard<T, F>(name: &str, fallback: T, check: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> GuardOutcome<T>,
{
    let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(check)) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!(guard = name, "guard panicked during check(); treating as blocked");
            return fallback;
        }
    };

    let fut = outcome.into_future();
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(guard = name, "guard future panicked; treating as blocked");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::guard::{AllowGuard, BlockGuard, ConditionalLeaveGuard, DelayedGuard, RedirectGuard};
    use crate::memory::{MemoryHashSource, SimpleHostRouter};
    use crate::route::Route;
    use std::time::Duration;

    fn router_for(
        routes: Vec<Route>,
    ) -> Arc<GuardedRouter<SimpleHostRouter, MemoryHashSource>> {
        let host = Arc::new(SimpleHostRouter::new(routes));
        let hash_source = Arc::new(MemoryHashSource::new());
        GuardedRouter::new(host, hash_source, RouterConfig::new())
    }

    #[tokio::test]
    async fn test_commits_with_no_guards() {
        let router = router_for(vec![Route::new("/home").unwrap().name("home")]);
        router.parse("/home");
        assert_eq!(router.current_hash(), Some("/home".to_string()));
        assert!(matches!(router.attempt_state(), AttemptState::Committed(_)));
    }

    #[tokio::test]
    async fn test_global_guard_blocks() {
        let router = router_for(vec![Route::new("/admin").unwrap().name("admin")]);
        router.add_guard(Arc::new(BlockGuard));
        router.parse("/admin");

        assert!(router.current_hash().is_none());
        assert!(matches!(router.attempt_state(), AttemptState::Blocked(_)));
    }

    #[tokio::test]
    async fn test_global_guard_allows() {
        let router = router_for(vec![Route::new("/admin").unwrap().name("admin")]);
        router.add_guard(Arc::new(AllowGuard));
        router.parse("/admin");

        assert_eq!(router.current_hash(), Some("/admin".to_string()));
    }

    #[tokio::test]
    async fn test_route_guard_redirect_by_name() {
        let routes = vec![
            Route::new("/admin").unwrap().name("admin"),
            Route::new("/login").unwrap().name("login"),
        ];
        let router = router_for(routes);

        let resolved = router.host.resolve("/admin").unwrap();

        router.add_route_guard(
            resolved.id(),
            RouteGuardSpec::Guard(Arc::new(RedirectGuard::new("login"))),
        );

        router.parse("/admin");

        assert_eq!(router.current_hash(), Some("/login".to_string()));
    }

    #[tokio::test]
    async fn test_no_op_navigation_is_deduped() {
        let router = router_for(vec![Route::new("/home").unwrap().name("home")]);
        router.parse("/home");
        let generation_after_first = router.state.lock().unwrap().generation;

        // Arrival at the already-committed hash still advances `generation`
        // exactly once (invariant 2) and aborts any in-flight token, but
        // does not re-run the guard pipeline or change the committed hash.
        router.parse("/home");
        let generation_after_second = router.state.lock().unwrap().generation;

        assert_eq!(generation_after_second, generation_after_first + 1);
        assert_eq!(router.current_hash(), Some("/home".to_string()));
    }

    #[tokio::test]
    async fn test_first_parse_not_deduped_against_initial_hash() {
        let host = Arc::new(SimpleHostRouter::new(vec![Route::new("/home").unwrap().name("home")]));
        let hash_source = Arc::new(MemoryHashSource::new());
        let router = GuardedRouter::new(
            host,
            hash_source,
            RouterConfig::new().with_initial_hash("/home"),
        );

        router.parse("/home");
        assert!(matches!(router.attempt_state(), AttemptState::Committed(_)));
    }

    #[tokio::test]
    async fn test_leave_guard_blocks() {
        let router = router_for(vec![
            Route::new("/a").unwrap().name("a"),
            Route::new("/b").unwrap().name("b"),
        ]);

        router.parse("/a");
        let a_id = router.current_route().unwrap();

        router.add_leave_guard(a_id, Arc::new(ConditionalLeaveGuard::new("block", |_| false)));

        router.parse("/b");

        assert_eq!(router.current_hash(), Some("/a".to_string()));
        assert!(matches!(router.attempt_state(), AttemptState::Blocked(_)));
    }

    #[tokio::test]
    async fn test_async_guard_eventually_commits() {
        let router = router_for(vec![Route::new("/slow").unwrap().name("slow")]);
        router.add_guard(Arc::new(DelayedGuard::new(
            "slow-allow",
            Duration::from_millis(5),
            GuardResult::Allow,
        )));

        router.parse("/slow");
        // The guard suspended, so the pipeline is still running in the
        // background at this point.
        assert!(router.current_hash().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(router.current_hash(), Some("/slow".to_string()));
    }

    #[tokio::test]
    async fn test_async_supersession_discards_stale_result() {
        let router = router_for(vec![
            Route::new("/slow").unwrap().name("slow"),
            Route::new("/fast").unwrap().name("fast"),
        ]);
        router.add_guard(Arc::new(DelayedGuard::new(
            "slow-allow",
            Duration::from_millis(200),
            GuardResult::Allow,
        )));

        router.parse("/slow");
        tokio::time::sleep(Duration::from_millis(10)).await;
        router.parse("/fast");

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(router.current_hash(), Some("/fast".to_string()));
    }

    #[tokio::test]
    async fn test_destroy_clears_guards() {
        let router = router_for(vec![Route::new("/home").unwrap().name("home")]);
        router.add_guard(Arc::new(BlockGuard));
        router.destroy();

        router.parse("/home");
        assert_eq!(router.current_hash(), Some("/home".to_string()));
    }

    #[tokio::test]
    async fn test_trace_pipeline_disabled_does_not_affect_outcome() {
        let host = Arc::new(SimpleHostRouter::new(vec![
            Route::new("/admin").unwrap().name("admin"),
        ]));
        let hash_source = Arc::new(MemoryHashSource::new());
        let router = GuardedRouter::new(
            host,
            hash_source,
            RouterConfig::new().with_trace_pipeline(false),
        );
        router.add_guard(Arc::new(BlockGuard));

        assert!(!router.trace_enabled());

        router.parse("/admin");

        assert!(router.current_hash().is_none());
        assert!(matches!(router.attempt_state(), AttemptState::Blocked(_)));
    }
}
