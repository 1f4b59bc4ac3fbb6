//! Navigation Guards
//!
//! This module provides the guard taxonomy, the context handed to every
//! guard, and the registry that holds global and per-route guards. Guards
//! can be used to implement authentication checks, unsaved-changes
//! confirmations, data preloading, and other navigation-gating logic.
//!
//! A guard may answer immediately or asynchronously — see [`GuardOutcome`]
//! for how both shapes are unified without forcing every guard through an
//! allocation.

use crate::params::HashArguments;
use crate::route::RouteId;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The result of an enter-guard check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GuardResult {
    /// Allow the navigation to proceed.
    Allow,
    /// Block the navigation (stay on the current route).
    Block,
    /// Redirect to a route by name, with no explicit parameters.
    RedirectByName(String),
    /// Redirect to a route by name, carrying parameters and/or component
    /// target hints for the host router.
    RedirectWithParams {
        /// The target route's name.
        route: String,
        /// Parameters to resolve against the target route's pattern.
        parameters: Option<HashArguments>,
        /// Opaque, host-router-specific routing hints (e.g. which outlet or
        /// component slot the navigation targets).
        component_target_info: Option<serde_json::Value>,
    },
}

impl GuardResult {
    /// Returns true if this result allows the navigation.
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardResult::Allow)
    }

    /// Returns true if this result blocks the navigation.
    pub fn is_block(&self) -> bool {
        matches!(self, GuardResult::Block)
    }

    /// Returns the redirect target route name, if this result is a redirect.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardResult::RedirectByName(name) => Some(name),
            GuardResult::RedirectWithParams { route, .. } => Some(route),
            _ => None,
        }
    }

    /// Coerces a loosely-typed value (e.g. from a scripting or plugin
    /// boundary) into a `GuardResult`. Allow, Block, a non-empty string
    /// (treated as a named-redirect shorthand), and an object shaped like
    /// [`GuardResult::RedirectWithParams`] are accepted; anything else is
    /// coerced to `Block` with a warning logged.
    pub fn coerce(value: serde_json::Value) -> Self {
        if let Ok(result) = serde_json::from_value::<GuardResult>(value.clone()) {
            return result;
        }

        if let serde_json::Value::String(ref s) = value {
            if !s.is_empty() {
                return GuardResult::RedirectByName(s.clone());
            }
        }

        tracing::warn!(value = %value, "guard returned an unrecognized value; coercing to Block");
        GuardResult::Block
    }
}

impl Default for GuardResult {
    fn default() -> Self {
        GuardResult::Allow
    }
}

/// Context provided to every guard invocation.
///
/// `to_route`/`from_route` use `Option` at this API boundary; the engine's
/// own internal state additionally distinguishes "no navigation has ever
/// committed" from "committed to the empty hash" with a three-valued
/// [`crate::engine::CurrentHash`] — that distinction does not need to reach
/// individual guards.
#[derive(Debug, Clone)]
pub struct GuardContext {
    /// The route the navigation is entering, if the destination hash
    /// matched one.
    pub to_route: Option<RouteId>,
    /// The destination hash.
    pub to_hash: String,
    /// Arguments extracted from the destination hash.
    pub to_arguments: HashArguments,
    /// The route the navigation is leaving, if any.
    pub from_route: Option<RouteId>,
    /// The hash being left, if any navigation has committed before this one.
    pub from_hash: Option<String>,
    /// Cancellation signal for this navigation attempt. A guard performing
    /// async work should observe this and abandon its work promptly if it
    /// becomes cancelled, since a newer navigation has already superseded
    /// this one.
    pub signal: CancellationToken,
}

impl GuardContext {
    /// Creates a new guard context for a navigation to `to_hash`.
    pub fn new(to_hash: impl Into<String>, signal: CancellationToken) -> Self {
        Self {
            to_route: None,
            to_hash: to_hash.into(),
            to_arguments: HashArguments::new(),
            from_route: None,
            from_hash: None,
            signal,
        }
    }

    /// Sets the destination route.
    pub fn with_to_route(mut self, route: RouteId) -> Self {
        self.to_route = Some(route);
        self
    }

    /// Sets the destination arguments.
    pub fn with_to_arguments(mut self, arguments: HashArguments) -> Self {
        self.to_arguments = arguments;
        self
    }

    /// Sets the source route.
    pub fn with_from_route(mut self, route: RouteId) -> Self {
        self.from_route = Some(route);
        self
    }

    /// Sets the source hash.
    pub fn with_from_hash(mut self, hash: impl Into<String>) -> Self {
        self.from_hash = Some(hash.into());
        self
    }

    /// Returns true if this navigation attempt has already been superseded.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

/// Either an immediately-available value, or a boxed future that will
/// eventually produce one.
///
/// Guards answer through this type rather than a bare `Future` so that a
/// synchronous guard resolves with zero allocation and zero suspension — the
/// pipeline driver only pays the cost of polling a boxed future for guards
/// that actually need to suspend.
pub enum GuardOutcome<T> {
    /// The guard has already decided.
    Ready(T),
    /// The guard's decision is pending; awaiting this future resolves it.
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> GuardOutcome<T> {
    /// Converts this outcome into a boxed future, wrapping an already-ready
    /// value in an immediately-resolving future.
    pub fn into_future(self) -> BoxFuture<'static, T> {
        match self {
            GuardOutcome::Ready(value) => Box::pin(std::future::ready(value)),
            GuardOutcome::Pending(fut) => fut,
        }
    }

    /// Returns true if this outcome is already resolved.
    pub fn is_ready(&self) -> bool {
        matches!(self, GuardOutcome::Ready(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for GuardOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardOutcome::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            GuardOutcome::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A guard run before entering a route (global, or scoped to a route).
///
/// # Example
///
/// ```rust
/// use guarded_router::guard::{EnterGuard, GuardContext, GuardOutcome, GuardResult};
///
/// struct AuthGuard {
///     is_authenticated: bool,
/// }
///
/// impl EnterGuard for AuthGuard {
///     fn check(&self, _ctx: &GuardContext) -> GuardOutcome<GuardResult> {
///         if self.is_authenticated {
///             GuardOutcome::Ready(GuardResult::Allow)
///         } else {
///             GuardOutcome::Ready(GuardResult::RedirectByName("login".to_string()))
///         }
///     }
///
///     fn name(&self) -> &str {
///         "AuthGuard"
///     }
/// }
/// ```
pub trait EnterGuard: Send + Sync {
    /// Checks whether the navigation should be allowed, blocked, or
    /// redirected.
    fn check(&self, ctx: &GuardContext) -> GuardOutcome<GuardResult>;

    /// Returns the guard name, used in tracing output.
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn EnterGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnterGuard({})", self.name())
    }
}

/// A guard run before leaving a route. Its result is strictly allow/deny —
/// a leave guard can never redirect, since the navigation it would be
/// redirecting *from* hasn't committed to leaving yet.
pub trait LeaveGuard: Send + Sync {
    /// Checks whether leaving the current route should be allowed.
    /// `true` allows the navigation to proceed past this guard.
    fn check(&self, ctx: &GuardContext) -> GuardOutcome<bool>;

    /// Returns the guard name, used in tracing output.
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn LeaveGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LeaveGuard({})", self.name())
    }
}

/// A function-or-configuration union for registering a guard against a
/// route, mirroring the "accepts either a bare guard or a `{ beforeEnter,
/// beforeLeave }` configuration object" shape.
pub enum RouteGuardSpec {
    /// Register a single enter guard for the route.
    Guard(Arc<dyn EnterGuard>),
    /// Register an enter guard and/or a leave guard for the route.
    Config {
        /// The enter guard to register, if any.
        before_enter: Option<Arc<dyn EnterGuard>>,
        /// The leave guard to register, if any.
        before_leave: Option<Arc<dyn LeaveGuard>>,
    },
}

/// Holds the three guard containers described by the guard pipeline: global
/// enter guards, per-route enter guards, and per-route leave guards.
///
/// Guards are held by `Arc` so removal by identity is `Arc::ptr_eq` — the
/// idiomatic Rust substitute for function-reference equality.
#[derive(Default)]
pub struct GuardRegistry {
    global_enter: Vec<Arc<dyn EnterGuard>>,
    enter_by_route: HashMap<RouteId, Vec<Arc<dyn EnterGuard>>>,
    leave_by_route: HashMap<RouteId, Vec<Arc<dyn LeaveGuard>>>,
}

impl GuardRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a global enter guard, run for every navigation.
    pub fn add_global(&mut self, guard: Arc<dyn EnterGuard>) {
        self.global_enter.push(guard);
    }

    /// Removes a global enter guard by identity. Returns true if a guard was
    /// removed.
    pub fn remove_global(&mut self, guard: &Arc<dyn EnterGuard>) -> bool {
        let before = self.global_enter.len();
        self.global_enter.retain(|g| !Arc::ptr_eq(g, guard));
        self.global_enter.len() != before
    }

    /// Registers a guard (or guard pair) against a specific route.
    ///
    /// If `spec` is a `Config` with neither `before_enter` nor
    /// `before_leave` set, this is a no-op (logged at info level).
    pub fn add_route_guard(&mut self, route: RouteId, spec: RouteGuardSpec) {
        match spec {
            RouteGuardSpec::Guard(guard) => {
                self.enter_by_route.entry(route).or_default().push(guard);
            }
            RouteGuardSpec::Config {
                before_enter,
                before_leave,
            } => {
                if before_enter.is_none() && before_leave.is_none() {
                    tracing::info!(
                        route = %route,
                        "add_route_guard called with an empty configuration; ignoring"
                    );
                    return;
                }
                if let Some(enter) = before_enter {
                    self.enter_by_route.entry(route).or_default().push(enter);
                }
                if let Some(leave) = before_leave {
                    self.leave_by_route.entry(route).or_default().push(leave);
                }
            }
        }
    }

    /// Removes a guard (or guard pair) previously registered against a
    /// route. Empty route entries are cleaned up from the underlying maps.
    pub fn remove_route_guard(&mut self, route: RouteId, spec: &RouteGuardSpec) {
        match spec {
            RouteGuardSpec::Guard(guard) => self.remove_enter(route, guard),
            RouteGuardSpec::Config {
                before_enter,
                before_leave,
            } => {
                if let Some(enter) = before_enter {
                    self.remove_enter(route, enter);
                }
                if let Some(leave) = before_leave {
                    self.remove_leave(route, leave);
                }
            }
        }
    }

    /// Registers a leave guard against a specific route.
    pub fn add_leave_guard(&mut self, route: RouteId, guard: Arc<dyn LeaveGuard>) {
        self.leave_by_route.entry(route).or_default().push(guard);
    }

    /// Removes a leave guard previously registered against a route.
    pub fn remove_leave_guard(&mut self, route: RouteId, guard: &Arc<dyn LeaveGuard>) {
        self.remove_leave(route, guard);
    }

    fn remove_enter(&mut self, route: RouteId, guard: &Arc<dyn EnterGuard>) {
        if let Some(list) = self.enter_by_route.get_mut(&route) {
            list.retain(|g| !Arc::ptr_eq(g, guard));
            if list.is_empty() {
                self.enter_by_route.remove(&route);
            }
        }
    }

    fn remove_leave(&mut self, route: RouteId, guard: &Arc<dyn LeaveGuard>) {
        if let Some(list) = self.leave_by_route.get_mut(&route) {
            list.retain(|g| !Arc::ptr_eq(g, guard));
            if list.is_empty() {
                self.leave_by_route.remove(&route);
            }
        }
    }

    /// Returns the global enter guards, in registration order.
    pub fn global_enter_guards(&self) -> &[Arc<dyn EnterGuard>] {
        &self.global_enter
    }

    /// Returns the enter guards registered for a specific route.
    pub fn enter_guards_for(&self, route: RouteId) -> &[Arc<dyn EnterGuard>] {
        self.enter_by_route
            .get(&route)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the leave guards registered for a specific route.
    pub fn leave_guards_for(&self, route: RouteId) -> &[Arc<dyn LeaveGuard>] {
        self.leave_by_route
            .get(&route)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardRegistry")
            .field("global_enter", &self.global_enter.len())
            .field("enter_by_route", &self.enter_by_route.len())
            .field("leave_by_route", &self.leave_by_route.len())
            .finish()
    }
}

// Common guard implementations, useful directly and as building blocks for
// tests.

/// A guard that always allows navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowGuard;

impl EnterGuard for AllowGuard {
    fn check(&self, _ctx: &GuardContext) -> GuardOutcome<GuardResult> {
        GuardOutcome::Ready(GuardResult::Allow)
    }

    fn name(&self) -> &str {
        "AllowGuard"
    }
}

/// A guard that always blocks navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockGuard;

impl EnterGuard for BlockGuard {
    fn check(&self, _ctx: &GuardContext) -> GuardOutcome<GuardResult> {
        GuardOutcome::Ready(GuardResult::Block)
    }

    fn name(&self) -> &str {
        "BlockGuard"
    }
}

/// A guard that redirects to a named route.
#[derive(Debug, Clone)]
pub struct RedirectGuard {
    target: String,
}

impl RedirectGuard {
    /// Creates a new redirect guard targeting the given route name.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl EnterGuard for RedirectGuard {
    fn check(&self, _ctx: &GuardContext) -> GuardOutcome<GuardResult> {
        GuardOutcome::Ready(GuardResult::RedirectByName(self.target.clone()))
    }

    fn name(&self) -> &str {
        "RedirectGuard"
    }
}

/// A guard that checks a synchronous condition function.
#[derive(Clone)]
pub struct ConditionalGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    condition: F,
    name: String,
    on_fail: GuardResult,
}

impl<F> ConditionalGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    /// Creates a new conditional guard.
    pub fn new(name: impl Into<String>, condition: F) -> Self {
        Self {
            condition,
            name: name.into(),
            on_fail: GuardResult::Block,
        }
    }

    /// Sets the result returned when the condition fails.
    pub fn on_fail(mut self, result: GuardResult) -> Self {
        self.on_fail = result;
        self
    }
}

impl<F> EnterGuard for ConditionalGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    fn check(&self, ctx: &GuardContext) -> GuardOutcome<GuardResult> {
        if (self.condition)(ctx) {
            GuardOutcome::Ready(GuardResult::Allow)
        } else {
            GuardOutcome::Ready(self.on_fail.clone())
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for ConditionalGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalGuard")
            .field("name", &self.name)
            .field("on_fail", &self.on_fail)
            .finish()
    }
}

/// An enter guard that resolves after a fixed delay, for exercising the
/// pipeline's sync-to-async suspension path (tests, and guards that
/// legitimately need to await e.g. a server round-trip).
pub struct DelayedGuard {
    name: String,
    delay: std::time::Duration,
    result: GuardResult,
}

impl DelayedGuard {
    /// Creates a guard that waits `delay` before resolving to `result`.
    pub fn new(name: impl Into<String>, delay: std::time::Duration, result: GuardResult) -> Self {
        Self {
            name: name.into(),
            delay,
            result,
        }
    }
}

impl EnterGuard for DelayedGuard {
    fn check(&self, _ctx: &GuardContext) -> GuardOutcome<GuardResult> {
        let delay = self.delay;
        let result = self.result.clone();
        GuardOutcome::Pending(Box::pin(async move {
            tokio::time::sleep(delay).await;
            result
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A leave guard that always allows leaving.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowLeaveGuard;

impl LeaveGuard for AllowLeaveGuard {
    fn check(&self, _ctx: &GuardContext) -> GuardOutcome<bool> {
        GuardOutcome::Ready(true)
    }

    fn name(&self) -> &str {
        "AllowLeaveGuard"
    }
}

/// A leave guard that checks a synchronous condition function (e.g. an
/// unsaved-changes confirmation).
#[derive(Clone)]
pub struct ConditionalLeaveGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    condition: F,
    name: String,
}

impl<F> ConditionalLeaveGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    /// Creates a new conditional leave guard.
    pub fn new(name: impl Into<String>, condition: F) -> Self {
        Self {
            condition,
            name: name.into(),
        }
    }
}

impl<F> LeaveGuard for ConditionalLeaveGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    fn check(&self, ctx: &GuardContext) -> GuardOutcome<bool> {
        GuardOutcome::Ready((self.condition)(ctx))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for ConditionalLeaveGuard<F>
where
    F: Fn(&GuardContext) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalLeaveGuard")
            .field("name", &self.name)
            .finish()
    }
}
