//! Route Definition and Pattern Matching
//!
//! This module provides route identity and pattern-matching types used to
//! resolve a navigated-to hash into a route and its arguments. View
//! rendering and component composition are the host routing framework's
//! concern, not this crate's — see [`crate::contract::HostRouter`].

use crate::params::HashArguments;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(Uuid);

impl RouteId {
    /// Creates a new random route ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a route ID from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A segment in a route path pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A literal path segment that must match exactly.
    Literal(String),
    /// A parameter segment that captures a value (e.g., `:id`).
    Param(String),
    /// A wildcard that matches any remaining path segments.
    Wildcard,
    /// An optional segment (ends with `?`).
    Optional(String),
}

/// A compiled route pattern that can be matched against hash paths.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// The original pattern string.
    pub pattern: String,
    /// The parsed segments.
    pub segments: Vec<PathSegment>,
    /// Compiled regex for matching (cached).
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
    /// Whether this pattern has a wildcard.
    has_wildcard: bool,
}

impl RoutePattern {
    /// Creates a new route pattern from a path string.
    ///
    /// # Pattern Syntax
    ///
    /// - `/literal` - Matches exactly
    /// - `/:param` - Captures a single segment as a named argument
    /// - `/:param?` - Optional argument segment
    /// - `/*` or `/**` - Wildcard matching any remaining segments
    /// - `/users/:id/posts/:postId` - Multiple arguments
    pub fn new(pattern: &str) -> Result<Self, RoutePatternError> {
        let pattern = pattern.to_string();
        let mut segments = Vec::new();
        let mut param_names = Vec::new();
        let mut regex_parts = vec!["^".to_string()];
        let mut has_wildcard = false;

        let path_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();

        for segment in path_segments {
            if segment == "*" || segment == "**" {
                segments.push(PathSegment::Wildcard);
                regex_parts.push("(?:/(.*))?".to_string());
                param_names.push("*".to_string());
                has_wildcard = true;
            } else if let Some(name) = segment.strip_prefix(':') {
                if let Some(name) = name.strip_suffix('?') {
                    if name.is_empty() {
                        return Err(RoutePatternError::InvalidPattern(
                            "empty optional parameter name".to_string(),
                        ));
                    }
                    segments.push(PathSegment::Optional(name.to_string()));
                    regex_parts.push("(?:/([^/]+))?".to_string());
                    param_names.push(name.to_string());
                } else {
                    if name.is_empty() {
                        return Err(RoutePatternError::InvalidPattern(
                            "empty parameter name".to_string(),
                        ));
                    }
                    segments.push(PathSegment::Param(name.to_string()));
                    regex_parts.push("/([^/]+)".to_string());
                    param_names.push(name.to_string());
                }
            } else {
                segments.push(PathSegment::Literal(segment.to_string()));
                regex_parts.push(format!("/{}", regex::escape(segment)));
            }
        }

        if !has_wildcard {
            regex_parts.push("/?$".to_string());
        }

        let regex_str = regex_parts.join("");
        let regex = Regex::new(&regex_str)
            .map_err(|e| RoutePatternError::InvalidPattern(format!("invalid regex: {}", e)))?;

        Ok(Self {
            pattern,
            segments,
            regex,
            param_names,
            has_wildcard,
        })
    }

    /// Attempts to match a hash path against this pattern, returning
    /// extracted arguments.
    pub fn match_path(&self, path: &str) -> Option<HashArguments> {
        let path = if path.is_empty() { "/" } else { path };

        if self.pattern == "/" {
            return if path == "/" || path.is_empty() {
                Some(HashArguments::new())
            } else {
                None
            };
        }

        let captures = self.regex.captures(path)?;
        let mut args = HashArguments::new();

        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(matched) = captures.get(i + 1) {
                let value = matched.as_str();
                if !value.is_empty() || name == "*" {
                    args.insert(name.clone(), value.to_string());
                }
            }
        }

        Some(args)
    }

    /// Generates a hash path string from arguments, the inverse of
    /// [`RoutePattern::match_path`]. Used to build the target of a
    /// name-based redirect.
    pub fn generate(&self, args: &HashArguments) -> Result<String, RoutePatternError> {
        let mut path = String::new();

        for segment in &self.segments {
            match segment {
                PathSegment::Literal(s) => {
                    path.push('/');
                    path.push_str(s);
                }
                PathSegment::Param(name) => {
                    let value = args
                        .get(name)
                        .ok_or_else(|| RoutePatternError::MissingParam(name.clone()))?;
                    path.push('/');
                    path.push_str(value);
                }
                PathSegment::Optional(name) => {
                    if let Some(value) = args.get(name) {
                        path.push('/');
                        path.push_str(value);
                    }
                }
                PathSegment::Wildcard => {
                    if let Some(value) = args.get("*") {
                        if !value.is_empty() {
                            if !path.is_empty() {
                                path.push('/');
                            }
                            path.push_str(value);
                        }
                    }
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }

        Ok(path)
    }

    /// Returns the number of literal segments (used for match priority).
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Literal(_)))
            .count()
    }

    /// Returns true if this pattern has a wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.has_wildcard
    }

    /// Returns the parameter names in this pattern.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// Errors that can occur when working with route patterns.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoutePatternError {
    /// The pattern syntax is invalid.
    #[error("invalid route pattern: {0}")]
    InvalidPattern(String),

    /// A required parameter was not provided when generating a path.
    #[error("missing parameter: {0}")]
    MissingParam(String),
}

/// Metadata associated with a route, consulted by guards (e.g. an
/// `requiresAuth` flag checked by an authentication guard).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteMeta {
    /// Custom metadata key-value pairs.
    pub data: HashMap<String, serde_json::Value>,
}

impl RouteMeta {
    /// Creates new empty metadata.
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    /// Inserts a metadata value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        self.data.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
    }

    /// Gets a metadata value.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Checks if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns true if the route requires authentication (based on meta).
    pub fn requires_auth(&self) -> bool {
        self.get::<bool>("requiresAuth").unwrap_or(false)
    }

    /// Returns the page title if set.
    pub fn title(&self) -> Option<String> {
        self.get("title")
    }
}

/// A route definition: a named, pattern-matched hash with metadata.
#[derive(Debug, Clone)]
pub struct Route {
    /// Unique identifier for this route.
    pub id: RouteId,
    /// Optional name for the route (used for name-based redirects).
    pub name: Option<String>,
    /// The hash pattern to match.
    pub pattern: RoutePattern,
    /// Route metadata (title, auth requirements, etc.).
    pub meta: RouteMeta,
    /// The match priority of this route (higher = preferred on ties).
    pub priority: i32,
}

impl Route {
    /// Creates a new route with the given hash pattern.
    pub fn new(path: &str) -> Result<Self, RoutePatternError> {
        let pattern = RoutePattern::new(path)?;
        let priority = Self::calculate_priority(&pattern);

        Ok(Self {
            id: RouteId::new(),
            name: None,
            pattern,
            meta: RouteMeta::new(),
            priority,
        })
    }

    /// Sets the route name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets route metadata.
    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Sets a single metadata value.
    pub fn meta_value(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.meta.insert(key, value);
        self
    }

    /// Sets the route title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.meta.insert("title", title.into());
        self
    }

    /// Marks this route as requiring authentication.
    pub fn requires_auth(mut self) -> Self {
        self.meta.insert("requiresAuth", true);
        self
    }

    /// Sets the route priority (higher = matched first on ties).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Calculates the default priority based on pattern specificity.
    fn calculate_priority(pattern: &RoutePattern) -> i32 {
        let mut priority = 0i32;

        for (i, segment) in pattern.segments.iter().enumerate() {
            let position_weight = 100 - (i as i32 * 10);
            match segment {
                PathSegment::Literal(_) => priority += position_weight * 3,
                PathSegment::Param(_) => priority += position_weight * 2,
                PathSegment::Optional(_) => priority += position_weight,
                PathSegment::Wildcard => priority -= 50,
            }
        }

        priority
    }

    /// Returns the hash pattern string.
    pub fn path(&self) -> &str {
        &self.pattern.pattern
    }

    /// Attempts to match a hash path against this route.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.pattern.match_path(path).map(|arguments| RouteMatch {
            route: self.clone(),
            arguments,
            matched_path: path.to_string(),
        })
    }
}

/// A successful route match containing the route and extracted arguments.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Route,
    /// The extracted hash arguments.
    pub arguments: HashArguments,
    /// The actual hash path that was matched.
    pub matched_path: String,
}

impl RouteMatch {
    /// Returns the route ID.
    pub fn id(&self) -> RouteId {
        self.route.id
    }

    /// Returns the route name if set.
    pub fn name(&self) -> Option<&str> {
        self.route.name.as_deref()
    }

    /// Returns the route metadata.
    pub fn meta(&self) -> &RouteMeta {
        &self.route.meta
    }
}
