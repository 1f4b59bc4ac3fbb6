//! Hash Argument Parsing
//!
//! This module provides the argument tree extracted when a hash is matched
//! against a route pattern: a mapping from parameter name to string value,
//! or to a nested mapping for nested parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while extracting typed arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentsError {
    /// The argument was not present in the mapping.
    #[error("argument '{0}' not found")]
    NotFound(String),

    /// The argument value could not be parsed to the requested type.
    #[error("failed to parse argument '{0}': {1}")]
    ParseError(String, String),

    /// The argument is a nested mapping, not a leaf value.
    #[error("argument '{0}' is a nested mapping, not a value")]
    NotAValue(String),
}

/// Result type for argument operations.
pub type ArgumentsResult<T> = Result<T, ArgumentsError>;

/// A single entry in a [`HashArguments`] tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// A leaf string value.
    Value(String),
    /// A nested mapping of arguments (for nested route parameters).
    Nested(HashArguments),
}

/// A mapping from parameter name to string value, or nested mapping, matched
/// out of a hash path by a [`crate::route::RoutePattern`].
///
/// # Example
///
/// ```rust
/// use guarded_router::params::HashArguments;
///
/// let mut args = HashArguments::new();
/// args.insert("id", "123");
///
/// assert_eq!(args.get("id"), Some("123"));
/// assert_eq!(args.get_as::<i32>("id").unwrap(), 123);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashArguments {
    entries: HashMap<String, ArgumentValue>,
}

impl HashArguments {
    /// Creates a new, empty argument mapping.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Inserts a leaf string argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(name.into(), ArgumentValue::Value(value.into()));
    }

    /// Inserts a nested argument mapping.
    pub fn insert_nested(&mut self, name: impl Into<String>, nested: HashArguments) {
        self.entries.insert(name.into(), ArgumentValue::Nested(nested));
    }

    /// Returns the raw string value of a leaf argument, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(ArgumentValue::Value(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns a nested argument mapping, if present.
    pub fn get_nested(&self, name: &str) -> Option<&HashArguments> {
        match self.entries.get(name) {
            Some(ArgumentValue::Nested(n)) => Some(n),
            _ => None,
        }
    }

    /// Returns the argument value parsed as the specified type.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentsError::NotFound`] if the argument doesn't exist,
    /// [`ArgumentsError::NotAValue`] if it is a nested mapping, and
    /// [`ArgumentsError::ParseError`] if the value can't be parsed.
    pub fn get_as<T: FromStr>(&self, name: &str) -> ArgumentsResult<T> {
        match self.entries.get(name) {
            Some(ArgumentValue::Value(v)) => v.parse::<T>().map_err(|_| {
                ArgumentsError::ParseError(
                    name.to_string(),
                    format!("cannot parse '{}' as {}", v, std::any::type_name::<T>()),
                )
            }),
            Some(ArgumentValue::Nested(_)) => Err(ArgumentsError::NotAValue(name.to_string())),
            None => Err(ArgumentsError::NotFound(name.to_string())),
        }
    }

    /// Returns the argument value or a default if missing or unparseable.
    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.get_as(name).unwrap_or(default)
    }

    /// Returns an iterator over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks if an entry with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl From<HashMap<String, String>> for HashArguments {
    fn from(params: HashMap<String, String>) -> Self {
        Self {
            entries: params
                .into_iter()
                .map(|(k, v)| (k, ArgumentValue::Value(v)))
                .collect(),
        }
    }
}
