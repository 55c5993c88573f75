//! Route table: one radix tree per HTTP method.
//!
//! # Responsibilities
//! - Own the per-method trees
//! - Resolve (method, path) pairs for dispatch and introspection
//!
//! # Design Decisions
//! - Mutated only through `&mut self`, so registration cannot race serving
//! - Unknown methods are a plain miss, never an error

use std::collections::HashMap;

use axum::http::Method;

use super::params::Params;
use super::tree::{Node, RouteError};

/// Result of an introspective lookup.
#[derive(Debug)]
pub struct Lookup<'t, T> {
    /// The matched value, if any.
    pub value: Option<&'t T>,
    /// Parameters captured by the match. Empty on a miss.
    pub params: Params,
    /// On a miss: the path with its trailing slash toggled would match.
    pub trailing_slash_redirect: bool,
}

/// Per-method routing trees.
pub struct RouteTable<T> {
    trees: HashMap<Method, Node<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` + `pattern`.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        self.trees
            .entry(method)
            .or_default()
            .insert(pattern, value)
    }

    /// The tree for `method`, if any route was registered for it.
    pub fn tree(&self, method: &Method) -> Option<&Node<T>> {
        self.trees.get(method)
    }

    /// Methods that have at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.trees.keys()
    }

    /// Resolve without touching any request state.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let mut params = Params::new();
        let Some(tree) = self.trees.get(method) else {
            return Lookup {
                value: None,
                params,
                trailing_slash_redirect: false,
            };
        };

        match tree.find(path, &mut params) {
            Some(value) => Lookup {
                value: Some(value),
                params,
                trailing_slash_redirect: false,
            },
            None => Lookup {
                value: None,
                params,
                trailing_slash_redirect: tree.trailing_slash_redirect(path),
            },
        }
    }
}
