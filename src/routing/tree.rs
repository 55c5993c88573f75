//! Radix tree holding the routes of one HTTP method.
//!
//! # Responsibilities
//! - Store literal, `:param` and `*catch_all` patterns in a compressed trie
//! - Resolve a request path to a value plus captured parameters
//! - Report trailing-slash near misses
//! - Recover a correctly cased path for case-insensitive near misses
//!
//! # Design Decisions
//! - Literal children are disjoint by their first character
//! - A node carries at most one wildcard child: a parameter or a catch-all
//! - Lookup tries literals, then the parameter, then the catch-all, and
//!   backtracks when a literal branch dead-ends deeper down
//! - Literal children are kept ordered by the number of routes below them

use super::params::Params;

/// Registration failures. These are programmer errors in the route setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("path must begin with '/' in path '{0}'")]
    MissingLeadingSlash(String),

    #[error("handlers are already registered for path '{0}'")]
    Duplicate(String),

    #[error("wildcard '{name}' in path '{path}' conflicts with existing wildcard '{existing}'")]
    WildcardConflict {
        path: String,
        name: String,
        existing: String,
    },

    #[error("catch-all '{name}' must be the final segment in path '{path}'")]
    CatchAllNotFinal { path: String, name: String },

    #[error("catch-all must be preceded by '/' in path '{0}'")]
    CatchAllWithoutSlash(String),

    #[error("wildcards must be named with a non-empty name in path '{0}'")]
    UnnamedWildcard(String),

    #[error("only one wildcard per path segment is allowed in path '{0}'")]
    MultipleWildcards(String),
}

/// The single wildcard child a node may own.
enum Wildcard<T> {
    Param { name: String, node: Node<T> },
    CatchAll { name: String, value: T },
}

impl<T> Wildcard<T> {
    fn name(&self) -> &str {
        match self {
            Wildcard::Param { name, .. } | Wildcard::CatchAll { name, .. } => name,
        }
    }
}

/// A node of the routing trie.
pub struct Node<T> {
    /// Literal text matched by this node. Empty for the root and for the
    /// node directly below a parameter.
    path: String,
    /// First character of each literal child, parallel to `children`.
    indices: Vec<char>,
    children: Vec<Node<T>>,
    wildcard: Option<Box<Wildcard<T>>>,
    value: Option<T>,
    /// Number of routes registered at or below this node.
    priority: u32,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::with_path(String::new())
    }
}

impl<T> Node<T> {
    /// Create an empty root.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_path(path: String) -> Self {
        Self {
            path,
            indices: Vec::new(),
            children: Vec::new(),
            wildcard: None,
            value: None,
            priority: 0,
        }
    }

    /// Register `value` under `pattern`.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), RouteError> {
        validate_pattern(pattern)?;
        self.insert_at(pattern, pattern, value)
    }

    fn insert_at(&mut self, full: &str, path: &str, value: T) -> Result<(), RouteError> {
        self.priority += 1;

        let common = common_prefix_len(&self.path, path);
        if common < self.path.len() {
            self.split(common);
        }

        let rest = &path[common..];
        let Some(first) = rest.chars().next() else {
            if self.value.is_some() {
                return Err(RouteError::Duplicate(full.to_string()));
            }
            self.value = Some(value);
            return Ok(());
        };

        match first {
            ':' => self.insert_param(full, rest, value),
            '*' => self.insert_catch_all(full, rest, value),
            _ => self.insert_literal(full, rest, first, value),
        }
    }

    fn insert_param(&mut self, full: &str, rest: &str, value: T) -> Result<(), RouteError> {
        let end = rest.find('/').unwrap_or(rest.len());
        let (name, tail) = (&rest[1..end], &rest[end..]);

        let wildcard = self.wildcard.get_or_insert_with(|| {
            Box::new(Wildcard::Param {
                name: name.to_string(),
                node: Node::default(),
            })
        });

        match &mut **wildcard {
            Wildcard::Param {
                name: existing,
                node,
            } if existing.as_str() == name => node.insert_at(full, tail, value),
            other => Err(RouteError::WildcardConflict {
                path: full.to_string(),
                name: name.to_string(),
                existing: other.name().to_string(),
            }),
        }
    }

    fn insert_catch_all(&mut self, full: &str, rest: &str, value: T) -> Result<(), RouteError> {
        let name = &rest[1..];

        if let Some(existing) = self.wildcard.as_deref() {
            return Err(match existing {
                Wildcard::CatchAll { name: n, .. } if n.as_str() == name => {
                    RouteError::Duplicate(full.to_string())
                }
                other => RouteError::WildcardConflict {
                    path: full.to_string(),
                    name: name.to_string(),
                    existing: other.name().to_string(),
                },
            });
        }

        self.wildcard = Some(Box::new(Wildcard::CatchAll {
            name: name.to_string(),
            value,
        }));
        Ok(())
    }

    fn insert_literal(
        &mut self,
        full: &str,
        rest: &str,
        first: char,
        value: T,
    ) -> Result<(), RouteError> {
        let index = match self.indices.iter().position(|&c| c == first) {
            Some(i) => i,
            None => {
                let literal_end = rest.find(|c| c == ':' || c == '*').unwrap_or(rest.len());
                self.indices.push(first);
                self.children
                    .push(Node::with_path(rest[..literal_end].to_string()));
                self.children.len() - 1
            }
        };

        self.children[index].insert_at(full, rest, value)?;
        self.promote(index);
        Ok(())
    }

    /// Move everything from byte `at` onwards into a new single child.
    fn split(&mut self, at: usize) {
        let child = Node {
            path: self.path[at..].to_string(),
            indices: std::mem::take(&mut self.indices),
            children: std::mem::take(&mut self.children),
            wildcard: self.wildcard.take(),
            value: self.value.take(),
            priority: self.priority - 1,
        };

        self.indices = child.path.chars().next().into_iter().collect();
        self.children = vec![child];
        self.path.truncate(at);
    }

    /// Bubble a child towards the front while it holds more routes than
    /// its left neighbour.
    fn promote(&mut self, mut index: usize) {
        while index > 0 && self.children[index - 1].priority < self.children[index].priority {
            self.children.swap(index - 1, index);
            self.indices.swap(index - 1, index);
            index -= 1;
        }
    }

    /// Resolve `path`, pushing captured parameters onto `params`.
    ///
    /// On a miss `params` is left exactly as it was passed in.
    pub fn find<'n>(&'n self, path: &str, params: &mut Params) -> Option<&'n T> {
        let rest = path.strip_prefix(self.path.as_str())?;

        let Some(first) = rest.chars().next() else {
            if let Some(value) = &self.value {
                return Some(value);
            }
            return match self.wildcard.as_deref() {
                Some(Wildcard::CatchAll { name, value }) => {
                    params.push(name.as_str(), "");
                    Some(value)
                }
                _ => None,
            };
        };

        if let Some(i) = self.indices.iter().position(|&c| c == first) {
            let mark = params.len();
            if let Some(value) = self.children[i].find(rest, params) {
                return Some(value);
            }
            params.truncate(mark);
        }

        match self.wildcard.as_deref()? {
            Wildcard::Param { name, node } => {
                let end = rest.find('/').unwrap_or(rest.len());
                if end == 0 {
                    return None;
                }
                let mark = params.len();
                params.push(name.as_str(), &rest[..end]);
                let found = node.find(&rest[end..], params);
                if found.is_none() {
                    params.truncate(mark);
                }
                found
            }
            Wildcard::CatchAll { name, value } => {
                params.push(name.as_str(), rest);
                Some(value)
            }
        }
    }

    /// Whether the same path with the trailing slash added or removed
    /// would resolve.
    pub fn trailing_slash_redirect(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let alternate = match path.strip_suffix('/') {
            Some(trimmed) => trimmed.to_string(),
            None => format!("{}/", path),
        };
        self.find(&alternate, &mut Params::new()).is_some()
    }

    /// Case-insensitive lookup returning the path as it was registered.
    ///
    /// Parameter values keep the casing of the request. With
    /// `fix_trailing_slash` a missing or superfluous trailing slash is
    /// corrected as well.
    pub fn find_case_insensitive(&self, path: &str, fix_trailing_slash: bool) -> Option<String> {
        let mut fixed = String::with_capacity(path.len() + 1);
        self.fix_case(path, &mut fixed, fix_trailing_slash)
            .then_some(fixed)
    }

    fn fix_case(&self, path: &str, out: &mut String, fix_slash: bool) -> bool {
        let mark = out.len();
        let n = self.path.len();

        match path.get(..n) {
            Some(head) if head.eq_ignore_ascii_case(&self.path) => {
                out.push_str(&self.path);
                if self.fix_case_rest(&path[n..], out, fix_slash) {
                    return true;
                }
                out.truncate(mark);
                false
            }
            _ => {
                // "/abc" against a node registered as "/abc/"
                let missing_slash = fix_slash
                    && self.value.is_some()
                    && self.path.len() == path.len() + 1
                    && self.path.ends_with('/')
                    && self.path[..path.len()].eq_ignore_ascii_case(path);
                if missing_slash {
                    out.push_str(&self.path);
                }
                missing_slash
            }
        }
    }

    fn fix_case_rest(&self, rest: &str, out: &mut String, fix_slash: bool) -> bool {
        let Some(first) = rest.chars().next() else {
            if self.value.is_some() {
                return true;
            }
            if let Some(Wildcard::CatchAll { .. }) = self.wildcard.as_deref() {
                return true;
            }
            if fix_slash {
                let slash_child = self
                    .indices
                    .iter()
                    .position(|&c| c == '/')
                    .map(|i| &self.children[i]);
                if let Some(child) = slash_child {
                    if child.path == "/" && child.value.is_some() {
                        out.push('/');
                        return true;
                    }
                }
            }
            return false;
        };

        for (i, c) in self.indices.iter().enumerate() {
            if c.eq_ignore_ascii_case(&first) && self.children[i].fix_case(rest, out, fix_slash) {
                return true;
            }
        }

        match self.wildcard.as_deref() {
            Some(Wildcard::Param { node, .. }) => {
                let end = rest.find('/').unwrap_or(rest.len());
                if end > 0 {
                    let mark = out.len();
                    out.push_str(&rest[..end]);
                    if node.fix_case(&rest[end..], out, fix_slash) {
                        return true;
                    }
                    out.truncate(mark);
                }
            }
            Some(Wildcard::CatchAll { .. }) => {
                out.push_str(rest);
                return true;
            }
            None => {}
        }

        // superfluous trailing slash
        fix_slash && rest == "/" && self.value.is_some()
    }
}

/// Byte length of the longest common prefix, always on a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash(pattern.to_string()));
    }

    let is_wild = |c: char| c == ':' || c == '*';
    let mut cursor = 0;
    while let Some(offset) = pattern[cursor..].find(is_wild) {
        let start = cursor + offset;
        let end = pattern[start + 1..]
            .find('/')
            .map_or(pattern.len(), |e| start + 1 + e);
        let name = &pattern[start + 1..end];

        if name.is_empty() {
            return Err(RouteError::UnnamedWildcard(pattern.to_string()));
        }
        if name.contains(is_wild) {
            return Err(RouteError::MultipleWildcards(pattern.to_string()));
        }
        if pattern[start..].starts_with('*') {
            if end != pattern.len() {
                return Err(RouteError::CatchAllNotFinal {
                    path: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            if !pattern[..start].ends_with('/') {
                return Err(RouteError::CatchAllWithoutSlash(pattern.to_string()));
            }
        }
        cursor = end;
    }
    Ok(())
}
