//! Arena of path-prefix groups.
//!
//! # Responsibilities
//! - Create child groups that inherit a copy of their parent's chains
//! - Resolve a status chain by walking towards the root
//! - Validate the status table before serving

use std::collections::HashMap;
use std::fmt;

use axum::http::StatusCode;

use super::status::{default_statuses, StatusChain, STANDARD_CODES};
use crate::context::Handler;
use crate::routing::join_paths;

/// Index of a group in a [`GroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

impl GroupId {
    pub const ROOT: GroupId = GroupId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Status table problems found by [`GroupTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("root group has no handler chain for status {0}")]
    MissingRootStatus(StatusCode),

    #[error("group {group} ({prefix}) has an incomplete chain for status {code}")]
    IncompleteChain {
        group: GroupId,
        prefix: String,
        code: StatusCode,
    },
}

/// One prefix scope.
#[derive(Debug, Clone)]
pub struct Group {
    prefix: String,
    parent: Option<GroupId>,
    statuses: HashMap<StatusCode, StatusChain>,
}

impl Group {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Chain registered on this group itself.
    pub fn status(&self, code: StatusCode) -> Option<&StatusChain> {
        self.statuses.get(&code)
    }
}

/// All groups of an engine. Index 0 is the root, mounted at `/`.
#[derive(Debug, Clone)]
pub struct GroupTree {
    groups: Vec<Group>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    pub fn new() -> Self {
        Self {
            groups: vec![Group {
                prefix: "/".to_string(),
                parent: None,
                statuses: default_statuses(),
            }],
        }
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &Group)> {
        self.groups.iter().enumerate().map(|(i, g)| (GroupId(i), g))
    }

    /// Add a child of `parent` mounted at `parent.prefix + component`.
    ///
    /// The child starts with its own copy of the parent's chains.
    ///
    /// # Panics
    /// If `parent` does not belong to this tree.
    pub fn add(&mut self, parent: GroupId, component: &str) -> GroupId {
        let base = &self.groups[parent.0];
        let group = Group {
            prefix: join_paths(&base.prefix, component),
            parent: Some(parent),
            statuses: base.statuses.clone(),
        };
        self.groups.push(group);
        GroupId(self.groups.len() - 1)
    }

    /// The chain for `code`, from `id` or its nearest ancestor.
    pub fn resolve(&self, id: GroupId, code: StatusCode) -> Option<&StatusChain> {
        let mut current = Some(id);
        while let Some(gid) = current {
            let group = self.groups.get(gid.0)?;
            if let Some(chain) = group.statuses.get(&code) {
                return Some(chain);
            }
            current = group.parent;
        }
        None
    }

    /// Splice `custom` into `id`'s chain for `code`.
    ///
    /// A group without its own chain starts from the resolved one, or from a
    /// fresh chain when no ancestor handles `code`.
    pub fn override_status(
        &mut self,
        id: GroupId,
        code: StatusCode,
        message: Option<&str>,
        custom: impl IntoIterator<Item = Handler>,
    ) {
        let mut chain = match (self.groups[id.0].statuses.get(&code), message) {
            (Some(existing), None) => existing.clone(),
            (existing, message) => {
                let inherited = existing.cloned().or_else(|| self.resolve(id, code).cloned());
                let message = message
                    .map(str::to_string)
                    .or_else(|| inherited.as_ref().map(|c| c.message().to_string()))
                    .unwrap_or_default();
                let mut fresh = StatusChain::new(code, message);
                if let Some(inherited) = inherited {
                    let handlers = inherited.handlers();
                    if handlers.len() > 2 {
                        fresh.update(handlers[1..handlers.len() - 1].iter().cloned());
                    }
                }
                fresh
            }
        };
        chain.update(custom);
        self.groups[id.0].statuses.insert(code, chain);
    }

    /// Check that every escalation terminates in a usable chain.
    pub fn validate(&self) -> Result<(), StatusError> {
        let root = &self.groups[GroupId::ROOT.0];
        for code in STANDARD_CODES {
            if !root.statuses.contains_key(&code) {
                return Err(StatusError::MissingRootStatus(code));
            }
        }

        for (id, group) in self.iter() {
            for (code, chain) in &group.statuses {
                if chain.len() < 2 {
                    return Err(StatusError::IncompleteChain {
                        group: id,
                        prefix: group.prefix.clone(),
                        code: *code,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::handler;

    #[test]
    fn test_prefix_composition() {
        let mut tree = GroupTree::new();
        let api = tree.add(GroupId::ROOT, "api");
        let v1 = tree.add(api, "/v1/");
        let empty = tree.add(api, "");

        assert_eq!(tree.get(api).unwrap().prefix(), "/api");
        assert_eq!(tree.get(v1).unwrap().prefix(), "/api/v1/");
        assert_eq!(tree.get(empty).unwrap().prefix(), "/api");
        assert_eq!(tree.get(v1).unwrap().parent(), Some(api));
    }

    #[test]
    fn test_override_is_local() {
        let mut tree = GroupTree::new();
        let a = tree.add(GroupId::ROOT, "/a");
        let b = tree.add(GroupId::ROOT, "/b");
        let a_child = tree.add(a, "/child");

        tree.override_status(a, StatusCode::IM_A_TEAPOT, None, [handler(|_| {})]);

        let len = |id| tree.resolve(id, StatusCode::IM_A_TEAPOT).unwrap().len();
        assert_eq!(len(a), 3);
        assert_eq!(len(b), 2);
        assert_eq!(len(GroupId::ROOT), 2);
        // copied at creation, before the override
        assert_eq!(len(a_child), 2);
    }

    #[test]
    fn test_resolve_walks_to_parent() {
        let mut tree = GroupTree::new();
        let a = tree.add(GroupId::ROOT, "/a");
        let custom = StatusCode::from_u16(499).unwrap();

        assert!(tree.resolve(a, custom).is_none());
        tree.override_status(GroupId::ROOT, custom, Some("client closed"), [handler(|_| {})]);

        let chain = tree.resolve(a, custom).unwrap();
        assert_eq!(chain.message(), "client closed");
        assert_eq!(chain.len(), 3);
        assert!(tree.get(a).unwrap().status(custom).is_none());
    }

    #[test]
    fn test_message_override_keeps_custom_handlers() {
        let mut tree = GroupTree::new();
        tree.override_status(
            GroupId::ROOT,
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("oops"),
            [handler(|_| {})],
        );
        let chain = tree
            .resolve(GroupId::ROOT, StatusCode::INTERNAL_SERVER_ERROR)
            .unwrap();
        // before, panic handler, custom, after
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.message(), "oops");
    }

    #[test]
    fn test_validate() {
        let tree = GroupTree::new();
        assert!(tree.validate().is_ok());

        let mut broken = GroupTree::new();
        broken.groups[0].statuses.remove(&StatusCode::NOT_FOUND);
        assert_eq!(
            broken.validate(),
            Err(StatusError::MissingRootStatus(StatusCode::NOT_FOUND))
        );
    }
}
