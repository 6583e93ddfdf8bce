//! # Action Trie
//!
//! Segment trie mapping request paths to registered actions.
//!
//! ## Matching rules
//!
//! - Paths are split on `/`; one leading and one trailing empty segment are ignored
//! - `:name` segments are placeholders, every other segment is matched verbatim
//! - At each level a literal child wins over placeholders. Placeholders are only
//!   tried when no literal child has the segment text, in registration order,
//!   and the first one whose subtree completes the path is taken
//! - The node reached by the last segment must hold an action

use crate::error::{Error, Result};
use crate::params::BoundParams;
use crate::types::{decode_segment, placeholder_name, split_path};
use std::borrow::Cow;
use std::collections::HashMap;

/// Action identifier (index into the registry's action list)
pub type ActionId = usize;

/// One path segment level of the trie
#[derive(Debug, Clone, Default)]
pub struct ActionNode {
    /// Children keyed by literal segment text
    literal: HashMap<String, ActionNode>,
    /// Placeholder children in registration order
    bound: Vec<(String, ActionNode)>,
    /// Action terminating at this node
    action: Option<ActionId>,
}

impl ActionNode {
    /// Get or create the child for a registration segment
    fn child_mut(&mut self, segment: &str) -> &mut Self {
        let Some(name) = placeholder_name(segment) else {
            return self.literal.entry(segment.to_string()).or_default();
        };

        let index = match self.bound.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.bound.push((name.to_string(), Self::default()));
                self.bound.len() - 1
            }
        };
        &mut self.bound[index].1
    }

    /// Structural lookup of a registration segment (placeholders compared by name)
    fn child(&self, segment: &str) -> Option<&Self> {
        match placeholder_name(segment) {
            Some(name) => self
                .bound
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, node)| node),
            None => self.literal.get(segment),
        }
    }

    fn find<'a>(
        &'a self,
        segments: &[&str],
        captures: &mut Vec<(&'a str, String)>,
    ) -> Option<ActionId> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.action;
        };

        if let Some(child) = self.literal.get(*segment) {
            return child.find(rest, captures);
        }

        for (name, child) in &self.bound {
            captures.push((name.as_str(), (*segment).to_string()));
            if let Some(id) = child.find(rest, captures) {
                return Some(id);
            }
            captures.pop();
        }

        None
    }
}

/// Path → action lookup structure
#[derive(Debug, Clone, Default)]
pub struct ActionTrie {
    root: ActionNode,
    len: usize,
}

impl ActionTrie {
    /// Create an empty trie
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an action to `path`, creating intermediate nodes
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRoute` if an action already terminates at `path`
    pub fn insert(&mut self, path: &str, action: ActionId) -> Result<()> {
        let mut node = &mut self.root;
        for segment in split_path(path) {
            node = node.child_mut(segment);
        }

        if node.action.is_some() {
            return Err(Error::DuplicateRoute {
                path: path.to_string(),
            });
        }

        node.action = Some(action);
        self.len += 1;
        Ok(())
    }

    /// Whether an action is registered for exactly this registration path
    ///
    /// `/user/:id` and `/user/:uid` are different paths.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let mut node = &self.root;
        for segment in split_path(path) {
            match node.child(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.action.is_some()
    }

    /// Match a request path
    ///
    /// Segments are percent-decoded before matching, so captures hold decoded
    /// text.
    ///
    /// # Errors
    ///
    /// Returns `Error::ActionNotFound` if no action matches
    pub fn at(&self, path: &str) -> Result<(ActionId, BoundParams)> {
        let decoded: Vec<Cow<'_, str>> = split_path(path)
            .into_iter()
            .map(decode_segment)
            .collect();
        let segments: Vec<&str> = decoded.iter().map(|segment| &**segment).collect();
        let mut captures = Vec::new();

        let id = self
            .root
            .find(&segments, &mut captures)
            .ok_or_else(|| Error::ActionNotFound {
                path: path.to_string(),
            })?;

        Ok((id, captures.into_iter().collect()))
    }

    /// Number of registered actions
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if no action is registered
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
