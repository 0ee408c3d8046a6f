//! Arena-backed topic tree.
//!
//! Nodes live in a flat arena. Child links are map entries holding arena
//! indices and the parent link is a plain index, so ownership flows
//! strictly root to children and no cycle can form. Nodes are created
//! lazily and never removed: the tree grows monotonically for the
//! engine's lifetime, an accepted limitation of the design.

use std::collections::BTreeMap;

use topicbus_proto::{topic, Metadata, Payload};

use crate::callback::{Callback, CallbackId};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

/// One node of the hierarchical key space.
#[derive(Debug, Default)]
pub(crate) struct TopicNode {
    /// Full path from the root; the root's path is empty.
    pub path: String,
    /// Non-owning back-reference; `None` for the root.
    pub parent: Option<NodeId>,
    /// Child nodes keyed by single path segment.
    pub children: BTreeMap<String, NodeId>,
    /// Retained value; `None` means nothing is retained.
    pub value: Option<Payload>,
    /// Descriptor for the topic, independent of the value.
    pub meta: Option<Metadata>,
    /// Registered subscribers with their forward flag, in registration
    /// order. A callback id appears at most once.
    pub subscribers: Vec<(Callback, bool)>,
}

/// The arena holding every node of one engine's key space.
pub(crate) struct TopicTree {
    nodes: Vec<TopicNode>,
}

impl TopicTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![TopicNode::default()],
        }
    }

    /// The root node's id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TopicNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TopicNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Find the node for a topic without creating anything.
    pub fn lookup(&self, topic_str: &str) -> Option<NodeId> {
        let mut current = self.root();
        for segment in topic::segments(topic_str) {
            current = *self.node(current).children.get(segment)?;
        }
        Some(current)
    }

    /// Resolve a topic to its node, creating missing segments.
    pub fn resolve(&mut self, topic_str: &str) -> NodeId {
        let mut current = self.root();
        for segment in topic::segments(topic_str) {
            current = match self.node(current).children.get(segment) {
                Some(child) => *child,
                None => {
                    let path = topic::join(&self.node(current).path, segment);
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(TopicNode {
                        path,
                        parent: Some(current),
                        ..TopicNode::default()
                    });
                    self.node_mut(current)
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        current
    }

    /// The deepest node that already exists along a topic's path.
    ///
    /// Falls back to the root when nothing under the path exists; relays
    /// for not-yet-created remote namespaces rely on this.
    pub fn resolve_existing_base(&self, topic_str: &str) -> NodeId {
        let mut current = self.root();
        for segment in topic::segments(topic_str) {
            match self.node(current).children.get(segment) {
                Some(child) => current = *child,
                None => break,
            }
        }
        current
    }

    /// Register a callback on a node, once per callback id.
    pub fn subscribe(&mut self, id: NodeId, callback: &Callback, forward: bool) {
        let subscribers = &mut self.node_mut(id).subscribers;
        if !subscribers.iter().any(|(cb, _)| cb.id() == callback.id()) {
            subscribers.push((callback.clone(), forward));
        }
    }

    /// Remove every registration for the callback id on a node.
    pub fn unsubscribe(&mut self, id: NodeId, callback: CallbackId) {
        self.node_mut(id)
            .subscribers
            .retain(|(cb, _)| cb.id() != callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_creates_intermediates() {
        let mut tree = TopicTree::new();
        let leaf = tree.resolve("a/b/c");
        assert_eq!(tree.node(leaf).path, "a/b/c");

        let a = tree.lookup("a").unwrap();
        let b = tree.lookup("a/b").unwrap();
        assert_eq!(tree.node(b).parent, Some(a));
        assert_eq!(tree.node(a).parent, Some(tree.root()));
        assert_eq!(tree.node(tree.root()).parent, None);

        // Resolving again returns the same node.
        assert_eq!(tree.resolve("a/b/c"), leaf);
    }

    #[test]
    fn test_resolve_ignores_separator_noise() {
        let mut tree = TopicTree::new();
        let node = tree.resolve("/a//b/");
        assert_eq!(tree.node(node).path, "a/b");
        assert_eq!(tree.lookup("a/b"), Some(node));
        assert_eq!(tree.lookup("a/b$"), Some(node));
    }

    #[test]
    fn test_lookup_miss() {
        let tree = TopicTree::new();
        assert_eq!(tree.lookup(""), Some(tree.root()));
        assert!(tree.lookup("missing").is_none());
    }

    #[test]
    fn test_existing_base_fallback() {
        let mut tree = TopicTree::new();
        let b = tree.resolve("a/b");

        assert_eq!(tree.resolve_existing_base("a/b/c/d"), b);
        assert_eq!(tree.resolve_existing_base("other/x"), tree.root());
        assert_eq!(tree.resolve_existing_base("a/b"), b);
    }

    #[test]
    fn test_subscribe_once_per_id() {
        let mut tree = TopicTree::new();
        let node = tree.resolve("a");
        let callback = Callback::new(|_, _, _| {});

        tree.subscribe(node, &callback, false);
        tree.subscribe(node, &callback, true); // same id, ignored
        assert_eq!(tree.node(node).subscribers.len(), 1);
        assert!(!tree.node(node).subscribers[0].1);

        let other = Callback::new(|_, _, _| {});
        tree.subscribe(node, &other, true);
        assert_eq!(tree.node(node).subscribers.len(), 2);

        tree.unsubscribe(node, callback.id());
        assert_eq!(tree.node(node).subscribers.len(), 1);
        assert_eq!(tree.node(node).subscribers[0].0.id(), other.id());
    }
}
