//! The publish/subscribe engine.

use std::cell::RefCell;

use tracing::{debug, trace};

use topicbus_proto::{Metadata, Payload, TopicKind};

use crate::callback::{Callback, CallbackId, SubscribeOptions};
use crate::error::Error;
use crate::tree::{NodeId, TopicTree};

/// A single-threaded hierarchical publish/subscribe engine.
///
/// The engine owns a topic tree with retained values and metadata
/// descriptors, and delivers events synchronously: a publish invokes
/// every matching subscriber at the originating node and then at each
/// ancestor, in registration order, before returning. Subscribing to a
/// parent path therefore observes all descendant activity, up to the
/// root subscription that sees everything.
///
/// Three protocols share the tree, selected by topic suffix: ordinary
/// values, metadata (`$`), and the reserved query syntax (`?`).
///
/// Delivery is reentrant. A subscriber may publish or subscribe again
/// from inside its callback; nested calls run to completion before the
/// outer delivery continues. This depth-first ordering is what lets
/// bridged engines suppress echo purely through callback exclusion.
///
/// The engine is deliberately not `Send`/`Sync`: one logical owner
/// mutates the tree, and producers on other execution contexts must
/// marshal their events into that context before publishing.
pub struct PubSub {
    prefix: String,
    tree: RefCell<TopicTree>,
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new("")
    }
}

impl PubSub {
    /// Create an engine owning the given topic namespace prefix.
    ///
    /// The prefix decides which metadata requests this instance answers
    /// itself and which it relays outward for a bridged peer. Provide an
    /// empty prefix for a standalone instance.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tree: RefCell::new(TopicTree::new()),
        }
    }

    /// The namespace prefix this engine owns.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Publish to a topic.
    ///
    /// The topic suffix selects the protocol: `$` forms address
    /// metadata, a trailing `?` is reserved and accepted as a no-op,
    /// anything else publishes an ordinary value. For value topics,
    /// `retain` stores the payload so `get` and late subscribers observe
    /// it; publishing an identical retained payload is a complete no-op,
    /// and a non-retained publish clears the stored value while still
    /// delivering the transient event. `exclude` names the one callback
    /// that never receives this event, at any tree level.
    pub fn publish(
        &self,
        topic_str: &str,
        payload: Option<Payload>,
        retain: bool,
        exclude: Option<CallbackId>,
    ) -> Result<(), Error> {
        if topic_str.is_empty() {
            return Err(Error::EmptyTopic);
        }
        match TopicKind::classify(topic_str) {
            TopicKind::MetaAll => {
                trace!(prefix = self.prefix.as_str(), "metadata broadcast");
                let base = self.tree.borrow_mut().resolve(&self.prefix);
                self.meta_send_all(base, exclude);
                let root = self.tree.borrow().root();
                self.notify_forward(root, topic_str, None, retain, exclude, false);
                Ok(())
            }
            TopicKind::MetaSubtree => {
                if topic_str.starts_with(self.prefix.as_str()) {
                    let base = self.tree.borrow_mut().resolve(topic_str);
                    self.meta_send_all(base, exclude);
                } else {
                    // Not our namespace: relay the raw request from the
                    // deepest existing node toward the root.
                    let base = self.tree.borrow().resolve_existing_base(topic_str);
                    self.notify_forward(base, topic_str, None, retain, exclude, true);
                }
                Ok(())
            }
            TopicKind::MetaTopic => self.publish_meta_topic(topic_str, payload, exclude),
            TopicKind::Query => {
                // Reserved syntax with no semantics yet; accepted so
                // peers probing for it see neither an error nor a
                // mutation.
                trace!(topic = topic_str, "query topic ignored");
                Ok(())
            }
            TopicKind::Value => self.publish_value_topic(topic_str, payload, retain, exclude),
        }
    }

    /// Publish an ordinary value, retained or transient.
    pub fn publish_value(
        &self,
        topic_str: &str,
        value: impl Into<topicbus_proto::Value>,
        retain: bool,
    ) -> Result<(), Error> {
        self.publish(topic_str, Some(Payload::Value(value.into())), retain, None)
    }

    /// Get the retained value for a topic.
    ///
    /// Fails when no operation has ever touched the path. An existing
    /// topic with nothing retained returns `None`.
    pub fn get(&self, topic_str: &str) -> Result<Option<Payload>, Error> {
        let tree = self.tree.borrow();
        let node = tree
            .lookup(topic_str)
            .ok_or_else(|| Error::NotFound(topic_str.to_string()))?;
        Ok(tree.node(node).value.clone())
    }

    /// Subscribe to a topic and its descendants.
    ///
    /// Unless `skip_retained`, the current retained state of the subtree
    /// replays synchronously to the new subscriber as retained events,
    /// descendants first. With `forward`, the subscriber also receives
    /// metadata and query protocol traffic; bridges and user interfaces
    /// opt in, ordinary consumers do not.
    pub fn subscribe(&self, topic_str: &str, callback: &Callback, opts: SubscribeOptions) {
        let node = self.tree.borrow_mut().resolve(topic_str);
        self.tree.borrow_mut().subscribe(node, callback, opts.forward);
        if !opts.skip_retained {
            self.replay_retained(node, callback);
        }
    }

    /// Remove a subscriber from a topic.
    pub fn unsubscribe(&self, topic_str: &str, callback: CallbackId) {
        let node = self.tree.borrow_mut().resolve(topic_str);
        self.tree.borrow_mut().unsubscribe(node, callback);
    }

    /// Set a topic's metadata descriptor.
    ///
    /// Sugar for publishing the descriptor on the topic's `$` form.
    pub fn meta(&self, topic_str: &str, meta: Metadata) -> Result<(), Error> {
        if topic_str.ends_with('$') {
            self.publish(topic_str, Some(Payload::Meta(meta)), false, None)
        } else {
            let suffixed = format!("{topic_str}$");
            self.publish(&suffixed, Some(Payload::Meta(meta)), false, None)
        }
    }

    /// Create a topic that must not exist yet.
    ///
    /// Unlike `publish`, creation is not idempotent: a second `create`
    /// on the same path fails and leaves the existing node untouched.
    /// On success the descriptor is stored, a declared `default` is
    /// published honoring the descriptor's coerced `retain` flag with
    /// `callback` excluded, and `callback` (when given) is subscribed.
    pub fn create(
        &self,
        topic_str: &str,
        meta: Option<Metadata>,
        callback: Option<&Callback>,
        opts: SubscribeOptions,
    ) -> Result<(), Error> {
        if self.tree.borrow().lookup(topic_str).is_some() {
            return Err(Error::AlreadyExists(topic_str.to_string()));
        }
        // All validation happens before any node is created.
        let mut initial = None;
        if let Some(meta) = &meta {
            meta.validate()?;
            if let Some(default) = &meta.default {
                if !meta.option_allows(default) {
                    return Err(Error::OptionNotFound {
                        topic: topic_str.to_string(),
                        value: default.clone(),
                    });
                }
                initial = Some((default.clone(), meta.retain_flag()?));
            }
        }
        debug!(topic = topic_str, "creating topic");
        let node = self.tree.borrow_mut().resolve(topic_str);
        self.tree.borrow_mut().node_mut(node).meta = meta;
        if let Some((default, retain)) = initial {
            self.publish_at(
                node,
                Some(Payload::Value(default)),
                retain,
                callback.map(Callback::id),
            );
        }
        if let Some(callback) = callback {
            self.tree.borrow_mut().subscribe(node, callback, opts.forward);
            if !opts.skip_retained {
                self.replay_retained(node, callback);
            }
        }
        Ok(())
    }

    /// Per-topic metadata get/set (`topic$`).
    fn publish_meta_topic(
        &self,
        topic_str: &str,
        payload: Option<Payload>,
        exclude: Option<CallbackId>,
    ) -> Result<(), Error> {
        if !topic_str.starts_with(self.prefix.as_str()) {
            // Get or set for another instance: pure passthrough relay,
            // never parsed here.
            let node = self.tree.borrow_mut().resolve(topic_str);
            self.notify_forward(node, topic_str, payload.as_ref(), true, exclude, true);
            return Ok(());
        }
        match payload {
            None => {
                // Read request: re-emit the current descriptor, if any.
                let node = self.tree.borrow_mut().resolve(topic_str);
                let meta = self.tree.borrow().node(node).meta.clone();
                if let Some(meta) = meta {
                    self.notify_forward(
                        node,
                        topic_str,
                        Some(&Payload::Meta(meta)),
                        true,
                        exclude,
                        true,
                    );
                }
            }
            Some(payload) => {
                // Write: parse and validate before touching the tree.
                let meta = payload.to_meta()?;
                meta.validate()?;
                let node = self.tree.borrow_mut().resolve(topic_str);
                debug!(topic = topic_str, "storing metadata");
                self.tree.borrow_mut().node_mut(node).meta = Some(meta);
                self.notify_forward(node, topic_str, Some(&payload), true, exclude, true);
            }
        }
        Ok(())
    }

    /// Ordinary value publish.
    fn publish_value_topic(
        &self,
        topic_str: &str,
        payload: Option<Payload>,
        retain: bool,
        exclude: Option<CallbackId>,
    ) -> Result<(), Error> {
        // Options are validated before the tree is touched; a topic that
        // does not exist yet cannot have declared any.
        {
            let tree = self.tree.borrow();
            if let Some(node) = tree.lookup(topic_str) {
                if let (Some(meta), Some(Payload::Value(value))) =
                    (&tree.node(node).meta, payload.as_ref())
                {
                    if !meta.option_allows(value) {
                        return Err(Error::OptionNotFound {
                            topic: topic_str.to_string(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }
        let node = self.tree.borrow_mut().resolve(topic_str);
        self.publish_at(node, payload, retain, exclude);
        Ok(())
    }

    /// Apply the dedup/clear rule at a node, then notify the node and
    /// every ancestor. Events carry the originating node's full path.
    fn publish_at(
        &self,
        node: NodeId,
        payload: Option<Payload>,
        retain: bool,
        exclude: Option<CallbackId>,
    ) {
        {
            let mut tree = self.tree.borrow_mut();
            let entry = tree.node_mut(node);
            if retain {
                if entry.value == payload {
                    return; // retained dedup: no mutation, no delivery
                }
                entry.value = payload.clone();
            } else {
                entry.value = None;
            }
        }
        let origin = self.tree.borrow().node(node).path.clone();
        let mut cursor = Some(node);
        while let Some(level) = cursor {
            let mut index = 0;
            loop {
                // The borrow is released around every callback so
                // subscribers can re-enter the engine.
                let callback = {
                    let tree = self.tree.borrow();
                    match tree.node(level).subscribers.get(index) {
                        Some((callback, _)) => callback.clone(),
                        None => break,
                    }
                };
                index += 1;
                if Some(callback.id()) == exclude {
                    continue;
                }
                callback.invoke(&origin, payload.as_ref(), retain);
            }
            cursor = self.tree.borrow().node(level).parent;
        }
    }

    /// Deliver a protocol event to forward-flagged subscribers at a
    /// node, optionally walking the ancestors with the same filter.
    fn notify_forward(
        &self,
        start: NodeId,
        topic_str: &str,
        payload: Option<&Payload>,
        retain: bool,
        exclude: Option<CallbackId>,
        traverse_parent: bool,
    ) {
        let mut cursor = Some(start);
        while let Some(level) = cursor {
            let mut index = 0;
            loop {
                let entry = {
                    let tree = self.tree.borrow();
                    tree.node(level)
                        .subscribers
                        .get(index)
                        .map(|(callback, forward)| (callback.clone(), *forward))
                };
                let Some((callback, forward)) = entry else {
                    break;
                };
                index += 1;
                if !forward || Some(callback.id()) == exclude {
                    continue;
                }
                callback.invoke(topic_str, payload, retain);
            }
            if !traverse_parent {
                break;
            }
            cursor = self.tree.borrow().node(level).parent;
        }
    }

    /// Emit the descriptor of every node in a subtree to forward
    /// subscribers, pre-order (node, then children), each event walking
    /// to the root. Iterative so arbitrarily deep trees cannot overflow
    /// the stack.
    fn meta_send_all(&self, start: NodeId, exclude: Option<CallbackId>) {
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            let (meta, path, children) = {
                let tree = self.tree.borrow();
                let entry = tree.node(node);
                (
                    entry.meta.clone(),
                    entry.path.clone(),
                    // Reversed so the stack pops children in map order.
                    entry.children.values().rev().copied().collect::<Vec<_>>(),
                )
            };
            if let Some(meta) = meta {
                let topic_str = format!("{path}$");
                self.notify_forward(
                    node,
                    &topic_str,
                    Some(&Payload::Meta(meta)),
                    false,
                    exclude,
                    true,
                );
            }
            stack.extend(children);
        }
    }

    /// Replay the retained state of a subtree to one callback as
    /// retained events, descendants first, the subscribed node last.
    fn replay_retained(&self, start: NodeId, callback: &Callback) {
        let mut stack = vec![(start, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                let delivery = {
                    let tree = self.tree.borrow();
                    let entry = tree.node(node);
                    entry
                        .value
                        .as_ref()
                        .map(|payload| (entry.path.clone(), payload.clone()))
                };
                if let Some((path, payload)) = delivery {
                    callback.invoke(&path, Some(&payload), true);
                }
            } else {
                stack.push((node, true));
                let children = {
                    let tree = self.tree.borrow();
                    tree.node(node)
                        .children
                        .values()
                        .rev()
                        .copied()
                        .collect::<Vec<_>>()
                };
                stack.extend(children.into_iter().map(|child| (child, false)));
            }
        }
    }
}
