//! Topic path syntax.
//!
//! Topics are case-sensitive ASCII strings with `/`-delimited segments.
//! A trailing `$` selects the metadata protocol; a trailing `?` is
//! reserved query syntax. Leading, trailing, and doubled separators are
//! ignored during resolution.

/// Protocol classification of a published topic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// `"$"` exactly: broadcast metadata for the whole owned namespace.
    MetaAll,
    /// Ends with `"/$"`: metadata request/broadcast for a subtree.
    MetaSubtree,
    /// Ends with `"$"`: metadata get/set for a single topic.
    MetaTopic,
    /// Ends with `"?"`: reserved query syntax, accepted as a no-op.
    Query,
    /// Anything else: an ordinary value topic.
    Value,
}

impl TopicKind {
    /// Classify a topic string. The match order is significant: the bare
    /// broadcast, then the subtree form, then the per-topic form.
    pub fn classify(topic: &str) -> TopicKind {
        if topic == "$" {
            TopicKind::MetaAll
        } else if topic.ends_with("/$") {
            TopicKind::MetaSubtree
        } else if topic.ends_with('$') {
            TopicKind::MetaTopic
        } else if topic.ends_with('?') {
            TopicKind::Query
        } else {
            TopicKind::Value
        }
    }
}

/// Trim protocol suffix characters (`/`, `$`, `?`) from the end of a topic.
pub fn trim_suffix(topic: &str) -> &str {
    topic.trim_end_matches(['/', '$', '?'])
}

/// Iterate the non-empty path segments of a topic.
pub fn segments(topic: &str) -> impl Iterator<Item = &str> {
    trim_suffix(topic).split('/').filter(|s| !s.is_empty())
}

/// Join a parent path and a child segment.
pub fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}
