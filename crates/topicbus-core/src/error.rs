//! Engine error types.

use thiserror::Error;

use topicbus_proto::Value;

/// Engine-level errors.
///
/// Every failing operation is atomic: an error means the topic tree was
/// left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty topic strings are rejected before any resolution.
    #[error("empty topic not allowed")]
    EmptyTopic,

    /// `get` addressed a path no operation has touched.
    #[error("topic not found: {0}")]
    NotFound(String),

    /// `create` addressed a topic that already has a node.
    #[error("topic already exists: {0}")]
    AlreadyExists(String),

    /// A published value is not among the topic's declared options.
    #[error("option not found for topic {topic}: {value:?}")]
    OptionNotFound {
        /// The topic whose options were consulted.
        topic: String,
        /// The rejected value.
        value: Value,
    },

    /// Metadata descriptor error.
    #[error("metadata error: {0}")]
    Meta(#[from] topicbus_proto::Error),
}
