//! Topicbus protocol types.
//!
//! This crate defines the data model shared by bus instances and the
//! transports that connect them: the closed [`Value`] union, the
//! [`Metadata`] descriptor, event [`Payload`]s, and topic-path syntax.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types and boolean coercion
//! - [`meta`] - Metadata descriptors, options, ranges, and flags
//! - [`payload`] - Event payload union (value or descriptor)
//! - [`topic`] - Topic path syntax and protocol-suffix classification
//! - [`version`] - Packed 32-bit version helpers
//! - [`error`] - Protocol error types
//!
//! Metadata descriptors (de)serialize with serde to the JSON format
//! device firmware emits:
//!
//! ```
//! use topicbus_proto::{Dtype, Metadata};
//!
//! let meta = Metadata::from_json_str(
//!     r#"{"dtype": "u8", "options": [[0, "off"], [1, "on"]], "default": 0}"#,
//! ).unwrap();
//! assert_eq!(meta.dtype, Dtype::U8);
//! ```

pub mod error;
pub mod meta;
pub mod payload;
pub mod topic;
pub mod value;
pub mod version;

pub use error::Error;

// Re-export commonly used types at crate root
pub use meta::{MetaFlag, MetaOption, MetaRange, Metadata};
pub use payload::Payload;
pub use topic::TopicKind;
pub use value::{Dtype, Value};
