//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while interpreting payloads and metadata descriptors.
#[derive(Debug, Error)]
pub enum Error {
    /// A boolean-coercible field held an unrecognized spelling.
    #[error("invalid boolean value: {0}")]
    InvalidBool(String),

    /// A range declaration was not `[min, max]` or `[min, max, step]`.
    #[error("invalid range: expected [min, max] or [min, max, step], got {0} elements")]
    InvalidRange(usize),

    /// A payload could not be interpreted as a metadata descriptor.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}
