//! Topicbus core - hierarchical retained publish/subscribe.
//!
//! This crate provides the engine at the heart of topicbus:
//!
//! - [`engine`] - the [`PubSub`] engine: a lazily grown topic tree with
//!   retained values, metadata descriptors, and synchronous delivery to
//!   the originating node and every ancestor.
//! - [`bridge`] - the [`Bridge`] adapter coupling two engines under a
//!   namespace prefix with echo suppression.
//! - [`callback`] - opaque [`Callback`] handles and subscription options.
//! - [`error`] - engine error types.
//!
//! The engine is single-threaded, synchronous, and reentrant; see the
//! [`PubSub`] documentation for the delivery model.

pub mod bridge;
pub mod callback;
pub mod engine;
pub mod error;
mod tree;

pub use bridge::Bridge;
pub use callback::{Callback, CallbackId, SubscribeOptions, SubscriberFn};
pub use engine::PubSub;
pub use error::Error;
