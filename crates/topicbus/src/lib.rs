//! Topicbus - a hierarchical retained publish/subscribe bus.
//!
//! Topicbus keys values by `/`-delimited topics, retains the latest
//! value per topic for late subscribers and `get`, attaches metadata
//! descriptors independently of values, and couples independent bus
//! instances (a device-side bus and an application-facing bus, say)
//! through a [`Bridge`] without feedback loops.
//!
//! Delivery is single-threaded, synchronous, and reentrant: a publish
//! invokes every matching subscriber - at the topic's node and at every
//! ancestor - before it returns.
//!
//! ```
//! use topicbus::{Callback, PubSub, SubscribeOptions, Value};
//!
//! let bus = PubSub::new("");
//! bus.publish_value("sensor/temp", 21.5f64, true).unwrap();
//!
//! // A late subscriber replays the retained state.
//! let seen = Callback::new(|topic, _payload, _retain| {
//!     assert_eq!(topic, "sensor/temp");
//! });
//! bus.subscribe("sensor", &seen, SubscribeOptions::new());
//!
//! assert_eq!(
//!     bus.get("sensor/temp").unwrap().unwrap().as_value(),
//!     Some(&Value::F64(21.5))
//! );
//! ```

pub use topicbus_core::{
    Bridge, Callback, CallbackId, Error, PubSub, SubscribeOptions, SubscriberFn,
};
pub use topicbus_proto::{
    Dtype, MetaFlag, MetaOption, MetaRange, Metadata, Payload, TopicKind, Value,
};

/// Re-export the protocol crate for topic-syntax and version helpers.
pub use topicbus_proto as proto;
