//! Subscriber callback handles.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use topicbus_proto::Payload;

/// Process-unique identity for a subscriber callback.
///
/// Closures cannot be compared, so every callback carries an explicit
/// opaque id; exclusion and unsubscription go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Signature every subscriber implements: `(topic, payload, retain)`.
pub type SubscriberFn = dyn Fn(&str, Option<&Payload>, bool);

/// A clonable handle to a subscriber function.
///
/// Clones share one id and one underlying function. Delivery is
/// reentrant: the function may call back into the engine, including a
/// nested publish that reaches the function itself, so the closure is
/// `Fn` rather than `FnMut`; subscribers that accumulate state keep it
/// behind their own `RefCell`.
#[derive(Clone)]
pub struct Callback {
    id: CallbackId,
    func: Rc<SubscriberFn>,
}

impl Callback {
    /// Wrap a subscriber function in a handle with a fresh id.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str, Option<&Payload>, bool) + 'static,
    {
        Self {
            id: CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed)),
            func: Rc::new(func),
        }
    }

    /// The handle's id, used for `exclude` and `unsubscribe`.
    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub(crate) fn invoke(&self, topic: &str, payload: Option<&Payload>, retain: bool) {
        (self.func)(topic, payload, retain);
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Options for registering a subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Skip the retained-state replay that normally runs on subscribe.
    pub skip_retained: bool,
    /// Also receive protocol (metadata/query) traffic.
    pub forward: bool,
}

impl SubscribeOptions {
    /// Defaults: replay retained state, value traffic only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the retained-state replay.
    pub fn with_skip_retained(mut self) -> Self {
        self.skip_retained = true;
        self
    }

    /// Opt in to protocol traffic (bridges and user interfaces).
    pub fn with_forward(mut self) -> Self {
        self.forward = true;
        self
    }
}
