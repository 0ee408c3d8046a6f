//! Coupling two engines under a namespace prefix.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{trace, warn};

use topicbus_proto::Payload;

use crate::callback::{Callback, CallbackId, SubscribeOptions};
use crate::engine::PubSub;
use crate::error::Error;

/// Couples an inner engine (a device-side bus) to an outer engine (an
/// application-side bus) under a namespace prefix owned by the inner
/// side.
///
/// Every event on the inner bus reappears on the outer bus under the
/// prefix, and every outer event under the prefix reappears on the inner
/// bus with the prefix stripped. Each relay republishes with its
/// counterpart excluded, so a publish crosses the bridge exactly once
/// per direction; the engines' exclusion walk is the only
/// loop-suppression state.
pub struct Bridge {
    inner: Rc<PubSub>,
    outer: Rc<PubSub>,
    base: String,
    prefix: String,
    inner_relay: Callback,
    outer_relay: Callback,
}

impl Bridge {
    /// Couple `inner` and `outer` under `prefix` (with or without a
    /// trailing separator).
    ///
    /// Retained state replays through both relays during construction,
    /// so the two sides converge immediately; the retained-equality rule
    /// absorbs anything that would otherwise bounce.
    pub fn new(inner: Rc<PubSub>, outer: Rc<PubSub>, prefix: &str) -> Self {
        let base = prefix.trim_matches('/').to_string();
        let prefixed = format!("{base}/");

        // The inner-side relay must exclude the outer-side relay, which
        // does not exist yet when this closure is built; the slot is
        // filled in once both callbacks exist, before any subscription.
        let outer_relay_id = Rc::new(Cell::new(None::<CallbackId>));

        let inner_relay = Callback::new({
            let outer = Rc::clone(&outer);
            let prefixed = prefixed.clone();
            let outer_relay_id = Rc::clone(&outer_relay_id);
            move |topic, payload, retain| {
                let relayed = format!("{prefixed}{topic}");
                trace!(topic = relayed.as_str(), retain, "relay out");
                if let Err(error) = outer.publish(&relayed, payload.cloned(), retain, outer_relay_id.get())
                {
                    warn!(topic = relayed.as_str(), %error, "relay out failed");
                }
            }
        });

        let outer_relay = Callback::new({
            let inner = Rc::clone(&inner);
            let prefixed = prefixed.clone();
            let inner_relay_id = inner_relay.id();
            move |topic, payload, retain| {
                let Some(stripped) = topic.strip_prefix(prefixed.as_str()) else {
                    return; // not under the bridged namespace
                };
                trace!(topic = stripped, retain, "relay in");
                if let Err(error) =
                    inner.publish(stripped, payload.cloned(), retain, Some(inner_relay_id))
                {
                    warn!(topic = stripped, %error, "relay in failed");
                }
            }
        });
        outer_relay_id.set(Some(outer_relay.id()));

        inner.subscribe("", &inner_relay, SubscribeOptions::new().with_forward());
        outer.subscribe(&base, &outer_relay, SubscribeOptions::new().with_forward());

        Self {
            inner,
            outer,
            base,
            prefix: prefixed,
            inner_relay,
            outer_relay,
        }
    }

    /// The bridged namespace prefix, with its trailing separator.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Publish on the outer engine under the bridge prefix.
    pub fn publish(
        &self,
        topic: &str,
        payload: Option<Payload>,
        retain: bool,
    ) -> Result<(), Error> {
        self.outer
            .publish(&format!("{}{topic}", self.prefix), payload, retain, None)
    }

    /// Get the retained value under the bridge prefix.
    pub fn get(&self, topic: &str) -> Result<Option<Payload>, Error> {
        self.outer.get(&format!("{}{topic}", self.prefix))
    }

    /// Subscribe under the bridge prefix.
    ///
    /// The given callback observes prefix-stripped topics. Returns the
    /// wrapper handle; pass its id to [`Bridge::unsubscribe`].
    pub fn subscribe(
        &self,
        topic: &str,
        callback: Callback,
        opts: SubscribeOptions,
    ) -> Callback {
        let prefixed = self.prefix.clone();
        let wrapper = Callback::new(move |full_topic, payload, retain| {
            if let Some(stripped) = full_topic.strip_prefix(prefixed.as_str()) {
                callback.invoke(stripped, payload, retain);
            }
        });
        self.outer
            .subscribe(&format!("{}{topic}", self.prefix), &wrapper, opts);
        wrapper
    }

    /// Remove a subscriber registered through [`Bridge::subscribe`].
    pub fn unsubscribe(&self, topic: &str, callback: CallbackId) {
        self.outer
            .unsubscribe(&format!("{}{topic}", self.prefix), callback);
    }

    /// Tear both relays down; the engines keep their state but stop
    /// exchanging events.
    pub fn detach(&self) {
        self.inner.unsubscribe("", self.inner_relay.id());
        self.outer.unsubscribe(&self.base, self.outer_relay.id());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use topicbus_proto::{Dtype, Metadata, Value};

    use super::*;

    type Events = Rc<RefCell<Vec<(String, Option<Payload>, bool)>>>;

    fn recorder() -> (Callback, Events) {
        let events: Events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let callback = Callback::new(move |topic, payload, retain| {
            sink.borrow_mut()
                .push((topic.to_string(), payload.cloned(), retain));
        });
        (callback, events)
    }

    fn pair() -> (Rc<PubSub>, Rc<PubSub>, Bridge) {
        let device = Rc::new(PubSub::new(""));
        let app = Rc::new(PubSub::new("ui"));
        let bridge = Bridge::new(Rc::clone(&device), Rc::clone(&app), "dev0");
        (device, app, bridge)
    }

    #[test]
    fn test_inner_to_outer() {
        let (device, app, _bridge) = pair();
        device.publish_value("status/led", 1u8, true).unwrap();
        assert_eq!(
            app.get("dev0/status/led").unwrap(),
            Some(Payload::Value(Value::U8(1)))
        );
    }

    #[test]
    fn test_outer_to_inner() {
        let (device, app, _bridge) = pair();
        app.publish_value("dev0/ctrl/rate", 7u32, true).unwrap();
        assert_eq!(
            device.get("ctrl/rate").unwrap(),
            Some(Payload::Value(Value::U32(7)))
        );
    }

    #[test]
    fn test_loop_suppression() {
        let (device, app, _bridge) = pair();
        let (device_cb, device_events) = recorder();
        let (app_cb, app_events) = recorder();
        device.subscribe("", &device_cb, SubscribeOptions::new());
        app.subscribe("", &app_cb, SubscribeOptions::new());

        device.publish_value("status/led", 1u8, true).unwrap();

        // Each side saw the event exactly once: the relays never echo an
        // event back across the bridge it arrived on.
        assert_eq!(device_events.borrow().len(), 1);
        assert_eq!(device_events.borrow()[0].0, "status/led");
        assert_eq!(app_events.borrow().len(), 1);
        assert_eq!(app_events.borrow()[0].0, "dev0/status/led");

        // Republishing the relayed value back is absorbed by the
        // retained dedup, not re-relayed.
        app.publish_value("dev0/status/led", 1u8, true).unwrap();
        assert_eq!(device_events.borrow().len(), 1);
        assert_eq!(app_events.borrow().len(), 1);
    }

    #[test]
    fn test_metadata_announcement_crosses_bridge() {
        let (device, app, _bridge) = pair();
        let (app_cb, app_events) = recorder();
        app.subscribe("dev0", &app_cb, SubscribeOptions::new().with_forward());

        // A descriptor stored on the device side fans out through the
        // bridge and reaches application-side forward subscribers under
        // the prefixed topic.
        let meta = Metadata::new(Dtype::U8).with_brief("Echo enable");
        device.meta("port/0/echo", meta.clone()).unwrap();
        assert_eq!(
            *app_events.borrow(),
            vec![(
                "dev0/port/0/echo$".to_string(),
                Some(Payload::Meta(meta)),
                true
            )]
        );
    }

    #[test]
    fn test_metadata_request_relays_inward() {
        let (device, app, _bridge) = pair();
        let (device_cb, device_events) = recorder();
        device.subscribe("", &device_cb, SubscribeOptions::new().with_forward());

        // A subtree request from the application side reaches the inner
        // engine as its own namespace broadcast.
        app.publish("dev0/$", None, false, None).unwrap();
        assert_eq!(*device_events.borrow(), vec![("$".to_string(), None, false)]);
    }

    #[test]
    fn test_retained_state_replays_at_construction() {
        let device = Rc::new(PubSub::new(""));
        let app = Rc::new(PubSub::new("ui"));
        device.publish_value("fw/version", 0x0102_0003u32, true).unwrap();
        app.publish_value("dev0/ctrl/rate", 4u32, true).unwrap();

        let _bridge = Bridge::new(Rc::clone(&device), Rc::clone(&app), "dev0");

        // Both sides converged without any explicit publish.
        assert_eq!(
            app.get("dev0/fw/version").unwrap(),
            Some(Payload::Value(Value::U32(0x0102_0003)))
        );
        assert_eq!(
            device.get("ctrl/rate").unwrap(),
            Some(Payload::Value(Value::U32(4)))
        );
    }

    #[test]
    fn test_prefixed_accessors() {
        let (device, _app, bridge) = pair();

        bridge
            .publish("ctrl/rate", Some(Payload::Value(Value::U32(9))), true)
            .unwrap();
        assert_eq!(
            device.get("ctrl/rate").unwrap(),
            Some(Payload::Value(Value::U32(9)))
        );
        assert_eq!(
            bridge.get("ctrl/rate").unwrap(),
            Some(Payload::Value(Value::U32(9)))
        );

        let (callback, events) = recorder();
        let handle = bridge.subscribe("status", callback, SubscribeOptions::new());
        device.publish_value("status/led", 1u8, false).unwrap();
        // The wrapper stripped the bridge prefix.
        assert_eq!(events.borrow()[0].0, "status/led");

        bridge.unsubscribe("status", handle.id());
        device.publish_value("status/led", 0u8, false).unwrap();
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_detach_stops_relaying() {
        let (device, app, bridge) = pair();
        bridge.detach();
        device.publish_value("status/led", 1u8, true).unwrap();
        assert!(app.get("dev0/status/led").is_err());
    }

    #[test]
    fn test_prefix_normalization() {
        let device = Rc::new(PubSub::new(""));
        let app = Rc::new(PubSub::new(""));
        let bridge = Bridge::new(Rc::clone(&device), Rc::clone(&app), "dev0/");
        assert_eq!(bridge.prefix(), "dev0/");

        device.publish_value("x", 1u8, true).unwrap();
        assert_eq!(app.get("dev0/x").unwrap(), Some(Payload::Value(Value::U8(1))));
    }
}
