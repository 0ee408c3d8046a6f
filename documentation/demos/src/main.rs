//! Topicbus bridge demo.
//!
//! Simulates the usual two-bus arrangement: a device-side bus that owns
//! its topics, an application-side bus a UI would subscribe to, and the
//! bridge coupling them under the `dev0/` prefix.
//!
//! Run with: cargo run --release
//! Set RUST_LOG=trace to watch the relay traffic.

use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use topicbus::proto::version;
use topicbus::{
    Bridge, Callback, Dtype, MetaFlag, MetaOption, Metadata, Payload, PubSub, SubscribeOptions,
    Value,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The device bus owns its whole namespace; the application bus owns
    // only `ui/`, so everything under `dev0/` relays.
    let device = Rc::new(PubSub::new(""));
    let app = Rc::new(PubSub::new("ui"));

    // The device declares its topics before anything is attached.
    device
        .create(
            "fw/version",
            Some(
                Metadata::new(Dtype::U32)
                    .with_brief("Firmware version")
                    .with_format("version")
                    .with_flag(MetaFlag::Ro)
                    .with_default(version::encode(1, 4, 2))
                    .with_retain(true),
            ),
            None,
            SubscribeOptions::new(),
        )
        .expect("fresh topic");
    device
        .create(
            "port/0/echo/enable",
            Some(
                Metadata::new(Dtype::U8)
                    .with_brief("Echo enable")
                    .with_option(MetaOption::new(0u8).with_label("off"))
                    .with_option(MetaOption::new(1u8).with_label("on"))
                    .with_default(0u8)
                    .with_retain(true),
            ),
            None,
            SubscribeOptions::new(),
        )
        .expect("fresh topic");

    // Couple the buses. Retained device state replays to the app side.
    let bridge = Bridge::new(Rc::clone(&device), Rc::clone(&app), "dev0");

    // A UI-style observer on the application bus.
    let observer = Callback::new(|topic, payload, retain| {
        let rendered = match payload {
            Some(Payload::Value(Value::U32(v))) if topic.ends_with("fw/version") => {
                version::to_string(*v)
            }
            Some(Payload::Value(value)) => format!("{value:?}"),
            Some(Payload::Meta(meta)) => format!("<meta {:?}>", meta.dtype),
            None => "<none>".to_string(),
        };
        println!("[app] {topic} = {rendered} (retain={retain})");
    });
    app.subscribe("dev0", &observer, SubscribeOptions::new().with_forward());

    // The application flips a control; the device observes it.
    let device_log = Callback::new(|topic, payload, _retain| {
        println!("[device] {topic} <- {payload:?}");
    });
    device.subscribe(
        "port",
        &device_log,
        SubscribeOptions::new().with_skip_retained(),
    );
    bridge
        .publish(
            "port/0/echo/enable",
            Some(Payload::Value(Value::U8(1))),
            true,
        )
        .expect("valid option");

    println!(
        "[app] get dev0/port/0/echo/enable -> {:?}",
        bridge.get("port/0/echo/enable").expect("bridged topic")
    );
    println!(
        "[device] get port/0/echo/enable -> {:?}",
        device.get("port/0/echo/enable").expect("own topic")
    );
}
