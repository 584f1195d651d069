//! Event bus fan-out and callback isolation.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::eyre;
use common::*;
use tokio::runtime::Handle;

use rulebridge::bus::EventBus;
use rulebridge::config::ExecutorConfig;
use rulebridge::connection::ConnectionState;
use rulebridge::events::{Event, EventFilter, EventKind, ERRORS_TOPIC};
use rulebridge::executor::{CallbackExecutor, WrappedCallback};
use rulebridge::runtime::Runtime;

fn bus() -> EventBus {
    EventBus::new(CallbackExecutor::new(
        &ExecutorConfig::default(),
        Handle::current(),
    ))
}

fn state(name: &str, value: &str) -> Event {
    Event::ItemState {
        name: name.to_string(),
        value: Some(value.to_string()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fan_out_to_matching_listeners() {
    let bus = bus();
    let exact = Recorder::new();
    let glob = Recorder::new();
    let other = Recorder::new();
    bus.add_listener("items/Light", exact.callback("exact"), EventFilter::Any);
    bus.add_listener("items/*", glob.callback("glob"), EventFilter::Any);
    bus.add_listener("things/*", other.callback("other"), EventFilter::Any);

    assert_eq!(bus.publish("items/Light", state("Light", "ON")), 2);
    assert_eq!(bus.publish("items/Door", state("Door", "OPEN")), 1);
    bus.executor().wait_idle().await;

    assert_eq!(exact.len(), 1);
    assert_eq!(glob.len(), 2);
    assert_eq!(other.len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_type_filter_limits_delivery() {
    let bus = bus();
    let changes = Recorder::new();
    bus.add_listener(
        "items/Light",
        changes.callback("changes"),
        EventKind::ItemStateChanged,
    );

    bus.publish("items/Light", state("Light", "ON"));
    bus.publish(
        "items/Light",
        Event::ItemStateChanged {
            name: "Light".to_string(),
            value: Some("ON".to_string()),
            old_value: None,
        },
    );
    bus.executor().wait_idle().await;

    let events = changes.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventKind::ItemStateChanged);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_callback_is_isolated() {
    let bus = bus();
    let healthy = Recorder::new();
    let errors = Recorder::new();
    bus.add_listener(
        "items/Light",
        WrappedCallback::sync("rule.broken", |_: &Event| Err(eyre!("division by zero"))),
        EventFilter::Any,
    );
    bus.add_listener(
        "items/Light",
        WrappedCallback::sync("rule.panics", |_: &Event| panic!("boom")),
        EventFilter::Any,
    );
    bus.add_listener("items/Light", healthy.callback("rule.healthy"), EventFilter::Any);
    bus.add_listener(ERRORS_TOPIC, errors.callback("error log"), EventKind::Error);

    bus.publish("items/Light", state("Light", "ON"));
    let reported = errors.wait_for(2).await;
    bus.executor().wait_idle().await;

    assert_eq!(healthy.len(), 1);
    let mut sources: Vec<String> = reported
        .iter()
        .map(|event| match event {
            Event::Error(error) => error.source_name.clone(),
            other => panic!("unexpected event {}", other),
        })
        .collect();
    sources.sort();
    assert_eq!(sources, vec!["rule.broken", "rule.panics"]);

    let broken = reported
        .iter()
        .find_map(|event| match event {
            Event::Error(error) if error.source_name == "rule.broken" => Some(error.clone()),
            _ => None,
        })
        .unwrap();
    assert!(broken.error_description.contains("division by zero"));
    assert!(!broken.formatted_trace.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_error_listener_does_not_loop() {
    let bus = bus();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    bus.add_listener(
        ERRORS_TOPIC,
        WrappedCallback::sync("error handler", move |_: &Event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(eyre!("error handler failed"))
        }),
        EventFilter::Any,
    );
    bus.add_listener(
        "items/*",
        WrappedCallback::sync("rule", |_: &Event| Err(eyre!("rule failed"))),
        EventFilter::Any,
    );

    bus.publish("items/A", state("A", "1"));
    eventually("error handler called", || calls.load(Ordering::SeqCst) == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.executor().wait_idle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_callbacks_are_dispatched() {
    let bus = bus();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    bus.add_listener(
        "items/*",
        WrappedCallback::from_async("async rule", move |_event: Event| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
        EventFilter::Any,
    );

    for i in 0..5 {
        bus.publish("items/A", state("A", &i.to_string()));
    }
    bus.executor().wait_idle().await;
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removed_listeners_receive_nothing() {
    let bus = bus();
    let first = Recorder::new();
    let second = Recorder::new();
    let a = bus.add_listener("items/*", first.callback("first"), EventFilter::Any);
    let b = bus.add_listener("items/*", second.callback("second"), EventFilter::Any);

    assert!(bus.remove_listener(a));
    assert!(!bus.remove_listener(a));
    bus.publish("items/A", state("A", "1"));
    bus.executor().wait_idle().await;
    assert_eq!(first.len(), 0);
    assert_eq!(second.len(), 1);

    assert_eq!(bus.remove_listeners(&[a, b]), 1);
    assert_eq!(bus.listener_count(), 0);
    assert_eq!(bus.publish("items/A", state("A", "2")), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_callback_can_write_through_blocking_client() {
    let peer = MockPeer::online(&[item_state_frame("Switch", "ON")]);
    let runtime = Runtime::builder(test_config(BASE_URL))
        .session_factory(peer.factory())
        .start();

    let client = runtime.client().blocking();
    let done = Arc::new(AtomicUsize::new(0));
    let finished = done.clone();
    runtime.bus().add_listener(
        "items/Switch",
        WrappedCallback::sync("mirror", move |event: &Event| {
            if let Event::ItemState { value: Some(value), .. } = event {
                client.post_update("Mirror", value)?;
                finished.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }),
        EventKind::ItemState,
    );

    wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
    eventually("mirror callback", || done.load(Ordering::SeqCst) == 1).await;

    let puts = peer.client.requests_with_method("PUT");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].url, url("/rest/items/Mirror/state"));
    assert_eq!(puts[0].body.as_deref(), Some("ON"));

    runtime.shutdown().await;
}
