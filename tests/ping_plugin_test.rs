//! The ping plugin on a live connection.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;

use rulebridge::config::PingConfig;
use rulebridge::connection::ConnectionState;
use rulebridge::plugins::PingPlugin;
use rulebridge::runtime::Runtime;
use rulebridge::traits::ConnectionPlugin;

fn ping_config() -> PingConfig {
    PingConfig {
        enabled: true,
        item: "Bridge_Ping".to_string(),
        interval_secs: 1,
    }
}

fn ping_puts(peer: &MockPeer) -> Vec<String> {
    peer.client
        .requests_with_method("PUT")
        .into_iter()
        .filter(|r| r.url == url("/rest/items/Bridge_Ping/state"))
        .filter_map(|r| r.body)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_posts_null_before_first_measurement() {
    let peer = MockPeer::online(&[]);
    let plugin = Arc::new(PingPlugin::new(ping_config()).with_start_delay(Duration::ZERO));
    let runtime = Runtime::builder(test_config(BASE_URL))
        .session_factory(peer.factory())
        .shared_plugin(plugin.clone())
        .start();

    wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
    eventually("first ping", || !ping_puts(&peer).is_empty()).await;
    assert_eq!(ping_puts(&peer)[0], "NULL");
    assert!(plugin.is_running());

    runtime.shutdown().await;
    assert!(!plugin.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_measures_echo() {
    let peer = MockPeer::online(&[]);
    let plugin = Arc::new(PingPlugin::new(ping_config()).with_start_delay(Duration::ZERO));
    let runtime = Runtime::builder(test_config(BASE_URL))
        .session_factory(peer.factory())
        .shared_plugin(plugin.clone())
        .start();

    wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
    eventually("first ping", || !ping_puts(&peer).is_empty()).await;

    // echo of the posted state as the event stream would deliver it
    runtime.bus().publish(
        "items/Bridge_Ping",
        rulebridge::events::Event::ItemState {
            name: "Bridge_Ping".to_string(),
            value: None,
        },
    );
    runtime.executor().wait_idle().await;
    assert!(plugin.last_rtt_ms().is_some());

    eventually("second ping", || ping_puts(&peer).len() >= 2).await;
    assert_ne!(ping_puts(&peer)[1], "NULL");

    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_ignores_unrelated_update() {
    let peer = MockPeer::online(&[]);
    let plugin = Arc::new(PingPlugin::new(ping_config()).with_start_delay(Duration::ZERO));
    let runtime = Runtime::builder(test_config(BASE_URL))
        .session_factory(peer.factory())
        .shared_plugin(plugin.clone())
        .start();

    wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
    eventually("first ping", || !ping_puts(&peer).is_empty()).await;

    // someone else writes the ping item before our NULL comes back
    runtime.bus().publish(
        "items/Bridge_Ping",
        rulebridge::events::Event::ItemState {
            name: "Bridge_Ping".to_string(),
            value: Some("999.0".to_string()),
        },
    );
    runtime.executor().wait_idle().await;
    assert_eq!(plugin.last_rtt_ms(), None);

    runtime.bus().publish(
        "items/Bridge_Ping",
        rulebridge::events::Event::ItemState {
            name: "Bridge_Ping".to_string(),
            value: None,
        },
    );
    runtime.executor().wait_idle().await;
    assert!(plugin.last_rtt_ms().is_some());

    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disabled_ping_does_nothing() {
    let peer = MockPeer::online(&[]);
    let mut config = ping_config();
    config.enabled = false;
    let plugin = Arc::new(PingPlugin::new(config).with_start_delay(Duration::ZERO));
    let runtime = Runtime::builder(test_config(BASE_URL))
        .session_factory(peer.factory())
        .shared_plugin(plugin.clone())
        .start();

    wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ping_puts(&peer).is_empty());
    assert!(!plugin.is_running());
    assert_eq!(runtime.bus().listener_count(), 0);
    assert_eq!(plugin.name(), "ping");

    runtime.shutdown().await;
}
