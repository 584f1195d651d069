//! The reqwest transport against a local HTTP server.

mod common;

use common::*;
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rulebridge::adapters::ReqwestHttpClient;
use rulebridge::config::ConnectionConfig;
use rulebridge::events::{EventKind, TopicLayout};
use rulebridge::runtime::Runtime;
use rulebridge::traits::{Headers, HttpClient, HttpError};

async fn mount_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/uuid"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0d3c5a8e"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "8",
            "runtimeInfo": {"version": "4.1.0", "buildString": "Release Build"},
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/uuid"))
        .and(header("authorization", "Basic cnVsZXM6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0d3c5a8e"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ConnectionConfig::with_url(server.uri());
    config.user = "rules".to_string();
    config.password = "secret".to_string();
    let client = ReqwestHttpClient::from_config(&config).unwrap();

    let response = client
        .get(&format!("{}/rest/uuid", server.uri()), &Headers::new())
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "0d3c5a8e");
}

#[tokio::test]
async fn test_put_sends_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/rest/items/Light/state"))
        .and(header("content-type", "text/plain"))
        .and(body_string("ON"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "text/plain".to_string());
    let response = client
        .put(
            &format!("{}/rest/items/Light/state", server.uri()),
            "ON",
            &headers,
        )
        .await
        .unwrap();
    assert_eq!(response.status, 202);
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/items/Gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let response = client
        .delete(&format!("{}/rest/items/Gone", server.uri()), &Headers::new())
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_stream_yields_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("event: alive\ndata: {}\n\n"),
        )
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let stream = client
        .get_stream(&format!("{}/rest/events", server.uri()), &Headers::new())
        .await
        .unwrap();
    let chunks: Vec<_> = stream.collect().await;
    let body: Vec<u8> = chunks
        .into_iter()
        .flat_map(|chunk| chunk.unwrap().to_vec())
        .collect();
    assert_eq!(body, b"event: alive\ndata: {}\n\n");
}

#[tokio::test]
async fn test_stream_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/events"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let result = client
        .get_stream(&format!("{}/rest/events", server.uri()), &Headers::new())
        .await;
    match result {
        Err(HttpError::ServerError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "starting");
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_runtime_against_http_server() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    let events = format!(
        "event: message\ndata: {}\n\nevent: alive\ndata: {{}}\n\n",
        item_state_frame("Temperature", "21.5")
    );
    Mock::given(method("GET"))
        .and(path("/rest/events"))
        .and(query_param(
            "topics",
            TopicLayout::CURRENT.subscription_topics(),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(events),
        )
        .mount(&server)
        .await;

    let runtime = Runtime::builder(test_config(&server.uri())).start();
    let recorder = Recorder::new();
    runtime.bus().add_listener(
        "items/Temperature",
        recorder.callback("temperature"),
        EventKind::ItemState,
    );

    // the body ends after one frame, so the session cycles; the event still
    // arrives on every pass
    recorder.wait_for(1).await;
    assert_eq!(
        runtime.items().value("Temperature"),
        Some("21.5".to_string())
    );

    runtime.shutdown().await;
}
