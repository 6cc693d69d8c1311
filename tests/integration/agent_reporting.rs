//! Agent push tests
//!
//! These tests verify that:
//! - The agent POSTs its snapshot as JSON to the collector
//! - Non-2xx answers and unreachable collectors surface as errors
//! - A full report is accepted by a real collector

use meshmap::{agent::Reporter, config::AgentConfig};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

use crate::helpers::create_test_snapshot;

fn config_for(url: &str) -> AgentConfig {
    let mut config = AgentConfig::new("pi-1");
    config.collector_url = url.to_string();
    config.provider = Some("raspberry-pi".to_string());
    config
}

#[tokio::test]
async fn test_send_posts_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/nodes"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({ "name": "pi-1", "hostname": "pi-1.local" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let reporter = Reporter::new(config_for(&server.uri())).unwrap();
    reporter
        .send(&create_test_snapshot("pi-1", &["pi-2"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/nodes"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "bad" })))
        .mount(&server)
        .await;

    let reporter = Reporter::new(config_for(&server.uri())).unwrap();
    let err = reporter
        .send(&create_test_snapshot("pi-1", &[]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_send_fails_when_collector_is_down() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let reporter = Reporter::new(config_for(&format!("http://{addr}"))).unwrap();

    assert!(reporter.send(&create_test_snapshot("pi-1", &[])).await.is_err());
}

#[tokio::test]
async fn test_report_once_sends_collected_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/nodes"))
        .and(body_partial_json(json!({ "name": "pi-1", "provider": "raspberry-pi" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut reporter = Reporter::new(config_for(&server.uri())).unwrap();
    reporter.report_once().await.unwrap();
}

#[cfg(feature = "api")]
#[tokio::test]
async fn test_report_accepted_by_collector() {
    use std::net::SocketAddr;

    use meshmap::{
        api::{ApiConfig, ApiState, spawn_api_server},
        store::RegistrySettings,
    };

    let (registry, _clock) = crate::helpers::spawn_registry(RegistrySettings::default());
    let config = ApiConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        enable_cors: false,
    };
    let addr = spawn_api_server(config, ApiState::new(registry.clone()))
        .await
        .unwrap();

    let mut reporter = Reporter::new(config_for(&format!("http://{addr}"))).unwrap();
    reporter.report_once().await.unwrap();

    let node = registry.get_node("pi-1").await.unwrap();
    assert_eq!(node.provider.as_deref(), Some("raspberry-pi"));
}
