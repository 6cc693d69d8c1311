//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Agents can push snapshots and read them back
//! - Invalid payloads are rejected with 400 and change nothing
//! - Unknown resources return 404 with an error body
//! - Connections carry both endpoints' coordinates
//! - Manual GC and the health endpoint report registry state

use std::net::SocketAddr;

use axum::http::StatusCode;
use chrono::Duration;
use meshmap::{
    actors::RegistryHandle,
    api::{
        ApiConfig, ApiState, ConnectionsResponse, HealthResponse, IngestResponse, NodesResponse,
        RemoveNodeResponse, spawn_api_server,
    },
    clock::{Clock, ManualClock},
    store::{ClusterStats, ConnectionView, NodeStatus, NodeView, RegistrySettings, SweepReport},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::helpers::{create_test_snapshot, located_snapshot, spawn_registry};

struct TestApi {
    base: String,
    clock: ManualClock,
    registry: RegistryHandle,
    client: reqwest::Client,
}

impl TestApi {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(body).send().await.unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }
}

async fn spawn_test_api(settings: RegistrySettings) -> TestApi {
    spawn_test_api_with_cors(settings, true).await
}

async fn spawn_test_api_with_cors(settings: RegistrySettings, enable_cors: bool) -> TestApi {
    let (registry, clock) = spawn_registry(settings);
    let state = ApiState::new(registry.clone());

    let config = ApiConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)), // Random port
        enable_cors,
    };
    let addr = spawn_api_server(config, state).await.unwrap();

    TestApi {
        base: format!("http://{addr}"),
        clock,
        registry,
        client: reqwest::Client::new(),
    }
}

fn node_payload(name: &str) -> Value {
    serde_json::to_value(create_test_snapshot(name, &[])).unwrap()
}

#[tokio::test]
async fn test_ingest_and_read_back() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    let response = api
        .post_json(
            "/api/v1/nodes",
            &json!({
                "name": "michael-pi",
                "hostname": "michael-pi",
                "internal_ip": "192.168.1.10",
                "lat": 52.52,
                "lon": 13.405,
                "location": "Berlin, Germany (Home)",
                "provider": "raspberry-pi",
                "metrics": { "cpu_percent": 12.5, "memory_percent": 40.0 },
                "system": { "architecture": "aarch64", "network_interfaces": ["eth0", "lo"] },
                "timestamp": 1.0
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: IngestResponse = response.json().await.unwrap();
    assert_eq!(body.status, "success");
    assert!(body.report.created);
    assert_eq!(body.report.received_at, api.clock.now());

    let node: NodeView = api.get("/api/v1/nodes/michael-pi").await.json().await.unwrap();
    assert_eq!(node.status, NodeStatus::Online);
    assert_eq!(node.internal_ip.as_deref(), Some("192.168.1.10"));
    assert_eq!(node.metrics.cpu_percent, Some(12.5));
    assert_eq!(node.system.network_interfaces, vec!["eth0", "lo"]);
    assert_eq!(node.last_seen_at, api.clock.now());

    let nodes: NodesResponse = api.get("/api/v1/nodes").await.json().await.unwrap();
    assert_eq!(nodes.count, 1);
}

#[tokio::test]
async fn test_offline_after_timeout() {
    let api = spawn_test_api(RegistrySettings::default()).await;
    api.post_json("/api/v1/nodes", &node_payload("node-a")).await;

    api.clock.advance(Duration::seconds(120));

    let body: Value = api.get("/api/v1/nodes/node-a").await.json().await.unwrap();
    assert_eq!(body["status"], "offline");
    assert_eq!(body["self_reported_status"], "online");
    assert_eq!(body["last_seen"], "2m ago");
}

#[tokio::test]
async fn test_invalid_payloads_are_rejected() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    let cases = [
        json!({ "name": "", "hostname": "h" }),
        json!({ "name": "bad name!", "hostname": "h" }),
        json!({ "name": "a", "hostname": "h", "lat": 95.0, "lon": 0.0 }),
        json!({ "name": "a", "hostname": "h", "lat": 10.0 }),
        json!({ "name": "a", "hostname": "h", "status": "offline" }),
        json!({ "name": "a", "hostname": "h", "metrics": { "cpu_percent": 140.0 } }),
        json!({ "name": "a", "hostname": "h",
                "connections": [{ "target_node": "a", "latency_ms": 1.0 }] }),
        json!({ "name": "a", "hostname": "h",
                "connections": [{ "target_node": "b", "latency_ms": -1.0 }] }),
        json!({ "hostname": "missing-name" }),
    ];

    for payload in &cases {
        let response = api.post_json("/api/v1/nodes", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload: {payload}");

        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let response = api
        .client
        .post(api.url("/api/v1/nodes"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(api.registry.status().await.unwrap().nodes, 0);
}

#[tokio::test]
async fn test_missing_resources_are_404() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    for path in [
        "/api/v1/nodes/ghost",
        "/api/v1/connections/ghost/other",
    ] {
        let response = api.get(path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    let response = api
        .client
        .delete(api.url("/api/v1/nodes/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connections_carry_coordinates() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    let mut pi = located_snapshot("michael-pi", 52.52, 13.405, "raspberry-pi");
    pi.connections = vec![crate::helpers::measurement("toby-gcp1", 110.0)];
    let gcp = located_snapshot("toby-gcp1", 41.2619, -95.8608, "gcp");

    api.post_json("/api/v1/nodes", &serde_json::to_value(pi).unwrap())
        .await;

    // the edge stays hidden until its target reports
    let connections: ConnectionsResponse =
        api.get("/api/v1/connections").await.json().await.unwrap();
    assert_eq!(connections.count, 0);

    api.post_json("/api/v1/nodes", &serde_json::to_value(gcp).unwrap())
        .await;

    let connections: ConnectionsResponse =
        api.get("/api/v1/connections").await.json().await.unwrap();
    assert_eq!(connections.count, 1);

    let edge = &connections.connections[0];
    assert_eq!(edge.source_node, "michael-pi");
    assert_eq!(edge.latency_avg_ms, 110.0);
    assert_eq!(edge.source_lat, Some(52.52));
    assert_eq!(edge.target_lon, Some(-95.8608));

    let reverse: ConnectionView = api
        .get("/api/v1/connections/toby-gcp1/michael-pi")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(&reverse, edge);
}

#[tokio::test]
async fn test_delete_cascades() {
    let api = spawn_test_api(RegistrySettings::default()).await;
    api.post_json(
        "/api/v1/nodes",
        &serde_json::to_value(create_test_snapshot("a", &["b"])).unwrap(),
    )
    .await;
    api.post_json("/api/v1/nodes", &node_payload("b")).await;

    let response = api
        .client
        .delete(api.url("/api/v1/nodes/a"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: RemoveNodeResponse = response.json().await.unwrap();
    assert_eq!(body.removal.node, "a");
    assert_eq!(body.removal.connections_removed, 1);

    let connections: ConnectionsResponse =
        api.get("/api/v1/connections").await.json().await.unwrap();
    assert_eq!(connections.count, 0);
    assert_eq!(
        api.get("/api/v1/connections/a/b").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_stats_endpoint() {
    let api = spawn_test_api(RegistrySettings::default()).await;
    let mut warm = create_test_snapshot("warm", &[]);
    warm.metrics.cpu_percent = Some(95.0);
    warm.status = meshmap::model::SelfReportedStatus::Warning;

    api.post_json("/api/v1/nodes", &node_payload("cool")).await;
    api.post_json("/api/v1/nodes", &serde_json::to_value(warm).unwrap())
        .await;

    let stats: ClusterStats = api.get("/api/v1/stats").await.json().await.unwrap();

    assert_eq!(stats.total_nodes, 2);
    assert_eq!(stats.online_nodes, 1);
    assert_eq!(stats.warning_nodes, 1);
    assert_eq!(stats.avg_cpu_percent, 25.0);
    assert_eq!(stats.providers.get("unknown"), Some(&2));
}

#[tokio::test]
async fn test_manual_gc() {
    let api = spawn_test_api(RegistrySettings::default()).await;
    api.post_json("/api/v1/nodes", &node_payload("old")).await;

    api.clock.advance(Duration::seconds(120 + 86_400 + 1));

    let response = api.client.post(api.url("/api/v1/gc")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report: SweepReport = response.json().await.unwrap();
    assert_eq!(report.nodes_removed, vec!["old".to_string()]);

    let health: HealthResponse = api.get("/api/v1/health").await.json().await.unwrap();
    assert_eq!(health.status, "running");
    assert_eq!(health.nodes_count, 0);
    assert_eq!(health.last_gc, Some(api.clock.now()));
}

#[tokio::test]
async fn test_cors_headers() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    let response = api
        .client
        .get(api.url("/api/v1/health"))
        .header("origin", "http://dashboard.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let api = spawn_test_api_with_cors(RegistrySettings::default(), false).await;

    let response = api
        .client
        .get(api.url("/api/v1/health"))
        .header("origin", "http://dashboard.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_invalid_connection_target_rejected() {
    let api = spawn_test_api(RegistrySettings::default()).await;

    let mut payload = node_payload("node-a");
    payload["connections"] = json!([{ "target_node": "bad name!", "latency_ms": 4.0 }]);
    let response = api.post_json("/api/v1/nodes", &payload).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let status = api.registry.status().await.unwrap();
    assert_eq!(status.nodes, 0);
    assert_eq!(status.connections, 0);
}
