//! Registry actor behaviour over time
//!
//! These tests verify that:
//! - Liveness follows the injected clock at the timeout boundary
//! - GC removes stale nodes and cascades to their connections
//! - The connection cap holds and evicts the oldest edges
//! - Stats only average online nodes

use chrono::Duration;
use meshmap::{
    model::SelfReportedStatus,
    store::{NodeStatus, RegistrySettings, StoreError},
};
use pretty_assertions::assert_eq;

use crate::helpers::{create_test_snapshot, located_snapshot, spawn_registry, start_time};

#[tokio::test]
async fn test_node_lifecycle_scenario() {
    let (registry, clock) = spawn_registry(RegistrySettings::default());
    registry
        .ingest(create_test_snapshot("node-a", &["node-b"]))
        .await
        .unwrap();

    clock.set(start_time() + Duration::seconds(119));
    let node = registry.get_node("node-a").await.unwrap();
    assert_eq!(node.status, NodeStatus::Online);

    clock.set(start_time() + Duration::seconds(121));
    let node = registry.get_node("node-a").await.unwrap();
    assert_eq!(node.status, NodeStatus::Offline);

    // node-b stays fresh so only node-a ages out
    clock.set(start_time() + Duration::seconds(86_400));
    registry
        .ingest(create_test_snapshot("node-b", &[]))
        .await
        .unwrap();

    clock.set(start_time() + Duration::seconds(86_521));
    let nodes = registry.list_nodes().await.unwrap();
    let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["node-b"]);

    assert!(registry.list_connections().await.unwrap().is_empty());
    assert_eq!(registry.status().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_warning_is_kept_until_timeout() {
    let (registry, clock) = spawn_registry(RegistrySettings::default());
    let mut snapshot = create_test_snapshot("node-a", &[]);
    snapshot.status = SelfReportedStatus::Warning;
    registry.ingest(snapshot).await.unwrap();

    clock.advance(Duration::seconds(50));

    let node = registry.get_node("node-a").await.unwrap();
    assert_eq!(node.status, NodeStatus::Warning);
    assert_eq!(node.seconds_since_seen, 50);
    assert_eq!(node.last_seen, "50s ago");
}

#[tokio::test]
async fn test_connection_cap_evicts_oldest() {
    let settings = RegistrySettings {
        max_connections: 3,
        ..Default::default()
    };
    let (registry, clock) = spawn_registry(settings);

    for name in ["hub", "p1", "p2", "p3", "p4", "p5"] {
        registry.ingest(create_test_snapshot(name, &[])).await.unwrap();
    }
    for peer in ["p1", "p2", "p3", "p4", "p5"] {
        clock.advance(Duration::seconds(1));
        registry
            .ingest(create_test_snapshot("hub", &[peer]))
            .await
            .unwrap();
    }

    let status = registry.status().await.unwrap();
    assert_eq!(status.connections, 3);

    let mut targets: Vec<_> = registry
        .list_connections()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.target_node)
        .collect();
    targets.sort();
    assert_eq!(targets, vec!["p3", "p4", "p5"]);
}

#[tokio::test]
async fn test_directed_edges_without_dedup() {
    let settings = RegistrySettings {
        dedup_connections: false,
        ..Default::default()
    };
    let (registry, _clock) = spawn_registry(settings);

    registry
        .ingest(create_test_snapshot("a", &["b"]))
        .await
        .unwrap();
    registry
        .ingest(create_test_snapshot("b", &["a"]))
        .await
        .unwrap();

    assert_eq!(registry.list_connections().await.unwrap().len(), 2);
    let reverse = registry.get_connection("b", "a").await.unwrap();
    assert_eq!(reverse.source_node, "b");
}

#[tokio::test]
async fn test_reverse_reports_collapse_with_dedup() {
    let (registry, _clock) = spawn_registry(RegistrySettings::default());

    registry
        .ingest(create_test_snapshot("a", &["b"]))
        .await
        .unwrap();
    registry
        .ingest(create_test_snapshot("b", &["a"]))
        .await
        .unwrap();

    assert_eq!(registry.list_connections().await.unwrap().len(), 1);
    assert!(registry.get_connection("a", "b").await.is_ok());
    assert!(registry.get_connection("b", "a").await.is_ok());
}

#[tokio::test]
async fn test_stats_average_online_nodes_only() {
    let (registry, clock) = spawn_registry(RegistrySettings::default());

    let mut stale = located_snapshot("stale", 41.26, -95.86, "gcp");
    stale.metrics.cpu_percent = Some(99.0);
    registry.ingest(stale).await.unwrap();

    clock.advance(Duration::seconds(200));

    let mut busy = located_snapshot("busy", 37.33, -121.88, "oracle");
    busy.metrics.cpu_percent = Some(80.0);
    busy.status = SelfReportedStatus::Warning;
    registry.ingest(busy).await.unwrap();

    let mut calm = located_snapshot("calm", 37.33, -121.88, "oracle");
    calm.metrics.cpu_percent = Some(20.0);
    registry.ingest(calm).await.unwrap();

    let stats = registry.stats().await.unwrap();

    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.online_nodes, 1);
    assert_eq!(stats.warning_nodes, 1);
    assert_eq!(stats.offline_nodes, 1);
    assert_eq!(stats.avg_cpu_percent, 20.0);
    assert_eq!(stats.providers.get("oracle"), Some(&2));
    assert_eq!(stats.providers.get("gcp"), Some(&1));
}

#[tokio::test]
async fn test_unknown_names_are_not_found() {
    let (registry, _clock) = spawn_registry(RegistrySettings::default());

    assert!(matches!(
        registry.get_node("ghost").await,
        Err(StoreError::NodeNotFound(_))
    ));
    assert!(matches!(
        registry.remove_node("ghost").await,
        Err(StoreError::NodeNotFound(_))
    ));
    assert!(matches!(
        registry.get_connection("ghost", "other").await,
        Err(StoreError::ConnectionNotFound { .. })
    ));
}
