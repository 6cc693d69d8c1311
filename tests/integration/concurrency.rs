//! Concurrent access to the registry actor
//!
//! These tests verify that:
//! - Concurrent ingests from many agents all land
//! - The connection cap holds under concurrent writers
//! - Readers never observe an edge whose endpoint was removed

use meshmap::store::RegistrySettings;

use crate::helpers::{create_test_snapshot, spawn_registry};

#[tokio::test]
async fn test_concurrent_ingests() {
    let (registry, _clock) = spawn_registry(RegistrySettings::default());

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let peer = format!("node-{}", (i + 1) % 50);
                registry
                    .ingest(create_test_snapshot(&format!("node-{i}"), &[peer.as_str()]))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let status = registry.status().await.unwrap();
    assert_eq!(status.nodes, 50);
    assert_eq!(status.connections, 50);
    assert_eq!(registry.list_connections().await.unwrap().len(), 50);
}

#[tokio::test]
async fn test_cap_holds_under_concurrent_writers() {
    let settings = RegistrySettings {
        max_connections: 10,
        ..Default::default()
    };
    let (registry, _clock) = spawn_registry(settings);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let peers: Vec<String> = (0..5).map(|p| format!("peer-{i}-{p}")).collect();
                let peers: Vec<&str> = peers.iter().map(String::as_str).collect();
                registry
                    .ingest(create_test_snapshot(&format!("node-{i}"), &peers))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
        assert!(registry.status().await.unwrap().connections <= 10);
    }

    assert_eq!(registry.status().await.unwrap().connections, 10);
}

#[tokio::test]
async fn test_removal_is_atomic_for_readers() {
    let (registry, _clock) = spawn_registry(RegistrySettings::default());
    for i in 0..10 {
        let peers: Vec<String> = (0..10)
            .filter(|p| *p != i)
            .map(|p| format!("node-{p}"))
            .collect();
        let peers: Vec<&str> = peers.iter().map(String::as_str).collect();
        registry
            .ingest(create_test_snapshot(&format!("node-{i}"), &peers))
            .await
            .unwrap();
    }

    let remover = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for i in 0..5 {
                registry.remove_node(&format!("node-{i}")).await.unwrap();
            }
        })
    };

    for _ in 0..20 {
        let connections = registry.list_connections().await.unwrap();
        assert!(connections.len() <= 45);
    }

    remover.await.unwrap();

    let connections = registry.list_connections().await.unwrap();
    assert_eq!(connections.len(), 10);
    for connection in connections {
        for endpoint in [&connection.source_node, &connection.target_node] {
            assert!(registry.get_node(endpoint).await.is_ok());
        }
    }
    assert_eq!(registry.status().await.unwrap().connections, 10);
}
