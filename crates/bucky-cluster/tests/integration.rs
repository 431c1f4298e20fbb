// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! End-to-end tests: resolve, detect, plan and sync over in-memory nodes.

use std::sync::Arc;

use bucky_cluster::testing::{InMemoryCatalog, InMemoryStore, StaticMembership};
use bucky_cluster::{
    find_inconsistencies, Cluster, HousekeepingFilter, MetricMapping, MetricSelection,
    PlanRequest, Planner, RingDescription, SyncConfig, SyncExecutor,
};

fn membership(port: u16, hosts: &[&str]) -> StaticMembership {
    let nodes: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
    let description = RingDescription::carbon(hosts[0], nodes);
    hosts.iter().fold(StaticMembership::new(), |membership, host| {
        membership.with_node(format!("{host}:{port}"), description.clone())
    })
}

fn catalog_of(store: &InMemoryStore) -> InMemoryCatalog {
    store.metrics_by_node().into_iter().fold(InMemoryCatalog::new(), |catalog, (node, metrics)| {
        catalog.with_metrics(node, metrics)
    })
}

#[tokio::test]
async fn test_rebalance_fixes_inconsistencies() {
    let membership = membership(4242, &["graphite-a", "graphite-b", "graphite-c"]);
    let cluster = Cluster::resolve("graphite-a:4242", &membership).await.unwrap();
    assert!(cluster.is_healthy());

    let store = Arc::new(InMemoryStore::new());
    store.insert("graphite-a:4242", "x.y.z", b"xyz".to_vec());
    store.insert("graphite-a:4242", "foo.bar.baz", b"foo".to_vec());
    store.insert("graphite-b:4242", "new.metric", b"new".to_vec());
    store.insert("graphite-c:4242", "servers.web01.cpu.user", b"cpu".to_vec());
    store.insert("graphite-b:4242", "carbon.agents.host-a.cache.size", b"1".to_vec());

    let filter = HousekeepingFilter::excluding("carbon.agents.");
    let catalog = catalog_of(&store);
    let report =
        find_inconsistencies(&cluster, &catalog, &MetricSelection::All, false, &filter)
            .await
            .unwrap();
    assert_eq!(report.metric_count(), 3);
    assert_eq!(report.get("graphite-a:4242").unwrap(), &["x.y.z"]);
    assert_eq!(report.get("graphite-b:4242").unwrap(), &["new.metric"]);
    assert_eq!(report.get("graphite-c:4242").unwrap(), &["servers.web01.cpu.user"]);

    let jobs = Planner::new(&cluster, &cluster, &catalog)
        .plan(&PlanRequest::Rebalance { report })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);

    let executor = SyncExecutor::new(
        SyncConfig { workers: 2, delete_source: true, ..Default::default() },
        Arc::clone(&store),
    );
    let sync = executor.run(&jobs).await.unwrap();
    assert_eq!(sync.copied, 3);
    assert_eq!(store.get("graphite-c:4242", "x.y.z").unwrap(), b"xyz");
    assert_eq!(store.get("graphite-a:4242", "servers.web01.cpu.user").unwrap(), b"cpu");

    let catalog = catalog_of(&store);
    for _ in 0..2 {
        let report =
            find_inconsistencies(&cluster, &catalog, &MetricSelection::All, false, &filter)
                .await
                .unwrap();
        assert!(report.is_empty());
    }
}

#[tokio::test]
async fn test_backfill_between_clusters_with_mapping() {
    let source_membership = membership(4242, &["graphite-a", "graphite-b", "graphite-c"]);
    let destination_membership = membership(2003, &["carbon-1", "carbon-2"]);
    let source = Cluster::resolve("graphite-b:4242", &source_membership).await.unwrap();
    let destination = Cluster::resolve("carbon-1:2003", &destination_membership).await.unwrap();

    let store = Arc::new(InMemoryStore::new());
    store.insert("graphite-c:4242", "old.metric", b"series".to_vec());

    let mapping = MetricMapping::from_json_str(r#"{"old.metric": "new.metric"}"#).unwrap();
    let catalog = InMemoryCatalog::new();
    let jobs = Planner::new(&source, &destination, &catalog)
        .plan(&PlanRequest::ExplicitMapping { mapping })
        .await
        .unwrap();

    let owner = destination.owner_of("new.metric").address();
    assert_eq!(jobs.get(&owner, "graphite-c:4242").unwrap().len(), 1);

    let executor = SyncExecutor::new(SyncConfig::default(), Arc::clone(&store));
    executor.run(&jobs).await.unwrap();
    assert_eq!(store.get(&owner, "new.metric").unwrap(), b"series");
    assert!(store.contains("graphite-c:4242", "old.metric"));

    // A second run overwrites with the same data.
    executor.run(&jobs).await.unwrap();
    assert_eq!(store.get(&owner, "new.metric").unwrap(), b"series");
}

#[tokio::test]
async fn test_regex_backfill_dry_run_leaves_store_untouched() {
    let source_membership = membership(4242, &["graphite-a", "graphite-b"]);
    let destination_membership = membership(2003, &["carbon-1", "carbon-2"]);
    let source = Cluster::resolve("graphite-a:4242", &source_membership).await.unwrap();
    let destination = Cluster::resolve("carbon-1:2003", &destination_membership).await.unwrap();

    let store = Arc::new(InMemoryStore::new());
    store.insert("graphite-a:4242", "foo.one", b"1".to_vec());
    store.insert("graphite-a:4242", "foo.two", b"2".to_vec());
    store.insert("graphite-b:4242", "foo.three", b"3".to_vec());
    store.insert("graphite-b:4242", "bar.one", b"4".to_vec());
    let before = store.snapshot();

    let catalog = catalog_of(&store);
    let jobs = Planner::new(&source, &destination, &catalog)
        .plan(&PlanRequest::RegexSelection { pattern: "^foo\\.".to_string() })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);

    let executor =
        SyncExecutor::new(SyncConfig { dry_run: true, ..Default::default() }, Arc::clone(&store));
    let report = executor.run(&jobs).await.unwrap();

    assert_eq!(report.dry_run, 3);
    assert_eq!(store.transfer_calls(), 0);
    assert_eq!(store.snapshot(), before);
}
