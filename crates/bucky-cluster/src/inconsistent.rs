// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Detection of metrics stored on a node other than their hash ring owner.
//!
//! Misplaced metrics are reported under the node they were *observed* on, not
//! the node that should own them. The report therefore reads as "what has to be
//! moved off each node", which is the shape rebalance planning consumes.

use std::collections::BTreeMap;
use std::time::Instant;

use bucky_core::{split_host_port, Result, DEFAULT_HOUSEKEEPING_PREFIX};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{MetricCatalog, MetricSelection, MetricsByNode};
use crate::topology::Cluster;

/// Decides which housekeeping metrics to leave out of consistency checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HousekeepingFilter {
    exclude: bool,
    prefix: String,
}

impl Default for HousekeepingFilter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl HousekeepingFilter {
    /// Checks every metric.
    #[must_use]
    pub fn disabled() -> Self {
        Self { exclude: false, prefix: DEFAULT_HOUSEKEEPING_PREFIX.to_string() }
    }

    /// Skips metrics starting with `prefix`.
    #[must_use]
    pub fn excluding(prefix: impl Into<String>) -> Self {
        Self { exclude: true, prefix: prefix.into() }
    }

    /// Builds a filter from the exclusion toggle and prefix.
    #[must_use]
    pub fn new(exclude: bool, prefix: impl Into<String>) -> Self {
        Self { exclude, prefix: prefix.into() }
    }

    /// Returns whether `metric` is skipped.
    #[must_use]
    pub fn skips(&self, metric: &str) -> bool {
        self.exclude && metric.starts_with(&self.prefix)
    }
}

/// Misplaced metrics per observed node, sorted by name within each node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InconsistencyReport(BTreeMap<String, Vec<String>>);

impl InconsistencyReport {
    /// Returns true when nothing is misplaced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the total number of misplaced metrics.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Returns the misplaced metrics observed on `node`.
    #[must_use]
    pub fn get(&self, node: &str) -> Option<&[String]> {
        self.0.get(node).map(Vec::as_slice)
    }

    /// Iterates over `(observed node, misplaced metrics)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(node, metrics)| (node.as_str(), metrics.as_slice()))
    }

    /// Iterates over every `(observed node, metric)` pair.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().flat_map(|(node, metrics)| metrics.iter().map(move |m| (node, m.as_str())))
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl From<BTreeMap<String, Vec<String>>> for InconsistencyReport {
    fn from(mut map: BTreeMap<String, Vec<String>>) -> Self {
        map.retain(|_, metrics| !metrics.is_empty());
        for metrics in map.values_mut() {
            metrics.sort();
        }
        Self(map)
    }
}

/// Finds metrics whose observed node disagrees with `cluster`'s ring.
///
/// Nodes are compared by host only, so a metric on any port of its owner's
/// host counts as correctly placed.
///
/// # Errors
///
/// Returns [`bucky_core::Error::MalformedAddress`] if any catalog key is not a
/// valid `host:port`. The whole pass is aborted: an address that cannot be
/// parsed means the catalog cannot be trusted.
pub fn detect(
    cluster: &Cluster,
    metrics_by_node: &MetricsByNode,
    filter: &HousekeepingFilter,
) -> Result<InconsistencyReport> {
    let mut results: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (server, metrics) in metrics_by_node {
        let (host, _) = split_host_port(server)?;

        for metric in metrics {
            if filter.skips(metric) {
                continue;
            }
            if cluster.owner_of(metric).host() != host {
                results.entry(server.clone()).or_default().push(metric.clone());
            }
        }
    }

    Ok(InconsistencyReport::from(results))
}

/// Lists `cluster`'s catalog and runs [`detect`] over it.
///
/// # Errors
///
/// Returns the catalog's error if listing fails, or the error from [`detect`].
pub async fn find_inconsistencies<C>(
    cluster: &Cluster,
    catalog: &C,
    selection: &MetricSelection,
    force_rebuild: bool,
    filter: &HousekeepingFilter,
) -> Result<InconsistencyReport>
where
    C: MetricCatalog + ?Sized,
{
    if !cluster.is_healthy() {
        warn!(seed = %cluster.seed(), "Cluster is not healthy, results may be incomplete");
    }

    let metrics = selection.fetch(catalog, &cluster.host_ports(), force_rebuild).await?;

    info!("Hashing...");
    let started = Instant::now();
    let report = detect(cluster, &metrics, filter)?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Hashing complete");

    for (node, misplaced) in report.iter() {
        info!(node = %node, count = misplaced.len(), "Inconsistent metrics found");
    }
    if report.is_empty() {
        info!("No inconsistent metrics found");
    }

    Ok(report)
}
