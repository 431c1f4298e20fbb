// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! In-memory collaborators for tests.
//!
//! - [`StaticMembership`]: fixed ring descriptions per daemon address.
//! - [`InMemoryCatalog`]: fixed metric lists per node, with failure injection.
//! - [`InMemoryStore`]: series data per `(node, metric)` that implements
//!   [`MetricTransfer`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bucky_core::{Error, Result};
use dashmap::DashMap;
use regex::Regex;

use crate::catalog::{MetricCatalog, MetricsByNode};
use crate::sync::{MetricTransfer, TransferError, TransferRequest, TransferStatus};
use crate::topology::{MembershipSource, RingDescription};

/// Ring membership served from a fixed table.
#[derive(Debug, Default)]
pub struct StaticMembership {
    descriptions: HashMap<String, RingDescription>,
    unreachable: HashSet<String>,
}

impl StaticMembership {
    /// Creates an empty table; every address is unreachable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `description` at `address`.
    #[must_use]
    pub fn with_node(mut self, address: impl Into<String>, description: RingDescription) -> Self {
        self.descriptions.insert(address.into(), description);
        self
    }

    /// Makes `address` unreachable.
    #[must_use]
    pub fn with_unreachable(mut self, address: impl Into<String>) -> Self {
        self.unreachable.insert(address.into());
        self
    }
}

#[async_trait]
impl MembershipSource for StaticMembership {
    async fn describe_ring(&self, address: &str) -> Result<RingDescription> {
        if self.unreachable.contains(address) {
            return Err(Error::Topology(format!("{address} unreachable")));
        }
        self.descriptions
            .get(address)
            .cloned()
            .ok_or_else(|| Error::Topology(format!("{address} unreachable")))
    }
}

/// Metric lists served from memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    metrics: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    last_force_rebuild: AtomicBool,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics stored on `node`, in listing order.
    #[must_use]
    pub fn with_metrics<I, S>(mut self, node: impl Into<String>, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.entry(node.into()).or_default().extend(metrics.into_iter().map(Into::into));
        self
    }

    /// Makes listing `node` fail.
    #[must_use]
    pub fn with_failing_node(mut self, node: impl Into<String>) -> Self {
        self.failing.insert(node.into());
        self
    }

    /// Returns the `force_rebuild` flag of the last listing.
    pub fn last_force_rebuild(&self) -> bool {
        self.last_force_rebuild.load(Ordering::SeqCst)
    }

    fn list(
        &self,
        hostports: &[String],
        force_rebuild: bool,
        filter: impl Fn(&str) -> bool,
    ) -> Result<MetricsByNode> {
        self.last_force_rebuild.store(force_rebuild, Ordering::SeqCst);

        let mut listed = MetricsByNode::new();
        for node in hostports {
            if self.failing.contains(node) {
                return Err(Error::catalog(node.as_str(), "listing failed"));
            }
            let metrics = self
                .metrics
                .get(node)
                .map(|metrics| metrics.iter().filter(|m| filter(m)).cloned().collect())
                .unwrap_or_default();
            listed.insert(node.clone(), metrics);
        }
        Ok(listed)
    }
}

#[async_trait]
impl MetricCatalog for InMemoryCatalog {
    async fn list_all_metrics(
        &self,
        hostports: &[String],
        force_rebuild: bool,
    ) -> Result<MetricsByNode> {
        self.list(hostports, force_rebuild, |_| true)
    }

    async fn list_regex_metrics(
        &self,
        hostports: &[String],
        pattern: &str,
        force_rebuild: bool,
    ) -> Result<MetricsByNode> {
        let regex = Regex::new(pattern).map_err(|e| Error::Config(e.to_string()))?;
        self.list(hostports, force_rebuild, |metric| regex.is_match(metric))
    }
}

/// Series data per `(node, metric)`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<(String, String), Vec<u8>>,
    unreachable: HashSet<String>,
    transfer_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request touching `node` fail as unreachable.
    #[must_use]
    pub fn with_unreachable(mut self, node: impl Into<String>) -> Self {
        self.unreachable.insert(node.into());
        self
    }

    /// Stores `data` for `metric` on `node`.
    pub fn insert(&self, node: &str, metric: &str, data: Vec<u8>) {
        self.data.insert((node.to_string(), metric.to_string()), data);
    }

    /// Returns the data of `metric` on `node`.
    pub fn get(&self, node: &str, metric: &str) -> Option<Vec<u8>> {
        self.data.get(&(node.to_string(), metric.to_string())).map(|entry| entry.value().clone())
    }

    /// Returns whether `node` stores `metric`.
    pub fn contains(&self, node: &str, metric: &str) -> bool {
        self.data.contains_key(&(node.to_string(), metric.to_string()))
    }

    /// Returns every stored `(node, metric)` with its data, sorted.
    pub fn snapshot(&self) -> BTreeMap<(String, String), Vec<u8>> {
        self.data.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }

    /// Returns the metrics stored on each node, in the catalog's shape.
    pub fn metrics_by_node(&self) -> MetricsByNode {
        let mut listed: MetricsByNode = BTreeMap::new();
        for ((node, metric), _) in self.snapshot() {
            listed.entry(node).or_default().push(metric);
        }
        listed
    }

    /// Returns how many transfers were attempted.
    pub fn transfer_calls(&self) -> usize {
        self.transfer_calls.load(Ordering::SeqCst)
    }

    /// Returns how many source deletes were attempted.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, node: &str) -> std::result::Result<(), TransferError> {
        if self.unreachable.contains(node) {
            return Err(TransferError::Unreachable {
                node: node.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MetricTransfer for InMemoryStore {
    async fn transfer(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<TransferStatus, TransferError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(&request.source)?;
        self.check_reachable(&request.destination)?;

        let Some(data) = self.get(&request.source, &request.old_name) else {
            return Ok(TransferStatus::SourceNotFound);
        };
        let bytes = data.len() as u64;
        self.insert(&request.destination, &request.new_name, data);
        Ok(TransferStatus::Copied { bytes })
    }

    async fn delete_source(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<(), TransferError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(&request.source)?;
        self.data.remove(&(request.source.clone(), request.old_name.clone()));
        Ok(())
    }
}
