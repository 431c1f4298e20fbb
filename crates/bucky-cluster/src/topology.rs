// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Cluster topology resolution.
//!
//! A [`Cluster`] is resolved from a single seed node: the seed reports the full
//! ring membership, and every member is then asked for its own view. The cluster
//! is healthy only if all members answer and agree with the seed. Callers may
//! work with an unhealthy cluster but must check [`Cluster::is_healthy`] before
//! trusting results derived from it.
//!
//! Clusters are never cached. Every command resolves its own, and two resolved
//! values are independent even when they describe the same physical fleet.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use bucky_core::{split_host_port, Error, Node, Result};
use bucky_placement::{HashRing, RingAlgorithm};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A daemon's description of the hash ring it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingDescription {
    /// Name of the reporting daemon.
    pub name: String,
    /// Ring members, each `host` or `host:instance`.
    pub nodes: Vec<String>,
    /// Hashing algorithm name. Empty means carbon.
    #[serde(default)]
    pub algo: String,
    /// Carbon ring replicas per node. Zero means the carbon default.
    #[serde(default)]
    pub replicas: usize,
}

impl RingDescription {
    /// Creates a carbon ring description.
    #[must_use]
    pub fn carbon(name: impl Into<String>, nodes: Vec<String>) -> Self {
        Self { name: name.into(), nodes, algo: "carbon".to_string(), replicas: 100 }
    }

    fn member_set(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }
}

/// Source of ring membership, usually the daemons themselves.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Asks the daemon at `address` (`host:port`) for its ring description.
    async fn describe_ring(&self, address: &str) -> Result<RingDescription>;
}

/// A resolved cluster: its nodes, their hash ring and a health flag.
#[derive(Debug, Clone)]
pub struct Cluster {
    seed: String,
    name: String,
    ring: HashRing,
    healthy: bool,
}

impl Cluster {
    /// Creates a cluster from an already built ring.
    #[must_use]
    pub fn new(seed: impl Into<String>, name: impl Into<String>, ring: HashRing) -> Self {
        Self { seed: seed.into(), name: name.into(), ring, healthy: true }
    }

    /// Marks the cluster unhealthy or healthy.
    #[must_use]
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Resolves the cluster the seed at `seed` (`host:port`) belongs to.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `seed` is not a valid `host:port`.
    /// - [`Error::Topology`] if the seed cannot be reached or reports an
    ///   unusable ring.
    /// - [`Error::EmptyTopology`] if the seed reports no members.
    ///
    /// Unreachable or disagreeing members do not fail resolution; they mark the
    /// cluster unhealthy.
    pub async fn resolve<M>(seed: &str, source: &M) -> Result<Self>
    where
        M: MembershipSource + ?Sized,
    {
        let (_, port) = split_host_port(seed)
            .map_err(|e| Error::Config(format!("invalid seed address: {e}")))?;

        let description = source
            .describe_ring(seed)
            .await
            .map_err(|e| Error::Topology(format!("seed {seed} unreachable: {e}")))?;

        let algorithm = RingAlgorithm::from_name(&description.algo, description.replicas)?;
        let nodes = description
            .nodes
            .iter()
            .map(|entry| Node::from_ring_entry(entry, port))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::Topology(format!("seed {seed} reported a bad ring: {e}")))?;
        let ring = HashRing::build(nodes, algorithm)?;

        let mut cluster = Self::new(seed, description.name.clone(), ring);
        cluster.healthy = cluster.check_members(&description, source).await;

        info!(
            seed = %seed,
            nodes = cluster.ring.len(),
            algorithm = %algorithm,
            healthy = cluster.healthy,
            "Resolved cluster"
        );
        if !cluster.healthy {
            warn!(seed = %seed, "Cluster is not healthy");
        }

        Ok(cluster)
    }

    /// Queries every member concurrently and compares its view with the seed's.
    async fn check_members<M>(&self, expected: &RingDescription, source: &M) -> bool
    where
        M: MembershipSource + ?Sized,
    {
        let expected = expected.member_set();
        let addresses = self.host_ports();
        let answers = join_all(addresses.iter().map(|addr| source.describe_ring(addr))).await;

        let mut healthy = true;
        for (address, answer) in addresses.iter().zip(answers) {
            match answer {
                Ok(description) if description.member_set() == expected => {
                    debug!(node = %address, "Member agrees with seed");
                }
                Ok(description) => {
                    warn!(
                        node = %address,
                        reported = ?description.nodes,
                        "Member reports inconsistent ring membership"
                    );
                    healthy = false;
                }
                Err(e) => {
                    warn!(node = %address, error = %e, "Member unreachable");
                    healthy = false;
                }
            }
        }
        healthy
    }

    /// Returns the seed address this cluster was resolved from.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Returns the name the seed daemon reported.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether every member answered and agreed on membership.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Returns the cluster's hash ring.
    #[must_use]
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// Returns the ring members in ring order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        self.ring.nodes()
    }

    /// Returns the node that owns `metric`.
    #[must_use]
    pub fn owner_of(&self, metric: &str) -> &Node {
        self.ring.get_node(metric)
    }

    /// Returns the distinct `host:port` addresses of the members, in ring order.
    ///
    /// Carbon instances sharing a host are served by one daemon, so they
    /// collapse to a single address.
    #[must_use]
    pub fn host_ports(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.ring
            .nodes()
            .iter()
            .map(Node::address)
            .filter(|address| seen.insert(address.clone()))
            .collect()
    }
}
