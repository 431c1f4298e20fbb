// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Sync jobs and their grouping by node pair.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of migration: copy `old_name` on the source node to `new_name` on
/// the destination node. The nodes are implied by where the job sits in a
/// [`JobSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJob {
    /// Metric name on the source node.
    pub old_name: String,
    /// Metric name on the destination node.
    pub new_name: String,
}

impl SyncJob {
    /// Creates a job that renames while moving.
    #[must_use]
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self { old_name: old_name.into(), new_name: new_name.into() }
    }

    /// Creates a job that only moves, keeping the name.
    #[must_use]
    pub fn relocate(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { old_name: name.clone(), new_name: name }
    }

    /// Returns whether the metric changes name.
    #[must_use]
    pub fn is_rename(&self) -> bool {
        self.old_name != self.new_name
    }
}

/// A `(destination, source)` address pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePair {
    /// Destination `host:port`.
    pub destination: String,
    /// Source `host:port`.
    pub source: String,
}

impl NodePair {
    /// Creates a node pair.
    #[must_use]
    pub fn new(destination: impl Into<String>, source: impl Into<String>) -> Self {
        Self { destination: destination.into(), source: source.into() }
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Planned jobs grouped by destination, then source.
///
/// Iteration order is deterministic (sorted by address); job order within a
/// pair is insertion order. A job set is built once by the planner and only
/// read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobSet {
    jobs: BTreeMap<String, BTreeMap<String, Vec<SyncJob>>>,
}

impl JobSet {
    /// Creates an empty job set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job under `jobs[destination][source]`.
    pub fn push(
        &mut self,
        destination: impl Into<String>,
        source: impl Into<String>,
        job: SyncJob,
    ) {
        self.jobs
            .entry(destination.into())
            .or_default()
            .entry(source.into())
            .or_default()
            .push(job);
    }

    /// Returns the jobs moving data from `source` to `destination`.
    #[must_use]
    pub fn get(&self, destination: &str, source: &str) -> Option<&[SyncJob]> {
        self.jobs.get(destination)?.get(source).map(Vec::as_slice)
    }

    /// Returns the total number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs().map(|(_, jobs)| jobs.len()).sum()
    }

    /// Returns true if there are no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns the number of distinct node pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.jobs.values().map(BTreeMap::len).sum()
    }

    /// Returns the destination addresses.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    /// Iterates over node pairs and their jobs.
    pub fn pairs(&self) -> impl Iterator<Item = (NodePair, &[SyncJob])> {
        self.jobs.iter().flat_map(|(destination, sources)| {
            sources.iter().map(move |(source, jobs)| {
                (NodePair::new(destination.as_str(), source.as_str()), jobs.as_slice())
            })
        })
    }

    /// Iterates over every job with its pair.
    pub fn iter(&self) -> impl Iterator<Item = (NodePair, &SyncJob)> {
        self.pairs().flat_map(|(pair, jobs)| jobs.iter().map(move |job| (pair.clone(), job)))
    }
}
