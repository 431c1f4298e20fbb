// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Migration planning.
//!
//! The planner turns a [`PlanRequest`] into a [`JobSet`] by consulting the
//! source and destination rings. It reads the source catalog when the request
//! needs it but never contacts the destination's data store, so planning is
//! side-effect free and can back a dry run.
//!
//! # Modes
//!
//! - [`PlanRequest::RegexSelection`]: metrics matching a pattern are moved to
//!   their destination owner under the same name, from wherever they were
//!   observed on the source.
//! - [`PlanRequest::ExplicitMapping`]: each `old -> new` pair is moved from the
//!   source owner of `old` to the destination owner of `new`.
//! - [`PlanRequest::Rebalance`]: each misplaced metric in an
//!   [`InconsistencyReport`] is moved from its observed node to its owner.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bucky_core::{Error, Result};
use regex::Regex;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use tracing::{debug, info};

use crate::catalog::MetricCatalog;
use crate::inconsistent::InconsistencyReport;
use crate::sync::{JobSet, SyncJob};
use crate::topology::Cluster;

/// Old to new metric names, ordered by first appearance.
///
/// An old name given twice keeps its first position and its last target, as
/// with any JSON object decoded into a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricMapping(Vec<(String, String)>);

impl MetricMapping {
    /// Creates a mapping from pairs. Later pairs override earlier ones with
    /// the same old name.
    #[must_use]
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        let mut mapping = Self::default();
        let mut index = HashMap::with_capacity(pairs.len());
        for (old_name, new_name) in pairs {
            mapping.insert(&mut index, old_name, new_name);
        }
        mapping
    }

    fn insert(&mut self, index: &mut HashMap<String, usize>, old_name: String, new_name: String) {
        match index.get(&old_name) {
            Some(&position) => self.0[position].1 = new_name,
            None => {
                index.insert(old_name.clone(), self.0.len());
                self.0.push((old_name, new_name));
            }
        }
    }

    /// Parses a JSON object of old to new names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the input is not a JSON object of strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid metric map: {e}")))
    }

    /// Parses a JSON object of old to new names from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the input is not a JSON object of strings.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| Error::Config(format!("invalid metric map: {e}")))
    }

    /// Loads a mapping file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be opened or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Config(format!("cannot open metric map {}: {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Returns the `(old, new)` pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for MetricMapping {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = MetricMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping old metric names to new metric names")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut mapping = MetricMapping::default();
                let mut index = HashMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((old_name, new_name)) = access.next_entry::<String, String>()? {
                    mapping.insert(&mut index, old_name, new_name);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// What to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRequest {
    /// Move every source metric matching `pattern`, keeping its name.
    RegexSelection {
        /// Regular expression applied to metric names.
        pattern: String,
    },
    /// Move and rename according to an explicit mapping.
    ExplicitMapping {
        /// Old to new names.
        mapping: MetricMapping,
    },
    /// Move the metrics of a detector report off the nodes they were seen on.
    Rebalance {
        /// Misplaced metrics per observed node.
        report: InconsistencyReport,
    },
}

/// Builds job sets for a source and destination cluster.
///
/// Source and destination may be the same cluster.
pub struct Planner<'a, C: ?Sized> {
    source: &'a Cluster,
    destination: &'a Cluster,
    catalog: &'a C,
    force_rebuild: bool,
    log_jobs: bool,
}

impl<'a, C> Planner<'a, C>
where
    C: MetricCatalog + ?Sized,
{
    /// Creates a planner. `catalog` lists metrics on the source cluster.
    pub fn new(source: &'a Cluster, destination: &'a Cluster, catalog: &'a C) -> Self {
        Self { source, destination, catalog, force_rebuild: false, log_jobs: false }
    }

    /// Forces a catalog cache rebuild when listing the source.
    #[must_use]
    pub fn with_force_rebuild(mut self, force_rebuild: bool) -> Self {
        self.force_rebuild = force_rebuild;
        self
    }

    /// Logs every planned job.
    #[must_use]
    pub fn with_job_logging(mut self, log_jobs: bool) -> Self {
        self.log_jobs = log_jobs;
        self
    }

    /// Plans the jobs for `request`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for an invalid regex.
    /// - [`Error::Topology`] when regex mode runs against an unhealthy source.
    /// - The catalog's error when listing the source fails.
    pub async fn plan(&self, request: &PlanRequest) -> Result<JobSet> {
        let jobs = match request {
            PlanRequest::RegexSelection { pattern } => self.plan_regex(pattern).await?,
            PlanRequest::ExplicitMapping { mapping } => self.plan_mapping(mapping),
            PlanRequest::Rebalance { report } => self.plan_rebalance(report),
        };

        info!(metrics = jobs.len(), "Number of metrics to copy");
        for (pair, planned) in jobs.pairs() {
            info!(
                src = %pair.source,
                dst = %pair.destination,
                jobs = planned.len(),
                "Planned transfers"
            );
            if self.log_jobs {
                for job in planned {
                    info!(
                        src = %pair.source,
                        dst = %pair.destination,
                        old = %job.old_name,
                        new = %job.new_name,
                        "Planned move"
                    );
                }
            }
        }

        Ok(jobs)
    }

    async fn plan_regex(&self, pattern: &str) -> Result<JobSet> {
        Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid metric regex '{pattern}': {e}")))?;

        if !self.source.is_healthy() || self.source.nodes().is_empty() {
            return Err(Error::Topology(format!(
                "source cluster {} is unhealthy or empty, refusing to plan",
                self.source.seed()
            )));
        }

        let catalog = self
            .catalog
            .list_regex_metrics(&self.source.host_ports(), pattern, self.force_rebuild)
            .await?;

        let mut jobs = JobSet::new();
        for (source, metrics) in catalog {
            debug!(node = %source, count = metrics.len(), "Matched metrics");
            for metric in metrics {
                let destination = self.destination.owner_of(&metric).address();
                jobs.push(destination, source.as_str(), SyncJob::relocate(metric));
            }
        }
        Ok(jobs)
    }

    fn plan_mapping(&self, mapping: &MetricMapping) -> JobSet {
        let mut jobs = JobSet::new();
        for (old_name, new_name) in mapping.pairs() {
            let source = self.source.owner_of(old_name).address();
            let destination = self.destination.owner_of(new_name).address();
            jobs.push(destination, source, SyncJob::new(old_name.as_str(), new_name.as_str()));
        }
        jobs
    }

    fn plan_rebalance(&self, report: &InconsistencyReport) -> JobSet {
        let mut jobs = JobSet::new();
        for (observed, metric) in report.entries() {
            let destination = self.destination.owner_of(metric).address();
            jobs.push(destination, observed, SyncJob::relocate(metric));
        }
        jobs
    }
}
