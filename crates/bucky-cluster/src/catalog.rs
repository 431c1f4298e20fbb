// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Metric catalog access.
//!
//! The catalog answers "which metrics are physically stored on which node".
//! Transport and caching are left to implementations; the core only needs the
//! two listing shapes below.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bucky_core::Result;

/// Metrics physically present on each node, keyed by `host:port`.
pub type MetricsByNode = BTreeMap<String, Vec<String>>;

/// Lists the metrics stored on a set of nodes.
///
/// Implementations must fail the whole call if any node cannot be listed:
/// a partial catalog could silently drop metrics that need migration.
#[async_trait]
pub trait MetricCatalog: Send + Sync {
    /// Lists every metric on each of `hostports`.
    async fn list_all_metrics(
        &self,
        hostports: &[String],
        force_rebuild: bool,
    ) -> Result<MetricsByNode>;

    /// Lists the metrics matching `pattern` on each of `hostports`.
    async fn list_regex_metrics(
        &self,
        hostports: &[String],
        pattern: &str,
        force_rebuild: bool,
    ) -> Result<MetricsByNode>;
}

/// Which metrics to pull from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetricSelection {
    /// Every metric.
    #[default]
    All,
    /// Only metrics matching a regular expression.
    Matching(String),
}

impl MetricSelection {
    /// Builds a selection from an optional pattern.
    #[must_use]
    pub fn from_pattern(pattern: Option<&str>) -> Self {
        match pattern {
            Some(pattern) if !pattern.is_empty() => Self::Matching(pattern.to_string()),
            _ => Self::All,
        }
    }

    /// Fetches the selected metrics for `hostports`.
    ///
    /// # Errors
    ///
    /// Propagates the catalog's error.
    pub async fn fetch<C>(
        &self,
        catalog: &C,
        hostports: &[String],
        force_rebuild: bool,
    ) -> Result<MetricsByNode>
    where
        C: MetricCatalog + ?Sized,
    {
        match self {
            Self::All => catalog.list_all_metrics(hostports, force_rebuild).await,
            Self::Matching(pattern) => {
                catalog.list_regex_metrics(hostports, pattern, force_rebuild).await
            }
        }
    }
}
