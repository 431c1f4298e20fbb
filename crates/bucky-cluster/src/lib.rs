//! Cluster-level placement logic for Carbon metric stores.
//!
//! This crate provides:
//! - [`Cluster`]: topology resolved from a seed daemon, with its hash ring and
//!   a health flag
//! - [`find_inconsistencies`] and [`detect`]: metrics stored away from their
//!   ring owner, reported under the node they were observed on
//! - [`Planner`]: turns a [`PlanRequest`] into a [`JobSet`] grouped by
//!   destination and source node
//! - [`SyncExecutor`]: runs a job set over a bounded worker pool
//!
//! Transport is left to implementations of [`MembershipSource`],
//! [`MetricCatalog`] and [`MetricTransfer`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bucky_cluster::{Cluster, Planner, PlanRequest, SyncConfig, SyncExecutor};
//!
//! let source = Cluster::resolve("graphite-a:4242", &client).await?;
//! let destination = Cluster::resolve("carbon-1:2003", &client).await?;
//!
//! let jobs = Planner::new(&source, &destination, &client)
//!     .plan(&PlanRequest::RegexSelection { pattern: "^servers\\.".into() })
//!     .await?;
//!
//! let executor = SyncExecutor::new(SyncConfig::default(), Arc::new(client));
//! let report = executor.run(&jobs).await?;
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod inconsistent;
pub mod plan;
pub mod sync;
pub mod topology;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{MetricCatalog, MetricSelection, MetricsByNode};
pub use inconsistent::{detect, find_inconsistencies, HousekeepingFilter, InconsistencyReport};
pub use plan::{MetricMapping, PlanRequest, Planner};
pub use sync::{
    JobFailure, JobOutcome, JobSet, MetricTransfer, NoOpTransfer, NodePair, PairProgress,
    SyncConfig, SyncError, SyncEvent, SyncExecutor, SyncJob, SyncReport, TransferError,
    TransferRequest, TransferStatus,
};
pub use topology::{Cluster, MembershipSource, RingDescription};
