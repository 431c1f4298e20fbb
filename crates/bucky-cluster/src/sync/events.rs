// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Events, outcomes and reports for sync runs.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use super::job::{NodePair, SyncJob};

/// Result of executing a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Series data was copied.
    Copied {
        /// Bytes written to the destination.
        bytes: u64,
    },
    /// Dry run: the move was logged, not performed.
    DryRun,
    /// The source had no such metric and missing sources are tolerated.
    SkippedMissing,
    /// Source and destination are the same metric on the same node.
    SkippedNoop,
    /// The job failed.
    Failed {
        /// Error message.
        error: String,
    },
    /// The run was cancelled before the job started.
    Cancelled,
}

/// A failed job and why it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// The node pair the job belonged to.
    pub pair: NodePair,
    /// The job.
    pub job: SyncJob,
    /// Error message.
    pub error: String,
}

/// Progress of one `(destination, source)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairProgress {
    /// Jobs planned for the pair.
    pub total: usize,
    /// Jobs finished, whatever their outcome.
    pub finished: usize,
    /// Jobs that failed.
    pub failed: usize,
}

/// Summary of a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Jobs in the job set.
    pub total: usize,
    /// Jobs whose data was copied.
    pub copied: usize,
    /// Jobs only logged because of dry run.
    pub dry_run: usize,
    /// Jobs skipped because the source metric was missing.
    pub skipped_missing: usize,
    /// Jobs skipped as no-ops.
    pub skipped_noop: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Jobs never started because the run was cancelled.
    pub cancelled: usize,
    /// Bytes copied across all jobs.
    pub bytes_copied: u64,
    /// Per-pair progress.
    pub pairs: BTreeMap<NodePair, PairProgress>,
    /// Every failed job.
    pub failures: Vec<JobFailure>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl SyncReport {
    /// Records one finished job.
    pub(crate) fn record(&mut self, pair: &NodePair, job: &SyncJob, outcome: &JobOutcome) {
        let progress = self.pairs.entry(pair.clone()).or_default();
        match outcome {
            JobOutcome::Cancelled => {
                self.cancelled += 1;
                return;
            }
            JobOutcome::Copied { bytes } => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            JobOutcome::DryRun => self.dry_run += 1,
            JobOutcome::SkippedMissing => self.skipped_missing += 1,
            JobOutcome::SkippedNoop => self.skipped_noop += 1,
            JobOutcome::Failed { error } => {
                self.failed += 1;
                progress.failed += 1;
                self.failures.push(JobFailure {
                    pair: pair.clone(),
                    job: job.clone(),
                    error: error.clone(),
                });
            }
        }
        progress.finished += 1;
    }

    /// Returns the number of jobs that finished without failing.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.copied + self.dry_run + self.skipped_missing + self.skipped_noop
    }

    /// Returns true if no job failed or was cancelled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Events emitted by the sync executor.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A run started.
    RunStarted {
        /// Jobs in the run.
        jobs: usize,
        /// Worker count.
        workers: usize,
        /// Whether this is a dry run.
        dry_run: bool,
    },
    /// A dry-run job was logged instead of executed.
    JobPlanned {
        /// Node pair.
        pair: NodePair,
        /// The job.
        job: SyncJob,
    },
    /// A job finished.
    JobFinished {
        /// Node pair.
        pair: NodePair,
        /// The job.
        job: SyncJob,
        /// How it ended.
        outcome: JobOutcome,
    },
    /// The run finished.
    RunCompleted {
        /// Jobs that did not fail.
        succeeded: usize,
        /// Jobs that failed.
        failed: usize,
        /// Jobs never started.
        cancelled: usize,
        /// Total bytes copied.
        bytes_copied: u64,
        /// Run duration.
        duration: Duration,
    },
}

/// Aggregate failure of a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// At least one job failed. The other jobs still ran.
    #[error("{failed} of {total} sync jobs failed", failed = .0.failed, total = .0.total)]
    JobsFailed(Box<SyncReport>),

    /// The run was cancelled before every job was dispatched.
    #[error("sync cancelled with {cancelled} jobs not started", cancelled = .0.cancelled)]
    Cancelled(Box<SyncReport>),
}

impl SyncError {
    /// Returns the report of the run.
    #[must_use]
    pub fn report(&self) -> &SyncReport {
        match self {
            Self::JobsFailed(report) | Self::Cancelled(report) => report,
        }
    }
}
