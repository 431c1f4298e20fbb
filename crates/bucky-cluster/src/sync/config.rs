// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! Configuration for the sync executor.

use std::time::Duration;

use bucky_core::SyncSettings;

/// Configuration for the sync executor.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of concurrent workers. Values below one are treated as one.
    pub workers: usize,

    /// Log each planned move and mark it done without transferring.
    pub dry_run: bool,

    /// Treat "source not found" as a skip rather than a job failure.
    pub ignore_missing_source: bool,

    /// Delete the source metric after a successful copy to another node.
    pub delete_source: bool,

    /// Log every job outcome, not only failures.
    pub verbose: bool,

    /// Timeout for one transfer, including the optional source delete.
    pub transfer_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            dry_run: false,
            ignore_missing_source: false,
            delete_source: false,
            verbose: false,
            transfer_timeout: Duration::from_secs(600),
        }
    }
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            workers: settings.workers,
            dry_run: settings.dry_run,
            ignore_missing_source: settings.ignore_missing_source,
            delete_source: settings.delete_source,
            verbose: false,
            transfer_timeout: Duration::from_secs(settings.transfer_timeout_secs),
        }
    }
}
