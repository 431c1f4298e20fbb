// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Bucky Authors

//! The transfer seam between the executor and storage nodes.

use async_trait::async_trait;
use thiserror::Error;

/// One metric copy from `(source, old_name)` to `(destination, new_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source `host:port`.
    pub source: String,
    /// Metric name on the source.
    pub old_name: String,
    /// Destination `host:port`.
    pub destination: String,
    /// Metric name on the destination.
    pub new_name: String,
}

impl TransferRequest {
    /// Returns true when the copy would overwrite the metric with itself.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.source == self.destination && self.old_name == self.new_name
    }
}

/// Outcome of a transfer that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Series data was written to the destination.
    Copied {
        /// Bytes written.
        bytes: u64,
    },
    /// The source node has no such metric.
    SourceNotFound,
}

/// A failed transfer or source delete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// A node could not be reached.
    #[error("node {node} unreachable: {reason}")]
    Unreachable {
        /// The node address.
        node: String,
        /// Why the connection failed.
        reason: String,
    },

    /// A node address in the job is not a valid `host:port`.
    #[error("malformed node address '{0}'")]
    MalformedAddress(String),

    /// A node answered with an unexpected status.
    #[error("node {node} rejected the request with status {status}")]
    Rejected {
        /// The node address.
        node: String,
        /// The status code returned.
        status: u16,
    },

    /// The transfer did not finish in time.
    #[error("transfer timed out after {0}s")]
    Timeout(u64),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

/// Copies series data between storage nodes.
///
/// Transfers must overwrite the destination, so re-running a completed job is
/// harmless.
#[async_trait]
pub trait MetricTransfer: Send + Sync {
    /// Copies one metric.
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferStatus, TransferError>;

    /// Deletes the source copy after a successful transfer.
    async fn delete_source(&self, request: &TransferRequest) -> Result<(), TransferError>;
}

/// A transfer that copies nothing and always succeeds.
pub struct NoOpTransfer;

#[async_trait]
impl MetricTransfer for NoOpTransfer {
    async fn transfer(&self, _request: &TransferRequest) -> Result<TransferStatus, TransferError> {
        Ok(TransferStatus::Copied { bytes: 0 })
    }

    async fn delete_source(&self, _request: &TransferRequest) -> Result<(), TransferError> {
        Ok(())
    }
}
