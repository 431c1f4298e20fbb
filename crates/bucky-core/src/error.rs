//! Error types for bucky.

use thiserror::Error;

/// A specialized `Result` type for bucky operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving clusters, reading catalogs or planning.
///
/// Per-job transfer failures are not represented here; they are collected by the
/// sync executor and reported in aggregate.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or inconsistent operator input. Fatal, no partial work is attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// A seed node could not be resolved into a usable cluster.
    #[error("topology error: {0}")]
    Topology(String),

    /// A hash ring was requested over an empty node set.
    #[error("cannot build a hash ring over an empty node set")]
    EmptyTopology,

    /// A node address could not be split into host and port.
    #[error("malformed node address '{address}': {reason}")]
    MalformedAddress {
        /// The offending address.
        address: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Listing metrics on a node failed.
    #[error("failed to list metrics on {node}: {message}")]
    Catalog {
        /// The node that could not be listed.
        node: String,
        /// A human-readable error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new malformed-address error.
    #[must_use]
    pub fn malformed_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress { address: address.into(), reason: reason.into() }
    }

    /// Creates a new catalog error.
    #[must_use]
    pub fn catalog(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Catalog { node: node.into(), message: message.into() }
    }

    /// Returns a short, stable name for the error class, suitable for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Json(_) => "configuration",
            Self::Topology(_) | Self::EmptyTopology => "topology",
            Self::MalformedAddress { .. } => "malformed_address",
            Self::Catalog { .. } => "catalog",
            Self::Io(_) => "io",
        }
    }
}
