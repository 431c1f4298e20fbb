//! Core types and utilities for bucky.
//!
//! This crate provides the building blocks shared by every bucky component:
//! - Node addressing (`host:port`) and address parsing
//! - Error types following the operator-facing error taxonomy
//! - Configuration management

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod node;

pub use config::{
    CatalogConfig, ClientConfig, Config, LogFormat, LoggingConfig, SyncSettings,
    DEFAULT_HOUSEKEEPING_PREFIX,
};
pub use error::{Error, Result};
pub use node::{split_host_port, Node};
