//! Storage node addressing.
//!
//! A node is identified by `host:port`. Carbon additionally distinguishes
//! multiple daemons on the same host by an optional instance name, which takes
//! part in hash ring placement but not in the network address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single storage server in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    host: String,
    port: u16,
    instance: Option<String>,
}

impl Node {
    /// Creates a node without an instance name.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, instance: None }
    }

    /// Sets the carbon instance name.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Parses a hash ring entry (`host` or `host:instance`) served by a daemon.
    ///
    /// Ring entries carry no port; every node of a cluster listens on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedAddress`] if the host or instance is empty.
    pub fn from_ring_entry(entry: &str, port: u16) -> Result<Self> {
        let (host, instance) = match entry.split_once(':') {
            Some((host, instance)) => (host, Some(instance)),
            None => (entry, None),
        };
        if host.is_empty() {
            return Err(Error::malformed_address(entry, "empty host"));
        }
        let node = Self::new(host, port);
        match instance {
            Some("") => Err(Error::malformed_address(entry, "empty instance")),
            Some(instance) => Ok(node.with_instance(instance)),
            None => Ok(node),
        }
    }

    /// Returns the host name or IP.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the carbon instance name, if any.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Returns the network address, `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Returns the key carbon uses to place this node on its hash ring.
    ///
    /// This is the Python `repr` of the `(server, instance)` tuple, e.g.
    /// `('10.0.0.1', 'a')` or `('10.0.0.1', None)`.
    #[must_use]
    pub fn ring_key(&self) -> String {
        match &self.instance {
            Some(instance) => format!("('{}', '{}')", self.host, instance),
            None => format!("('{}', None)", self.host),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = split_host_port(s)?;
        Ok(Self::new(host, port))
    }
}

/// Splits `host:port` (or `[v6-host]:port`) into its parts.
///
/// # Errors
///
/// Returns [`Error::MalformedAddress`] when the port is missing or invalid, the
/// host is empty, or an unbracketed host contains a colon.
pub fn split_host_port(address: &str) -> Result<(&str, u16)> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::malformed_address(address, "missing ']' in address"))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| Error::malformed_address(address, "missing port in address"))?;
        (host, port)
    } else {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| Error::malformed_address(address, "missing port in address"))?;
        if host.contains(':') {
            return Err(Error::malformed_address(address, "too many colons in address"));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(Error::malformed_address(address, "empty host"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| Error::malformed_address(address, format!("invalid port: {e}")))?;
    Ok((host, port))
}
