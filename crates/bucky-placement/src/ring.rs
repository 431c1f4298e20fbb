//! Consistent hash rings mapping metric names to storage nodes.
//!
//! A ring is built once from a topology snapshot and never mutated; a node set
//! change means building a new ring. Lookups take `&self` only, so a ring can be
//! shared by any number of concurrent readers.

use std::collections::HashSet;
use std::fmt;

use bucky_core::Node;
use thiserror::Error;

use crate::hash::{carbon_position, fnv1a_64, jump_hash};

/// Number of ring entries carbon places per node unless configured otherwise.
pub const DEFAULT_CARBON_REPLICAS: usize = 100;

/// Errors that can occur when building a hash ring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    /// No nodes were supplied.
    #[error("cannot build a hash ring over an empty node set")]
    EmptyTopology,

    /// The daemon reported a hashing algorithm we do not implement.
    #[error("unknown hash ring algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// The carbon ring needs at least one entry per node.
    #[error("carbon ring replica count must be positive")]
    InvalidReplicas,
}

impl From<RingError> for bucky_core::Error {
    fn from(err: RingError) -> Self {
        match err {
            RingError::EmptyTopology => Self::EmptyTopology,
            other => Self::Topology(other.to_string()),
        }
    }
}

/// The hashing scheme used to place metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingAlgorithm {
    /// Graphite carbon's MD5 consistent hash ring.
    Carbon {
        /// Ring entries per node.
        replicas: usize,
    },
    /// FNV-1a fed to jump consistent hashing over the ordered node list.
    JumpFnv1a,
}

impl Default for RingAlgorithm {
    fn default() -> Self {
        Self::Carbon { replicas: DEFAULT_CARBON_REPLICAS }
    }
}

impl RingAlgorithm {
    /// Resolves an algorithm by the name daemons report (`carbon`, `jump_fnv1a`).
    ///
    /// An empty name means carbon. `replicas` of zero selects the carbon default.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::UnknownAlgorithm`] for any other name.
    pub fn from_name(name: &str, replicas: usize) -> Result<Self, RingError> {
        match name {
            "" | "carbon" | "carbon_ch" => Ok(Self::Carbon {
                replicas: if replicas == 0 { DEFAULT_CARBON_REPLICAS } else { replicas },
            }),
            "jump_fnv1a" | "jump_fnv1a_ch" => Ok(Self::JumpFnv1a),
            other => Err(RingError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for RingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carbon { replicas } => write!(f, "carbon(replicas={replicas})"),
            Self::JumpFnv1a => f.write_str("jump_fnv1a"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RingEntry {
    position: u32,
    node: usize,
}

/// An immutable consistent hash ring over a fixed node set.
#[derive(Debug, Clone)]
pub struct HashRing {
    algorithm: RingAlgorithm,
    nodes: Vec<Node>,
    /// Sorted by position. Empty for jump hashing.
    entries: Vec<RingEntry>,
}

impl HashRing {
    /// Builds a ring over `nodes` in the given order.
    ///
    /// Duplicate nodes are ignored after their first occurrence. Node order is
    /// significant: carbon resolves position collisions in insertion order and
    /// jump hashing indexes the node list directly.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::EmptyTopology`] if `nodes` is empty.
    pub fn build(
        nodes: impl IntoIterator<Item = Node>,
        algorithm: RingAlgorithm,
    ) -> Result<Self, RingError> {
        let mut seen = HashSet::new();
        let nodes: Vec<Node> = nodes.into_iter().filter(|n| seen.insert(n.clone())).collect();
        if nodes.is_empty() {
            return Err(RingError::EmptyTopology);
        }

        let entries = match algorithm {
            RingAlgorithm::Carbon { replicas } => {
                if replicas == 0 {
                    return Err(RingError::InvalidReplicas);
                }
                Self::carbon_entries(&nodes, replicas)
            }
            RingAlgorithm::JumpFnv1a => Vec::new(),
        };

        Ok(Self { algorithm, nodes, entries })
    }

    /// Places `replicas` entries per node. A position already taken is bumped
    /// until free, exactly as carbon does.
    fn carbon_entries(nodes: &[Node], replicas: usize) -> Vec<RingEntry> {
        let mut taken = HashSet::with_capacity(nodes.len() * replicas);
        let mut entries = Vec::with_capacity(nodes.len() * replicas);

        for (index, node) in nodes.iter().enumerate() {
            let key = node.ring_key();
            for replica in 0..replicas {
                let mut position = carbon_position(&format!("{key}:{replica}"));
                while !taken.insert(position) {
                    position += 1;
                }
                entries.push(RingEntry { position, node: index });
            }
        }

        entries.sort_by_key(|entry| entry.position);
        entries
    }

    /// Returns the node owning `metric`.
    #[must_use]
    pub fn get_node(&self, metric: &str) -> &Node {
        &self.nodes[self.node_index(metric)]
    }

    fn node_index(&self, metric: &str) -> usize {
        match self.algorithm {
            RingAlgorithm::Carbon { .. } => {
                let position = carbon_position(metric);
                let index = self.entries.partition_point(|entry| entry.position < position);
                self.entries[index % self.entries.len()].node
            }
            RingAlgorithm::JumpFnv1a => jump_hash(fnv1a_64(metric.as_bytes()), self.nodes.len()),
        }
    }

    /// Returns the nodes on this ring, in build order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns whether `node` is a member of this ring.
    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: empty rings cannot be built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbon_nodes() -> Vec<Node> {
        ["graphite-a", "graphite-b", "graphite-c"]
            .iter()
            .map(|host| Node::new(*host, 4242))
            .collect()
    }

    #[test]
    fn test_empty_ring_is_rejected() {
        let err = HashRing::build(Vec::new(), RingAlgorithm::default()).unwrap_err();
        assert_eq!(err, RingError::EmptyTopology);
        assert!(matches!(bucky_core::Error::from(err), bucky_core::Error::EmptyTopology));
    }

    #[test]
    fn test_zero_replicas_rejected() {
        let err = HashRing::build(carbon_nodes(), RingAlgorithm::Carbon { replicas: 0 });
        assert_eq!(err.unwrap_err(), RingError::InvalidReplicas);
    }

    #[test]
    fn test_carbon_placement_matches_carbon() {
        // Reference placements computed with carbon's ConsistentHashRing.
        let ring = HashRing::build(carbon_nodes(), RingAlgorithm::default()).unwrap();
        let cases = [
            ("x.y.z", "graphite-c"),
            ("foo.bar.baz", "graphite-a"),
            ("servers.web01.cpu.user", "graphite-a"),
            ("old.metric", "graphite-c"),
            ("a", "graphite-b"),
            ("carbon.agents.host-a.cache.size", "graphite-c"),
        ];
        for (metric, host) in cases {
            assert_eq!(ring.get_node(metric).host(), host, "placement of {metric}");
        }
    }

    #[test]
    fn test_carbon_instances_are_distinct_nodes() {
        let nodes = vec![
            Node::new("graphite-a", 4242).with_instance("a"),
            Node::new("graphite-a", 4242).with_instance("b"),
        ];
        let ring = HashRing::build(nodes, RingAlgorithm::default()).unwrap();
        assert_eq!(ring.get_node("x.y.z").instance(), Some("a"));
        assert_eq!(ring.get_node("foo.bar.baz").instance(), Some("b"));
    }

    #[test]
    fn test_carbon_positions_are_unique() {
        let ring = HashRing::build(carbon_nodes(), RingAlgorithm::default()).unwrap();
        let positions: HashSet<u32> = ring.entries.iter().map(|e| e.position).collect();
        assert_eq!(positions.len(), 300);
        assert_eq!(ring.entries.len(), 300);
    }

    #[test]
    fn test_jump_placement() {
        let ring = HashRing::build(carbon_nodes(), RingAlgorithm::JumpFnv1a).unwrap();
        assert_eq!(ring.get_node("x.y.z").host(), "graphite-c");
        assert_eq!(ring.get_node("new.metric").host(), "graphite-b");
        assert_eq!(ring.get_node("foo.bar.baz").host(), "graphite-a");
    }

    #[test]
    fn test_placement_is_deterministic_across_rebuilds() {
        for algorithm in [RingAlgorithm::default(), RingAlgorithm::JumpFnv1a] {
            let first = HashRing::build(carbon_nodes(), algorithm).unwrap();
            let second = HashRing::build(carbon_nodes(), algorithm).unwrap();
            for i in 0..2000 {
                let metric = format!("servers.host{i}.cpu.idle");
                assert_eq!(first.get_node(&metric), first.get_node(&metric));
                assert_eq!(first.get_node(&metric), second.get_node(&metric));
            }
        }
    }

    #[test]
    fn test_placement_is_always_a_member() {
        for algorithm in [RingAlgorithm::default(), RingAlgorithm::JumpFnv1a] {
            let ring = HashRing::build(carbon_nodes(), algorithm).unwrap();
            for i in 0..2000 {
                assert!(ring.contains(ring.get_node(&format!("app.{i}.requests"))));
            }
        }
    }

    #[test]
    fn test_adding_a_node_remaps_a_bounded_fraction() {
        let mut grown = carbon_nodes();
        grown.push(Node::new("graphite-d", 4242));

        for algorithm in [RingAlgorithm::default(), RingAlgorithm::JumpFnv1a] {
            let before = HashRing::build(carbon_nodes(), algorithm).unwrap();
            let after = HashRing::build(grown.clone(), algorithm).unwrap();

            let total = 10_000;
            let moved = (0..total)
                .map(|i| format!("metric.{i}"))
                .filter(|m| before.get_node(m) != after.get_node(m))
                .count();

            // Ideal is 1/4; allow generous slack for ring variance.
            assert!(moved < total / 2, "{algorithm}: {moved} of {total} metrics moved");
        }
    }

    #[test]
    fn test_duplicate_nodes_ignored() {
        let mut nodes = carbon_nodes();
        nodes.push(Node::new("graphite-a", 4242));
        let ring = HashRing::build(nodes, RingAlgorithm::default()).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get_node("x.y.z").host(), "graphite-c");
    }

    #[test]
    fn test_algorithm_from_name() {
        assert_eq!(
            RingAlgorithm::from_name("carbon", 0).unwrap(),
            RingAlgorithm::Carbon { replicas: 100 }
        );
        assert_eq!(
            RingAlgorithm::from_name("", 50).unwrap(),
            RingAlgorithm::Carbon { replicas: 50 }
        );
        assert_eq!(RingAlgorithm::from_name("jump_fnv1a", 0).unwrap(), RingAlgorithm::JumpFnv1a);
        assert!(matches!(
            RingAlgorithm::from_name("fnv1a_ch", 100),
            Err(RingError::UnknownAlgorithm(_))
        ));
    }
}
