//! Consistent hashing for Carbon metric placement.
//!
//! This crate provides deterministic `metric name → node` placement over a
//! fixed node set. Two processes that build a ring from the same node list
//! (in the same order) and the same algorithm agree on the owner of every
//! metric, which is what lets detection and planning reconstruct the routing
//! of a cluster independently of the daemons that serve it.
//!
//! # Usage
//!
//! ```
//! use bucky_core::Node;
//! use bucky_placement::{HashRing, RingAlgorithm};
//!
//! let nodes = vec![Node::new("graphite-a", 4242), Node::new("graphite-b", 4242)];
//! let ring = HashRing::build(nodes, RingAlgorithm::default()).unwrap();
//!
//! let owner = ring.get_node("servers.web01.cpu.user");
//! println!("owned by {}", owner.address());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod hash;
pub mod ring;

pub use hash::{carbon_position, fnv1a_64, jump_hash};
pub use ring::{HashRing, RingAlgorithm, RingError, DEFAULT_CARBON_REPLICAS};
