//! Bucky: find misplaced metrics in Carbon clusters and move them.
//!
//! The binary talks to `buckyd` daemons over HTTP through [`client::BuckydClient`]
//! and drives the placement, planning and sync logic of `bucky-cluster`.

pub mod cli;
pub mod client;
pub mod commands;
pub mod render;
