//! Cluster routing - hash slots, topology and ownership lookup
//!
//! Implements the client side of Redis-style cluster routing:
//! - Hash slot algorithm (CRC16 mod 16384, hash tags)
//! - `CLUSTER NODES` parsing into immutable topology snapshots
//! - Key to owning master resolution

pub mod fetcher;
pub mod hash_slot;
pub mod resolver;
pub mod topology;
pub mod types;

pub use fetcher::TopologyFetcher;
pub use hash_slot::{hash_slot, hash_slot_str};
pub use resolver::{RoutingOutcome, resolve};
pub use topology::TopologySnapshot;
pub use types::{
    ClusterNode, NodeFlags, NodeRole, SlotRange, TOTAL_SLOTS, TopologyError, TopologyResult,
};

#[cfg(test)]
mod tests;
