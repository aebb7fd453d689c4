//! Slot Resolver
//!
//! Maps a key to the master that owns its slot in a given snapshot.

use super::hash_slot::hash_slot;
use super::topology::TopologySnapshot;
use super::types::ClusterNode;
use std::fmt;

/// Routing decision for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// A master owns the key's slot
    Resolved { node: ClusterNode, slot: u16 },
    /// No master owns the slot: stale snapshot or slot migration in progress
    NodeNotFound { slot: u16 },
    /// Single endpoint, no sharding
    NotClustered,
    /// Topology could not be fetched
    ResolutionError { cause: String },
}

impl RoutingOutcome {
    pub fn slot(&self) -> Option<u16> {
        match self {
            Self::Resolved { slot, .. } | Self::NodeNotFound { slot } => Some(*slot),
            Self::NotClustered | Self::ResolutionError { .. } => None,
        }
    }

    pub fn node(&self) -> Option<&ClusterNode> {
        match self {
            Self::Resolved { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for RoutingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { node, slot } => write!(f, "slot {} -> {}", slot, node),
            Self::NodeNotFound { slot } => write!(f, "slot {} -> no owning master", slot),
            Self::NotClustered => f.write_str("not clustered (single endpoint)"),
            Self::ResolutionError { cause } => write!(f, "resolution failed: {}", cause),
        }
    }
}

/// Resolve `key` against `snapshot`
///
/// Master ranges never overlap in a healthy topology, so the first match is
/// the only match.
pub fn resolve(key: &[u8], snapshot: &TopologySnapshot) -> RoutingOutcome {
    if !snapshot.is_clustered() {
        return RoutingOutcome::NotClustered;
    }

    let slot = hash_slot(key);
    match snapshot.master_for_slot(slot) {
        Some(node) => RoutingOutcome::Resolved {
            node: node.clone(),
            slot,
        },
        None => RoutingOutcome::NodeNotFound { slot },
    }
}
