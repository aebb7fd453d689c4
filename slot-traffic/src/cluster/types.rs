use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Total number of hash slots (Redis-compatible)
pub const TOTAL_SLOTS: u16 = 16384;

/// Node role as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Replica,
}

/// Node flags besides the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeFlags {
    pub is_myself: bool,
    /// `fail?` - failure suspected by the reporting node
    pub is_pfail: bool,
    pub is_fail: bool,
    pub is_handshake: bool,
    pub is_noaddr: bool,
}

/// Cluster node as observed in one topology snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Node ID (40 char hex name)
    pub id: String,
    pub host: String,
    pub port: u16,
    pub role: NodeRole,
    /// Master node ID (if this is a replica)
    pub master_id: Option<String>,
    /// Slot ranges served by this node (empty for replicas)
    pub slots: Vec<SlotRange>,
    pub flags: NodeFlags,
}

impl ClusterNode {
    pub fn is_master(&self) -> bool {
        self.role == NodeRole::Master
    }

    /// `host:port`, with IPv6 hosts bracketed
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn owns_slot(&self, slot: u16) -> bool {
        self.slots.iter().any(|range| range.contains(slot))
    }

    pub fn slot_count(&self) -> usize {
        self.slots.iter().map(|r| r.count() as usize).sum()
    }
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// Slot range (inclusive start, inclusive end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: u16,
    pub end: u16,
}

impl SlotRange {
    pub fn new(start: u16, end: u16) -> TopologyResult<Self> {
        if start > end || end >= TOTAL_SLOTS {
            return Err(TopologyError::InvalidSlotRange(start, end));
        }
        Ok(Self { start, end })
    }

    /// Parse a `CLUSTER NODES` slot entry (`N` or `N-M`)
    pub fn parse(entry: &str) -> TopologyResult<Self> {
        let malformed = || TopologyError::Malformed(format!("invalid slot entry '{}'", entry));
        let (start, end) = match entry.split_once('-') {
            Some((start, end)) => (start, end),
            None => (entry, entry),
        };
        let start = start.parse::<u16>().map_err(|_| malformed())?;
        let end = end.parse::<u16>().map_err(|_| malformed())?;
        Self::new(start, end)
    }

    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    pub fn count(&self) -> u16 {
        self.end - self.start + 1
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Topology error types
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Topology fetch failed: {0}")]
    Store(#[from] StoreError),
    #[error("Malformed topology entry: {0}")]
    Malformed(String),
    #[error("Invalid slot range: {0}-{1}")]
    InvalidSlotRange(u16, u16),
}

/// Topology result type
pub type TopologyResult<T> = Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_range_parse() {
        assert_eq!(SlotRange::parse("0-5460").unwrap(), SlotRange { start: 0, end: 5460 });
        assert_eq!(SlotRange::parse("8620").unwrap(), SlotRange { start: 8620, end: 8620 });

        assert!(SlotRange::parse("5460-0").is_err());
        assert!(SlotRange::parse("0-16384").is_err());
        assert!(SlotRange::parse("abc").is_err());
        assert!(SlotRange::parse("1-2-3").is_err());
    }

    #[test]
    fn test_slot_range_contains_is_inclusive() {
        let range = SlotRange::new(100, 200).unwrap();
        assert!(range.contains(100));
        assert!(range.contains(200));
        assert!(!range.contains(99));
        assert!(!range.contains(201));
        assert_eq!(range.count(), 101);
        assert_eq!(range.to_string(), "100-200");
    }

    #[test]
    fn test_node_address() {
        let mut node = ClusterNode {
            id: "a".repeat(40),
            host: "10.0.0.1".to_string(),
            port: 6379,
            role: NodeRole::Master,
            master_id: None,
            slots: vec![SlotRange::new(0, 99).unwrap(), SlotRange::new(200, 200).unwrap()],
            flags: NodeFlags::default(),
        };
        assert_eq!(node.address(), "10.0.0.1:6379");
        assert_eq!(node.slot_count(), 101);
        assert!(node.owns_slot(200));
        assert!(!node.owns_slot(150));

        node.host = "fe80::1".to_string();
        assert_eq!(node.to_string(), "[fe80::1]:6379");
    }
}
