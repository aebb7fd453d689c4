//! Cluster Topology Snapshot
//!
//! Immutable view of the cluster as reported by one `CLUSTER NODES` call.

use super::types::{
    ClusterNode, NodeFlags, NodeRole, SlotRange, TOTAL_SLOTS, TopologyError, TopologyResult,
};
use tracing::{debug, warn};

/// Minimum number of fields in a `CLUSTER NODES` line before the slot list
const NODE_LINE_FIELDS: usize = 8;

/// Topology as observed at one point in time
///
/// `NotClustered` is returned for stores that do not run in cluster mode and is
/// distinct from a clustered view that happens to contain no nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologySnapshot {
    Clustered(Vec<ClusterNode>),
    NotClustered,
}

impl TopologySnapshot {
    pub fn clustered(nodes: Vec<ClusterNode>) -> Self {
        Self::Clustered(nodes)
    }

    /// Build a snapshot from a raw `CLUSTER NODES` reply
    ///
    /// Lines that cannot be parsed are skipped with a warning.
    pub fn from_cluster_nodes(reply: &str) -> Self {
        let mut nodes = Vec::new();
        for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match parse_node_line(line) {
                Ok(node) => nodes.push(node),
                Err(e) => warn!("Skipping cluster node entry: {} (line: {})", e, line),
            }
        }

        let snapshot = Self::Clustered(nodes);
        if snapshot.has_overlapping_masters() {
            warn!("Cluster topology reports overlapping master slot ranges");
        }
        debug!(
            "Parsed topology: {} nodes, {:.2}% slot coverage",
            snapshot.node_count(),
            snapshot.slot_coverage()
        );
        snapshot
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self, Self::Clustered(_))
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        match self {
            Self::Clustered(nodes) => nodes,
            Self::NotClustered => &[],
        }
    }

    pub fn masters(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes().iter().filter(|n| n.is_master())
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// First master whose ranges contain `slot`
    pub fn master_for_slot(&self, slot: u16) -> Option<&ClusterNode> {
        self.masters().find(|node| node.owns_slot(slot))
    }

    /// Number of distinct slots owned by some master
    pub fn covered_slots(&self) -> usize {
        self.slot_owner_counts().iter().filter(|&&c| c > 0).count()
    }

    pub fn has_full_coverage(&self) -> bool {
        self.covered_slots() == TOTAL_SLOTS as usize
    }

    /// Slot coverage percentage
    pub fn slot_coverage(&self) -> f64 {
        (self.covered_slots() as f64 / TOTAL_SLOTS as f64) * 100.0
    }

    /// True if any slot is claimed by more than one master
    pub fn has_overlapping_masters(&self) -> bool {
        self.slot_owner_counts().iter().any(|&c| c > 1)
    }

    fn slot_owner_counts(&self) -> Vec<u8> {
        let mut owners = vec![0u8; TOTAL_SLOTS as usize];
        for node in self.masters() {
            for range in &node.slots {
                for slot in range.start..=range.end {
                    owners[slot as usize] = owners[slot as usize].saturating_add(1);
                }
            }
        }
        owners
    }
}

/// Parse one `CLUSTER NODES` line
///
/// `<id> <ip:port@cport[,hostname]> <flags> <master> <ping-sent> <pong-recv> <epoch> <link-state> <slot>...`
pub fn parse_node_line(line: &str) -> TopologyResult<ClusterNode> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < NODE_LINE_FIELDS {
        return Err(TopologyError::Malformed(format!(
            "expected at least {} fields, got {}",
            NODE_LINE_FIELDS,
            fields.len()
        )));
    }

    let id = fields[0].to_string();
    let (host, port) = parse_address(fields[1])?;
    let (role, flags) = parse_flags(fields[2])?;
    let master_id = match fields[3] {
        "-" => None,
        id => Some(id.to_string()),
    };

    let mut slots = Vec::new();
    for entry in &fields[NODE_LINE_FIELDS..] {
        // [slot->-node] / [slot-<-node] mark migrating and importing slots
        if entry.starts_with('[') {
            continue;
        }
        match SlotRange::parse(entry) {
            Ok(range) => slots.push(range),
            Err(e) => warn!("Skipping slot entry of node {}: {}", id, e),
        }
    }

    if role == NodeRole::Replica && !slots.is_empty() {
        debug!("Replica {} reports slots, ignoring them", id);
        slots.clear();
    }

    Ok(ClusterNode {
        id,
        host,
        port,
        role,
        master_id,
        slots,
        flags,
    })
}

/// Split `ip:port@cport[,hostname]` into host and port (IPv6 aware)
fn parse_address(field: &str) -> TopologyResult<(String, u16)> {
    let addr = field.split(',').next().unwrap_or(field);
    let addr = addr.split('@').next().unwrap_or(addr);
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| TopologyError::Malformed(format!("invalid node address '{}'", field)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| TopologyError::Malformed(format!("invalid node port '{}'", field)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok((host.to_string(), port))
}

fn parse_flags(field: &str) -> TopologyResult<(NodeRole, NodeFlags)> {
    let mut role = None;
    let mut flags = NodeFlags::default();
    for flag in field.split(',') {
        match flag {
            "master" => role = Some(NodeRole::Master),
            "slave" | "replica" => role = Some(NodeRole::Replica),
            "myself" => flags.is_myself = true,
            "fail?" => flags.is_pfail = true,
            "fail" => flags.is_fail = true,
            "handshake" => flags.is_handshake = true,
            "noaddr" => flags.is_noaddr = true,
            _ => {}
        }
    }
    let role =
        role.ok_or_else(|| TopologyError::Malformed(format!("no role in flags '{}'", field)))?;
    Ok((role, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER_NODES: &str = "\
09596be5c2150ad93c51fdca1ff9116d1077e042 172.28.0.17:6379@16379 master - 0 1711678515085 7 connected 0-1671 2268 5461-7127 8620 10923-12588 15759
0e9d360631a20c27f629267bf3e01de8e8c4cbec 172.28.0.11:6379@16379 myself,master - 0 1711678514000 1 connected 1672-2267 2269-5460
5bafc7277da3038a8fbf01873179260351ed0a0a 172.28.0.13:6379@16379 master - 0 1711678515180 3 connected 12589-15758 15760-16383
c02d3f6210367e1b7bbfd131b5c2269520ef4f73 172.28.0.12:6379@16379 master - 0 1711678514044 2 connected 7128-8619 8621-10922
66e84ed6d7f28971cdf59d530c490561c64dda61 172.28.0.16:6379@16379 slave c02d3f6210367e1b7bbfd131b5c2269520ef4f73 0 1711678514561 2 connected
587ec020a7cd63397afe33d6e92ee975b4ab79a2 172.28.0.14:6379@16379 slave 5bafc7277da3038a8fbf01873179260351ed0a0a 0 1711678514562 3 connected
";

    #[test]
    fn test_parse_cluster_nodes() {
        let snapshot = TopologySnapshot::from_cluster_nodes(CLUSTER_NODES);

        assert!(snapshot.is_clustered());
        assert_eq!(snapshot.node_count(), 6);
        assert_eq!(snapshot.masters().count(), 4);
        assert!(snapshot.has_full_coverage());
        assert!(!snapshot.has_overlapping_masters());

        let nodes = snapshot.nodes();
        assert_eq!(nodes[0].slot_count(), 5008);
        assert_eq!(nodes[1].slot_count(), 3788);
        assert!(nodes[1].flags.is_myself);
        assert_eq!(nodes[0].host, "172.28.0.17");
        assert_eq!(nodes[0].port, 6379);

        let replica = &nodes[4];
        assert_eq!(replica.role, NodeRole::Replica);
        assert_eq!(
            replica.master_id.as_deref(),
            Some("c02d3f6210367e1b7bbfd131b5c2269520ef4f73")
        );
        assert!(replica.slots.is_empty());
    }

    #[test]
    fn test_master_for_slot() {
        let snapshot = TopologySnapshot::from_cluster_nodes(CLUSTER_NODES);

        assert_eq!(snapshot.master_for_slot(0).unwrap().port, 6379);
        assert_eq!(snapshot.master_for_slot(2268).unwrap().host, "172.28.0.17");
        assert_eq!(snapshot.master_for_slot(2269).unwrap().host, "172.28.0.11");
        assert_eq!(snapshot.master_for_slot(16383).unwrap().host, "172.28.0.13");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let reply = "\
garbage
07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 master - 0 1426238317239 4 connected 0-notaslot 10-20
e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:30001 handshake - 0 0 0 connected
67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 127.0.0.1:nope@31002 master - 0 0 2 connected 5461-10922
";
        let snapshot = TopologySnapshot::from_cluster_nodes(reply);

        assert_eq!(snapshot.node_count(), 1);
        let node = &snapshot.nodes()[0];
        assert_eq!(node.slots, vec![SlotRange { start: 10, end: 20 }]);
        assert_eq!(snapshot.covered_slots(), 11);
    }

    #[test]
    fn test_migration_markers_ignored() {
        let line = "292f8b365bb7edb5e285caf0b7e6ddc7265d2f4f 127.0.0.1:30003@31003 master - 0 1426238318243 3 connected 10923-16383 [10923->-67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1] [5461-<-07c37dfeb235213a872192d90877d0cd55635b91]";
        let node = parse_node_line(line).unwrap();
        assert_eq!(node.slots, vec![SlotRange { start: 10923, end: 16383 }]);
    }

    #[test]
    fn test_parse_ipv6_and_hostname() {
        let line = "0e9d360631a20c27f629267bf3e01de8e8c4cbec 2001:db8::1:7000@17000,redis-0.local master,fail? - 0 0 1 connected 0-100";
        let node = parse_node_line(line).unwrap();
        assert_eq!(node.host, "2001:db8::1");
        assert_eq!(node.port, 7000);
        assert_eq!(node.address(), "[2001:db8::1]:7000");
        assert!(node.flags.is_pfail);
        assert!(!node.flags.is_fail);
    }

    #[test]
    fn test_overlapping_and_partial_coverage() {
        let reply = "\
aaaa 10.0.0.1:7000@17000 master - 0 0 1 connected 0-8000
bbbb 10.0.0.2:7000@17000 master - 0 0 2 connected 7000-9000
";
        let snapshot = TopologySnapshot::from_cluster_nodes(reply);
        assert!(snapshot.has_overlapping_masters());
        assert_eq!(snapshot.covered_slots(), 9001);
        assert!(!snapshot.has_full_coverage());
    }

    #[test]
    fn test_not_clustered_is_distinct_from_empty_cluster() {
        let empty = TopologySnapshot::from_cluster_nodes("");
        assert!(empty.is_clustered());
        assert_eq!(empty.node_count(), 0);

        assert_ne!(empty, TopologySnapshot::NotClustered);
        assert!(!TopologySnapshot::NotClustered.is_clustered());
        assert_eq!(TopologySnapshot::NotClustered.slot_coverage(), 0.0);
    }
}
