#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use crate::cluster::hash_slot::*;
    use crate::cluster::resolver::*;
    use crate::cluster::topology::*;
    use crate::cluster::types::*;
    use crate::store::memory::simulated_cluster_nodes;

    fn sample_keys() -> Vec<String> {
        let mut keys: Vec<String> = (0..2000).map(|i| format!("key:{}", i)).collect();
        keys.push(String::new());
        keys.push("{}".to_string());
        keys.push("{".to_string());
        keys.push("}{".to_string());
        keys.push("timekey:20240101-120000-000001:0f1e2d3c".to_string());
        keys
    }

    #[test]
    fn test_slot_is_in_range_and_deterministic() {
        for key in sample_keys() {
            let slot = hash_slot(key.as_bytes());
            assert!(slot < TOTAL_SLOTS);
            assert_eq!(slot, hash_slot(key.as_bytes()));
        }
    }

    #[test]
    fn test_hash_tag_overrides_key() {
        for tag in ["user1000", "a", "{x", "timekey", "0"] {
            let expected = hash_slot(tag.as_bytes());
            assert_eq!(hash_slot(format!("{{{}}}", tag).as_bytes()), expected);
            assert_eq!(hash_slot(format!("prefix{{{}}}suffix", tag).as_bytes()), expected);
            assert_eq!(hash_slot(format!("{{{}}}:{{other}}", tag).as_bytes()), expected);
        }
    }

    #[test]
    fn test_hash_slot_distribution() {
        let mut slots = std::collections::HashSet::new();
        for i in 0..1000 {
            slots.insert(hash_slot_str(&format!("key:{}", i)));
        }
        assert!(slots.len() > 100);
    }

    #[test]
    fn test_full_coverage_never_misses() {
        let snapshot = TopologySnapshot::from_cluster_nodes(&simulated_cluster_nodes(5));
        assert!(snapshot.has_full_coverage());

        for key in sample_keys() {
            match resolve(key.as_bytes(), &snapshot) {
                RoutingOutcome::Resolved { node, slot } => {
                    assert!(node.is_master());
                    assert!(node.owns_slot(slot));
                }
                other => panic!("key {:?} not resolved: {:?}", key, other),
            }
        }

        // Every slot has exactly one owner
        for slot in 0..TOTAL_SLOTS {
            assert_eq!(snapshot.masters().filter(|n| n.owns_slot(slot)).count(), 1);
        }
    }

    #[test]
    fn test_gap_reports_node_not_found() {
        let snapshot = TopologySnapshot::from_cluster_nodes(
            "aaaa 10.0.0.1:7000@17000 master - 0 0 1 connected 0-8000",
        );

        assert!(snapshot.master_for_slot(9000).is_none());

        let key = (0..1_000_000)
            .map(|i| format!("probe:{}", i))
            .find(|k| hash_slot_str(k) == 9000)
            .expect("some probe key hashes to slot 9000");
        assert_eq!(
            resolve(key.as_bytes(), &snapshot),
            RoutingOutcome::NodeNotFound { slot: 9000 }
        );
    }

    #[test]
    fn test_not_clustered_for_every_key() {
        for key in sample_keys() {
            assert_eq!(
                resolve(key.as_bytes(), &TopologySnapshot::NotClustered),
                RoutingOutcome::NotClustered
            );
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let reply = "\
n1id 127.0.0.1:7000@17000 master - 0 0 1 connected 0-8191
n2id 127.0.0.2:7001@17001 master - 0 0 2 connected 8192-16383";
        let snapshot = TopologySnapshot::from_cluster_nodes(reply);

        match resolve(b"foo", &snapshot) {
            RoutingOutcome::Resolved { node, slot } => {
                assert_eq!(slot, 12182);
                assert_eq!(node.id, "n2id");
                assert_eq!(node.address(), "127.0.0.2:7001");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_migrating_slot_resolves_to_current_owner() {
        // Slot 12182 is being moved from n2 to n1 but still owned by n2
        let reply = "\
n1id 127.0.0.1:7000@17000 master - 0 0 1 connected 0-8191 [12182-<-n2id]
n2id 127.0.0.2:7001@17001 master - 0 0 2 connected 8192-16383 [12182->-n1id]";
        let snapshot = TopologySnapshot::from_cluster_nodes(reply);

        assert_eq!(
            resolve(b"foo", &snapshot).node().map(|n| n.id.as_str()),
            Some("n2id")
        );
    }
}
