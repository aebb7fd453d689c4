//! Common test utilities

use slot_traffic::TrafficConfig;
use slot_traffic::config::BackoffConfig;

/// Traffic config with short timings for tests
#[allow(dead_code)] // Used by other test modules
pub fn fast_config(max_iterations: Option<u64>) -> TrafficConfig {
    TrafficConfig {
        interval_ms: 1,
        timeout_ms: 500,
        key_prefix: "testkey".to_string(),
        max_iterations,
        backoff: BackoffConfig::default(),
    }
}

/// Two masters splitting the slot space in half, each with a replica
#[allow(dead_code)] // Used by other test modules
pub const TWO_MASTERS: &str = "\
1111111111111111111111111111111111111111 n1:7000@17000 myself,master - 0 0 1 connected 0-8191
2222222222222222222222222222222222222222 n2:7001@17001 master - 0 0 2 connected 8192-16383
3333333333333333333333333333333333333333 n3:7002@17002 slave 1111111111111111111111111111111111111111 0 0 1 connected
4444444444444444444444444444444444444444 n4:7003@17003 slave 2222222222222222222222222222222222222222 0 0 2 connected";

/// Only the first half of the slot space is served
#[allow(dead_code)] // Used by other test modules
pub const HALF_COVERED: &str =
    "1111111111111111111111111111111111111111 n1:7000@17000 master - 0 0 1 connected 0-8191";
