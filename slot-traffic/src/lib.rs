//! # slot-traffic
//!
//! Generates continuous SET/GET traffic against a sharded Redis-compatible
//! store and reports, for every key, the hash slot and the master that owns it.
//!
//! ```rust,no_run
//! use slot_traffic::{MemoryConnector, TrafficConfig, TrafficLoop};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let config = TrafficConfig {
//!     max_iterations: Some(10),
//!     ..Default::default()
//! };
//! let mut traffic = TrafficLoop::new(MemoryConnector::simulated_cluster(3), config);
//! let stats = traffic.run(CancellationToken::new()).await;
//! println!("{}", stats);
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod logging;
pub mod store;
pub mod traffic;

pub use cluster::{
    ClusterNode, NodeRole, RoutingOutcome, SlotRange, TOTAL_SLOTS, TopologyError,
    TopologyFetcher, TopologySnapshot, hash_slot, resolve,
};
pub use config::{AppConfig, ConfigOverrides, LoggingConfig, RedisConfig, TrafficConfig};
pub use store::{
    Capability, ClusterIntrospection, ClusterNodesReply, MemoryConnector, RedisConnector,
    StoreConnection, StoreConnector, StoreError, StoreResult,
};
pub use traffic::{IterationReport, LoopState, OperationError, TrafficLoop, TrafficStats};
