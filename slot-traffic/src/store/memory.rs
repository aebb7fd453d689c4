//! In-process store used for dry runs and tests
//!
//! Serves GET/SET from a map and answers cluster introspection with a
//! configurable `CLUSTER NODES` reply. Faults can be switched on per call kind.

use super::{
    Capability, ClusterIntrospection, ClusterNodesReply, StoreConnection, StoreConnector,
    StoreError, StoreResult,
};
use crate::cluster::types::TOTAL_SLOTS;
use crate::config::RedisConfig;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// How the simulated store presents itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryMode {
    /// Cluster mode, answering `CLUSTER NODES` with this text
    Cluster(String),
    /// Cluster-capable client, but the server reports cluster support disabled
    ClusterDisabled,
    /// Plain single endpoint
    Standalone,
}

/// Keys kept before the oldest ones are evicted
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Bounded key/value map, evicting in insertion order
struct Entries {
    values: HashMap<String, String>,
    order: VecDeque<String>,
    max_entries: usize,
}

impl Entries {
    fn insert(&mut self, key: &str, value: &str) {
        if self.values.insert(key.to_string(), value.to_string()).is_none() {
            self.order.push_back(key.to_string());
        }
        self.evict();
    }

    fn evict(&mut self) {
        while self.values.len() > self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.values.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[derive(Default)]
struct Faults {
    open: AtomicBool,
    topology: AtomicBool,
    set: AtomicBool,
    get: AtomicBool,
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    closed: AtomicU64,
    topology_requests: AtomicU64,
    sets: AtomicU64,
    gets: AtomicU64,
}

struct MemoryState {
    mode: RwLock<MemoryMode>,
    data: Mutex<Entries>,
    faults: Faults,
    counters: Counters,
}

/// Connector for the in-process store
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
}

impl MemoryConnector {
    pub fn new(mode: MemoryMode) -> Self {
        Self {
            state: Arc::new(MemoryState {
                mode: RwLock::new(mode),
                data: Mutex::new(Entries {
                    values: HashMap::new(),
                    order: VecDeque::new(),
                    max_entries: DEFAULT_MAX_ENTRIES,
                }),
                faults: Faults::default(),
                counters: Counters::default(),
            }),
        }
    }

    /// Cluster with `masters` masters splitting the slot space evenly, one replica each
    pub fn simulated_cluster(masters: usize) -> Self {
        Self::new(MemoryMode::Cluster(simulated_cluster_nodes(masters)))
    }

    pub fn standalone() -> Self {
        Self::new(MemoryMode::Standalone)
    }

    /// Simulated stand-in for the store described by `config`
    pub fn dry_run(config: &RedisConfig, masters: usize) -> Self {
        if config.cluster_enabled {
            Self::simulated_cluster(masters)
        } else {
            Self::standalone()
        }
    }

    /// Keep at most `max` keys, dropping the oldest first
    pub fn with_max_entries(self, max: usize) -> Self {
        {
            let mut data = self.state.data.lock();
            data.max_entries = max;
            data.evict();
        }
        self
    }

    /// Replace the topology reported from now on
    pub fn set_mode(&self, mode: MemoryMode) {
        *self.state.mode.write() = mode;
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.faults.open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_topology(&self, fail: bool) {
        self.state.faults.topology.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.state.faults.set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_get(&self, fail: bool) {
        self.state.faults.get.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.state.data.lock().values.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.data.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn opened(&self) -> u64 {
        self.state.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.state.counters.closed.load(Ordering::SeqCst)
    }

    pub fn topology_requests(&self) -> u64 {
        self.state.counters.topology_requests.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> u64 {
        self.state.counters.sets.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> u64 {
        self.state.counters.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn open(&self) -> StoreResult<MemoryConnection> {
        if self.state.faults.open.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        self.state.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            state: Arc::clone(&self.state),
        })
    }

    fn describe(&self) -> String {
        match &*self.state.mode.read() {
            MemoryMode::Cluster(_) => "in-memory cluster".to_string(),
            MemoryMode::ClusterDisabled | MemoryMode::Standalone => {
                "in-memory standalone".to_string()
            }
        }
    }
}

/// Connection to the in-process store
pub struct MemoryConnection {
    state: Arc<MemoryState>,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.state.counters.sets.fetch_add(1, Ordering::SeqCst);
        if self.state.faults.set.load(Ordering::SeqCst) {
            return Err(StoreError::Command(
                "READONLY You can't write against a read only replica.".to_string(),
            ));
        }
        self.state.data.lock().insert(key, value);
        Ok(())
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.state.counters.gets.fetch_add(1, Ordering::SeqCst);
        if self.state.faults.get.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection reset by peer".to_string()));
        }
        Ok(self.state.data.lock().values.get(key).cloned())
    }

    fn capability(&mut self) -> Capability<'_> {
        let standalone = *self.state.mode.read() == MemoryMode::Standalone;
        if standalone {
            Capability::Simple
        } else {
            Capability::Clustered(self)
        }
    }

    async fn close(self) -> StoreResult<()> {
        self.state.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ClusterIntrospection for MemoryConnection {
    async fn cluster_nodes(&mut self) -> StoreResult<ClusterNodesReply> {
        self.state
            .counters
            .topology_requests
            .fetch_add(1, Ordering::SeqCst);
        if self.state.faults.topology.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("topology request failed".to_string()));
        }
        let reply = match &*self.state.mode.read() {
            MemoryMode::Cluster(text) => ClusterNodesReply::Nodes(text.clone()),
            MemoryMode::ClusterDisabled | MemoryMode::Standalone => {
                ClusterNodesReply::NotClustered
            }
        };
        Ok(reply)
    }
}

/// Render a `CLUSTER NODES` reply for an evenly split local cluster
pub fn simulated_cluster_nodes(masters: usize) -> String {
    let masters = masters.clamp(1, TOTAL_SLOTS as usize);
    let slots_per_node = TOTAL_SLOTS as usize / masters;
    let mut lines = Vec::with_capacity(masters * 2);

    for i in 0..masters {
        let master_id = format!("{:040x}", i + 1);
        let replica_id = format!("{:040x}", masters + i + 1);
        let start = i * slots_per_node;
        let end = if i == masters - 1 {
            TOTAL_SLOTS as usize - 1
        } else {
            start + slots_per_node - 1
        };
        let flags = if i == 0 { "myself,master" } else { "master" };

        lines.push(format!(
            "{} 127.0.0.1:{}@{} {} - 0 0 {} connected {}-{}",
            master_id,
            7000 + i,
            17000 + i,
            flags,
            i + 1,
            start,
            end
        ));
        lines.push(format!(
            "{} 127.0.0.1:{}@{} slave {} 0 0 {} connected",
            replica_id,
            7100 + i,
            17100 + i,
            master_id,
            i + 1
        ));
    }

    lines.join("\n")
}
