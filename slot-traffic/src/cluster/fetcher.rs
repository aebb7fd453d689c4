//! Topology Fetcher
//!
//! Asks the store for its current node list and turns it into a snapshot.

use super::topology::TopologySnapshot;
use super::types::TopologyResult;
use crate::store::{Capability, ClusterNodesReply, StoreConnection, StoreConnector, bounded};
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches a fresh topology snapshot per call
///
/// Never retries; retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct TopologyFetcher {
    timeout: Duration,
}

impl TopologyFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Open a connection, introspect the cluster and release the connection
    ///
    /// The connection is closed on every path, including transport failures.
    pub async fn fetch<C: StoreConnector>(
        &self,
        connector: &C,
    ) -> TopologyResult<TopologySnapshot> {
        let mut conn = bounded(self.timeout, connector.open()).await?;
        let result = self.fetch_from(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to release topology connection: {}", e);
        }
        result
    }

    async fn fetch_from<T: StoreConnection>(
        &self,
        conn: &mut T,
    ) -> TopologyResult<TopologySnapshot> {
        let introspect = match conn.capability() {
            Capability::Clustered(introspect) => introspect,
            Capability::Simple => {
                debug!("Connection has no cluster capability");
                return Ok(TopologySnapshot::NotClustered);
            }
        };

        match bounded(self.timeout, introspect.cluster_nodes()).await? {
            ClusterNodesReply::Nodes(reply) => Ok(TopologySnapshot::from_cluster_nodes(&reply)),
            ClusterNodesReply::NotClustered => {
                debug!("Store reports cluster support disabled");
                Ok(TopologySnapshot::NotClustered)
            }
        }
    }
}
