//! Redis / Valkey / ElastiCache backed store connections
//!
//! Cluster mode uses the async cluster client (follows MOVED/ASK up to
//! `max_redirects`), standalone mode a reconnecting connection manager.
//! Both are multiplexed, so one shared handle is created lazily and every
//! `open()` hands out a clone of it.
//!
//! A cluster client pointed at a server without cluster support falls back to
//! a single-endpoint connection on the first seed node.

use super::{
    Capability, ClusterIntrospection, ClusterNodesReply, StoreConnection, StoreConnector,
    StoreError, StoreResult,
};
use crate::config::RedisConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster::{ClusterClient, ClusterClientBuilder};
use redis::cluster_async::ClusterConnection;
use redis::{AsyncCommands, Client, IntoConnectionInfo, RedisError, RedisResult, TlsCertificates};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

enum Target {
    Cluster {
        client: ClusterClient,
        /// First seed node, used when the server runs without cluster support
        seed: Client,
    },
    Standalone(Client),
}

/// Connector for a real Redis-compatible deployment
pub struct RedisConnector {
    target: Target,
    shared: OnceCell<RedisConnection>,
    description: String,
}

/// Checked-out handle on the shared multiplexed connection
#[derive(Clone)]
pub enum RedisConnection {
    Cluster(ClusterConnection),
    Standalone(ConnectionManager),
}

impl RedisConnector {
    /// Build the client. No network traffic happens until the first `open()`.
    pub fn new(config: &RedisConfig) -> StoreResult<Self> {
        let nodes: Vec<&str> = config
            .nodes
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if nodes.is_empty() {
            return Err(StoreError::Config("no store nodes configured".to_string()));
        }

        let scheme = if config.tls.enabled { "rediss" } else { "redis" };

        info!(
            "Configuring store client: nodes={}, cluster={}, tls={}, user={}",
            nodes.join(","),
            config.cluster_enabled,
            config.tls.enabled,
            config.username().unwrap_or("-")
        );

        let target = if config.cluster_enabled {
            let urls: Vec<String> = nodes
                .iter()
                .map(|node| format!("{}://{}", scheme, node))
                .collect();
            let mut builder = ClusterClientBuilder::new(urls).retries(config.max_redirects);
            if let Some(username) = config.username() {
                builder = builder.username(username.to_string());
            }
            if let Some(password) = config.password() {
                builder = builder.password(password.to_string());
            }
            if let Some(certificates) = load_certificates(config)? {
                builder = builder.certs(certificates);
            }
            Target::Cluster {
                client: builder.build()?,
                seed: single_endpoint_client(config, scheme, nodes[0])?,
            }
        } else {
            if nodes.len() > 1 {
                debug!("Standalone mode uses only the first node ({})", nodes[0]);
            }
            Target::Standalone(single_endpoint_client(config, scheme, nodes[0])?)
        };

        let mode = if config.cluster_enabled { "cluster" } else { "standalone" };
        Ok(Self {
            target,
            shared: OnceCell::new(),
            description: format!("{} {}", mode, nodes.join(",")),
        })
    }

    async fn connect(&self) -> StoreResult<RedisConnection> {
        let connection = match &self.target {
            Target::Cluster { client, seed } => match client.get_async_connection().await {
                Ok(conn) => RedisConnection::Cluster(conn),
                Err(e) if should_try_seed(&e) => fall_back_to_seed(seed, e).await?,
                Err(e) => return Err(e.into()),
            },
            Target::Standalone(client) => {
                RedisConnection::Standalone(client.get_connection_manager().await?)
            }
        };
        info!("Connected to {}", self.description);
        Ok(connection)
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    type Connection = RedisConnection;

    async fn open(&self) -> StoreResult<RedisConnection> {
        let shared = self.shared.get_or_try_init(|| self.connect()).await?;
        Ok(shared.clone())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        match self {
            Self::Cluster(conn) => conn.set::<_, _, ()>(key, value).await?,
            Self::Standalone(conn) => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let value = match self {
            Self::Cluster(conn) => conn.get::<_, Option<String>>(key).await?,
            Self::Standalone(conn) => conn.get::<_, Option<String>>(key).await?,
        };
        Ok(value)
    }

    fn capability(&mut self) -> Capability<'_> {
        match self {
            Self::Cluster(_) => Capability::Clustered(self),
            Self::Standalone(_) => Capability::Simple,
        }
    }

    async fn close(self) -> StoreResult<()> {
        // Dropping the clone releases it; the shared pipeline stays up.
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl ClusterIntrospection for RedisConnection {
    async fn cluster_nodes(&mut self) -> StoreResult<ClusterNodesReply> {
        let conn = match self {
            Self::Cluster(conn) => conn,
            Self::Standalone(_) => return Ok(ClusterNodesReply::NotClustered),
        };

        let reply: RedisResult<String> =
            redis::cmd("CLUSTER").arg("NODES").query_async(conn).await;
        match reply {
            Ok(text) => Ok(ClusterNodesReply::Nodes(text)),
            Err(e) if is_cluster_disabled(&e) => Ok(ClusterNodesReply::NotClustered),
            Err(e) => Err(e.into()),
        }
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if is_transport_error(&err) {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

fn is_transport_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
}

fn is_cluster_disabled(err: &RedisError) -> bool {
    err.to_string().contains("cluster support disabled")
}

/// The cluster handshake got an answer but failed, so the seed may be a
/// plain server. Unreachable nodes are not worth a second attempt.
fn should_try_seed(err: &RedisError) -> bool {
    !is_transport_error(err)
}

fn seed_is_standalone(probe: &RedisResult<String>) -> bool {
    matches!(probe, Err(e) if is_cluster_disabled(e))
}

/// Use the seed as a single endpoint if it reports cluster support disabled,
/// otherwise surface the original handshake error
async fn fall_back_to_seed(
    seed: &Client,
    cluster_err: RedisError,
) -> StoreResult<RedisConnection> {
    let mut conn = match seed.get_connection_manager().await {
        Ok(conn) => conn,
        Err(e) => {
            debug!("Seed node unreachable after cluster handshake failure: {}", e);
            return Err(cluster_err.into());
        }
    };

    let probe: RedisResult<String> =
        redis::cmd("CLUSTER").arg("NODES").query_async(&mut conn).await;
    if seed_is_standalone(&probe) {
        warn!("Seed node has cluster support disabled, using it as a single endpoint");
        Ok(RedisConnection::Standalone(conn))
    } else {
        Err(cluster_err.into())
    }
}

fn single_endpoint_client(config: &RedisConfig, scheme: &str, node: &str) -> StoreResult<Client> {
    let mut info = format!("{}://{}", scheme, node).into_connection_info()?;
    info.redis.username = config.username().map(str::to_string);
    info.redis.password = config.password().map(str::to_string);
    let client = match load_certificates(config)? {
        Some(certificates) => Client::build_with_tls(info, certificates)?,
        None => Client::open(info)?,
    };
    Ok(client)
}

fn load_certificates(config: &RedisConfig) -> StoreResult<Option<TlsCertificates>> {
    let Some(path) = config.trust_store() else {
        return Ok(None);
    };
    let root_cert = std::fs::read(path).map_err(|e| {
        StoreError::Config(format!("failed to read trust store {}: {}", path.display(), e))
    })?;
    Ok(Some(TlsCertificates {
        client_tls: None,
        root_cert: Some(root_cert),
    }))
}
