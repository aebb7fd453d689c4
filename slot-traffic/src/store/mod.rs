//! Store connection capability
//!
//! The traffic loop and topology fetcher only see these traits, so the
//! redis-backed implementation and the in-memory one are interchangeable.

pub mod memory;
pub mod redis_store;

pub use self::memory::MemoryConnector;
pub use self::redis_store::{RedisConnection, RedisConnector};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Store error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Command error: {0}")]
    Command(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Reply to a cluster introspection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterNodesReply {
    /// Raw `CLUSTER NODES` text
    Nodes(String),
    /// The store answered but cluster support is disabled
    NotClustered,
}

/// Cluster-only capability of a connection
#[async_trait]
pub trait ClusterIntrospection: Send {
    async fn cluster_nodes(&mut self) -> StoreResult<ClusterNodesReply>;
}

/// What a connection can do besides GET/SET
pub enum Capability<'a> {
    Clustered(&'a mut dyn ClusterIntrospection),
    Simple,
}

/// A single checked-out connection
#[async_trait]
pub trait StoreConnection: Send + Sized {
    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    fn capability(&mut self) -> Capability<'_>;

    /// Release the connection back to its owner
    async fn close(self) -> StoreResult<()>;
}

/// Source of store connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Connection: StoreConnection;

    async fn open(&self) -> StoreResult<Self::Connection>;

    /// Human readable target, used in logs
    fn describe(&self) -> String;
}

/// Bound a store call with a timeout
pub async fn bounded<T, F>(timeout: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
}
