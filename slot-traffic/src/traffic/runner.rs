use super::backoff::Backoff;
use super::keygen::KeyGenerator;
use super::types::{IterationReport, LoopState, OperationError, TrafficStats};
use crate::cluster::{RoutingOutcome, TopologyFetcher, resolve};
use crate::config::TrafficConfig;
use crate::store::{StoreConnection, StoreConnector, bounded};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Traffic Loop
///
/// Per iteration:
/// - Generates a fresh time-ordered key
/// - Resolves the owning node (best effort, never blocks the data plane)
/// - Writes the key, then reads it back
/// - Waits the configured interval (or backoff delay)
///
/// Iteration failures are logged and counted; only cancellation or the
/// optional iteration limit stops the loop.
pub struct TrafficLoop<C> {
    connector: C,
    config: TrafficConfig,
    fetcher: TopologyFetcher,
    keys: KeyGenerator,
    backoff: Backoff,
    state: LoopState,
    stats: TrafficStats,
}

impl<C: StoreConnector> TrafficLoop<C> {
    pub fn new(connector: C, config: TrafficConfig) -> Self {
        Self {
            fetcher: TopologyFetcher::new(config.timeout()),
            keys: KeyGenerator::new(config.key_prefix.clone()),
            backoff: Backoff::from_config(&config),
            connector,
            config,
            state: LoopState::Running,
            stats: TrafficStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &TrafficStats {
        &self.stats
    }

    /// Run until `cancel` fires or the iteration limit is reached
    ///
    /// In-flight store calls are abandoned on cancellation; dropping them
    /// releases their connections.
    pub async fn run(&mut self, cancel: CancellationToken) -> TrafficStats {
        info!(
            "Starting traffic generation against {} (interval {:?}, timeout {:?})",
            self.connector.describe(),
            self.config.interval(),
            self.config.timeout()
        );

        while self.state == LoopState::Running {
            if cancel.is_cancelled() || self.limit_reached() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.run_iteration() => {}
            }

            if self.limit_reached() {
                info!("Reached iteration limit of {}", self.stats.iterations);
                break;
            }

            let delay = self.backoff.delay();
            if delay > self.config.interval() {
                warn!(
                    "Backing off for {:?} after {} consecutive failures",
                    delay,
                    self.backoff.consecutive_failures()
                );
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state = LoopState::Stopped;
        info!("Traffic generation stopped: {}", self.stats);
        self.stats.clone()
    }

    /// Run a single iteration and record its outcome
    pub async fn run_iteration(&mut self) -> IterationReport {
        let entry = self.keys.next_entry();
        debug!(key = %entry.key, "Starting iteration {}", self.stats.iterations + 1);

        let routing = self.route(&entry.key).await;
        log_routing(&entry.key, &routing);

        let operation = self.write_then_read(&entry.key, &entry.value).await;
        match &operation {
            Ok(_) => self.backoff.record_success(),
            Err(e) => {
                error!(key = %entry.key, "Store operation failed: {}", e);
                self.backoff.record_failure();
            }
        }

        let report = IterationReport {
            key: entry.key,
            value: entry.value,
            routing,
            operation,
        };
        self.stats.record(&report);
        report
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_iterations
            .is_some_and(|max| self.stats.iterations >= max)
    }

    async fn route(&self, key: &str) -> RoutingOutcome {
        match self.fetcher.fetch(&self.connector).await {
            Ok(snapshot) => resolve(key.as_bytes(), &snapshot),
            Err(e) => RoutingOutcome::ResolutionError {
                cause: e.to_string(),
            },
        }
    }

    async fn write_then_read(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, OperationError> {
        let timeout = self.config.timeout();
        let mut conn = bounded(timeout, self.connector.open())
            .await
            .map_err(OperationError::Connect)?;

        let result = exercise(&mut conn, key, value, timeout).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to release store connection: {}", e);
        }
        result
    }
}

async fn exercise<T: StoreConnection>(
    conn: &mut T,
    key: &str,
    value: &str,
    timeout: Duration,
) -> Result<Option<String>, OperationError> {
    bounded(timeout, conn.set(key, value))
        .await
        .map_err(|source| OperationError::Write {
            key: key.to_string(),
            source,
        })?;
    info!(key = %key, "Key written");

    let read = bounded(timeout, conn.get(key))
        .await
        .map_err(|source| OperationError::Read {
            key: key.to_string(),
            source,
        })?;
    match &read {
        Some(found) => info!(key = %key, value = %found, "Key read"),
        None => warn!(key = %key, "Key read returned no value"),
    }
    Ok(read)
}

fn log_routing(key: &str, routing: &RoutingOutcome) {
    match routing {
        RoutingOutcome::Resolved { node, slot } => {
            info!(key = %key, slot, node = %node, "Key routed to target node");
        }
        RoutingOutcome::NodeNotFound { slot } => {
            warn!(
                key = %key,
                slot,
                "No master owns the slot (topology may need a refresh)"
            );
        }
        RoutingOutcome::NotClustered => {
            info!(key = %key, "Store is not clustered, key goes to the single endpoint");
        }
        RoutingOutcome::ResolutionError { cause } => {
            warn!(key = %key, "Could not resolve target node: {}", cause);
        }
    }
}
