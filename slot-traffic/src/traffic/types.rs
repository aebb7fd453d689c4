use crate::cluster::RoutingOutcome;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Traffic loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal, reached only through cancellation or the iteration limit
    Stopped,
}

/// Data-plane failure of one iteration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Failed to open store connection: {0}")]
    Connect(StoreError),
    #[error("Write failed for key {key}: {source}")]
    Write { key: String, source: StoreError },
    #[error("Read failed for key {key}: {source}")]
    Read { key: String, source: StoreError },
}

impl OperationError {
    pub fn cause(&self) -> &StoreError {
        match self {
            Self::Connect(source) | Self::Write { source, .. } | Self::Read { source, .. } => {
                source
            }
        }
    }
}

/// Result of one iteration
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub key: String,
    pub value: String,
    pub routing: RoutingOutcome,
    /// Value read back after the write
    pub operation: Result<Option<String>, OperationError>,
}

impl IterationReport {
    pub fn write_succeeded(&self) -> bool {
        matches!(self.operation, Ok(_) | Err(OperationError::Read { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.operation.is_ok()
    }
}

/// Counters accumulated over the lifetime of a loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub iterations: u64,
    pub writes: u64,
    pub reads: u64,
    /// Read returned a value different from the one written
    pub mismatches: u64,
    pub connect_failures: u64,
    pub write_failures: u64,
    pub read_failures: u64,
    pub resolved: u64,
    pub node_not_found: u64,
    pub not_clustered: u64,
    pub resolution_errors: u64,
}

impl TrafficStats {
    pub fn record(&mut self, report: &IterationReport) {
        self.iterations += 1;

        match &report.routing {
            RoutingOutcome::Resolved { .. } => self.resolved += 1,
            RoutingOutcome::NodeNotFound { .. } => self.node_not_found += 1,
            RoutingOutcome::NotClustered => self.not_clustered += 1,
            RoutingOutcome::ResolutionError { .. } => self.resolution_errors += 1,
        }

        match &report.operation {
            Ok(read) => {
                self.writes += 1;
                self.reads += 1;
                if read.as_deref() != Some(report.value.as_str()) {
                    self.mismatches += 1;
                }
            }
            Err(OperationError::Connect(_)) => self.connect_failures += 1,
            Err(OperationError::Write { .. }) => self.write_failures += 1,
            Err(OperationError::Read { .. }) => {
                self.writes += 1;
                self.read_failures += 1;
            }
        }
    }

    pub fn failures(&self) -> u64 {
        self.connect_failures + self.write_failures + self.read_failures
    }
}

impl fmt::Display for TrafficStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} writes={} reads={} mismatches={} failures={} (connect={} write={} read={}) routing: resolved={} not_found={} not_clustered={} errors={}",
            self.iterations,
            self.writes,
            self.reads,
            self.mismatches,
            self.failures(),
            self.connect_failures,
            self.write_failures,
            self.read_failures,
            self.resolved,
            self.node_not_found,
            self.not_clustered,
            self.resolution_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(
        routing: RoutingOutcome,
        operation: Result<Option<String>, OperationError>,
    ) -> IterationReport {
        IterationReport {
            key: "k".to_string(),
            value: "v".to_string(),
            routing,
            operation,
        }
    }

    #[test]
    fn test_stats_record() {
        let mut stats = TrafficStats::default();
        stats.record(&report(RoutingOutcome::NotClustered, Ok(Some("v".to_string()))));
        stats.record(&report(
            RoutingOutcome::NodeNotFound { slot: 1 },
            Ok(Some("other".to_string())),
        ));
        stats.record(&report(
            RoutingOutcome::ResolutionError {
                cause: "down".to_string(),
            },
            Err(OperationError::Read {
                key: "k".to_string(),
                source: StoreError::Connection("reset".to_string()),
            }),
        ));
        stats.record(&report(
            RoutingOutcome::NotClustered,
            Err(OperationError::Connect(StoreError::Connection("refused".to_string()))),
        ));

        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.writes, 3);
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.mismatches, 1);
        assert_eq!(stats.read_failures, 1);
        assert_eq!(stats.connect_failures, 1);
        assert_eq!(stats.failures(), 2);
        assert_eq!(stats.not_clustered, 2);
        assert_eq!(stats.node_not_found, 1);
        assert_eq!(stats.resolution_errors, 1);
    }

    #[test]
    fn test_write_succeeded() {
        let read_failure = report(
            RoutingOutcome::NotClustered,
            Err(OperationError::Read {
                key: "k".to_string(),
                source: StoreError::Timeout(std::time::Duration::from_secs(3)),
            }),
        );
        assert!(read_failure.write_succeeded());
        assert!(!read_failure.is_success());

        let write_failure = report(
            RoutingOutcome::NotClustered,
            Err(OperationError::Write {
                key: "k".to_string(),
                source: StoreError::Command("READONLY".to_string()),
            }),
        );
        assert!(!write_failure.write_succeeded());
    }
}
