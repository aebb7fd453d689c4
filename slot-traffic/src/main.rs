//! slot-traffic
//!
//! Writes and reads time-ordered keys against a Redis-compatible store and
//! logs the hash slot and owning node of every key.

use anyhow::{Context, Result};
use clap::Parser;
use slot_traffic::config::{AppConfig, ConfigOverrides};
use slot_traffic::store::{MemoryConnector, RedisConnector};
use slot_traffic::{TrafficLoop, logging};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "slot-traffic")]
#[command(about = "Generate key/value traffic and report which shard owns each key", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed nodes (host:port, comma separated)
    #[arg(short, long, value_delimiter = ',')]
    nodes: Option<Vec<String>>,

    /// Target a single non-clustered endpoint
    #[arg(long)]
    standalone: bool,

    /// Username for AUTH
    #[arg(long, env = "REDIS_USERNAME")]
    username: Option<String>,

    /// Password for AUTH
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Connect over TLS
    #[arg(long)]
    tls: bool,

    /// PEM CA bundle used to verify the server certificate
    #[arg(long)]
    trust_store: Option<PathBuf>,

    /// Pause between iterations (milliseconds)
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Per-call timeout (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Stop after this many iterations
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Run against an in-process simulated store (a single endpoint with --standalone)
    #[arg(long)]
    dry_run: bool,

    /// Masters in the simulated cluster (with --dry-run)
    #[arg(long, default_value_t = 3)]
    dry_run_masters: usize,

    /// Log format (text or json)
    #[arg(long)]
    log_format: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            nodes: self.nodes.clone(),
            standalone: self.standalone,
            username: self.username.clone(),
            password: self.password.clone(),
            tls: self.tls,
            trust_store: self.trust_store.clone(),
            interval_ms: self.interval_ms,
            timeout_ms: self.timeout_ms,
            max_iterations: self.max_iterations,
            log_level: self.verbose.then(|| "debug".to_string()),
            log_format: self.log_format.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(cli.overrides());
    config.validate().context("Invalid configuration")?;

    logging::init(&config.logging)?;

    info!("Starting slot-traffic v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let stats = if cli.dry_run {
        let connector = MemoryConnector::dry_run(&config.redis, cli.dry_run_masters);
        TrafficLoop::new(connector, config.traffic.clone())
            .run(cancel)
            .await
    } else {
        let connector =
            RedisConnector::new(&config.redis).context("Failed to configure store client")?;
        TrafficLoop::new(connector, config.traffic.clone())
            .run(cancel)
            .await
    };

    info!("Done after {} iterations", stats.iterations);
    Ok(())
}
