use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub traffic: TrafficConfig,
    pub logging: LoggingConfig,
}

/// Target store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Seed nodes (`host:port`)
    pub nodes: Vec<String>,
    /// Connect with a cluster-aware client; `false` targets a single endpoint
    pub cluster_enabled: bool,
    /// MOVED/ASK redirects followed per command
    pub max_redirects: u32,
    pub username: String,
    pub password: String,
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// PEM encoded CA bundle used to verify the server certificate
    pub trust_store: Option<PathBuf>,
}

/// Traffic loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Pause between iterations (milliseconds)
    pub interval_ms: u64,
    /// Per-call timeout for every store request (milliseconds)
    pub timeout_ms: u64,
    pub key_prefix: String,
    /// Stop after this many iterations (unbounded if unset)
    pub max_iterations: Option<u64>,
    pub backoff: BackoffConfig,
}

/// Backoff applied after consecutive failed write/read attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub enabled: bool,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["127.0.0.1:7000".to_string()],
            cluster_enabled: true,
            max_redirects: 3,
            username: String::new(),
            password: String::new(),
            tls: TlsConfig::default(),
        }
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_ms: 3000,
            key_prefix: "timekey".to_string(),
            max_iterations: None,
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Values given on the command line, applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub nodes: Option<Vec<String>>,
    pub standalone: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub trust_store: Option<PathBuf>,
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_iterations: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(nodes) = overrides.nodes {
            self.redis.nodes = nodes;
        }
        if overrides.standalone {
            self.redis.cluster_enabled = false;
        }
        if let Some(username) = overrides.username {
            self.redis.username = username;
        }
        if let Some(password) = overrides.password {
            self.redis.password = password;
        }
        if overrides.tls {
            self.redis.tls.enabled = true;
        }
        if let Some(trust_store) = overrides.trust_store {
            self.redis.tls.trust_store = Some(trust_store);
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.traffic.interval_ms = interval_ms;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.traffic.timeout_ms = timeout_ms;
        }
        if let Some(max_iterations) = overrides.max_iterations {
            self.traffic.max_iterations = Some(max_iterations);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.redis.validate()?;
        self.traffic.validate()?;
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => bail!("Unknown log format '{}' (expected text or json)", other),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes.iter().all(|n| n.trim().is_empty()) {
            bail!("At least one store node must be configured");
        }
        for node in &self.nodes {
            let (_, port) = node
                .rsplit_once(':')
                .with_context(|| format!("Node '{}' must be in host:port form", node))?;
            port.parse::<u16>()
                .with_context(|| format!("Node '{}' has an invalid port", node))?;
        }
        Ok(())
    }

    pub fn username(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|u| !u.trim().is_empty())
    }

    pub fn password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|p| !p.trim().is_empty())
    }

    /// Trust store path, only when TLS is on
    pub fn trust_store(&self) -> Option<&Path> {
        if !self.tls.enabled {
            return None;
        }
        self.tls
            .trust_store
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms == 0 {
            bail!("traffic.interval_ms must be greater than zero");
        }
        if self.timeout_ms == 0 {
            bail!("traffic.timeout_ms must be greater than zero");
        }
        if self.key_prefix.is_empty() {
            bail!("traffic.key_prefix must not be empty");
        }
        if self.backoff.enabled {
            if self.backoff.multiplier.is_nan() || self.backoff.multiplier < 1.0 {
                bail!("traffic.backoff.multiplier must be at least 1.0");
            }
            if self.backoff.max_delay_ms < self.interval_ms {
                bail!("traffic.backoff.max_delay_ms must not be below traffic.interval_ms");
            }
        }
        Ok(())
    }

    /// Get iteration interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get per-call timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get maximum backoff delay as Duration
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.backoff.max_delay_ms)
    }
}
