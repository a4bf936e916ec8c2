use serde::Deserialize;
use std::path::PathBuf;

/// File name of the data file inside `database.dir`.
pub const DATABASE_FILE: &str = "traffic.db";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Default the log filter to `debug` when `RUST_LOG` is unset.
    #[serde(default)]
    pub debug: bool,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub dir: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    /// Required free space before a new data file is created. 0 disables the check.
    #[serde(default = "default_min_free_space_mib")]
    pub min_free_space_mib: u64,
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

fn default_max_pool_size() -> u32 {
    1
}

fn default_min_free_space_mib() -> u64 {
    1
}

fn default_create_if_missing() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_secs: u64,
    /// How often to log worker stats at INFO level.
    pub stats_log_interval_secs: u64,
    /// Interfaces to account. Empty accounts every interface found.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "trafficd.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn database_file(&self) -> PathBuf {
        PathBuf::from(&self.database.dir).join(DATABASE_FILE)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.dir.is_empty(),
            "database.dir must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_secs > 0,
            "monitoring.sample_interval_secs must be > 0, got {}",
            self.monitoring.sample_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.interfaces.iter().all(|i| !i.is_empty()),
            "monitoring.interfaces must not contain empty names"
        );
        Ok(())
    }
}
