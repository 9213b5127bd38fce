//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use taxfolio::RebalanceConfig;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub inputs: InputsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Paths of the CSV input files. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
    #[serde(default = "default_accounts")]
    pub accounts: PathBuf,
    #[serde(default = "default_holdings")]
    pub holdings: PathBuf,
    #[serde(default = "default_prices")]
    pub prices: PathBuf,
}

fn default_assets() -> PathBuf {
    "assets.csv".into()
}
fn default_accounts() -> PathBuf {
    "accounts.csv".into()
}
fn default_holdings() -> PathBuf {
    "holdings.csv".into()
}
fn default_prices() -> PathBuf {
    "prices.csv".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_threshold")]
    pub threshold_fraction: f64,
    #[serde(default = "default_weight_tolerance")]
    pub weight_tolerance: f64,
    #[serde(default = "default_slack")]
    pub slack_shares: u64,
}

fn default_threshold() -> f64 {
    0.05
}
fn default_weight_tolerance() -> f64 {
    0.01
}
fn default_slack() -> u64 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: default_threshold(),
            weight_tolerance: default_weight_tolerance(),
            slack_shares: default_slack(),
        }
    }
}

impl From<&EngineConfig> for RebalanceConfig {
    fn from(e: &EngineConfig) -> Self {
        RebalanceConfig {
            threshold_fraction: e.threshold_fraction,
            weight_tolerance: e.weight_tolerance,
            slack_shares: e.slack_shares,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        let engine = self.rebalance_config();
        engine
            .validate()
            .map_err(|e| Error::Config(format!("[engine] {e}")))?;
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Engine settings as the core library's value object.
    pub fn rebalance_config(&self) -> RebalanceConfig {
        RebalanceConfig::from(&self.engine)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
