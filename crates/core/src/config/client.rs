//! Client runtime configuration with profile support.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting a built-in profile.
pub const PROFILE_ENV: &str = "DSC_PROFILE";

/// Environment variable pointing at a TOML config file.
pub const CONFIG_PATH_ENV: &str = "DSC_CONFIG";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Protocol stats refresh and cache
    #[serde(default)]
    pub stats: StatsConfig,

    /// Transaction submission
    #[serde(default)]
    pub transactions: TransactionConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Protocol stats refresh and cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// How long cached stats are served without chain reads (seconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Trailing window scanned for liquidations (blocks)
    #[serde(default = "default_liquidation_window")]
    pub liquidation_window_blocks: u64,

    /// Directory holding the persisted cache record. In-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

fn default_cache_ttl() -> u64 {
    120
}
fn default_liquidation_window() -> u64 {
    7200
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            liquidation_window_blocks: default_liquidation_window(),
            cache_dir: None,
        }
    }
}

impl StatsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Transaction submission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Blocks required before a transaction counts as confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Receipt polling interval while waiting (milliseconds)
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,
}

fn default_confirmations() -> u64 {
    1
}
fn default_receipt_poll_interval() -> u64 {
    1000
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            confirmations: default_confirmations(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
        }
    }
}

impl TransactionConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            stats: StatsConfig::default(),
            transactions: TransactionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Local development against Anvil: short cache, fast polling.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            stats: StatsConfig {
                cache_ttl_secs: 5,
                liquidation_window_blocks: 7200,
                cache_dir: None,
            },
            transactions: TransactionConfig {
                confirmations: 1,
                receipt_poll_interval_ms: 100, // Anvil mines instantly
            },
        }
    }

    /// Public testnets: persisted cache, slower polling.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            stats: StatsConfig {
                cache_ttl_secs: 120,
                liquidation_window_blocks: 7200,
                cache_dir: Some(PathBuf::from(".dsc-cache")),
            },
            transactions: TransactionConfig {
                confirmations: 1,
                receipt_poll_interval_ms: 2000,
            },
        }
    }

    /// Get profile from environment variable DSC_PROFILE, or default.
    /// Supported values: testing, production
    pub fn from_env() -> Self {
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| "default".to_string());
        Self::from_profile(&profile)
    }

    fn from_profile(profile: &str) -> Self {
        match profile.to_lowercase().as_str() {
            "testing" | "test" => Self::testing(),
            "production" | "prod" => Self::production(),
            _ => Self::default(),
        }
    }

    /// File from DSC_CONFIG when set, otherwise the DSC_PROFILE profile.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Client configuration loaded");
        tracing::info!(
            cache_ttl_secs = self.stats.cache_ttl_secs,
            window_blocks = self.stats.liquidation_window_blocks,
            cache_dir = ?self.stats.cache_dir,
            "Protocol stats"
        );
        tracing::info!(
            confirmations = self.transactions.confirmations,
            poll_ms = self.transactions.receipt_poll_interval_ms,
            "Transactions"
        );
    }
}
