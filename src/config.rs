use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// When false only the synthetic generator is used.
    #[serde(default = "default_live")]
    pub live: bool,
    /// Per-adapter budget, seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_protocols_url")]
    pub defillama_protocols_url: String,
    #[serde(default = "default_yields_url")]
    pub defillama_yields_url: String,
    #[serde(default = "default_coins_url")]
    pub defillama_coins_url: String,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    #[serde(default = "default_min_protocol_tvl")]
    pub min_protocol_tvl: f64,
    #[serde(default = "default_min_pool_tvl")]
    pub min_pool_tvl: f64,
    #[serde(default = "default_max_protocols")]
    pub max_protocols: usize,
    #[serde(default = "default_max_pools")]
    pub max_pools: usize,
    /// Drop records on unknown chains instead of attributing them to the fallback chain.
    #[serde(default)]
    pub reject_unknown_chains: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArbitrageConfig {
    #[serde(default = "default_trade_size")]
    pub trade_size_usd: f64,
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8001 }
fn default_live() -> bool { true }
fn default_timeout_secs() -> u64 { 5 }
fn default_protocols_url() -> String { "https://api.llama.fi/protocols".to_string() }
fn default_yields_url() -> String { "https://yields.llama.fi/pools".to_string() }
fn default_coins_url() -> String { "https://coins.llama.fi/prices/current".to_string() }
fn default_coingecko_url() -> String { "https://api.coingecko.com/api/v3".to_string() }
fn default_min_protocol_tvl() -> f64 { 1_000_000.0 }
fn default_min_pool_tvl() -> f64 { 100_000.0 }
fn default_max_protocols() -> usize { 50 }
fn default_max_pools() -> usize { 100 }
fn default_trade_size() -> f64 { 5_000.0 }
fn default_expiry_minutes() -> i64 { 15 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            live: default_live(),
            timeout_secs: default_timeout_secs(),
            defillama_protocols_url: default_protocols_url(),
            defillama_yields_url: default_yields_url(),
            defillama_coins_url: default_coins_url(),
            coingecko_url: default_coingecko_url(),
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            min_protocol_tvl: default_min_protocol_tvl(),
            min_pool_tvl: default_min_pool_tvl(),
            max_protocols: default_max_protocols(),
            max_pools: default_max_pools(),
            reject_unknown_chains: false,
        }
    }
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            trade_size_usd: default_trade_size(),
            expiry_minutes: default_expiry_minutes(),
        }
    }
}

impl Config {
    /// Reads `config.toml`, or the file named by `OMNIYIELD_CONFIG`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("OMNIYIELD_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=9).contains(&self.sources.timeout_secs) {
            return Err(ConfigError::InvalidValue {
                field: "sources.timeout_secs",
                reason: format!("{} is outside 1..=9", self.sources.timeout_secs),
            });
        }
        if !(5..=30).contains(&self.arbitrage.expiry_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.expiry_minutes",
                reason: format!("{} is outside 5..=30", self.arbitrage.expiry_minutes),
            });
        }
        if !(self.arbitrage.trade_size_usd > 0.0 && self.arbitrage.trade_size_usd.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.trade_size_usd",
                reason: "must be a positive amount".to_string(),
            });
        }
        if self.normalize.max_protocols == 0 || self.normalize.max_pools == 0 {
            return Err(ConfigError::InvalidValue {
                field: "normalize.max_*",
                reason: "top-N limits must be at least 1".to_string(),
            });
        }
        if self.normalize.min_protocol_tvl < 0.0 || self.normalize.min_pool_tvl < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "normalize.min_*_tvl",
                reason: "TVL thresholds cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}
