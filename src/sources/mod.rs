pub mod coingecko;
pub mod defillama;
pub mod rpc;
pub mod synthetic;
pub mod tokens;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

pub use crate::error::SourceError;

/// The three record families a market-data source can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Protocols,
    Pools,
    Prices,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataKind::Protocols => "protocols",
            DataKind::Pools => "pools",
            DataKind::Prices => "prices",
        };
        f.write_str(s)
    }
}

/// Protocol as reported upstream, before chain mapping and thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProtocol {
    pub name: String,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub tvl_usd: Option<f64>,
    pub chains: Vec<String>,
}

/// Pool as reported upstream. `symbol` may be a combined pair ("ETH/USDC") or a single asset.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPool {
    pub project: String,
    pub chain: String,
    pub symbol: String,
    pub apy: Option<f64>,
    pub apy_7d: Option<f64>,
    pub apy_30d: Option<f64>,
    pub tvl_usd: Option<f64>,
    pub volume_usd_1d: Option<f64>,
    pub reward_tokens: Vec<String>,
}

/// Price observation with the provider's own chain spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrice {
    pub symbol: String,
    pub chain: String,
    pub price_usd: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordSet {
    Protocols(Vec<RawProtocol>),
    Pools(Vec<RawPool>),
    Prices(Vec<RawPrice>),
}

impl RecordSet {
    pub fn kind(&self) -> DataKind {
        match self {
            RecordSet::Protocols(_) => DataKind::Protocols,
            RecordSet::Pools(_) => DataKind::Pools,
            RecordSet::Prices(_) => DataKind::Prices,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordSet::Protocols(v) => v.len(),
            RecordSet::Pools(v) => v.len(),
            RecordSet::Prices(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One upstream market-data provider.
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn serves(&self, kind: DataKind) -> bool;

    async fn fetch(&self, kind: DataKind) -> Result<RecordSet, SourceError>;
}

pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("omni-yield/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("HTTP client builder failed ({}), using defaults", e);
            Client::new()
        })
}

/// Maps a non-success response to the matching `SourceError`.
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(SourceError::RateLimit);
    }
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(resp)
}

/// Upstream numbers arrive as numbers, numeric strings, or null.
pub(crate) fn lenient_f64(value: &serde_json::Value) -> Option<f64> {
    let v = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}
