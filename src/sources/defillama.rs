use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::tokens::{TokenDeployment, TRACKED_TOKENS};
use super::{
    check_status, http_client, lenient_f64, DataKind, MarketSource, RawPool, RawPrice, RawProtocol,
    RecordSet, SourceError,
};
use crate::config::SourcesConfig;

/// DeFiLlama: protocol TVL, yield pools and per-chain coin prices.
pub struct DefiLlama {
    client: Client,
    protocols_url: String,
    yields_url: String,
    coins_url: String,
}

#[derive(Debug, Deserialize)]
struct LlamaProtocol {
    name: Option<String>,
    slug: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tvl: serde_json::Value,
    #[serde(default)]
    chains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlamaYieldsResponse {
    data: Vec<LlamaPool>,
}

#[derive(Debug, Deserialize)]
struct LlamaPool {
    chain: Option<String>,
    project: Option<String>,
    symbol: Option<String>,
    #[serde(rename = "tvlUsd", default)]
    tvl_usd: serde_json::Value,
    #[serde(default)]
    apy: serde_json::Value,
    #[serde(rename = "apyMean7d", default)]
    apy_mean_7d: serde_json::Value,
    #[serde(rename = "apyMean30d", default)]
    apy_mean_30d: serde_json::Value,
    #[serde(rename = "volumeUsd1d", default)]
    volume_usd_1d: serde_json::Value,
    #[serde(rename = "rewardTokens", default)]
    reward_tokens: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LlamaCoinsResponse {
    coins: HashMap<String, LlamaCoin>,
}

#[derive(Debug, Deserialize)]
struct LlamaCoin {
    #[serde(default)]
    price: serde_json::Value,
    timestamp: Option<i64>,
}

/// DeFiLlama's coin-key prefix for a registry chain.
fn llama_chain_prefix(chain_id: &str) -> Option<&'static str> {
    match chain_id {
        "ethereum" => Some("ethereum"),
        "bsc" => Some("bsc"),
        "polygon" => Some("polygon"),
        "avalanche" => Some("avax"),
        "arbitrum" => Some("arbitrum"),
        _ => None,
    }
}

impl DefiLlama {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            protocols_url: config.defillama_protocols_url.clone(),
            yields_url: config.defillama_yields_url.clone(),
            coins_url: config.defillama_coins_url.clone(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(check_status(resp)?.text().await?)
    }

    async fn fetch_prices(&self) -> Result<Vec<RawPrice>, SourceError> {
        let keyed: HashMap<String, &TokenDeployment> = TRACKED_TOKENS
            .iter()
            .filter_map(|t| {
                llama_chain_prefix(t.chain_id).map(|prefix| (format!("{}:{}", prefix, t.address), t))
            })
            .collect();

        let mut keys: Vec<&str> = keyed.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let url = format!("{}/{}", self.coins_url.trim_end_matches('/'), keys.join(","));

        let body = self.get_text(&url).await?;
        parse_coin_prices(&body, &keyed)
    }
}

pub(crate) fn parse_protocols(body: &str) -> Result<Vec<RawProtocol>, SourceError> {
    let data: Vec<LlamaProtocol> =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    Ok(data
        .into_iter()
        .filter_map(|p| {
            let name = p.name.filter(|n| !n.trim().is_empty())?;
            Some(RawProtocol {
                name,
                slug: p.slug,
                category: p.category,
                tvl_usd: lenient_f64(&p.tvl),
                chains: p.chains,
            })
        })
        .collect())
}

pub(crate) fn parse_pools(body: &str) -> Result<Vec<RawPool>, SourceError> {
    let resp: LlamaYieldsResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    Ok(resp
        .data
        .into_iter()
        .filter_map(|p| {
            // project, chain and symbol are the minimum for a usable pool
            let project = p.project.filter(|s| !s.is_empty())?;
            let chain = p.chain.filter(|s| !s.is_empty())?;
            let symbol = p.symbol.filter(|s| !s.is_empty())?;

            Some(RawPool {
                project,
                chain,
                symbol,
                apy: lenient_f64(&p.apy),
                apy_7d: lenient_f64(&p.apy_mean_7d),
                apy_30d: lenient_f64(&p.apy_mean_30d),
                tvl_usd: lenient_f64(&p.tvl_usd),
                volume_usd_1d: lenient_f64(&p.volume_usd_1d),
                reward_tokens: p.reward_tokens.unwrap_or_default(),
            })
        })
        .collect())
}

pub(crate) fn parse_coin_prices(
    body: &str,
    keyed: &HashMap<String, &TokenDeployment>,
) -> Result<Vec<RawPrice>, SourceError> {
    let resp: LlamaCoinsResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let mut prices: Vec<RawPrice> = resp
        .coins
        .into_iter()
        .filter_map(|(key, coin)| {
            // keys come back lowercased regardless of how they were requested
            let token = keyed
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&key))
                .map(|(_, t)| *t)?;
            let price = lenient_f64(&coin.price)?;
            let chain = key.split(':').next()?.to_string();
            let observed_at = coin
                .timestamp
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .unwrap_or_else(Utc::now);

            Some(RawPrice {
                symbol: token.symbol.to_string(),
                chain,
                price_usd: price,
                observed_at,
            })
        })
        .collect();

    // HashMap iteration order is random; keep output stable for the normalizer
    prices.sort_by(|a, b| (a.symbol.as_str(), a.chain.as_str()).cmp(&(b.symbol.as_str(), b.chain.as_str())));
    Ok(prices)
}

#[async_trait]
impl MarketSource for DefiLlama {
    fn name(&self) -> &'static str {
        "DefiLlama"
    }

    fn serves(&self, _kind: DataKind) -> bool {
        true
    }

    async fn fetch(&self, kind: DataKind) -> Result<RecordSet, SourceError> {
        match kind {
            DataKind::Protocols => {
                let body = self.get_text(&self.protocols_url).await?;
                Ok(RecordSet::Protocols(parse_protocols(&body)?))
            }
            DataKind::Pools => {
                let body = self.get_text(&self.yields_url).await?;
                Ok(RecordSet::Pools(parse_pools(&body)?))
            }
            DataKind::Prices => Ok(RecordSet::Prices(self.fetch_prices().await?)),
        }
    }
}
