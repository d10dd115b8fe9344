use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;

use super::tokens::{self, TokenDeployment};
use super::{
    check_status, http_client, lenient_f64, DataKind, MarketSource, RawPrice, RecordSet,
    SourceError,
};
use crate::config::SourcesConfig;

/// CoinGecko per-platform contract prices.
pub struct CoinGecko {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeckoQuote {
    #[serde(default)]
    usd: serde_json::Value,
    last_updated_at: Option<i64>,
}

/// CoinGecko asset-platform id for a registry chain.
fn gecko_platform(chain_id: &str) -> Option<&'static str> {
    match chain_id {
        "ethereum" => Some("ethereum"),
        "bsc" => Some("binance-smart-chain"),
        "polygon" => Some("polygon-pos"),
        "avalanche" => Some("avalanche"),
        "arbitrum" => Some("arbitrum-one"),
        _ => None,
    }
}

impl CoinGecko {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            base_url: config.coingecko_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_platform(
        &self,
        chain_id: &'static str,
        platform: &'static str,
    ) -> Result<Vec<RawPrice>, SourceError> {
        let deployments: Vec<&TokenDeployment> = tokens::deployments_on(chain_id).collect();
        if deployments.is_empty() {
            return Ok(vec![]);
        }

        let addresses: Vec<&str> = deployments.iter().map(|t| t.address).collect();
        let url = format!(
            "{}/simple/token_price/{}?contract_addresses={}&vs_currencies=usd&include_last_updated_at=true",
            self.base_url,
            platform,
            addresses.join(",")
        );

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let body = check_status(resp)?.text().await?;
        parse_token_prices(&body, chain_id, platform)
    }
}

pub(crate) fn parse_token_prices(
    body: &str,
    chain_id: &str,
    platform: &str,
) -> Result<Vec<RawPrice>, SourceError> {
    let quotes: HashMap<String, GeckoQuote> =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let mut prices: Vec<RawPrice> = quotes
        .into_iter()
        .filter_map(|(address, quote)| {
            let token = tokens::by_address(chain_id, &address)?;
            let price = lenient_f64(&quote.usd)?;
            let observed_at = quote
                .last_updated_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .unwrap_or_else(Utc::now);

            Some(RawPrice {
                symbol: token.symbol.to_string(),
                chain: platform.to_string(),
                price_usd: price,
                observed_at,
            })
        })
        .collect();

    prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(prices)
}

#[async_trait]
impl MarketSource for CoinGecko {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    fn serves(&self, kind: DataKind) -> bool {
        kind == DataKind::Prices
    }

    async fn fetch(&self, kind: DataKind) -> Result<RecordSet, SourceError> {
        if kind != DataKind::Prices {
            return Err(SourceError::Unsupported(kind));
        }

        let platforms: Vec<(&'static str, &'static str)> = ["ethereum", "bsc", "polygon", "avalanche", "arbitrum"]
            .into_iter()
            .filter_map(|chain| gecko_platform(chain).map(|p| (chain, p)))
            .collect();

        let results = join_all(
            platforms
                .iter()
                .map(|&(chain, platform)| self.fetch_platform(chain, platform)),
        )
        .await;

        let mut prices = Vec::new();
        let mut first_error = None;
        for ((_, platform), result) in platforms.iter().zip(results) {
            match result {
                Ok(p) => prices.extend(p),
                Err(e) => {
                    tracing::debug!("CoinGecko platform {} failed: {}", platform, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        // a partial answer is still an answer
        match first_error {
            Some(e) if prices.is_empty() => Err(e),
            _ => Ok(RecordSet::Prices(prices)),
        }
    }
}
