use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, SourceError};
use crate::models::Chain;

/// Reachability of one chain's public RPC endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStatus {
    pub chain_id: String,
    pub reachable: bool,
    pub latest_block: Option<u64>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

/// Minimal JSON-RPC client for the registry's EVM endpoints.
pub struct ChainRpc {
    client: Client,
    timeout: Duration,
}

impl ChainRpc {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            timeout,
        }
    }

    pub async fn block_number(&self, rpc_url: &str) -> Result<u64, SourceError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1,
        });

        let resp = self
            .client
            .post(rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let body = check_status(resp)?.text().await?;
        parse_block_number(&body)
    }

    /// Probes every chain concurrently; a failing endpoint yields `reachable = false`.
    pub async fn probe(&self, chains: &[Chain]) -> Vec<ChainStatus> {
        let probes = chains.iter().map(|chain| async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(self.timeout, self.block_number(&chain.rpc_url)).await {
                Ok(r) => r,
                Err(_) => Err(SourceError::Timeout(self.timeout)),
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(block) => ChainStatus {
                    chain_id: chain.id.clone(),
                    reachable: true,
                    latest_block: Some(block),
                    latency_ms: Some(latency_ms),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("RPC probe for {} failed: {}", chain.id, e);
                    ChainStatus {
                        chain_id: chain.id.clone(),
                        reachable: false,
                        latest_block: None,
                        latency_ms: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        join_all(probes).await
    }
}

pub(crate) fn parse_block_number(body: &str) -> Result<u64, SourceError> {
    let resp: RpcResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    if let Some(err) = resp.error {
        return Err(SourceError::Malformed(format!("rpc error: {}", err.message)));
    }

    let hex = resp
        .result
        .ok_or_else(|| SourceError::Malformed("missing result".to_string()))?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| SourceError::Malformed(format!("bad block number {hex}: {e}")))
}
