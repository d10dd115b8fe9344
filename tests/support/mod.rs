#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use omni_yield::config::Config;
use omni_yield::sources::{
    DataKind, MarketSource, RawPool, RawPrice, RawProtocol, RecordSet, SourceError,
};

pub enum Behaviour {
    Fail(SourceError),
    Sleep(Duration),
    Return(RecordSet),
}

/// Scripted in-process source.
pub struct MockSource {
    name: &'static str,
    kinds: Vec<DataKind>,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &'static str, kinds: &[DataKind], behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            kinds: kinds.to_vec(),
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str, kind: DataKind) -> Arc<Self> {
        Self::new(name, &[kind], Behaviour::Fail(SourceError::Status(502)))
    }

    pub fn returning(name: &'static str, records: RecordSet) -> Arc<Self> {
        Self::new(name, &[records.kind()], Behaviour::Return(records))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serves(&self, kind: DataKind) -> bool {
        self.kinds.contains(&kind)
    }

    async fn fetch(&self, _kind: DataKind) -> Result<RecordSet, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Fail(e) => Err(e.clone()),
            Behaviour::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Err(SourceError::Network("woke up too late".to_string()))
            }
            Behaviour::Return(records) => Ok(records.clone()),
        }
    }
}

pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.sources.live = false;
    config.sources.timeout_secs = 1;
    config
}

pub fn raw_protocol(name: &str, tvl: f64, chains: &[&str]) -> RawProtocol {
    RawProtocol {
        name: name.to_string(),
        slug: None,
        category: Some("Dexes".to_string()),
        tvl_usd: Some(tvl),
        chains: chains.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn raw_pool(project: &str, chain: &str, symbol: &str, apy: f64, tvl: f64) -> RawPool {
    RawPool {
        project: project.to_string(),
        chain: chain.to_string(),
        symbol: symbol.to_string(),
        apy: Some(apy),
        apy_7d: None,
        apy_30d: None,
        tvl_usd: Some(tvl),
        volume_usd_1d: None,
        reward_tokens: Vec::new(),
    }
}

pub fn raw_price(symbol: &str, chain: &str, price: f64) -> RawPrice {
    RawPrice {
        symbol: symbol.to_string(),
        chain: chain.to_string(),
        price_usd: price,
        observed_at: Utc::now(),
    }
}

/// 30 pools across four chains, APY and TVL deliberately out of step.
pub fn pool_fixture() -> RecordSet {
    let chains = ["Ethereum", "Arbitrum", "BSC", "Polygon"];
    let projects = ["uniswap-v3", "curve-dex", "aave-v3", "beefy"];
    let symbols = ["WETH-USDC", "USDC-USDT", "WBTC-WETH", "STETH"];
    let pools = (0..30)
        .map(|i| {
            raw_pool(
                projects[i % projects.len()],
                chains[i % chains.len()],
                symbols[i % symbols.len()],
                ((i * 7) % 31) as f64,
                1_000_000.0 + (i as f64) * 250_000.0,
            )
        })
        .collect();
    RecordSet::Pools(pools)
}
