use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::detector::ArbitrageDetector;
use super::normalizer::Normalizer;
use super::portfolio;
use super::resolver::{FallbackResolver, Resolution, SourceHealth, SourceHealthBook};
use super::strategy::{StrategyOptimizer, StrategyPlan, StrategyRequest};
use crate::config::{Config, SourcesConfig};
use crate::error::{AggregatorError, Result};
use crate::models::{
    ArbitrageOpportunity, Chain, ChainRegistry, Pool, PortfolioSummary, Position, Protocol,
    YieldHistoryPoint,
};
use crate::sources::coingecko::CoinGecko;
use crate::sources::defillama::DefiLlama;
use crate::sources::rpc::{ChainRpc, ChainStatus};
use crate::sources::synthetic::{Catalogue, SyntheticGenerator};
use crate::sources::{DataKind, MarketSource, RecordSet};

pub const MAX_POOL_RESULTS: usize = 20;
pub const MAX_ARBITRAGE_RESULTS: usize = 10;
pub const PORTFOLIO_SIZE: usize = 8;
pub const DEFAULT_HISTORY_DAYS: u32 = 30;
pub const MAX_HISTORY_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSort {
    /// APY, highest first.
    Apy,
    /// TVL, highest first.
    Tvl,
    /// Risk score, lowest first.
    Risk,
}

impl FromStr for PoolSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apy" => Ok(PoolSort::Apy),
            "tvl" => Ok(PoolSort::Tvl),
            "risk" => Ok(PoolSort::Risk),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolQuery {
    pub chain_id: Option<String>,
    pub protocol_id: Option<String>,
    /// `apy` when absent. Unrecognized keys leave pools in TVL order.
    pub sort_by: Option<String>,
}

impl PoolQuery {
    fn sort(&self) -> Option<PoolSort> {
        match &self.sort_by {
            None => Some(PoolSort::Apy),
            Some(key) => key.parse().ok(),
        }
    }
}

/// Adapter chains per record kind, tried in order.
#[derive(Clone, Default)]
pub struct SourceSet {
    pub protocols: Vec<Arc<dyn MarketSource>>,
    pub pools: Vec<Arc<dyn MarketSource>>,
    pub prices: Vec<Arc<dyn MarketSource>>,
}

impl SourceSet {
    /// DefiLlama for protocols and pools; CoinGecko then DefiLlama for prices.
    pub fn live(config: &SourcesConfig) -> Self {
        let llama: Arc<dyn MarketSource> = Arc::new(DefiLlama::new(config));
        let gecko: Arc<dyn MarketSource> = Arc::new(CoinGecko::new(config));
        Self {
            protocols: vec![llama.clone()],
            pools: vec![llama.clone()],
            prices: vec![gecko, llama],
        }
    }

    fn for_kind(&self, kind: DataKind) -> &[Arc<dyn MarketSource>] {
        match kind {
            DataKind::Protocols => &self.protocols,
            DataKind::Pools => &self.pools,
            DataKind::Prices => &self.prices,
        }
    }
}

/// Counts from a concurrent pass over every record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmUp {
    pub protocols: usize,
    pub pools: usize,
    pub opportunities: usize,
}

/// Entry point for every read operation: live sources first, synthetic data when they all fail.
pub struct Aggregator {
    sources: SourceSet,
    resolver: FallbackResolver,
    health: Arc<SourceHealthBook>,
    normalizer: Normalizer,
    detector: ArbitrageDetector,
    optimizer: StrategyOptimizer,
    rpc: ChainRpc,
    catalogue: Catalogue,
    registry: ChainRegistry,
    live: bool,
}

impl Aggregator {
    pub fn new(config: &Config) -> Self {
        let sources = if config.sources.live {
            SourceSet::live(&config.sources)
        } else {
            SourceSet::default()
        };
        Self::with_sources(config, sources)
    }

    pub fn with_sources(config: &Config, sources: SourceSet) -> Self {
        let timeout = Duration::from_secs(config.sources.timeout_secs);
        let health = Arc::new(SourceHealthBook::new());
        Self {
            sources,
            resolver: FallbackResolver::new(timeout, health.clone()),
            health,
            normalizer: Normalizer::new(&config.normalize),
            detector: ArbitrageDetector::new(&config.arbitrage),
            optimizer: StrategyOptimizer::default(),
            rpc: ChainRpc::new(timeout),
            catalogue: Catalogue::default(),
            registry: ChainRegistry,
            live: config.sources.live,
        }
    }

    /// Replaces the synthetic template tables.
    pub fn with_catalogue(mut self, catalogue: Catalogue) -> Self {
        self.catalogue = catalogue;
        self
    }

    fn generator(&self) -> SyntheticGenerator {
        SyntheticGenerator::from_entropy(self.catalogue)
    }

    /// Resolves `kind` over its adapter chain and normalizes the winner. Falls back to the
    /// generator when every adapter fails or the live set normalizes to nothing.
    async fn live_or_synthetic<T>(
        &self,
        kind: DataKind,
        normalize: impl Fn(&RecordSet) -> Vec<T>,
        synthesize: impl FnOnce(&mut SyntheticGenerator) -> Vec<T>,
    ) -> Result<Vec<T>> {
        let adapters = self.sources.for_kind(kind);
        if adapters.is_empty() {
            tracing::debug!("no live sources for {}", kind);
        }

        // a set that normalizes to nothing moves on to the next adapter in the chain
        let mut remaining = adapters;
        while !remaining.is_empty() {
            match self.resolver.resolve(kind, remaining).await {
                Resolution::Resolved { source, records } => {
                    let canonical = normalize(&records);
                    if !canonical.is_empty() {
                        tracing::info!(
                            "{} {} from {} ({} raw)",
                            canonical.len(),
                            kind,
                            source,
                            records.len()
                        );
                        return Ok(canonical);
                    }
                    tracing::warn!(
                        "{} {} records from {} normalized to nothing",
                        records.len(),
                        kind,
                        source
                    );
                    let next = remaining
                        .iter()
                        .position(|a| a.name() == source)
                        .map_or(remaining.len(), |i| i + 1);
                    remaining = &remaining[next..];
                }
                Resolution::Exhausted { failures } => {
                    tracing::warn!("all {} remaining {} sources failed", failures.len(), kind);
                    break;
                }
            }
        }

        tracing::info!("using synthetic {}", kind);
        let records = synthesize(&mut self.generator());
        if records.is_empty() {
            return Err(AggregatorError::NoDataAvailable(kind));
        }
        Ok(records)
    }

    pub fn get_chains(&self) -> Vec<Chain> {
        self.registry.all().to_vec()
    }

    pub async fn get_protocols(&self) -> Result<Vec<Protocol>> {
        self.live_or_synthetic(
            DataKind::Protocols,
            |records| match records {
                RecordSet::Protocols(raw) => self.normalizer.protocols(raw),
                _ => Vec::new(),
            },
            |generator| generator.protocols(),
        )
        .await
    }

    /// Full normalized pool set, TVL-ordered.
    async fn all_pools(&self) -> Result<Vec<Pool>> {
        self.live_or_synthetic(
            DataKind::Pools,
            |records| match records {
                RecordSet::Pools(raw) => self.normalizer.pools(raw),
                _ => Vec::new(),
            },
            |generator| {
                let mut pools = generator.pools();
                pools.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd));
                pools
            },
        )
        .await
    }

    pub async fn get_pools(&self, query: &PoolQuery) -> Result<Vec<Pool>> {
        let mut pools = self.all_pools().await?;

        if let Some(chain_id) = &query.chain_id {
            pools.retain(|p| &p.chain_id == chain_id);
        }
        if let Some(protocol_id) = &query.protocol_id {
            pools.retain(|p| &p.protocol_id == protocol_id);
        }

        match query.sort() {
            Some(PoolSort::Apy) => pools.sort_by(|a, b| b.apy.total_cmp(&a.apy)),
            Some(PoolSort::Tvl) => pools.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd)),
            Some(PoolSort::Risk) => pools.sort_by(|a, b| a.risk_score.total_cmp(&b.risk_score)),
            None => tracing::debug!("unknown sort key {:?}, keeping TVL order", query.sort_by),
        }

        pools.truncate(MAX_POOL_RESULTS);
        Ok(pools)
    }

    pub async fn get_arbitrage_opportunities(&self) -> Result<Vec<ArbitrageOpportunity>> {
        let prices = self
            .live_or_synthetic(
                DataKind::Prices,
                |records| match records {
                    RecordSet::Prices(raw) => self.normalizer.prices(raw),
                    _ => Vec::new(),
                },
                |generator| generator.prices(),
            )
            .await?;

        let mut opportunities = self.detector.detect(&prices, &self.registry);
        tracing::info!(
            "{} opportunities over {} price points",
            opportunities.len(),
            prices.len()
        );
        opportunities.truncate(MAX_ARBITRAGE_RESULTS);
        Ok(opportunities)
    }

    pub fn get_portfolio_summary(&self, positions: &[Position]) -> PortfolioSummary {
        portfolio::summarize(positions)
    }

    /// Demo positions spread over the current pool set.
    pub async fn get_portfolio(&self) -> Result<Vec<Position>> {
        let pools = self.all_pools().await?;
        Ok(self.generator().positions(PORTFOLIO_SIZE, &pools))
    }

    pub async fn get_portfolio_overview(&self) -> Result<PortfolioSummary> {
        let positions = self.get_portfolio().await?;
        Ok(portfolio::summarize(&positions))
    }

    /// Daily series ending today; `days` is clamped to `1..=MAX_HISTORY_DAYS`.
    pub fn get_yield_history(&self, days: u32) -> Vec<YieldHistoryPoint> {
        self.generator().yield_history(days.clamp(1, MAX_HISTORY_DAYS))
    }

    pub async fn optimize_strategy(&self, request: &StrategyRequest) -> Result<StrategyPlan> {
        let pools = self.all_pools().await?;
        let plan = self.optimizer.optimize(&pools, request);
        tracing::info!(
            "strategy over {} pools: {} chains, expected apy {:.2}",
            pools.len(),
            plan.optimized_allocation.len(),
            plan.expected_apy
        );
        Ok(plan)
    }

    pub async fn get_chain_status(&self) -> Vec<ChainStatus> {
        if !self.live {
            return self
                .registry
                .all()
                .iter()
                .map(|chain| ChainStatus {
                    chain_id: chain.id.clone(),
                    reachable: false,
                    latest_block: None,
                    latency_ms: None,
                    error: Some("live sources disabled".to_string()),
                })
                .collect();
        }
        self.rpc.probe(self.registry.all()).await
    }

    pub fn source_health(&self) -> Vec<SourceHealth> {
        self.health.snapshot()
    }

    /// Resolves every record kind concurrently.
    pub async fn warm_up(&self) -> Result<WarmUp> {
        let (protocols, pools, opportunities) = tokio::join!(
            self.get_protocols(),
            self.all_pools(),
            self.get_arbitrage_opportunities()
        );
        Ok(WarmUp {
            protocols: protocols?.len(),
            pools: pools?.len(),
            opportunities: opportunities?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_parse_case_insensitively() {
        assert_eq!("APY".parse::<PoolSort>(), Ok(PoolSort::Apy));
        assert_eq!("tvl".parse::<PoolSort>(), Ok(PoolSort::Tvl));
        assert_eq!("Risk".parse::<PoolSort>(), Ok(PoolSort::Risk));
        assert!("volume".parse::<PoolSort>().is_err());
    }

    #[test]
    fn missing_sort_defaults_to_apy() {
        assert_eq!(PoolQuery::default().sort(), Some(PoolSort::Apy));
        let query = PoolQuery {
            sort_by: Some("volume".to_string()),
            ..PoolQuery::default()
        };
        assert_eq!(query.sort(), None);
    }

    #[test]
    fn live_source_set_orders_price_adapters() {
        let sources = SourceSet::live(&SourcesConfig::default());
        let names: Vec<&str> = sources.prices.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["CoinGecko", "DefiLlama"]);
        assert_eq!(sources.protocols.len(), 1);
        assert_eq!(sources.pools.len(), 1);
    }
}
