//! Last-resort data source.
//!
//! Every record comes from a fixed template catalogue with independent multiplicative jitter,
//! so output has a known shape and known bounds while the values vary per draw:
//!
//! * pool APY: `base * U(0.8, 1.3)`; 7-day `apy * U(0.9, 1.1)`; 30-day `apy * U(0.85, 1.15)`.
//!   Every APY field therefore lies in `[base * 0.8 * 0.85, base * 1.3 * 1.15]`.
//! * pool TVL `U(500k, 50M)`, daily volume `U(100k, 5M)`, 1-2 reward tokens.
//! * each (protocol, chain, template) combination is kept with probability 2/3.
//! * risk score: drawn once inside the template tier's band.
//! * prices: per token 2-4 chains; one anchor at `reference * U(0.9, 1.1)`, the rest at a
//!   `U(0.5%, 3%)` premium over the anchor.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{
    round_cents, ChainRegistry, IlRisk, Pool, Position, PricePoint, Protocol, YieldHistoryPoint,
};
use crate::services::RiskScorer;

#[derive(Debug, Clone, Copy)]
pub struct ProtocolTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub tvl_usd: f64,
    pub chains: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct PoolTemplate {
    pub token0: &'static str,
    pub token1: &'static str,
    pub base_apy: f64,
    pub risk: IlRisk,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenTemplate {
    pub symbol: &'static str,
    pub reference_price: f64,
}

pub const PROTOCOL_TEMPLATES: &[ProtocolTemplate] = &[
    ProtocolTemplate { id: "uniswap", name: "Uniswap V3", category: "DEX", tvl_usd: 4.2e9, chains: &["ethereum", "polygon", "arbitrum"] },
    ProtocolTemplate { id: "aave", name: "Aave", category: "Lending", tvl_usd: 7.8e9, chains: &["ethereum", "polygon", "avalanche", "arbitrum"] },
    ProtocolTemplate { id: "compound", name: "Compound", category: "Lending", tvl_usd: 3.1e9, chains: &["ethereum", "polygon"] },
    ProtocolTemplate { id: "pancakeswap", name: "PancakeSwap", category: "DEX", tvl_usd: 2.4e9, chains: &["bsc", "ethereum", "arbitrum"] },
    ProtocolTemplate { id: "curve", name: "Curve Finance", category: "DEX", tvl_usd: 1.9e9, chains: &["ethereum", "polygon", "arbitrum", "avalanche"] },
];

pub const POOL_TEMPLATES: &[PoolTemplate] = &[
    PoolTemplate { token0: "ETH", token1: "USDC", base_apy: 5.2, risk: IlRisk::Low },
    PoolTemplate { token0: "WBTC", token1: "ETH", base_apy: 7.8, risk: IlRisk::Medium },
    PoolTemplate { token0: "MATIC", token1: "USDT", base_apy: 12.4, risk: IlRisk::Medium },
    PoolTemplate { token0: "AVAX", token1: "USDC", base_apy: 15.6, risk: IlRisk::Medium },
    PoolTemplate { token0: "BNB", token1: "BUSD", base_apy: 9.2, risk: IlRisk::Low },
    PoolTemplate { token0: "USDC", token1: "USDT", base_apy: 3.8, risk: IlRisk::Low },
    PoolTemplate { token0: "LINK", token1: "ETH", base_apy: 18.5, risk: IlRisk::High },
    PoolTemplate { token0: "UNI", token1: "ETH", base_apy: 22.3, risk: IlRisk::High },
];

pub const PRICE_TEMPLATES: &[TokenTemplate] = &[
    TokenTemplate { symbol: "ETH", reference_price: 3_000.0 },
    TokenTemplate { symbol: "BTC", reference_price: 60_000.0 },
    TokenTemplate { symbol: "MATIC", reference_price: 0.7 },
    TokenTemplate { symbol: "AVAX", reference_price: 30.0 },
    TokenTemplate { symbol: "BNB", reference_price: 550.0 },
    TokenTemplate { symbol: "USDC", reference_price: 1.0 },
    TokenTemplate { symbol: "USDT", reference_price: 1.0 },
    TokenTemplate { symbol: "UNI", reference_price: 8.0 },
    TokenTemplate { symbol: "AAVE", reference_price: 95.0 },
];

pub const REWARD_TOKENS: &[&str] = &["UNI", "AAVE", "COMP", "CRV", "CAKE"];

const INCLUDE_PROBABILITY: f64 = 2.0 / 3.0;

/// The template tables a generator draws from.
#[derive(Debug, Clone, Copy)]
pub struct Catalogue {
    pub protocols: &'static [ProtocolTemplate],
    pub pools: &'static [PoolTemplate],
    pub tokens: &'static [TokenTemplate],
    pub reward_tokens: &'static [&'static str],
}

impl Default for Catalogue {
    fn default() -> Self {
        Self {
            protocols: PROTOCOL_TEMPLATES,
            pools: POOL_TEMPLATES,
            tokens: PRICE_TEMPLATES,
            reward_tokens: REWARD_TOKENS,
        }
    }
}

impl Catalogue {
    pub fn empty() -> Self {
        Self {
            protocols: &[],
            pools: &[],
            tokens: &[],
            reward_tokens: &[],
        }
    }
}

pub struct SyntheticGenerator<R = StdRng> {
    rng: R,
    catalogue: Catalogue,
    registry: ChainRegistry,
    scorer: RiskScorer,
}

impl SyntheticGenerator<StdRng> {
    pub fn from_entropy(catalogue: Catalogue) -> Self {
        Self::new(StdRng::from_entropy(), catalogue)
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), Catalogue::default())
    }
}

impl<R: Rng> SyntheticGenerator<R> {
    pub fn new(rng: R, catalogue: Catalogue) -> Self {
        Self {
            rng,
            catalogue,
            registry: ChainRegistry,
            scorer: RiskScorer,
        }
    }

    pub fn protocols(&mut self) -> Vec<Protocol> {
        let catalogue = self.catalogue;
        catalogue
            .protocols
            .iter()
            .map(|t| Protocol {
                id: t.id.to_string(),
                name: t.name.to_string(),
                category: t.category.to_string(),
                tvl_usd: (t.tvl_usd * self.rng.gen_range(0.95..1.05)).round(),
                chains: t.chains.iter().map(|c| c.to_string()).collect(),
            })
            .collect()
    }

    pub fn pools(&mut self) -> Vec<Pool> {
        let catalogue = self.catalogue;
        let mut pools = Vec::new();

        for protocol in catalogue.protocols {
            for chain in protocol.chains {
                for (index, template) in catalogue.pools.iter().enumerate() {
                    if self.rng.gen_bool(INCLUDE_PROBABILITY) {
                        pools.push(self.pool(protocol, chain, index, template));
                    }
                }
            }
        }

        // never hand back an empty set while the catalogue can produce something
        if pools.is_empty() {
            if let (Some(protocol), Some(template)) = (catalogue.protocols.first(), catalogue.pools.first()) {
                if let Some(chain) = protocol.chains.first() {
                    pools.push(self.pool(protocol, chain, 0, template));
                }
            }
        }

        pools
    }

    fn pool(&mut self, protocol: &ProtocolTemplate, chain: &str, index: usize, template: &PoolTemplate) -> Pool {
        let apy = template.base_apy * self.rng.gen_range(0.8..=1.3);
        let apy_7d = apy * self.rng.gen_range(0.9..=1.1);
        let apy_30d = apy * self.rng.gen_range(0.85..=1.15);

        let reward_count = self.rng.gen_range(1..=2);
        let mut rewards_tokens: Vec<String> = self
            .catalogue
            .reward_tokens
            .choose_multiple(&mut self.rng, reward_count)
            .map(|t| t.to_string())
            .collect();
        if rewards_tokens.is_empty() {
            rewards_tokens.push(template.token0.to_string());
        }

        Pool {
            id: format!("{}_{}_{}", protocol.id, chain, index),
            protocol_id: protocol.id.to_string(),
            chain_id: chain.to_string(),
            name: format!("{}/{} Pool", template.token0, template.token1),
            symbol: format!("{}/{}", template.token0, template.token1),
            token0: template.token0.to_string(),
            token1: template.token1.to_string(),
            apy,
            apy_7d,
            apy_30d,
            tvl_usd: self.rng.gen_range(500_000.0..=50_000_000.0_f64).round(),
            daily_volume_usd: self.rng.gen_range(100_000.0..=5_000_000.0_f64).round(),
            risk_score: self.scorer.sample(template.risk, &mut self.rng),
            il_risk: template.risk,
            auto_compound: self.rng.gen_bool(0.5),
            rewards_tokens,
        }
    }

    /// Price observations shaped so that every token shows a cross-chain spread.
    pub fn prices(&mut self) -> Vec<PricePoint> {
        let chain_ids: Vec<&'static str> = self.registry.ids().collect();
        if chain_ids.len() < 2 {
            return vec![];
        }
        let catalogue = self.catalogue;
        let now = Utc::now();
        let mut points = Vec::new();

        for token in catalogue.tokens {
            let count = self.rng.gen_range(2..=chain_ids.len().min(4));
            let chains: Vec<&'static str> = chain_ids
                .choose_multiple(&mut self.rng, count)
                .copied()
                .collect();
            let anchor = token.reference_price * self.rng.gen_range(0.9..=1.1);

            for (i, chain) in chains.into_iter().enumerate() {
                let price = if i == 0 {
                    anchor
                } else {
                    anchor * (1.0 + self.rng.gen_range(0.005..=0.03))
                };
                points.push(PricePoint {
                    token_id: token.symbol.to_string(),
                    chain_id: chain.to_string(),
                    price_usd: price,
                    observed_at: now,
                });
            }
        }

        points
    }

    /// Demo positions spread over the given pools; registry chains are used when there are none.
    pub fn positions(&mut self, count: usize, pools: &[Pool]) -> Vec<Position> {
        let chain_ids: Vec<&'static str> = self.registry.ids().collect();
        let now = Utc::now();

        (0..count)
            .map(|i| {
                let (chain_id, pool_id, token0, token1) = match pools.choose(&mut self.rng) {
                    Some(pool) => (pool.chain_id.clone(), pool.id.clone(), pool.token0.clone(), pool.token1.clone()),
                    None => (
                        chain_ids
                            .choose(&mut self.rng)
                            .copied()
                            .unwrap_or(self.registry.fallback().id.as_str())
                            .to_string(),
                        format!("pool_{i}"),
                        "USDC".to_string(),
                        "USDT".to_string(),
                    ),
                };

                let deposited = round_cents(self.rng.gen_range(1_000.0..=50_000.0));
                let current = round_cents(deposited * self.rng.gen_range(1.02..=1.25));
                let user = self.rng.gen_range(10u64.pow(15)..10u64.pow(16));

                Position::new(
                    format!("0x{:016x}", user),
                    chain_id,
                    pool_id,
                    token0,
                    token1,
                    deposited,
                    current,
                    round_cents(self.rng.gen_range(5.0..=25.0)),
                    now - Duration::hours(self.rng.gen_range(1..=72)),
                )
            })
            .collect()
    }

    pub fn yield_history(&mut self, days: u32) -> Vec<YieldHistoryPoint> {
        let now = Utc::now();
        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        (0..days)
            .map(|i| {
                let trend = 50_000.0 + f64::from(i) * 200.0;
                YieldHistoryPoint {
                    date: start
                        .checked_add_signed(Duration::days(i64::from(i)))
                        .unwrap_or(now),
                    total_value: round_cents(trend + self.rng.gen_range(-500.0..=800.0)),
                    daily_yield: round_cents(self.rng.gen_range(50.0..=200.0)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogue_templates_are_well_formed() {
        for t in POOL_TEMPLATES {
            assert_ne!(t.token0, t.token1);
            assert!(t.base_apy > 0.0);
        }
        for p in PROTOCOL_TEMPLATES {
            assert!(!p.chains.is_empty());
            for c in p.chains {
                assert!(ChainRegistry.contains(c), "{c}");
            }
        }
    }

    #[test]
    fn pools_respect_invariants_and_jitter_bounds() {
        for seed in 0..20 {
            let mut generator = SyntheticGenerator::seeded(seed);
            let pools = generator.pools();
            assert!(!pools.is_empty());

            for pool in &pools {
                assert!(pool.is_consistent(), "{pool:?}");
                let index: usize = pool.id.rsplit('_').next().unwrap().parse().unwrap();
                let base = POOL_TEMPLATES[index].base_apy;
                let (lo, hi) = (base * 0.8 * 0.85, base * 1.3 * 1.15);
                for apy in [pool.apy, pool.apy_7d, pool.apy_30d] {
                    assert!(apy >= lo - 1e-9 && apy <= hi + 1e-9, "{apy} outside [{lo}, {hi}]");
                }
                assert!((base * 0.8..=base * 1.3).contains(&pool.apy));
                assert!((500_000.0..=50_000_000.0).contains(&pool.tvl_usd));
                assert!((1..=2).contains(&pool.rewards_tokens.len()));
                assert_eq!(pool.il_risk, POOL_TEMPLATES[index].risk);
            }
        }
    }

    #[test]
    fn pool_ids_are_unique() {
        let pools = SyntheticGenerator::seeded(3).pools();
        let ids: HashSet<&str> = pools.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), pools.len());
    }

    #[test]
    fn prices_span_multiple_chains_with_bounded_premium() {
        let points = SyntheticGenerator::seeded(11).prices();
        for token in PRICE_TEMPLATES {
            let quotes: Vec<&PricePoint> = points.iter().filter(|p| p.token_id == token.symbol).collect();
            assert!((2..=4).contains(&quotes.len()));

            let chains: HashSet<&str> = quotes.iter().map(|p| p.chain_id.as_str()).collect();
            assert_eq!(chains.len(), quotes.len());

            let anchor = quotes[0].price_usd;
            assert!(anchor >= token.reference_price * 0.9 && anchor <= token.reference_price * 1.1);
            for q in &quotes[1..] {
                let premium = q.price_usd / anchor - 1.0;
                assert!((0.005 - 1e-12..=0.03 + 1e-12).contains(&premium), "{premium}");
            }
        }
    }

    #[test]
    fn positions_follow_the_pool_set() {
        let mut generator = SyntheticGenerator::seeded(5);
        let pools = generator.pools();
        let positions = generator.positions(8, &pools);
        assert_eq!(positions.len(), 8);

        let now = Utc::now();
        for p in &positions {
            let pool = pools.iter().find(|pool| pool.id == p.pool_id).unwrap();
            assert_eq!(p.chain_id, pool.chain_id);
            assert_eq!(p.token0, pool.token0);
            assert!(p.deposited_amount_usd >= 1_000.0);
            assert!(p.current_value_usd > p.deposited_amount_usd);
            assert!((p.rewards_earned_usd - (p.current_value_usd - p.deposited_amount_usd)).abs() < 1e-9);
            assert!(p.last_compound <= now);
            assert_eq!(p.user_address.len(), 18);
        }
    }

    #[test]
    fn positions_without_pools_use_registry_chains() {
        let positions = SyntheticGenerator::seeded(9).positions(3, &[]);
        for (i, p) in positions.iter().enumerate() {
            assert!(ChainRegistry.contains(&p.chain_id));
            assert_eq!(p.pool_id, format!("pool_{i}"));
            assert_ne!(p.token0, p.token1);
        }
    }

    #[test]
    fn yield_history_trends_upwards_within_noise() {
        let history = SyntheticGenerator::seeded(1).yield_history(30);
        assert_eq!(history.len(), 30);
        for (i, point) in history.iter().enumerate() {
            let trend = 50_000.0 + i as f64 * 200.0;
            assert!(point.total_value >= trend - 500.0 && point.total_value <= trend + 800.0);
            assert!((50.0..=200.0).contains(&point.daily_yield));
        }
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn empty_catalogue_generates_nothing() {
        let mut generator = SyntheticGenerator::new(StdRng::seed_from_u64(0), Catalogue::empty());
        assert!(generator.protocols().is_empty());
        assert!(generator.pools().is_empty());
        assert!(generator.prices().is_empty());
    }
}
