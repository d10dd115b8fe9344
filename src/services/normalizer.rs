use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use super::RiskScorer;
use crate::config::NormalizeConfig;
use crate::models::{ChainRegistry, Pool, PricePoint, Protocol};
use crate::sources::{RawPool, RawPrice, RawProtocol, RecordSet};

lazy_static! {
    /// Lower-cased provider spellings -> registry chain id.
    static ref CHAIN_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for alias in ["ethereum", "eth", "mainnet", "ethereum mainnet", "homestead"] {
            m.insert(alias, "ethereum");
        }
        for alias in ["bsc", "binance", "bnb", "bnb chain", "bnb smart chain", "binance-smart-chain", "binance smart chain"] {
            m.insert(alias, "bsc");
        }
        for alias in ["polygon", "matic", "polygon-pos", "polygon pos", "polygon mainnet"] {
            m.insert(alias, "polygon");
        }
        for alias in ["avalanche", "avax", "avalanche-c", "avalanche c-chain", "avalanche c chain"] {
            m.insert(alias, "avalanche");
        }
        for alias in ["arbitrum", "arbitrum one", "arbitrum-one", "arb", "arbitrum mainnet"] {
            m.insert(alias, "arbitrum");
        }
        for alias in ["zetachain", "zeta", "zetachain athens", "zetachain-athens"] {
            m.insert(alias, "zetachain");
        }
        m
    };
}

/// Checked in order; wrapped spellings first so "WBTC" does not resolve to "BTC".
const MAJOR_ASSETS: &[&str] = &["WBTC", "BTC", "WETH", "ETH", "USDC", "USDT", "DAI", "BNB", "MATIC", "AVAX"];

/// Substituted when a symbol carries no recognizable asset.
pub const DEFAULT_PAIR: (&str, &str) = ("USDC", "USDT");

/// Project-slug prefix -> governance token, used when upstream reward tokens are unusable.
const GOVERNANCE_TOKENS: &[(&str, &str)] = &[
    ("uniswap", "UNI"),
    ("aave", "AAVE"),
    ("compound", "COMP"),
    ("curve", "CRV"),
    ("pancakeswap", "CAKE"),
    ("sushi", "SUSHI"),
    ("balancer", "BAL"),
    ("convex", "CVX"),
    ("lido", "LDO"),
    ("quickswap", "QUICK"),
    ("trader-joe", "JOE"),
    ("gmx", "GMX"),
];

const AUTO_COMPOUNDERS: &[&str] = &["beefy", "yearn", "convex", "aura", "autofarm", "harvest", "yield-yak", "concentrator"];

/// Strict alias lookup, case-insensitive. `None` for chains outside the registry.
pub fn resolve_chain(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase();
    CHAIN_ALIASES.get(key.as_str()).copied()
}

fn partner_for(token: &str) -> &'static str {
    if token == "USDC" {
        "USDT"
    } else {
        "USDC"
    }
}

fn major_asset_in(symbol: &str) -> Option<&'static str> {
    MAJOR_ASSETS.iter().copied().find(|major| symbol.contains(major))
}

/// Splits "TOKEN0/TOKEN1" (or "TOKEN0-TOKEN1") into two distinct upper-case tokens.
///
/// Without a separator the first major asset found in the symbol becomes `token0`, paired
/// with USDC (USDT for USDC itself). Anything else becomes `DEFAULT_PAIR`.
pub fn split_symbol(symbol: &str) -> (String, String) {
    let upper = symbol.trim().to_ascii_uppercase();
    let parts: Vec<&str> = upper
        .split(['/', '-'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [a, b, ..] if a != b => (a.to_string(), b.to_string()),
        [a, ..] if parts.len() > 1 => (a.to_string(), partner_for(a).to_string()),
        _ => match major_asset_in(&upper) {
            Some(major) => (major.to_string(), partner_for(major).to_string()),
            None => (DEFAULT_PAIR.0.to_string(), DEFAULT_PAIR.1.to_string()),
        },
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn governance_token(project: &str) -> Option<&'static str> {
    GOVERNANCE_TOKENS
        .iter()
        .find(|(prefix, _)| project.starts_with(prefix))
        .map(|(_, token)| *token)
}

fn non_negative(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite()).map(|x| x.max(0.0))
}

/// Canonical output, one variant per record kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRecords {
    Protocols(Vec<Protocol>),
    Pools(Vec<Pool>),
    Prices(Vec<PricePoint>),
}

/// Maps provider record shapes onto the canonical schema. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct Normalizer {
    min_protocol_tvl: f64,
    min_pool_tvl: f64,
    max_protocols: usize,
    max_pools: usize,
    reject_unknown_chains: bool,
    registry: ChainRegistry,
    scorer: RiskScorer,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            min_protocol_tvl: config.min_protocol_tvl,
            min_pool_tvl: config.min_pool_tvl,
            max_protocols: config.max_protocols,
            max_pools: config.max_pools,
            reject_unknown_chains: config.reject_unknown_chains,
            registry: ChainRegistry,
            scorer: RiskScorer,
        }
    }

    /// Registry id for a provider chain name, applying the unknown-chain policy.
    pub fn map_chain(&self, name: &str) -> Option<&'static str> {
        match resolve_chain(name) {
            Some(id) => Some(id),
            None if self.reject_unknown_chains => None,
            None => Some(self.registry.fallback().id.as_str()),
        }
    }

    pub fn normalize(&self, records: &RecordSet) -> CanonicalRecords {
        match records {
            RecordSet::Protocols(raw) => CanonicalRecords::Protocols(self.protocols(raw)),
            RecordSet::Pools(raw) => CanonicalRecords::Pools(self.pools(raw)),
            RecordSet::Prices(raw) => CanonicalRecords::Prices(self.prices(raw)),
        }
    }

    pub fn protocols(&self, raw: &[RawProtocol]) -> Vec<Protocol> {
        let mut seen = HashSet::new();
        let mut protocols: Vec<Protocol> = raw
            .iter()
            .filter_map(|p| {
                let tvl = non_negative(p.tvl_usd).unwrap_or(0.0);
                if tvl < self.min_protocol_tvl {
                    return None;
                }

                let id = p
                    .slug
                    .as_deref()
                    .map(slugify)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| slugify(&p.name));
                if id.is_empty() || !seen.insert(id.clone()) {
                    return None;
                }

                let mut chains: Vec<String> = Vec::new();
                for chain in p.chains.iter().filter_map(|c| resolve_chain(c)) {
                    if !chains.iter().any(|c| c == chain) {
                        chains.push(chain.to_string());
                    }
                }
                if chains.is_empty() {
                    chains.push(self.registry.fallback().id.clone());
                }

                Some(Protocol {
                    id,
                    name: p.name.trim().to_string(),
                    category: p
                        .category
                        .clone()
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| "Other".to_string()),
                    tvl_usd: tvl,
                    chains,
                })
            })
            .collect();

        protocols.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd));
        protocols.truncate(self.max_protocols);
        protocols
    }

    pub fn pools(&self, raw: &[RawPool]) -> Vec<Pool> {
        let mut pools: Vec<Pool> = raw
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                let tvl = non_negative(p.tvl_usd).unwrap_or(0.0);
                if tvl < self.min_pool_tvl {
                    return None;
                }
                let chain_id = self.map_chain(&p.chain)?;
                let protocol_id = slugify(&p.project);
                if protocol_id.is_empty() {
                    return None;
                }

                let (token0, token1) = split_symbol(&p.symbol);
                let apy = non_negative(p.apy).unwrap_or(0.0);
                let (risk_score, il_risk) = self.scorer.estimate(apy);

                Some(Pool {
                    id: format!("{}_{}_{}", protocol_id, chain_id, index),
                    chain_id: chain_id.to_string(),
                    name: format!("{}/{} Pool", token0, token1),
                    symbol: format!("{}/{}", token0, token1),
                    apy,
                    apy_7d: non_negative(p.apy_7d).unwrap_or(apy),
                    apy_30d: non_negative(p.apy_30d).unwrap_or(apy),
                    tvl_usd: tvl,
                    daily_volume_usd: non_negative(p.volume_usd_1d).unwrap_or(0.0),
                    risk_score,
                    il_risk,
                    auto_compound: AUTO_COMPOUNDERS.iter().any(|a| protocol_id.starts_with(a)),
                    rewards_tokens: self.reward_tokens(&protocol_id, &p.reward_tokens, &token0),
                    protocol_id,
                    token0,
                    token1,
                })
            })
            .collect();

        pools.sort_by(|a, b| b.tvl_usd.total_cmp(&a.tvl_usd));
        pools.truncate(self.max_pools);
        pools
    }

    /// Unknown chains are always dropped here: a relabelled quote would pose as a real one.
    pub fn prices(&self, raw: &[RawPrice]) -> Vec<PricePoint> {
        let mut seen = HashSet::new();
        raw.iter()
            .filter_map(|p| {
                if !(p.price_usd.is_finite() && p.price_usd > 0.0) {
                    return None;
                }
                let token_id = p.symbol.trim().to_ascii_uppercase();
                if token_id.is_empty() {
                    return None;
                }
                let chain_id = resolve_chain(&p.chain)?;
                if !seen.insert((token_id.clone(), chain_id)) {
                    return None;
                }

                Some(PricePoint {
                    token_id,
                    chain_id: chain_id.to_string(),
                    price_usd: p.price_usd,
                    observed_at: p.observed_at,
                })
            })
            .collect()
    }

    /// Upstream often reports reward tokens as contract addresses; only symbols are kept.
    fn reward_tokens(&self, protocol_id: &str, upstream: &[String], token0: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for t in upstream {
            let t = t.trim();
            if t.is_empty() || t.starts_with("0x") || t.len() > 12 {
                continue;
            }
            let t = t.to_ascii_uppercase();
            if !tokens.contains(&t) {
                tokens.push(t);
            }
        }
        if tokens.is_empty() {
            tokens.push(governance_token(protocol_id).unwrap_or(token0).to_string());
        }
        tokens
    }
}
