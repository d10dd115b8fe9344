use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::ArbitrageConfig;
use crate::models::{ArbitrageOpportunity, ChainRegistry, PricePoint};

/// Estimated USD cost of one swap, by chain. Fixed; not derived from live gas prices.
const SWAP_GAS_USD: &[(&str, f64)] = &[
    ("ethereum", 15.0),
    ("bsc", 0.3),
    ("polygon", 0.05),
    ("avalanche", 0.5),
    ("arbitrum", 0.4),
    ("zetachain", 0.1),
];

const UNKNOWN_CHAIN_SWAP_GAS_USD: f64 = 5.0;

pub fn swap_gas_usd(chain_id: &str) -> f64 {
    SWAP_GAS_USD
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, cost)| *cost)
        .unwrap_or(UNKNOWN_CHAIN_SWAP_GAS_USD)
}

/// Cross-chain spread scanner. Batch estimate only: no slippage, depth or bridge latency.
pub struct ArbitrageDetector {
    trade_size_usd: f64,
    expiry: Duration,
}

impl ArbitrageDetector {
    pub fn new(config: &ArbitrageConfig) -> Self {
        Self {
            trade_size_usd: config.trade_size_usd,
            expiry: Duration::minutes(config.expiry_minutes),
        }
    }

    pub fn trade_size_usd(&self) -> f64 {
        self.trade_size_usd
    }

    /// Buy-side swap + sell-side swap + bridging out of the source chain.
    pub fn gas_cost_usd(&self, source_chain: &str, dest_chain: &str, registry: &ChainRegistry) -> f64 {
        let bridge = registry
            .get(source_chain)
            .map(|c| c.bridge_fee_usd)
            .unwrap_or(0.0);
        swap_gas_usd(source_chain) + swap_gas_usd(dest_chain) + bridge
    }

    /// Prices the `low -> high` route; `None` unless it clears gas.
    pub fn evaluate(
        &self,
        low: &PricePoint,
        high: &PricePoint,
        gas_cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        if low.chain_id == high.chain_id || low.price_usd <= 0.0 || high.price_usd <= low.price_usd {
            return None;
        }

        let opp = ArbitrageOpportunity::from_prices(
            low,
            high,
            self.trade_size_usd,
            gas_cost_usd,
            now,
            now + self.expiry,
        );
        (opp.net_profit_usd > 0.0).then_some(opp)
    }

    /// One route per token (cheapest chain -> dearest chain), ranked by net profit.
    pub fn detect(&self, prices: &[PricePoint], registry: &ChainRegistry) -> Vec<ArbitrageOpportunity> {
        let now = Utc::now();

        // group by token, keeping first-seen order so equal profits rank stably
        let mut order: Vec<&str> = Vec::new();
        let mut by_token: HashMap<&str, Vec<ChainQuotes>> = HashMap::new();
        for point in prices {
            if !registry.contains(&point.chain_id) || !(point.price_usd > 0.0) {
                continue;
            }
            let chains = by_token.entry(point.token_id.as_str()).or_insert_with(|| {
                order.push(point.token_id.as_str());
                Vec::new()
            });
            match chains.iter_mut().find(|c| c.low.chain_id == point.chain_id) {
                Some(quotes) => quotes.observe(point),
                None => chains.push(ChainQuotes { low: point, high: point }),
            }
        }

        let mut opportunities = Vec::new();
        for token in order {
            let Some(chains) = by_token.get(token) else {
                continue;
            };
            let Some((low, high)) = widest_spread(chains) else {
                continue;
            };

            let gas = self.gas_cost_usd(&low.chain_id, &high.chain_id, registry);
            match self.evaluate(low, high, gas, now) {
                Some(opp) => opportunities.push(opp),
                None => tracing::trace!(
                    "{} {}->{} does not clear ${:.2} gas",
                    token,
                    low.chain_id,
                    high.chain_id,
                    gas
                ),
            }
        }

        opportunities.sort_by(|a, b| b.net_profit_usd.total_cmp(&a.net_profit_usd));
        opportunities
    }
}

/// Cheapest and dearest quote seen for a token on one chain.
struct ChainQuotes<'a> {
    low: &'a PricePoint,
    high: &'a PricePoint,
}

impl<'a> ChainQuotes<'a> {
    fn observe(&mut self, point: &'a PricePoint) {
        if point.price_usd < self.low.price_usd {
            self.low = point;
        }
        if point.price_usd > self.high.price_usd {
            self.high = point;
        }
    }
}

/// Buy on one chain, sell on another: the pair of distinct chains with the largest gross spread.
/// Ties keep the earliest pair.
fn widest_spread<'a>(chains: &[ChainQuotes<'a>]) -> Option<(&'a PricePoint, &'a PricePoint)> {
    let mut best: Option<(&PricePoint, &PricePoint)> = None;
    for (i, buy) in chains.iter().enumerate() {
        for (j, sell) in chains.iter().enumerate() {
            if i == j {
                continue;
            }
            let spread = sell.high.price_usd - buy.low.price_usd;
            if best.map_or(true, |(l, h)| spread > h.price_usd - l.price_usd) {
                best = Some((buy.low, sell.high));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::synthetic::SyntheticGenerator;

    fn point(token: &str, chain: &str, price: f64) -> PricePoint {
        PricePoint {
            token_id: token.to_string(),
            chain_id: chain.to_string(),
            price_usd: price,
            observed_at: Utc::now(),
        }
    }

    fn detector() -> ArbitrageDetector {
        ArbitrageDetector::new(&ArbitrageConfig::default())
    }

    #[test]
    fn spread_example_nets_out_gas() {
        let d = detector();
        let low = point("ETH", "polygon", 100.0);
        let high = point("ETH", "arbitrum", 101.5);
        let now = Utc::now();

        let kept = d.evaluate(&low, &high, 20.0, now).expect("55 net should be kept");
        assert!((kept.profit_usd - 75.0).abs() < 1e-9);
        assert!((kept.net_profit_usd - 55.0).abs() < 1e-9);
        assert!((kept.profit_percentage - 1.5).abs() < 1e-9);
        assert_eq!(kept.trade_size_usd, 5_000.0);

        assert!(d.evaluate(&low, &high, 80.0, now).is_none());
    }

    #[test]
    fn expiry_is_in_the_future() {
        let d = detector();
        let now = Utc::now();
        let opp = d
            .evaluate(&point("BTC", "bsc", 100.0), &point("BTC", "polygon", 110.0), 1.0, now)
            .unwrap();
        assert_eq!(opp.expires_at - opp.detected_at, Duration::minutes(15));
        assert!(!opp.is_expired(now));
        assert!(opp.is_expired(now + Duration::minutes(16)));
    }

    #[test]
    fn gas_includes_source_bridge_fee() {
        let d = detector();
        let gas = d.gas_cost_usd("ethereum", "polygon", &ChainRegistry);
        assert!((gas - (15.0 + 0.05 + 25.0)).abs() < 1e-9);
        assert!(d.gas_cost_usd("polygon", "ethereum", &ChainRegistry) < gas);
    }

    #[test]
    fn picks_cheapest_and_dearest_chain() {
        let prices = vec![
            point("USDC", "bsc", 1.00),
            point("USDC", "polygon", 0.97),
            point("USDC", "arbitrum", 1.02),
        ];
        let opps = detector().detect(&prices, &ChainRegistry);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].source_chain, "polygon");
        assert_eq!(opps[0].dest_chain, "arbitrum");
    }

    #[test]
    fn single_chain_and_unprofitable_tokens_are_skipped() {
        let prices = vec![
            point("ETH", "ethereum", 3000.0),
            point("ETH", "ethereum", 3100.0),
            point("UNI", "polygon", 8.0),
            point("UNI", "bsc", 8.001),
            point("AAVE", "solana", 90.0),
            point("AAVE", "polygon", 99.0),
        ];
        assert!(detector().detect(&prices, &ChainRegistry).is_empty());
    }

    #[test]
    fn repeated_quotes_on_one_chain_still_pair_across_chains() {
        let prices = vec![
            point("ETH", "ethereum", 3000.0),
            point("ETH", "ethereum", 3100.0),
            point("ETH", "polygon", 3090.0),
        ];
        let opps = detector().detect(&prices, &ChainRegistry);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].source_chain, "ethereum");
        assert_eq!(opps[0].dest_chain, "polygon");
        assert_eq!(opps[0].source_price, 3000.0);
        assert!((opps[0].net_profit_usd - 109.95).abs() < 1e-6);
    }

    #[test]
    fn results_rank_by_net_profit() {
        let prices = vec![
            point("A", "polygon", 100.0),
            point("A", "arbitrum", 101.0),
            point("B", "polygon", 100.0),
            point("B", "arbitrum", 103.0),
            point("C", "polygon", 100.0),
            point("C", "arbitrum", 102.0),
        ];
        let opps = detector().detect(&prices, &ChainRegistry);
        let tokens: Vec<&str> = opps.iter().map(|o| o.token_symbol.as_str()).collect();
        assert_eq!(tokens, vec!["B", "C", "A"]);
    }

    #[test]
    fn equal_profits_keep_input_order() {
        let prices = vec![
            point("X", "polygon", 10.0),
            point("X", "bsc", 10.5),
            point("Y", "polygon", 10.0),
            point("Y", "bsc", 10.5),
        ];
        let opps = detector().detect(&prices, &ChainRegistry);
        let tokens: Vec<&str> = opps.iter().map(|o| o.token_symbol.as_str()).collect();
        assert_eq!(tokens, vec!["X", "Y"]);
    }

    #[test]
    fn synthetic_observations_only_yield_profitable_distinct_routes() {
        for seed in 0..25 {
            let prices = SyntheticGenerator::seeded(seed).prices();
            for opp in detector().detect(&prices, &ChainRegistry) {
                assert!(opp.net_profit_usd > 0.0);
                assert_ne!(opp.source_chain, opp.dest_chain);
                assert!(opp.source_price > 0.0 && opp.dest_price > opp.source_price);
                assert!(opp.gas_cost_usd > 0.0);
                assert!(opp.expires_at > opp.detected_at);
            }
        }
    }
}
