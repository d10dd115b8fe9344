//! Cross-chain allocation heuristic.
//!
//! Candidate pools are those at or below the requested impermanent-loss tier. Each chain is weighted
//! by `mean APY / mean risk score` of its candidates and the weights are turned into whole
//! percentages with the largest-remainder method, so the allocation always sums to 100.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{round_cents, ChainRegistry, IlRisk, Pool, FALLBACK_CHAIN_ID};

const DEFAULT_AMOUNT_USD: f64 = 10_000.0;
const REBALANCES_PER_MONTH: f64 = 4.0;
const HIGH_RISK_SCORE: f64 = 5.0;
const CHEAP_BRIDGE_FEE_USD: f64 = 5.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyRequest {
    /// Highest tier allowed; Medium when absent.
    #[serde(default)]
    pub max_risk: Option<IlRisk>,
    #[serde(default)]
    pub amount_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyPlan {
    /// Chain id -> whole percent.
    pub optimized_allocation: BTreeMap<String, u32>,
    pub expected_apy: f64,
    pub risk_score: f64,
    pub amount_usd: f64,
    pub expected_monthly_yield_usd: f64,
    /// Monthly bridge fees avoided versus rebalancing everything through the fallback chain.
    pub gas_optimization_savings: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug)]
struct ChainStats {
    chain_id: String,
    mean_apy: f64,
    mean_risk: f64,
    pools: usize,
    auto_compound: usize,
}

pub struct StrategyOptimizer {
    registry: ChainRegistry,
}

impl Default for StrategyOptimizer {
    fn default() -> Self {
        Self::new(ChainRegistry)
    }
}

impl StrategyOptimizer {
    pub fn new(registry: ChainRegistry) -> Self {
        Self { registry }
    }

    pub fn optimize(&self, pools: &[Pool], request: &StrategyRequest) -> StrategyPlan {
        let max_risk = request.max_risk.unwrap_or(IlRisk::Medium);
        let amount_usd = request
            .amount_usd
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or(DEFAULT_AMOUNT_USD);

        let stats = self.chain_stats(pools, max_risk);
        if stats.is_empty() {
            return StrategyPlan {
                optimized_allocation: BTreeMap::new(),
                expected_apy: 0.0,
                risk_score: 0.0,
                amount_usd,
                expected_monthly_yield_usd: 0.0,
                gas_optimization_savings: 0.0,
                recommendations: vec![format!(
                    "No pools at or below {} risk; raise max_risk or retry later",
                    max_risk
                )],
            };
        }

        let weights: Vec<f64> = stats
            .iter()
            .map(|s| if s.mean_risk > 0.0 { s.mean_apy / s.mean_risk } else { 0.0 })
            .collect();
        let shares = largest_remainder(&weights, 100);

        let mut expected_apy = 0.0;
        let mut risk_score = 0.0;
        let mut weighted_fee = 0.0;
        for (s, share) in stats.iter().zip(&shares) {
            let f = f64::from(*share) / 100.0;
            expected_apy += f * s.mean_apy;
            risk_score += f * s.mean_risk;
            weighted_fee += f * self.bridge_fee(&s.chain_id);
        }

        let fallback_fee = self.bridge_fee(FALLBACK_CHAIN_ID);
        let savings = ((fallback_fee - weighted_fee) * REBALANCES_PER_MONTH).max(0.0);

        let recommendations = self.recommend(&stats, &shares, risk_score);

        StrategyPlan {
            optimized_allocation: stats
                .iter()
                .zip(&shares)
                .filter(|(_, share)| **share > 0)
                .map(|(s, share)| (s.chain_id.clone(), *share))
                .collect(),
            expected_apy: round_cents(expected_apy),
            risk_score: (risk_score * 10.0).round() / 10.0,
            amount_usd,
            expected_monthly_yield_usd: round_cents(amount_usd * expected_apy / 100.0 / 12.0),
            gas_optimization_savings: round_cents(savings),
            recommendations,
        }
    }

    fn bridge_fee(&self, chain_id: &str) -> f64 {
        self.registry.get(chain_id).map(|c| c.bridge_fee_usd).unwrap_or(0.0)
    }

    /// Candidate stats per chain, in registry order.
    fn chain_stats(&self, pools: &[Pool], max_risk: IlRisk) -> Vec<ChainStats> {
        self.registry
            .ids()
            .filter_map(|chain_id| {
                let candidates: Vec<&Pool> = pools
                    .iter()
                    .filter(|p| p.chain_id == chain_id && p.il_risk <= max_risk)
                    .collect();
                if candidates.is_empty() {
                    return None;
                }
                let n = candidates.len() as f64;
                Some(ChainStats {
                    chain_id: chain_id.to_string(),
                    mean_apy: candidates.iter().map(|p| p.apy).sum::<f64>() / n,
                    mean_risk: candidates.iter().map(|p| p.risk_score).sum::<f64>() / n,
                    pools: candidates.len(),
                    auto_compound: candidates.iter().filter(|p| p.auto_compound).count(),
                })
            })
            .collect()
    }

    fn recommend(&self, stats: &[ChainStats], shares: &[u32], risk_score: f64) -> Vec<String> {
        let mut out = Vec::new();

        let top = stats.iter().zip(shares).max_by_key(|(_, share)| **share);
        let cheapest = stats
            .iter()
            .zip(shares)
            .filter(|(s, _)| self.bridge_fee(&s.chain_id) < CHEAP_BRIDGE_FEE_USD)
            .min_by(|(a, _), (b, _)| self.bridge_fee(&a.chain_id).total_cmp(&self.bridge_fee(&b.chain_id)));
        if let (Some((top, top_share)), Some((cheap, cheap_share))) = (top, cheapest) {
            if cheap.chain_id != top.chain_id && cheap_share < top_share {
                let name = self
                    .registry
                    .get(&cheap.chain_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(cheap.chain_id.as_str());
                out.push(format!("Consider increasing allocation to {} for lower fees", name));
            }
        }

        let pools: usize = stats.iter().map(|s| s.pools).sum();
        let compounding: usize = stats.iter().map(|s| s.auto_compound).sum();
        if compounding > 0 {
            out.push(format!(
                "{} of {} candidate pools auto-compound; prefer them to save on claim transactions",
                compounding, pools
            ));
        } else {
            out.push("Compound rewards manually every 3 days to keep gas below yield".to_string());
        }

        if risk_score > HIGH_RISK_SCORE {
            out.push("Diversify across more stable pairs to reduce IL risk".to_string());
        }

        if stats.len() == 1 {
            out.push(format!(
                "All candidates sit on {}; consider a second chain",
                stats[0].chain_id
            ));
        }

        out
    }
}

/// Splits `total` into whole parts proportional to `weights`. Ties go to the earlier entry.
fn largest_remainder(weights: &[f64], total: u32) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }

    let sum: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    let ideal: Vec<f64> = if sum > 0.0 {
        weights
            .iter()
            .map(|w| if w.is_finite() && *w > 0.0 { w / sum * f64::from(total) } else { 0.0 })
            .collect()
    } else {
        vec![f64::from(total) / weights.len() as f64; weights.len()]
    };

    let mut parts: Vec<u32> = ideal.iter().map(|x| x.floor() as u32).collect();
    let assigned: u32 = parts.iter().sum();

    let mut order: Vec<usize> = (0..ideal.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = ideal[a] - ideal[a].floor();
        let rb = ideal[b] - ideal[b].floor();
        rb.total_cmp(&ra)
    });
    for &i in order.iter().take(total.saturating_sub(assigned) as usize) {
        parts[i] += 1;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(chain: &str, apy: f64, risk: f64, tier: IlRisk) -> Pool {
        Pool {
            id: format!("p_{chain}_{apy}"),
            protocol_id: "aave".to_string(),
            chain_id: chain.to_string(),
            name: "USDC/USDT".to_string(),
            symbol: "USDC-USDT".to_string(),
            token0: "USDC".to_string(),
            token1: "USDT".to_string(),
            apy,
            apy_7d: apy,
            apy_30d: apy,
            tvl_usd: 1_000_000.0,
            daily_volume_usd: 0.0,
            risk_score: risk,
            il_risk: tier,
            auto_compound: false,
            rewards_tokens: vec!["AAVE".to_string()],
        }
    }

    #[test]
    fn largest_remainder_sums_to_total() {
        assert_eq!(largest_remainder(&[1.0, 1.0, 1.0], 100), vec![34, 33, 33]);
        assert_eq!(largest_remainder(&[3.0, 1.0], 100), vec![75, 25]);
        assert_eq!(largest_remainder(&[0.0, 0.0], 100), vec![50, 50]);
        assert!(largest_remainder(&[], 100).is_empty());

        let parts = largest_remainder(&[0.37, 1.9, 2.2, 0.01, 5.5], 100);
        assert_eq!(parts.iter().sum::<u32>(), 100);
    }

    #[test]
    fn allocation_favours_apy_per_unit_risk() {
        let pools = vec![
            pool("ethereum", 4.0, 2.0, IlRisk::Low),
            pool("polygon", 12.0, 4.0, IlRisk::Medium),
            pool("bsc", 40.0, 9.0, IlRisk::High),
        ];
        let plan = StrategyOptimizer::default().optimize(&pools, &StrategyRequest::default());

        assert!(!plan.optimized_allocation.contains_key("bsc"));
        assert_eq!(plan.optimized_allocation["ethereum"], 40);
        assert_eq!(plan.optimized_allocation["polygon"], 60);
        assert_eq!(plan.optimized_allocation.values().sum::<u32>(), 100);
        assert!((plan.expected_apy - (0.4 * 4.0 + 0.6 * 12.0)).abs() < 0.01);
        assert!((plan.risk_score - 3.2).abs() < 1e-9);
        assert!(plan.gas_optimization_savings > 0.0);
        assert!(!plan.recommendations.is_empty());
    }

    #[test]
    fn max_risk_high_admits_everything() {
        let pools = vec![
            pool("ethereum", 4.0, 2.0, IlRisk::Low),
            pool("bsc", 40.0, 9.0, IlRisk::High),
        ];
        let request = StrategyRequest {
            max_risk: Some(IlRisk::High),
            amount_usd: Some(1_200.0),
        };
        let plan = StrategyOptimizer::default().optimize(&pools, &request);
        assert_eq!(plan.optimized_allocation.len(), 2);
        assert_eq!(plan.amount_usd, 1_200.0);
        assert!(plan.expected_monthly_yield_usd > 0.0);
    }

    #[test]
    fn no_candidates_gives_an_empty_plan() {
        let pools = vec![pool("ethereum", 30.0, 8.0, IlRisk::High)];
        let request = StrategyRequest {
            max_risk: Some(IlRisk::Low),
            amount_usd: None,
        };
        let plan = StrategyOptimizer::default().optimize(&pools, &request);
        assert!(plan.optimized_allocation.is_empty());
        assert_eq!(plan.expected_apy, 0.0);
        assert_eq!(plan.risk_score, 0.0);
        assert_eq!(plan.gas_optimization_savings, 0.0);
        assert_eq!(plan.amount_usd, DEFAULT_AMOUNT_USD);
    }

    #[test]
    fn request_fields_are_optional() {
        let request: StrategyRequest = serde_json::from_str(r#"{"max_risk":"Low"}"#).unwrap();
        assert_eq!(request.max_risk, Some(IlRisk::Low));
        let request: StrategyRequest = serde_json::from_str("{}").unwrap();
        assert!(request.max_risk.is_none() && request.amount_usd.is_none());
    }
}
