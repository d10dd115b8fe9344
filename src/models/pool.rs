use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Impermanent-loss risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IlRisk {
    Low,
    Medium,
    High,
}

impl IlRisk {
    /// Closed score band a pool of this tier must fall into.
    pub fn score_band(self) -> (f64, f64) {
        match self {
            IlRisk::Low => (1.0, 3.0),
            IlRisk::Medium => (3.0, 7.0),
            IlRisk::High => (7.0, 10.0),
        }
    }

    pub fn contains(self, score: f64) -> bool {
        let (lo, hi) = self.score_band();
        score >= lo && score <= hi
    }
}

impl fmt::Display for IlRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IlRisk::Low => "Low",
            IlRisk::Medium => "Medium",
            IlRisk::High => "High",
        };
        f.write_str(s)
    }
}

impl FromStr for IlRisk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(IlRisk::Low),
            "medium" => Ok(IlRisk::Medium),
            "high" => Ok(IlRisk::High),
            other => Err(format!("unknown risk tier: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub protocol_id: String,
    pub chain_id: String,
    pub name: String,
    pub symbol: String,
    pub token0: String,
    pub token1: String,
    pub apy: f64,
    pub apy_7d: f64,
    pub apy_30d: f64,
    pub tvl_usd: f64,
    pub daily_volume_usd: f64,
    pub risk_score: f64,
    pub il_risk: IlRisk,
    pub auto_compound: bool,
    pub rewards_tokens: Vec<String>,
}

impl Pool {
    /// Checks the canonical pool invariants shared by live and synthetic records.
    pub fn is_consistent(&self) -> bool {
        self.token0 != self.token1
            && !self.rewards_tokens.is_empty()
            && self.apy >= 0.0
            && self.apy_7d >= 0.0
            && self.apy_30d >= 0.0
            && self.tvl_usd >= 0.0
            && self.daily_volume_usd >= 0.0
            && (0.0..=10.0).contains(&self.risk_score)
            && self.il_risk.contains(self.risk_score)
    }
}
