use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_address: String,
    pub chain_id: String,
    pub pool_id: String,
    #[serde(default = "default_token0")]
    pub token0: String,
    #[serde(default = "default_token1")]
    pub token1: String,
    pub deposited_amount_usd: f64,
    pub current_value_usd: f64,
    pub rewards_earned_usd: f64,
    pub apy_earned: f64,
    pub last_compound: DateTime<Utc>,
}

fn default_token0() -> String {
    "USDC".to_string()
}

fn default_token1() -> String {
    "USDT".to_string()
}

impl Position {
    /// Builds a position with `rewards_earned_usd` derived from the two balances.
    pub fn new(
        user_address: String,
        chain_id: String,
        pool_id: String,
        token0: String,
        token1: String,
        deposited_amount_usd: f64,
        current_value_usd: f64,
        apy_earned: f64,
        last_compound: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_address,
            chain_id,
            pool_id,
            token0,
            token1,
            deposited_amount_usd,
            current_value_usd,
            rewards_earned_usd: current_value_usd - deposited_amount_usd,
            apy_earned,
            last_compound,
        }
    }

    /// A position needs a positive deposit and a compound time that has already happened.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.deposited_amount_usd > 0.0 && self.last_compound <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value_locked: f64,
    pub total_deposited: f64,
    pub total_rewards_earned: f64,
    pub total_profit_loss: f64,
    /// `None` when there are no positions to average over.
    pub average_apy: Option<f64>,
    pub active_positions: usize,
    pub chains_count: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldHistoryPoint {
    pub date: DateTime<Utc>,
    pub total_value: f64,
    pub daily_yield: f64,
}
