use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PricePoint;

/// Estimated cross-chain spread, net of assumed gas. Not guaranteed executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: Uuid,
    pub token_symbol: String,
    pub source_chain: String,
    pub dest_chain: String,
    pub source_price: f64,
    pub dest_price: f64,
    pub profit_percentage: f64,
    pub profit_usd: f64,
    pub gas_cost_usd: f64,
    pub net_profit_usd: f64,
    pub trade_size_usd: f64,
    pub detected_at: DateTime<Utc>,
    /// Display hint only; nothing revokes an opportunity once this passes.
    pub expires_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    pub fn from_prices(
        low: &PricePoint,
        high: &PricePoint,
        trade_size_usd: f64,
        gas_cost_usd: f64,
        detected_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let spread = high.price_usd / low.price_usd - 1.0;
        let profit_usd = trade_size_usd * spread;
        Self {
            id: Uuid::new_v4(),
            token_symbol: low.token_id.clone(),
            source_chain: low.chain_id.clone(),
            dest_chain: high.chain_id.clone(),
            source_price: low.price_usd,
            dest_price: high.price_usd,
            profit_percentage: spread * 100.0,
            profit_usd,
            gas_cost_usd,
            net_profit_usd: profit_usd - gas_cost_usd,
            trade_size_usd,
            detected_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
