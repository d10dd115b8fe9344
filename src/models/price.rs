use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One token price as seen on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub token_id: String,
    pub chain_id: String,
    pub price_usd: f64,
    pub observed_at: DateTime<Utc>,
}
