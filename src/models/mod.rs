pub mod arbitrage;
pub mod chain;
pub mod pool;
pub mod position;
pub mod price;
pub mod protocol;

pub use arbitrage::ArbitrageOpportunity;
pub use chain::{Chain, ChainRegistry, FALLBACK_CHAIN_ID};
pub use pool::{IlRisk, Pool};
pub use position::{PortfolioSummary, Position, YieldHistoryPoint};
pub use price::PricePoint;
pub use protocol::Protocol;

/// Rounds a USD amount to cents.
pub(crate) fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
