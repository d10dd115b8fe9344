pub mod aggregator;
pub mod detector;
pub mod normalizer;
pub mod portfolio;
pub mod resolver;
pub mod risk;
pub mod strategy;

pub use aggregator::{Aggregator, PoolQuery, PoolSort, SourceSet};
pub use detector::ArbitrageDetector;
pub use normalizer::Normalizer;
pub use resolver::{FallbackResolver, Resolution, SourceHealth, SourceHealthBook};
pub use risk::RiskScorer;
pub use strategy::{StrategyOptimizer, StrategyPlan, StrategyRequest};
