use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub category: String,
    pub tvl_usd: f64,
    /// Registry chain ids, never empty.
    pub chains: Vec<String>,
}
