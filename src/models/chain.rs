use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Chain id used when an upstream chain name cannot be resolved.
pub const FALLBACK_CHAIN_ID: &str = "ethereum";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_token: String,
    pub bridge_fee_usd: f64,
    /// Seconds.
    pub avg_block_time: u32,
}

impl Chain {
    fn new(
        id: &str,
        name: &str,
        symbol: &str,
        rpc_url: &str,
        explorer_url: &str,
        native_token: &str,
        bridge_fee_usd: f64,
        avg_block_time: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            rpc_url: rpc_url.to_string(),
            explorer_url: explorer_url.to_string(),
            native_token: native_token.to_string(),
            bridge_fee_usd,
            avg_block_time,
        }
    }
}

lazy_static! {
    static ref CHAINS: Vec<Chain> = vec![
        Chain::new("ethereum", "Ethereum", "ETH", "https://eth.llamarpc.com", "https://etherscan.io", "ETH", 25.0, 12),
        Chain::new("bsc", "BNB Smart Chain", "BNB", "https://bsc-dataseed1.binance.org", "https://bscscan.com", "BNB", 3.0, 3),
        Chain::new("polygon", "Polygon", "MATIC", "https://polygon-rpc.com", "https://polygonscan.com", "MATIC", 1.5, 2),
        Chain::new("avalanche", "Avalanche", "AVAX", "https://api.avax.network/ext/bc/C/rpc", "https://snowtrace.io", "AVAX", 2.5, 1),
        Chain::new("arbitrum", "Arbitrum", "ARB", "https://arb1.arbitrum.io/rpc", "https://arbiscan.io", "ETH", 5.0, 1),
        Chain::new(
            "zetachain",
            "ZetaChain Athens",
            "ZETA",
            "https://zetachain-athens-evm.blockpi.network/v1/rpc/public",
            "https://explorer.zetachain.com",
            "ZETA",
            0.5,
            6,
        ),
    ];
}

/// The fixed set of chains every canonical record must point into.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainRegistry;

impl ChainRegistry {
    pub fn all(&self) -> &'static [Chain] {
        CHAINS.as_slice()
    }

    pub fn get(&self, id: &str) -> Option<&'static Chain> {
        CHAINS.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> {
        CHAINS.iter().map(|c| c.id.as_str())
    }

    pub fn fallback(&self) -> &'static Chain {
        // FALLBACK_CHAIN_ID is always the first registry entry
        &CHAINS[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_registered() {
        let registry = ChainRegistry;
        assert_eq!(registry.fallback().id, FALLBACK_CHAIN_ID);
        assert!(registry.contains(FALLBACK_CHAIN_ID));
    }

    #[test]
    fn registry_invariants_hold() {
        let registry = ChainRegistry;
        let mut ids: Vec<&str> = registry.ids().collect();
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), len, "chain ids must be unique");

        for chain in registry.all() {
            assert!(chain.bridge_fee_usd >= 0.0);
            assert!(chain.avg_block_time > 0);
        }
    }

    #[test]
    fn unknown_chain_is_absent() {
        assert!(ChainRegistry.get("solana").is_none());
    }
}
