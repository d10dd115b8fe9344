//! Token deployments queried by the per-chain price sources.

/// Address of one token on one registry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeployment {
    pub symbol: &'static str,
    pub chain_id: &'static str,
    pub address: &'static str,
}

const fn dep(symbol: &'static str, chain_id: &'static str, address: &'static str) -> TokenDeployment {
    TokenDeployment { symbol, chain_id, address }
}

pub const TRACKED_TOKENS: &[TokenDeployment] = &[
    dep("USDC", "ethereum", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    dep("USDC", "bsc", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
    dep("USDC", "polygon", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
    dep("USDC", "arbitrum", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
    dep("USDC", "avalanche", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    dep("USDT", "ethereum", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    dep("USDT", "bsc", "0x55d398326f99059fF775485246999027B3197955"),
    dep("USDT", "polygon", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
    dep("USDT", "arbitrum", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
    dep("USDT", "avalanche", "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7"),
    dep("ETH", "ethereum", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
    dep("ETH", "bsc", "0x2170Ed0880ac9A755fd29B2688956BD959F933F8"),
    dep("ETH", "polygon", "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"),
    dep("ETH", "arbitrum", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
    dep("ETH", "avalanche", "0x49D5c2BdFfac6CE2BFdB6640F4F80f226bc10bAB"),
    dep("BTC", "ethereum", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
    dep("BTC", "bsc", "0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c"),
    dep("BTC", "polygon", "0x1BFD67037B42Cf73acF2047067bd4F2C47D9BfD6"),
    dep("BTC", "arbitrum", "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f"),
    dep("BTC", "avalanche", "0x50b7545627a5162F82A992c33b87aDc75187B52B"),
];

pub fn deployments_on(chain_id: &str) -> impl Iterator<Item = &'static TokenDeployment> + '_ {
    TRACKED_TOKENS.iter().filter(move |t| t.chain_id == chain_id)
}

/// Reverse lookup used when a provider echoes back only the address.
pub fn by_address(chain_id: &str, address: &str) -> Option<&'static TokenDeployment> {
    TRACKED_TOKENS
        .iter()
        .find(|t| t.chain_id == chain_id && t.address.eq_ignore_ascii_case(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChainRegistry;

    #[test]
    fn deployments_point_at_registry_chains() {
        for token in TRACKED_TOKENS {
            assert!(ChainRegistry.contains(token.chain_id), "{} on {}", token.symbol, token.chain_id);
        }
    }

    #[test]
    fn address_lookup_ignores_case() {
        let usdc = by_address("ethereum", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(usdc.map(|t| t.symbol), Some("USDC"));
        assert!(by_address("bsc", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").is_none());
    }
}
