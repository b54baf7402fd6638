//! Per-session network configuration
//!
//! A [`NetworkContext`] is constructed once per payment session and threaded
//! through every component call. Contract ids come from the SaucerSwap
//! deployment registry (https://docs.saucerswap.finance/developer/contract-deployments).

use serde::{Deserialize, Serialize};

use crate::types::{EngineResult, SettlementError};

/// Target Hedera network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s.to_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(SettlementError::InvalidEntityId(format!(
                "unknown network {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine needs to talk to one network
///
/// No ambient globals: callers build one of these per payment session and
/// pass it down.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    pub network: Network,
    /// Mirror node REST base, e.g. https://mainnet.mirrornode.hedera.com
    pub mirror_base: String,
    /// JSON-RPC relay base, e.g. https://mainnet.hashio.io/api
    pub rpc_base: String,
    /// SaucerSwap REST API base (pool listings)
    pub dex_api_base: String,
    /// SaucerSwap v1 router (UniswapV2-style)
    pub v1_router: String,
    /// SaucerSwap v2 swap router
    pub v2_router: String,
    /// SaucerSwap v2 quoter
    pub v2_quoter: String,
    /// WHBAR helper contract (wrap/unwrap)
    pub whbar_helper: String,
    /// Wrapped-native token id; the native-coin alias normalizes to this
    pub whbar_token: String,
    /// USDC token id, used for fiat conversion quotes
    pub usdc_token: String,
}

impl NetworkContext {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            mirror_base: "https://mainnet.mirrornode.hedera.com".to_string(),
            rpc_base: "https://mainnet.hashio.io/api".to_string(),
            dex_api_base: "https://api.saucerswap.finance".to_string(),
            v1_router: "0.0.3045981".to_string(),
            v2_router: "0.0.3949434".to_string(),
            v2_quoter: "0.0.3949424".to_string(),
            whbar_helper: "0.0.5808826".to_string(),
            whbar_token: "0.0.1456986".to_string(),
            usdc_token: "0.0.456858".to_string(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            mirror_base: "https://testnet.mirrornode.hedera.com".to_string(),
            rpc_base: "https://testnet.hashio.io/api".to_string(),
            dex_api_base: "https://test-api.saucerswap.finance".to_string(),
            v1_router: "0.0.19264".to_string(),
            v2_router: "0.0.1414040".to_string(),
            v2_quoter: "0.0.1390002".to_string(),
            whbar_helper: "0.0.4371947".to_string(),
            whbar_token: "0.0.15058".to_string(),
            usdc_token: "0.0.5449".to_string(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self::testnet(),
            Network::Mainnet => Self::mainnet(),
        }
    }

    /// Resolve the native-coin alias to the network's wrapped-native token.
    /// Pool listings and swap paths only know WHBAR.
    pub fn normalize_token_id<'a>(&'a self, token_id: &'a str) -> &'a str {
        if token_id == crate::types::HBAR_TOKEN_ID {
            &self.whbar_token
        } else {
            token_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!(Network::parse("mainnet").unwrap(), Network::Mainnet);
        assert_eq!(Network::parse("TESTNET").unwrap(), Network::Testnet);
        assert!(Network::parse("previewnet").is_err());
    }

    #[test]
    fn test_native_alias_normalization() {
        let ctx = NetworkContext::mainnet();
        assert_eq!(ctx.normalize_token_id("hbar"), "0.0.1456986");
        assert_eq!(ctx.normalize_token_id("0.0.731861"), "0.0.731861");
    }
}
