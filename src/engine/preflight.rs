//! Payable-token preflight
//!
//! Before offering tokens at checkout, filter the candidate list down to
//! tokens the payer actually holds and that can reach the settlement token,
//! either directly or through a hosted pool. Balance reads go through the
//! mirror node; a candidate that fails its read is skipped, not fatal.

use crate::amm::pools::{PoolDirectory, PoolLocator};
use crate::mirror::ChainReader;
use crate::network::NetworkContext;
use crate::types::{EngineResult, TokenDescriptor};

/// Candidates the payer can settle the order with
pub async fn payable_tokens(
    chain: &dyn ChainReader,
    pools: &dyn PoolDirectory,
    ctx: &NetworkContext,
    payer_account: &str,
    candidates: &[TokenDescriptor],
    settlement: &TokenDescriptor,
) -> EngineResult<Vec<TokenDescriptor>> {
    let locator = PoolLocator::new(pools, ctx);
    let mut payable = Vec::with_capacity(candidates.len());

    for token in candidates {
        if !has_balance(chain, payer_account, token).await {
            tracing::debug!(token = %token.id, "skipped: no balance");
            continue;
        }
        if !token.same_token(settlement) {
            let routable = locator.find_pool(&token.id, &settlement.id).await?.is_some();
            if !routable {
                tracing::debug!(
                    token = %token.id,
                    settlement = %settlement.id,
                    "skipped: no pool to the settlement token"
                );
                continue;
            }
        }
        payable.push(token.clone());
    }

    Ok(payable)
}

async fn has_balance(chain: &dyn ChainReader, account: &str, token: &TokenDescriptor) -> bool {
    let balance = if token.is_native() {
        chain.hbar_balance(account).await
    } else {
        chain
            .token_balance(account, &token.id)
            .await
            .map(|b| b.map(|t| t.balance))
    };
    match balance {
        Ok(Some(amount)) => amount > 0,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(token = %token.id, error = %e, "balance read failed, skipping token");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::pools::{AmmVersion, ListedToken, PoolListing};
    use crate::mirror::{TokenBalance, TransactionRecord};
    use crate::types::SettlementError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const WHBAR: &str = "0.0.1456986";
    const SAUCE: &str = "0.0.731861";
    const USDC: &str = "0.0.456858";
    const ORPHAN: &str = "0.0.999999";

    struct FakeChain {
        hbar: Option<u128>,
        tokens: HashMap<String, u128>,
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn contract_call(&self, _to: &str, _data: &[u8]) -> EngineResult<Vec<u8>> {
            Err(SettlementError::MirrorNode("not scripted".into()))
        }

        async fn eth_call(&self, _to: &str, _data: &[u8]) -> EngineResult<Vec<u8>> {
            Err(SettlementError::MirrorNode("not scripted".into()))
        }

        async fn transaction_record(&self, _reference: &str) -> EngineResult<TransactionRecord> {
            Err(SettlementError::MirrorNode("not scripted".into()))
        }

        async fn hbar_balance(&self, _account: &str) -> EngineResult<Option<u128>> {
            Ok(self.hbar)
        }

        async fn token_balance(
            &self,
            _account: &str,
            token_id: &str,
        ) -> EngineResult<Option<TokenBalance>> {
            Ok(self.tokens.get(token_id).map(|balance| TokenBalance {
                token_id: token_id.to_string(),
                balance: *balance,
                decimals: 6,
            }))
        }
    }

    struct FakePools(Vec<PoolListing>);

    #[async_trait]
    impl PoolDirectory for FakePools {
        async fn pools(&self, version: AmmVersion) -> EngineResult<Vec<PoolListing>> {
            match version {
                AmmVersion::V2 => Ok(self.0.clone()),
                AmmVersion::V1 => Ok(vec![]),
            }
        }
    }

    fn listing(a: &str, b: &str) -> PoolListing {
        PoolListing {
            contract_id: "0.0.5555".to_string(),
            token_a: ListedToken {
                id: a.to_string(),
                decimals: 6,
            },
            token_b: ListedToken {
                id: b.to_string(),
                decimals: 6,
            },
        }
    }

    #[tokio::test]
    async fn test_filters_by_balance_and_routability() {
        let chain = FakeChain {
            hbar: Some(100),
            // SAUCE held, ORPHAN held but poolless, USDC not associated
            tokens: HashMap::from([(SAUCE.to_string(), 50u128), (ORPHAN.to_string(), 50u128)]),
        };
        let pools = FakePools(vec![listing(SAUCE, USDC), listing(WHBAR, USDC)]);
        let ctx = crate::network::NetworkContext::mainnet();

        let hbar = TokenDescriptor::hbar();
        let sauce = TokenDescriptor::new(SAUCE, "SAUCE", 6);
        let usdc = TokenDescriptor::new(USDC, "USDC", 6);
        let orphan = TokenDescriptor::new(ORPHAN, "ORPHAN", 6);

        let payable = payable_tokens(
            &chain,
            &pools,
            &ctx,
            "0.0.1111",
            &[hbar.clone(), sauce.clone(), usdc.clone(), orphan],
            &usdc,
        )
        .await
        .unwrap();

        // HBAR routes via the WHBAR alias, SAUCE via its pool; USDC is
        // dropped for balance, ORPHAN for routability
        assert_eq!(payable, vec![hbar, sauce]);
    }

    #[tokio::test]
    async fn test_zero_balances_drop_everything() {
        let chain = FakeChain {
            hbar: Some(0),
            tokens: HashMap::new(),
        };
        let pools = FakePools(vec![listing(WHBAR, USDC)]);
        let ctx = crate::network::NetworkContext::mainnet();
        let usdc = TokenDescriptor::new(USDC, "USDC", 6);

        let payable = payable_tokens(
            &chain,
            &pools,
            &ctx,
            "0.0.1111",
            &[TokenDescriptor::hbar(), usdc.clone()],
            &usdc,
        )
        .await
        .unwrap();
        assert!(payable.is_empty());
    }
}
