//! Quote resolver
//!
//! Answers "how much of the input token buys exactly this much output" with
//! the semantics of whichever protocol version hosts the pool. v1 uses the
//! router's `getAmountsIn` path query; v2 packs an output-to-input path and
//! calls `quoteExactOutput` on the quoter, with the pool's own fee tier read
//! from chain. Stateless: a pure function of chain state per attempt.

use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolCall;

use crate::amm::contracts::{IPoolV2, IQuoterV2, IRouterV1};
use crate::amm::pools::{AmmVersion, PoolRecord};
use crate::mirror::ChainReader;
use crate::network::NetworkContext;
use crate::types::{entity_to_address, u256_to_u128, EngineResult, SettlementError};

/// A fresh cross-token quote; never cached across attempts
#[derive(Debug, Clone)]
pub struct Quote {
    pub input_token: String,
    /// Required input, smallest units
    pub input_amount: u128,
    pub output_token: String,
    /// Desired output, smallest units
    pub output_amount: u128,
    pub pool: PoolRecord,
}

/// Resolves reverse quotes against the network's quoting contracts
pub struct QuoteResolver<'a> {
    chain: &'a dyn ChainReader,
    ctx: &'a NetworkContext,
}

impl<'a> QuoteResolver<'a> {
    pub fn new(chain: &'a dyn ChainReader, ctx: &'a NetworkContext) -> Self {
        Self { chain, ctx }
    }

    /// Full quote for an exact output amount: how much of the input token
    /// the pool demands right now.
    pub async fn quote(
        &self,
        output_token: &str,
        output_amount: u128,
        input_token: &str,
        pool: &PoolRecord,
    ) -> EngineResult<Quote> {
        let input_amount = self
            .quote_input_for_exact_output(output_token, output_amount, input_token, pool)
            .await?;
        Ok(Quote {
            input_token: input_token.to_string(),
            input_amount,
            output_token: output_token.to_string(),
            output_amount,
            pool: pool.clone(),
        })
    }

    /// Required input amount (smallest units) for an exact output amount
    /// (smallest units), dispatched on the pool's protocol version.
    pub async fn quote_input_for_exact_output(
        &self,
        output_token: &str,
        output_amount: u128,
        input_token: &str,
        pool: &PoolRecord,
    ) -> EngineResult<u128> {
        let input_token = self.ctx.normalize_token_id(input_token);
        let output_token = self.ctx.normalize_token_id(output_token);

        let amount_in = match pool.version {
            AmmVersion::V1 => {
                self.quote_v1(output_token, output_amount, input_token)
                    .await?
            }
            AmmVersion::V2 => {
                self.quote_v2(output_token, output_amount, input_token, pool)
                    .await?
            }
        };

        tracing::debug!(
            version = pool.version.as_str(),
            %input_token,
            %output_token,
            output_amount,
            amount_in,
            "quote resolved"
        );
        Ok(amount_in)
    }

    /// v1 reverse quote: `getAmountsIn` over the two-hop path
    async fn quote_v1(
        &self,
        output_token: &str,
        output_amount: u128,
        input_token: &str,
    ) -> EngineResult<u128> {
        let call = IRouterV1::getAmountsInCall {
            amountOut: U256::from(output_amount),
            path: vec![entity_to_address(input_token)?, entity_to_address(output_token)?],
        };
        let router = crate::types::entity_to_evm_address(&self.ctx.v1_router)?;
        let data = self
            .chain
            .contract_call(&router, &call.abi_encode())
            .await
            .map_err(|e| SettlementError::QuoteUnavailable(e.to_string()))?;

        let amounts = IRouterV1::getAmountsInCall::abi_decode_returns(&data)
            .map_err(|e| SettlementError::QuoteUnavailable(format!("getAmountsIn decode: {e}")))?;
        let amount_in = amounts
            .first()
            .copied()
            .ok_or_else(|| SettlementError::QuoteUnavailable("empty amounts array".into()))?;
        u256_to_u128(amount_in, "v1 amountIn")
    }

    /// v2 reverse quote: fee tier read, packed path, `quoteExactOutput`
    async fn quote_v2(
        &self,
        output_token: &str,
        output_amount: u128,
        input_token: &str,
        pool: &PoolRecord,
    ) -> EngineResult<u128> {
        let fee = self.fee_tier(&pool.contract_id).await?;

        let path = encode_exact_output_path(output_token, fee, input_token)?;
        let call = IQuoterV2::quoteExactOutputCall {
            path: Bytes::from(path),
            amountOut: U256::from(output_amount),
        };
        let quoter = crate::types::entity_to_evm_address(&self.ctx.v2_quoter)?;
        let data = self
            .chain
            .contract_call(&quoter, &call.abi_encode())
            .await
            .map_err(|e| SettlementError::QuoteUnavailable(e.to_string()))?;

        let decoded = IQuoterV2::quoteExactOutputCall::abi_decode_returns(&data).map_err(|e| {
            SettlementError::QuoteUnavailable(format!("quoteExactOutput decode: {e}"))
        })?;
        u256_to_u128(decoded.amountIn, "v2 amountIn")
    }

    /// Fee tier of one specific pool contract; tiers differ per pool, so
    /// this is always read from chain, never assumed.
    pub async fn fee_tier(&self, pool_contract_id: &str) -> EngineResult<u32> {
        let pool_evm = crate::types::entity_to_evm_address(pool_contract_id)?;
        let data = self
            .chain
            .eth_call(&pool_evm, &IPoolV2::feeCall {}.abi_encode())
            .await
            .map_err(|e| SettlementError::QuoteUnavailable(e.to_string()))?;

        let fee = IPoolV2::feeCall::abi_decode_returns(&data)
            .map_err(|e| SettlementError::QuoteUnavailable(format!("fee decode: {e}")))?;
        Ok(fee.to::<u32>())
    }
}

/// Pack the exact-output quote path: `output_token | fee(3 bytes) | input_token`.
///
/// The path runs output-to-input, the inverse of the swap direction; the
/// quoter walks it backwards.
pub fn encode_exact_output_path(
    output_token: &str,
    fee: u32,
    input_token: &str,
) -> EngineResult<Vec<u8>> {
    let mut path = Vec::with_capacity(43);
    path.extend_from_slice(entity_to_address(output_token)?.as_slice());
    path.extend_from_slice(&fee.to_be_bytes()[1..4]);
    path.extend_from_slice(entity_to_address(input_token)?.as_slice());
    Ok(path)
}

/// Pack the exact-input swap path: `input_token | fee(3 bytes) | output_token`.
pub fn encode_exact_input_path(
    input_token: &str,
    fee: u32,
    output_token: &str,
) -> EngineResult<Vec<u8>> {
    encode_exact_output_path(input_token, fee, output_token)
}
