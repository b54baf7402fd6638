//! Swap calldata construction and output decoding
//!
//! Builds the exact-input swap call for whichever router version hosts the
//! pool and decodes the realized output amount back out of the executed
//! transaction record. v2 swaps are wrapped in a `multicall` so the router
//! can unwrap WHBAR for the recipient in the same transaction when the
//! settlement token is native.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

use crate::amm::contracts::{IRouterV1, IRouterV2};
use crate::amm::pools::{AmmVersion, PoolRecord};
use crate::amm::quote::encode_exact_input_path;
use crate::network::NetworkContext;
use crate::types::{entity_to_address, u256_to_u128, EngineResult, SettlementError};

/// Swaps must land within this window of being signed
const SWAP_DEADLINE: u64 = 20 * 60;

/// Gas limits sized to observed router execution costs
pub const SWAP_GAS: u64 = 1_200_000;
pub const APPROVE_GAS: u64 = 800_000;

/// Everything needed to execute one exact-input swap
#[derive(Debug, Clone)]
pub struct SwapParams {
    pub input_token: String,
    pub output_token: String,
    /// Input amount, smallest units
    pub amount_in: u128,
    /// Revert floor for the received output, smallest units
    pub amount_out_minimum: u128,
    pub recipient: Address,
    pub fee_tier: u32,
    /// Native-coin input: the router wraps the attached value itself
    pub payable_input: bool,
    /// Native-coin output: unwrap WHBAR to the recipient in the same call
    pub unwrap_output: bool,
}

/// A contract call ready for signing
#[derive(Debug, Clone)]
pub struct SwapCall {
    /// Router entity id
    pub contract_id: String,
    pub calldata: Vec<u8>,
    /// Attached value in tinybars, zero for token-input swaps
    pub payable_tinybar: u128,
    pub gas: u64,
}

fn deadline() -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    U256::from(now + SWAP_DEADLINE)
}

/// Build the swap call for the pool's protocol version
pub fn build_swap(
    ctx: &NetworkContext,
    pool: &PoolRecord,
    params: &SwapParams,
) -> EngineResult<SwapCall> {
    match pool.version {
        AmmVersion::V1 => build_v1_swap(ctx, params),
        AmmVersion::V2 => build_v2_swap(ctx, params),
    }
}

fn build_v1_swap(ctx: &NetworkContext, params: &SwapParams) -> EngineResult<SwapCall> {
    let input = ctx.normalize_token_id(&params.input_token);
    let output = ctx.normalize_token_id(&params.output_token);
    let path = vec![entity_to_address(input)?, entity_to_address(output)?];

    // The v1 router handles native legs through its own payable/unwrapping
    // entry points; the attached value (or the HBAR payout) never passes
    // through WHBAR on the payer's side.
    let (calldata, payable_tinybar) = if params.payable_input {
        let call = IRouterV1::swapExactHBARForTokensCall {
            amountOutMin: U256::from(params.amount_out_minimum),
            path,
            to: params.recipient,
            deadline: deadline(),
        };
        (call.abi_encode(), params.amount_in)
    } else if params.unwrap_output {
        let call = IRouterV1::swapExactTokensForHBARCall {
            amountIn: U256::from(params.amount_in),
            amountOutMin: U256::from(params.amount_out_minimum),
            path,
            to: params.recipient,
            deadline: deadline(),
        };
        (call.abi_encode(), 0)
    } else {
        let call = IRouterV1::swapExactTokensForTokensCall {
            amountIn: U256::from(params.amount_in),
            amountOutMin: U256::from(params.amount_out_minimum),
            path,
            to: params.recipient,
            deadline: deadline(),
        };
        (call.abi_encode(), 0)
    };

    Ok(SwapCall {
        contract_id: ctx.v1_router.clone(),
        calldata,
        payable_tinybar,
        gas: SWAP_GAS,
    })
}

fn build_v2_swap(ctx: &NetworkContext, params: &SwapParams) -> EngineResult<SwapCall> {
    let input = ctx.normalize_token_id(&params.input_token);
    let output = ctx.normalize_token_id(&params.output_token);

    // When the output unwraps to native, the swap pays the router and the
    // trailing unwrap forwards HBAR to the real recipient.
    let swap_recipient = if params.unwrap_output {
        entity_to_address(&ctx.v2_router)?
    } else {
        params.recipient
    };

    let exact_input = IRouterV2::exactInputCall {
        params: IRouterV2::ExactInputParams {
            path: Bytes::from(encode_exact_input_path(input, params.fee_tier, output)?),
            recipient: swap_recipient,
            deadline: deadline(),
            amountIn: U256::from(params.amount_in),
            amountOutMinimum: U256::from(params.amount_out_minimum),
        },
    };

    let mut calls: Vec<Bytes> = vec![Bytes::from(exact_input.abi_encode())];
    if params.unwrap_output {
        let unwrap = IRouterV2::unwrapWHBARCall {
            amountMinimum: U256::from(params.amount_out_minimum),
            recipient: params.recipient,
        };
        calls.push(Bytes::from(unwrap.abi_encode()));
    }

    let multicall = IRouterV2::multicallCall { data: calls };
    Ok(SwapCall {
        contract_id: ctx.v2_router.clone(),
        calldata: multicall.abi_encode(),
        payable_tinybar: if params.payable_input {
            params.amount_in
        } else {
            0
        },
        gas: SWAP_GAS,
    })
}

/// Realized output amount of an executed swap, decoded from its record.
///
/// v2 swaps run under `multicall`, so the record's return data is the
/// multicall result array; the swap output lives in sub-result zero.
pub fn decode_swap_output(version: AmmVersion, record_output: &[u8]) -> EngineResult<u128> {
    match version {
        AmmVersion::V1 => {
            let amounts: Vec<U256> = Vec::<U256>::abi_decode(record_output).map_err(|e| {
                SettlementError::SwapRejected(format!("undecodable swap output: {e}"))
            })?;
            let out = amounts
                .last()
                .copied()
                .ok_or_else(|| SettlementError::SwapRejected("empty amounts output".into()))?;
            u256_to_u128(out, "v1 swap output")
        }
        AmmVersion::V2 => {
            let sub = decode_subcall_result(record_output, 0)?;
            let out = U256::abi_decode(&sub).map_err(|e| {
                SettlementError::SwapRejected(format!("undecodable swap output: {e}"))
            })?;
            u256_to_u128(out, "v2 swap output")
        }
    }
}

/// Extract one sub-result from a multicall return payload, bounds-checked.
pub fn decode_subcall_result(multicall_output: &[u8], index: usize) -> EngineResult<Vec<u8>> {
    let results: Vec<Bytes> = Vec::<Bytes>::abi_decode(multicall_output).map_err(|e| {
        SettlementError::SwapRejected(format!("undecodable multicall output: {e}"))
    })?;
    results.get(index).map(|b| b.to_vec()).ok_or_else(|| {
        SettlementError::SwapRejected(format!(
            "multicall output has {} sub-results, wanted index {index}",
            results.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHBAR: &str = "0.0.1456986";
    const SAUCE: &str = "0.0.731861";

    fn params(payable_input: bool, unwrap_output: bool) -> SwapParams {
        SwapParams {
            input_token: SAUCE.to_string(),
            output_token: WHBAR.to_string(),
            amount_in: 123_456_000,
            amount_out_minimum: 0,
            recipient: entity_to_address("0.0.1111").unwrap(),
            fee_tier: 3000,
            payable_input,
            unwrap_output,
        }
    }

    fn pool(version: AmmVersion) -> PoolRecord {
        PoolRecord {
            contract_id: "0.0.3951117".to_string(),
            version,
            token_a: SAUCE.to_string(),
            token_a_decimals: 6,
            token_b: WHBAR.to_string(),
            token_b_decimals: 8,
        }
    }

    #[test]
    fn test_v1_swap_targets_v1_router_and_is_not_payable() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V1), &params(false, false)).unwrap();
        assert_eq!(call.contract_id, ctx.v1_router);
        assert_eq!(call.payable_tinybar, 0);
        assert_eq!(
            &call.calldata[0..4],
            IRouterV1::swapExactTokensForTokensCall::SELECTOR
        );
    }

    #[test]
    fn test_v1_native_input_attaches_value() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V1), &params(true, false)).unwrap();
        assert_eq!(call.payable_tinybar, 123_456_000);
        assert_eq!(
            &call.calldata[0..4],
            IRouterV1::swapExactHBARForTokensCall::SELECTOR
        );
    }

    #[test]
    fn test_v1_native_output_uses_unwrapping_entry_point() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V1), &params(false, true)).unwrap();
        assert_eq!(call.payable_tinybar, 0);
        assert_eq!(
            &call.calldata[0..4],
            IRouterV1::swapExactTokensForHBARCall::SELECTOR
        );

        let decoded = IRouterV1::swapExactTokensForHBARCall::abi_decode(&call.calldata).unwrap();
        assert_eq!(decoded.amountIn, U256::from(123_456_000u64));
        assert_eq!(decoded.to, entity_to_address("0.0.1111").unwrap());
    }

    #[test]
    fn test_v2_swap_is_a_multicall() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V2), &params(false, false)).unwrap();
        assert_eq!(call.contract_id, ctx.v2_router);
        assert_eq!(&call.calldata[0..4], IRouterV2::multicallCall::SELECTOR);

        let decoded = IRouterV2::multicallCall::abi_decode(&call.calldata).unwrap();
        assert_eq!(decoded.data.len(), 1);
        assert_eq!(&decoded.data[0][0..4], IRouterV2::exactInputCall::SELECTOR);
    }

    #[test]
    fn test_native_input_attaches_value() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V2), &params(true, false)).unwrap();
        assert_eq!(call.payable_tinybar, 123_456_000);
    }

    #[test]
    fn test_native_output_appends_unwrap() {
        let ctx = NetworkContext::mainnet();
        let call = build_swap(&ctx, &pool(AmmVersion::V2), &params(false, true)).unwrap();

        let decoded = IRouterV2::multicallCall::abi_decode(&call.calldata).unwrap();
        assert_eq!(decoded.data.len(), 2);
        assert_eq!(&decoded.data[1][0..4], IRouterV2::unwrapWHBARCall::SELECTOR);

        // The swap itself pays the router; the unwrap pays the recipient
        let inner = IRouterV2::exactInputCall::abi_decode(&decoded.data[0]).unwrap();
        assert_eq!(
            inner.params.recipient,
            entity_to_address(&ctx.v2_router).unwrap()
        );
    }

    #[test]
    fn test_decode_v1_output_takes_last_amount() {
        // Return payload as the chain encodes it: the bare amounts array
        let encoded = vec![U256::from(500u64), U256::from(999u64)].abi_encode();
        let out = decode_swap_output(AmmVersion::V1, &encoded).unwrap();
        assert_eq!(out, 999);
    }

    #[test]
    fn test_decode_v2_output_from_multicall_record() {
        let sub: Vec<u8> = U256::from(777u64).abi_encode();
        let encoded = vec![Bytes::from(sub)].abi_encode();
        let out = decode_swap_output(AmmVersion::V2, &encoded).unwrap();
        assert_eq!(out, 777);
    }

    #[test]
    fn test_subcall_index_out_of_bounds_is_error() {
        let encoded = Vec::<Bytes>::new().abi_encode();
        assert!(decode_subcall_result(&encoded, 0).is_err());
    }
}
