//! Settlement orchestrator
//!
//! Drives one payment attempt through `Idle -> PlanSelected -> Approving ->
//! Swapping -> Transferring -> Settled | Failed`. Every fund-moving step is
//! signed by the payer's wallet; the orchestrator only sequences them and
//! confirms each executed contract step against its mirror-node record
//! before issuing the next. There is no retry inside an attempt: any step
//! failure ends in `Failed` and the caller restarts with a fresh quote.

use alloy::sol_types::SolCall;
use serde::Serialize;
use uuid::Uuid;

use crate::amm::contracts::IERC20;
use crate::amm::pools::{AmmVersion, PoolDirectory, PoolLocator, PoolRecord};
use crate::amm::quote::QuoteResolver;
use crate::amm::swap::{build_swap, decode_swap_output, SwapParams, APPROVE_GAS};
use crate::engine::plan::SettlementPlan;
use crate::engine::pricing;
use crate::mirror::ChainReader;
use crate::network::{Network, NetworkContext};
use crate::types::{
    entity_to_address, EngineResult, SettlementError, TokenDescriptor, HBAR_TOKEN_ID,
};
use crate::wallet::WalletSigner;

/// Attempt state, visible to the caller after `settle` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Idle,
    PlanSelected,
    Approving,
    Swapping,
    Transferring,
    Settled,
    Failed,
}

/// One checkout's worth of settlement input
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Fiat order total as a decimal string, e.g. "9.99"
    pub order_total_usd: String,
    pub selected_token: TokenDescriptor,
    pub settlement_token: TokenDescriptor,
    /// When false the merchant accepts the selected token as-is
    pub auto_swap: bool,
    /// Merchant receiving account entity id
    pub merchant_account: String,
    pub memo: String,
    /// Revert floor for swaps, in basis points below the quoted output.
    /// None preserves the legacy unprotected behavior (minimum of zero).
    pub slippage_bps: Option<u32>,
    /// Associate the payer with the settlement token before receiving it
    pub associate_settlement_token: bool,
}

/// Outcome of one attempt
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    pub attempt_id: String,
    pub success: bool,
    pub payer_account: String,
    /// Reference of the final fund-moving transaction
    pub transaction_reference: Option<String>,
    pub settled_token: TokenDescriptor,
    /// Smallest units of the settled token
    pub settled_amount: u128,
    pub network: Network,
    pub failure_reason: Option<String>,
}

/// Drives one payment attempt; construct a fresh one per attempt
pub struct SettlementOrchestrator<'a> {
    chain: &'a dyn ChainReader,
    pools: &'a dyn PoolDirectory,
    signer: &'a dyn WalletSigner,
    ctx: &'a NetworkContext,
    state: SettlementState,
    attempt_id: Uuid,
}

impl<'a> SettlementOrchestrator<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        pools: &'a dyn PoolDirectory,
        signer: &'a dyn WalletSigner,
        ctx: &'a NetworkContext,
    ) -> Self {
        Self {
            chain,
            pools,
            signer,
            ctx,
            state: SettlementState::Idle,
            attempt_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> SettlementState {
        self.state
    }

    /// Run the attempt to completion. Failures are folded into the returned
    /// result instead of bubbling as errors; the state machine never hangs
    /// in an intermediate state.
    pub async fn settle(&mut self, request: &CheckoutRequest) -> SettlementResult {
        let payer = self.signer.account_id();
        match self.run(request).await {
            Ok((reference, token, amount)) => {
                self.state = SettlementState::Settled;
                tracing::info!(
                    attempt = %self.attempt_id,
                    token = %token.id,
                    amount,
                    "settlement complete"
                );
                SettlementResult {
                    attempt_id: self.attempt_id.to_string(),
                    success: true,
                    payer_account: payer,
                    transaction_reference: Some(reference),
                    settled_token: token,
                    settled_amount: amount,
                    network: self.ctx.network,
                    failure_reason: None,
                }
            }
            Err(e) => {
                self.state = SettlementState::Failed;
                tracing::warn!(attempt = %self.attempt_id, error = %e, "settlement failed");
                SettlementResult {
                    attempt_id: self.attempt_id.to_string(),
                    success: false,
                    payer_account: payer,
                    transaction_reference: None,
                    settled_token: request.selected_token.clone(),
                    settled_amount: 0,
                    network: self.ctx.network,
                    failure_reason: Some(e.to_string()),
                }
            }
        }
    }

    async fn run(
        &mut self,
        request: &CheckoutRequest,
    ) -> EngineResult<(String, TokenDescriptor, u128)> {
        let payer = self.signer.account_id();
        if payer == request.merchant_account {
            return Err(SettlementError::SelfPaymentRejected(payer));
        }

        let plan = SettlementPlan::derive(
            &request.selected_token,
            &request.settlement_token,
            request.auto_swap,
        );
        self.state = SettlementState::PlanSelected;
        tracing::info!(
            attempt = %self.attempt_id,
            plan = plan.as_str(),
            selected = %request.selected_token.id,
            settlement = %request.settlement_token.id,
            "plan selected"
        );

        match plan {
            SettlementPlan::DirectTransfer => self.direct_transfer(request).await,
            SettlementPlan::SwapNativeToSettlement => self.swap_native(request).await,
            SettlementPlan::SwapTokenToNative => self.swap_token(request, true).await,
            SettlementPlan::SwapTokenToSettlement => self.swap_token(request, false).await,
        }
    }

    /// One signed transfer of the selected token to the merchant
    async fn direct_transfer(
        &mut self,
        request: &CheckoutRequest,
    ) -> EngineResult<(String, TokenDescriptor, u128)> {
        let token = &request.selected_token;
        let amount = self.order_amount_in(request, token).await?;

        self.state = SettlementState::Transferring;
        let reference = if token.is_native() {
            self.signer
                .transfer_native(&request.merchant_account, amount, &request.memo)
                .await?
        } else {
            self.signer
                .transfer_fungible_token(
                    &request.merchant_account,
                    &token.id,
                    amount,
                    token.decimals,
                    &request.memo,
                )
                .await?
        };
        let reference = reference
            .ok_or_else(|| SettlementError::TransferRejected("wallet declined transfer".into()))?;

        Ok((reference, token.clone(), amount))
    }

    /// Native coin into the payable swap entry point, settlement token out
    /// to the merchant, all in one signed transaction
    async fn swap_native(
        &mut self,
        request: &CheckoutRequest,
    ) -> EngineResult<(String, TokenDescriptor, u128)> {
        let settlement = &request.settlement_token;
        let settlement_amount = self.order_amount_in(request, settlement).await?;

        let pool = self.require_pool(HBAR_TOKEN_ID, &settlement.id).await?;
        let resolver = QuoteResolver::new(self.chain, self.ctx);
        let quote = resolver
            .quote(&settlement.id, settlement_amount, HBAR_TOKEN_ID, &pool)
            .await?;

        let params = SwapParams {
            input_token: HBAR_TOKEN_ID.to_string(),
            output_token: settlement.id.clone(),
            amount_in: quote.input_amount,
            amount_out_minimum: slippage_floor(settlement_amount, request.slippage_bps)?,
            recipient: entity_to_address(&request.merchant_account)?,
            fee_tier: self.pool_fee_tier(&pool).await?,
            payable_input: true,
            unwrap_output: false,
        };

        self.state = SettlementState::Swapping;
        let (reference, output) = self.execute_swap(&pool, &params).await?;
        Ok((reference, settlement.clone(), output))
    }

    /// Token plans: approve, swap, then forward the decoded output
    async fn swap_token(
        &mut self,
        request: &CheckoutRequest,
        to_native: bool,
    ) -> EngineResult<(String, TokenDescriptor, u128)> {
        let selected = &request.selected_token;
        let settlement = &request.settlement_token;
        let (output_token_id, settlement_amount) = if to_native {
            let tinybars =
                pricing::hbar_total_for_usd(self.chain, self.pools, self.ctx, &request.order_total_usd)
                    .await?;
            (HBAR_TOKEN_ID.to_string(), tinybars)
        } else {
            let amount = self.order_amount_in(request, settlement).await?;
            (settlement.id.clone(), amount)
        };

        let pool = self.require_pool(&selected.id, &output_token_id).await?;
        let resolver = QuoteResolver::new(self.chain, self.ctx);
        let quote = resolver
            .quote(&output_token_id, settlement_amount, &selected.id, &pool)
            .await?;
        let input_amount = quote.input_amount;

        if !to_native && request.associate_settlement_token {
            self.signer
                .associate_token(&settlement.id)
                .await?
                .ok_or_else(|| {
                    SettlementError::TransferRejected("token association declined".into())
                })?;
        }

        self.state = SettlementState::Approving;
        self.approve_router(&pool, &selected.id, input_amount).await?;

        let payer = self.signer.account_id();
        let params = SwapParams {
            input_token: selected.id.clone(),
            output_token: output_token_id,
            amount_in: input_amount,
            amount_out_minimum: slippage_floor(settlement_amount, request.slippage_bps)?,
            recipient: entity_to_address(&payer)?,
            fee_tier: self.pool_fee_tier(&pool).await?,
            payable_input: false,
            unwrap_output: to_native,
        };

        self.state = SettlementState::Swapping;
        let (_, output) = self.execute_swap(&pool, &params).await?;

        self.state = SettlementState::Transferring;
        let reference = if to_native {
            self.signer
                .transfer_native(&request.merchant_account, output, &request.memo)
                .await?
        } else {
            self.signer
                .transfer_fungible_token(
                    &request.merchant_account,
                    &settlement.id,
                    output,
                    settlement.decimals,
                    &request.memo,
                )
                .await?
        };
        let reference = reference
            .ok_or_else(|| SettlementError::TransferRejected("wallet declined transfer".into()))?;

        let settled = if to_native {
            TokenDescriptor::hbar()
        } else {
            settlement.clone()
        };
        Ok((reference, settled, output))
    }

    /// Exact-allowance approval on the input token, confirmed via its record
    async fn approve_router(
        &self,
        pool: &PoolRecord,
        token_id: &str,
        amount: u128,
    ) -> EngineResult<()> {
        let router = match pool.version {
            AmmVersion::V1 => &self.ctx.v1_router,
            AmmVersion::V2 => &self.ctx.v2_router,
        };
        let calldata = IERC20::approveCall {
            spender: entity_to_address(router)?,
            amount: alloy::primitives::U256::from(amount),
        }
        .abi_encode();

        let reference = self
            .signer
            .execute_contract_function(token_id, &calldata, 0, APPROVE_GAS)
            .await?
            .ok_or_else(|| {
                SettlementError::ApprovalRejected("wallet declined approval".into())
            })?;

        let record = self.chain.transaction_record(&reference).await?;
        if !record.succeeded() {
            return Err(SettlementError::ApprovalRejected(format!(
                "approval executed as {}",
                record.result
            )));
        }
        tracing::debug!(attempt = %self.attempt_id, %reference, amount, "allowance approved");
        Ok(())
    }

    /// Sign and submit the swap, confirm its record, decode the output
    async fn execute_swap(
        &self,
        pool: &PoolRecord,
        params: &SwapParams,
    ) -> EngineResult<(String, u128)> {
        let call = build_swap(self.ctx, pool, params)?;
        let reference = self
            .signer
            .execute_contract_function(
                &call.contract_id,
                &call.calldata,
                call.payable_tinybar,
                call.gas,
            )
            .await?
            .ok_or_else(|| SettlementError::SwapRejected("wallet declined swap".into()))?;

        let record = self.chain.transaction_record(&reference).await?;
        if !record.succeeded() {
            return Err(SettlementError::SwapRejected(format!(
                "swap executed as {}",
                record.result
            )));
        }

        let output = decode_swap_output(pool.version, &record.output_bytes()?)?;
        tracing::debug!(
            attempt = %self.attempt_id,
            %reference,
            amount_in = params.amount_in,
            output,
            "swap confirmed"
        );
        Ok((reference, output))
    }

    /// Order total expressed in `token`'s smallest units.
    ///
    /// USD anchors to USDC; the native total comes from the USDC quote, and
    /// other tokens are priced through their WHBAR pool against that total.
    async fn order_amount_in(
        &self,
        request: &CheckoutRequest,
        token: &TokenDescriptor,
    ) -> EngineResult<u128> {
        if token.is_native() {
            return pricing::hbar_total_for_usd(
                self.chain,
                self.pools,
                self.ctx,
                &request.order_total_usd,
            )
            .await;
        }
        if token.id == self.ctx.usdc_token {
            return crate::types::parse_units(&request.order_total_usd, token.decimals);
        }

        let tinybars = pricing::hbar_total_for_usd(
            self.chain,
            self.pools,
            self.ctx,
            &request.order_total_usd,
        )
        .await?;
        let pool = self.require_pool(&token.id, HBAR_TOKEN_ID).await?;
        QuoteResolver::new(self.chain, self.ctx)
            .quote_input_for_exact_output(HBAR_TOKEN_ID, tinybars, &token.id, &pool)
            .await
    }

    async fn require_pool(&self, token_a: &str, token_b: &str) -> EngineResult<PoolRecord> {
        PoolLocator::new(self.pools, self.ctx)
            .find_pool(token_a, token_b)
            .await?
            .ok_or_else(|| {
                SettlementError::PoolNotFound(token_a.to_string(), token_b.to_string())
            })
    }

    /// v2 pools carry their own fee tier; v1 pools take none
    async fn pool_fee_tier(&self, pool: &PoolRecord) -> EngineResult<u32> {
        match pool.version {
            AmmVersion::V1 => Ok(0),
            AmmVersion::V2 => {
                QuoteResolver::new(self.chain, self.ctx)
                    .fee_tier(&pool.contract_id)
                    .await
            }
        }
    }
}

/// Quoted output scaled down by the configured slippage bound; zero when
/// no bound is configured. A bound of a full 100% or more is a caller bug
/// and is rejected rather than degraded to no protection.
fn slippage_floor(quoted_output: u128, slippage_bps: Option<u32>) -> EngineResult<u128> {
    match slippage_bps {
        None => Ok(0),
        Some(bps) if bps < 10_000 => Ok(quoted_output * u128::from(10_000 - bps) / 10_000),
        Some(bps) => Err(SettlementError::InvalidAmount(format!(
            "slippage bound {bps} bps must be below 10000"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slippage_floor() {
        assert_eq!(slippage_floor(10_000_000, None).unwrap(), 0);
        assert_eq!(slippage_floor(10_000_000, Some(50)).unwrap(), 9_950_000);
    }

    #[test]
    fn test_full_slippage_bound_is_rejected() {
        assert!(matches!(
            slippage_floor(10_000_000, Some(10_000)),
            Err(SettlementError::InvalidAmount(_))
        ));
        assert!(matches!(
            slippage_floor(10_000_000, Some(12_500)),
            Err(SettlementError::InvalidAmount(_))
        ));
    }
}
