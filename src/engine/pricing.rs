//! Fiat to native-coin pricing
//!
//! Order totals arrive as USD decimals. The engine anchors USD to the
//! network's USDC token and asks the AMM how much WHBAR buys that exact
//! USDC amount; the answer, in tinybars, is the order total in native coin.

use crate::amm::pools::{PoolDirectory, PoolLocator};
use crate::amm::quote::QuoteResolver;
use crate::mirror::ChainReader;
use crate::network::NetworkContext;
use crate::types::{parse_units, EngineResult, SettlementError, HBAR_TOKEN_ID};

/// USDC carries six decimals on both networks
pub const USDC_DECIMALS: u32 = 6;

/// Order total in tinybars for a USD decimal amount such as "10" or "9.99"
pub async fn hbar_total_for_usd(
    chain: &dyn ChainReader,
    pools: &dyn PoolDirectory,
    ctx: &NetworkContext,
    usd_total: &str,
) -> EngineResult<u128> {
    let usdc_amount = parse_units(usd_total, USDC_DECIMALS)?;
    if usdc_amount == 0 {
        return Err(SettlementError::InvalidAmount(format!(
            "order total {usd_total} is zero"
        )));
    }

    let locator = PoolLocator::new(pools, ctx);
    let pool = locator
        .find_pool(HBAR_TOKEN_ID, &ctx.usdc_token)
        .await?
        .ok_or_else(|| {
            SettlementError::QuoteUnavailable("no WHBAR/USDC pool for fiat pricing".into())
        })?;

    let resolver = QuoteResolver::new(chain, ctx);
    let tinybars = resolver
        .quote_input_for_exact_output(&ctx.usdc_token, usdc_amount, HBAR_TOKEN_ID, &pool)
        .await?;

    tracing::debug!(usd_total, tinybars, "fiat order total priced in native coin");
    Ok(tinybars)
}
