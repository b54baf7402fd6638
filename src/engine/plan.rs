//! Settlement plan derivation
//!
//! The plan is a pure function of (selected token, settlement token,
//! auto-swap flag); everything network-dependent happens later in the
//! orchestrator.

use crate::types::TokenDescriptor;

/// How a payment in the selected token reaches the merchant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPlan {
    /// Selected token goes straight to the merchant, one signed transfer
    DirectTransfer,
    /// Native coin pays into the router's payable swap entry point; the
    /// settlement token lands at the merchant in the same transaction
    SwapNativeToSettlement,
    /// Token is swapped and unwrapped to native, then transferred
    SwapTokenToNative,
    /// Token is swapped to the settlement token, then transferred
    SwapTokenToSettlement,
}

impl SettlementPlan {
    pub fn derive(
        selected: &TokenDescriptor,
        settlement: &TokenDescriptor,
        auto_swap: bool,
    ) -> Self {
        if selected.same_token(settlement) || !auto_swap {
            return SettlementPlan::DirectTransfer;
        }
        if selected.is_native() {
            // Degenerate native-to-native case is caught by same_token above
            return SettlementPlan::SwapNativeToSettlement;
        }
        if settlement.is_native() {
            return SettlementPlan::SwapTokenToNative;
        }
        SettlementPlan::SwapTokenToSettlement
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementPlan::DirectTransfer => "direct_transfer",
            SettlementPlan::SwapNativeToSettlement => "swap_native_to_settlement",
            SettlementPlan::SwapTokenToNative => "swap_token_to_native",
            SettlementPlan::SwapTokenToSettlement => "swap_token_to_settlement",
        }
    }
}
