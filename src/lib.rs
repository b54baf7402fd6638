//! Hedera token payment settlement engine
//!
//! Accepts checkout payments in HBAR or any supported fungible HTS token and
//! settles the merchant in their chosen settlement token, swapping through
//! the SaucerSwap AMM (v1 and v2 routers) when the paid token differs.
//!
//! The crate is the settlement core only. The payer's wallet, the pool
//! directory, and chain reads are injected capabilities ([`WalletSigner`],
//! [`amm::pools::PoolDirectory`], [`mirror::ChainReader`]), so the whole
//! state machine runs against scripted fakes in tests and against HTTP
//! implementations in production. Merchant-side payouts and refunds go
//! through the remote [`treasury`] signing service; the treasury key never
//! enters this process.

pub mod amm;
pub mod engine;
pub mod mirror;
pub mod network;
pub mod treasury;
pub mod types;
pub mod wallet;

pub use engine::orchestrator::{
    CheckoutRequest, SettlementOrchestrator, SettlementResult, SettlementState,
};
pub use engine::plan::SettlementPlan;
pub use engine::recorder::{PaymentEvidence, SettlementRecorder};
pub use network::{Network, NetworkContext};
pub use types::{EngineResult, SettlementError, TokenDescriptor};
pub use wallet::WalletSigner;
