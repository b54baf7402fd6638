//! Payer wallet seam
//!
//! Every transaction the engine produces is signed by the payer's wallet,
//! never by the engine. Implementations bridge to whatever wallet connector
//! the host application uses; the engine only sees opaque transaction
//! references back. `Ok(None)` means the signer declined the request, which
//! is an ordinary outcome, not a transport failure.

use async_trait::async_trait;

use crate::types::EngineResult;

/// Signing capability of the paying account
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Paying account entity id ("0.0.x")
    fn account_id(&self) -> String;

    /// Send native coin to `receiver`, amount in tinybars
    async fn transfer_native(
        &self,
        receiver: &str,
        amount_tinybar: u128,
        memo: &str,
    ) -> EngineResult<Option<String>>;

    /// Send a fungible token to `receiver`, amount in smallest units
    async fn transfer_fungible_token(
        &self,
        receiver: &str,
        token_id: &str,
        amount: u128,
        decimals: u32,
        memo: &str,
    ) -> EngineResult<Option<String>>;

    /// Associate the paying account with a token it has not held before
    async fn associate_token(&self, token_id: &str) -> EngineResult<Option<String>>;

    /// Execute a contract function, optionally attaching native value
    async fn execute_contract_function(
        &self,
        contract_id: &str,
        calldata: &[u8],
        payable_tinybar: u128,
        gas: u64,
    ) -> EngineResult<Option<String>>;
}
