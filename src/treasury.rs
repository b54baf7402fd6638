//! Treasury remote-signing client
//!
//! Merchant-side fund movements (payouts, refunds, bundled item transfers)
//! are signed by a remote service that is the sole holder of the treasury
//! private key. This client forwards structured requests over authenticated
//! HTTP and relays back either raw signed-transaction bytes or a status
//! object. It never retries: none of these calls carry an idempotency key,
//! and a blind retry of a funds movement risks double payment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mirror::ChainReader;
use crate::network::Network;
use crate::types::{EngineResult, SettlementError};

/// Hard upper bound on every treasury call
const TREASURY_TIMEOUT: Duration = Duration::from_secs(60);

/// Signing actions the treasury service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasuryAction {
    TransferNative,
    TransferToken,
    TransferTokenAndItems,
    Refund,
}

impl TreasuryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreasuryAction::TransferNative => "transfer_native",
            TreasuryAction::TransferToken => "transfer_token",
            TreasuryAction::TransferTokenAndItems => "transfer_token_and_items",
            TreasuryAction::Refund => "refund",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            TreasuryAction::TransferNative => "/transfer-hbar",
            TreasuryAction::TransferToken => "/transfer-token",
            TreasuryAction::TransferTokenAndItems => "/transfer-token-and-items",
            TreasuryAction::Refund => "/refund-tokens",
        }
    }
}

/// Request body common to all treasury actions
#[derive(Debug, Clone, Serialize)]
pub struct TreasuryRequest {
    pub sender: String,
    pub receiver: String,
    /// Decimal amount string, matching what the service signs over
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Opaque item bundle for `transfer_token_and_items`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<serde_json::Value>,
    pub memo: String,
    pub network: Network,
}

/// What the service hands back: raw signed bytes, or a submission status
#[derive(Debug, Clone, PartialEq)]
pub enum TreasuryResponse {
    SignedBytes(Vec<u8>),
    Status {
        success: bool,
        transaction_reference: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    success: bool,
    #[serde(default, alias = "transactionId", alias = "transaction_id")]
    transaction_reference: Option<String>,
}

/// HTTP client for the treasury signing service
pub struct TreasuryClient {
    base_url: String,
    bearer_token: String,
    http: reqwest::Client,
}

impl TreasuryClient {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(TREASURY_TIMEOUT)
            .build()
            .map_err(|e| SettlementError::TreasuryUnavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            http,
        })
    }

    /// Submit one signing request. Timeout and transport errors map to
    /// `TreasuryUnavailable` with no retry.
    pub async fn request(
        &self,
        action: TreasuryAction,
        payload: &TreasuryRequest,
    ) -> EngineResult<TreasuryResponse> {
        tracing::info!(
            action = action.as_str(),
            receiver = %payload.receiver,
            network = %payload.network,
            "treasury signing request"
        );
        let body = self
            .http
            .post(format!("{}{}", self.base_url, action.path()))
            .bearer_auth(&self.bearer_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| SettlementError::TreasuryUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::TreasuryUnavailable(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| SettlementError::TreasuryUnavailable(e.to_string()))?;

        parse_response(&body)
    }
}

/// The service answers either with a JSON byte array (signed transaction)
/// or a `{success, ...}` status object.
fn parse_response(body: &[u8]) -> EngineResult<TreasuryResponse> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| SettlementError::TreasuryUnavailable(format!("unreadable response: {e}")))?;

    if value.is_array() {
        let bytes: Vec<u8> = serde_json::from_value(value).map_err(|e| {
            SettlementError::TreasuryUnavailable(format!("malformed signed bytes: {e}"))
        })?;
        return Ok(TreasuryResponse::SignedBytes(bytes));
    }

    let status: StatusBody = serde_json::from_value(value)
        .map_err(|e| SettlementError::TreasuryUnavailable(format!("malformed status: {e}")))?;
    Ok(TreasuryResponse::Status {
        success: status.success,
        transaction_reference: status.transaction_reference,
    })
}

/// A refund counts as complete only once its on-chain record reads SUCCESS;
/// a service-side "submitted" is not consensus.
pub async fn confirm_refund(chain: &dyn ChainReader, reference: &str) -> EngineResult<bool> {
    let record = chain.transaction_record(reference).await?;
    if !record.succeeded() {
        tracing::warn!(%reference, status = %record.result, "refund not yet at SUCCESS");
    }
    Ok(record.succeeded())
}
