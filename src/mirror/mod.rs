//! Mirror node and JSON-RPC relay access
//!
//! The mirror node serves read-optimized chain state over REST: balances,
//! read-only contract call simulation, and transaction records. The JSON-RPC
//! relay serves `eth_call` for contract reads that need EVM view semantics
//! (pool fee tiers). Both sit behind the [`ChainReader`] trait so the state
//! machine tests can script them.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::network::NetworkContext;
use crate::types::{EngineResult, SettlementError};

/// Bounded timeout for all read calls
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Record of an executed contract transaction as seen by the mirror node
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    /// "SUCCESS" or a failure status such as "CONTRACT_REVERT_EXECUTED"
    pub result: String,
    /// ABI-encoded return data of the executed call, hex
    #[serde(default)]
    pub call_result: Option<String>,
}

impl TransactionRecord {
    pub fn succeeded(&self) -> bool {
        self.result == "SUCCESS"
    }

    /// Decoded return data, empty when the record carries none
    pub fn output_bytes(&self) -> EngineResult<Vec<u8>> {
        match &self.call_result {
            Some(hex_str) => decode_hex(hex_str),
            None => Ok(Vec::new()),
        }
    }
}

/// Fungible token balance reported by the mirror node
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
    pub token_id: String,
    pub balance: u128,
    #[serde(default)]
    pub decimals: u32,
}

/// Read-only chain access used by the quote resolver and the orchestrator
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Simulate a contract call through the mirror node (`/contracts/call`)
    async fn contract_call(&self, to_evm: &str, calldata: &[u8]) -> EngineResult<Vec<u8>>;

    /// Read-only contract call through the JSON-RPC relay (`eth_call`)
    async fn eth_call(&self, to_evm: &str, calldata: &[u8]) -> EngineResult<Vec<u8>>;

    /// Fetch the record of an executed contract transaction
    async fn transaction_record(&self, reference: &str) -> EngineResult<TransactionRecord>;

    /// Account HBAR balance in tinybars, None when the account is unknown
    async fn hbar_balance(&self, account: &str) -> EngineResult<Option<u128>>;

    /// Balance of one fungible token on an account, None when not associated
    async fn token_balance(
        &self,
        account: &str,
        token_id: &str,
    ) -> EngineResult<Option<TokenBalance>>;
}

/// HTTP implementation backed by the network's mirror node and relay
pub struct HttpChainReader {
    ctx: NetworkContext,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ContractCallBody<'a> {
    block: &'a str,
    data: String,
    to: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContractCallResponse {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    balance: Option<AccountBalance>,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    balance: u128,
}

#[derive(Debug, Deserialize)]
struct AccountTokensResponse {
    #[serde(default)]
    tokens: Vec<TokenBalance>,
}

impl HttpChainReader {
    pub fn new(ctx: NetworkContext) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;
        Ok(Self { ctx, http })
    }

    fn mirror_url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.ctx.mirror_base)
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn contract_call(&self, to_evm: &str, calldata: &[u8]) -> EngineResult<Vec<u8>> {
        let body = ContractCallBody {
            block: "latest",
            data: encode_hex(calldata),
            to: to_evm,
        };
        let response: ContractCallResponse = self
            .http
            .post(self.mirror_url("/contracts/call"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;

        let result = response
            .result
            .ok_or_else(|| SettlementError::MirrorNode("contract call returned no result".into()))?;
        decode_hex(&result)
    }

    async fn eth_call(&self, to_evm: &str, calldata: &[u8]) -> EngineResult<Vec<u8>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": to_evm, "data": encode_hex(calldata) }, "latest"],
        });
        let response: serde_json::Value = self
            .http
            .post(&self.ctx.rpc_base)
            .json(&body)
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;

        match response.get("result").and_then(|r| r.as_str()) {
            Some(result) => decode_hex(result),
            None => Err(SettlementError::MirrorNode(format!(
                "eth_call failed: {}",
                response
                    .get("error")
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no result".to_string())
            ))),
        }
    }

    async fn transaction_record(&self, reference: &str) -> EngineResult<TransactionRecord> {
        self.http
            .get(self.mirror_url(&format!("/contracts/results/{reference}")))
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))
    }

    async fn hbar_balance(&self, account: &str) -> EngineResult<Option<u128>> {
        let response: AccountResponse = self
            .http
            .get(self.mirror_url(&format!("/accounts/{account}")))
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;

        Ok(response.balance.map(|b| b.balance))
    }

    async fn token_balance(
        &self,
        account: &str,
        token_id: &str,
    ) -> EngineResult<Option<TokenBalance>> {
        let response: AccountTokensResponse = self
            .http
            .get(self.mirror_url(&format!(
                "/accounts/{account}/tokens?token.id={token_id}"
            )))
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;

        Ok(response
            .tokens
            .into_iter()
            .find(|t| t.token_id == token_id))
    }
}

/// "0x"-prefixed lowercase hex
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without the "0x" prefix
pub fn decode_hex(s: &str) -> EngineResult<Vec<u8>> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped)
        .map_err(|e| SettlementError::MirrorNode(format!("undecodable hex result: {e}")))
}
