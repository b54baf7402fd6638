//! Walkthrough of one checkout settlement, end to end.
//!
//! Runs the orchestrator against in-memory stand-ins for the chain, the pool
//! directory, and the payer's wallet, so it works offline and shows the full
//! wiring: plan selection, approve/swap/transfer sequencing, and the payment
//! evidence the order layer receives.
//!
//! Run with: cargo run --example checkout_flow

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;

use hedera_tokenpay::amm::pools::{AmmVersion, ListedToken, PoolDirectory, PoolListing};
use hedera_tokenpay::mirror::{ChainReader, TokenBalance, TransactionRecord};
use hedera_tokenpay::types::EngineResult;
use hedera_tokenpay::{
    CheckoutRequest, NetworkContext, SettlementOrchestrator, SettlementRecorder, TokenDescriptor,
    WalletSigner,
};

struct DemoChain {
    quotes: Mutex<VecDeque<u128>>,
    records: Mutex<HashMap<String, TransactionRecord>>,
}

#[async_trait]
impl ChainReader for DemoChain {
    async fn contract_call(&self, _to: &str, _data: &[u8]) -> EngineResult<Vec<u8>> {
        let amount_in = self.quotes.lock().unwrap().pop_front().unwrap_or(0);
        // Sequence-encoded like the quoter's four-value return list
        Ok((
            U256::from(amount_in),
            Vec::<U256>::new(),
            Vec::<u32>::new(),
            U256::ZERO,
        )
            .abi_encode_params())
    }

    async fn eth_call(&self, _to: &str, _data: &[u8]) -> EngineResult<Vec<u8>> {
        // Every demo pool sits in the 0.3% fee tier
        Ok((3000u32,).abi_encode())
    }

    async fn transaction_record(&self, reference: &str) -> EngineResult<TransactionRecord> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .unwrap_or(TransactionRecord {
                result: "SUCCESS".to_string(),
                call_result: None,
            }))
    }

    async fn hbar_balance(&self, _account: &str) -> EngineResult<Option<u128>> {
        Ok(Some(5_000_000_000_000))
    }

    async fn token_balance(
        &self,
        _account: &str,
        token_id: &str,
    ) -> EngineResult<Option<TokenBalance>> {
        Ok(Some(TokenBalance {
            token_id: token_id.to_string(),
            balance: 500_000_000,
            decimals: 6,
        }))
    }
}

struct DemoPools(Vec<PoolListing>);

#[async_trait]
impl PoolDirectory for DemoPools {
    async fn pools(&self, version: AmmVersion) -> EngineResult<Vec<PoolListing>> {
        Ok(match version {
            AmmVersion::V2 => self.0.clone(),
            AmmVersion::V1 => vec![],
        })
    }
}

/// Signs everything it is asked to and hands back sequential references
struct DemoWallet {
    account: String,
    counter: Mutex<u32>,
}

impl DemoWallet {
    fn next(&self, kind: &str) -> Option<String> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let reference = format!("0.0.1111@demo-{kind}-{counter}");
        tracing::info!(%reference, "wallet signed {kind}");
        Some(reference)
    }
}

#[async_trait]
impl WalletSigner for DemoWallet {
    fn account_id(&self) -> String {
        self.account.clone()
    }

    async fn transfer_native(
        &self,
        _receiver: &str,
        _amount_tinybar: u128,
        _memo: &str,
    ) -> EngineResult<Option<String>> {
        Ok(self.next("hbar-transfer"))
    }

    async fn transfer_fungible_token(
        &self,
        _receiver: &str,
        _token_id: &str,
        _amount: u128,
        _decimals: u32,
        _memo: &str,
    ) -> EngineResult<Option<String>> {
        Ok(self.next("token-transfer"))
    }

    async fn associate_token(&self, _token_id: &str) -> EngineResult<Option<String>> {
        Ok(self.next("associate"))
    }

    async fn execute_contract_function(
        &self,
        _contract_id: &str,
        _calldata: &[u8],
        _payable_tinybar: u128,
        _gas: u64,
    ) -> EngineResult<Option<String>> {
        Ok(self.next("contract-call"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hedera_tokenpay=debug".into()),
        )
        .init();

    let ctx = NetworkContext::mainnet();
    let sauce = TokenDescriptor::new("0.0.731861", "SAUCE", 6);
    let usdc = TokenDescriptor::new(&ctx.usdc_token, "USDC", 6);

    let chain = DemoChain {
        // One quote: SAUCE input for exactly 10 USDC output
        quotes: Mutex::new(VecDeque::from([123_456_000])),
        records: Mutex::new(HashMap::new()),
    };
    // The swap record carries the realized output inside a multicall result
    let sub = U256::from(9_990_000u64).abi_encode();
    let multicall_output = vec![Bytes::from(sub)].abi_encode();
    chain.records.lock().unwrap().insert(
        "0.0.1111@demo-contract-call-2".to_string(),
        TransactionRecord {
            result: "SUCCESS".to_string(),
            call_result: Some(format!("0x{}", hex::encode(multicall_output))),
        },
    );

    let pools = DemoPools(vec![PoolListing {
        contract_id: "0.0.3951117".to_string(),
        token_a: ListedToken {
            id: sauce.id.clone(),
            decimals: 6,
        },
        token_b: ListedToken {
            id: usdc.id.clone(),
            decimals: 6,
        },
    }]);
    let wallet = DemoWallet {
        account: "0.0.1111".to_string(),
        counter: Mutex::new(0),
    };

    let request = CheckoutRequest {
        order_total_usd: "10".to_string(),
        selected_token: sauce,
        settlement_token: usdc,
        auto_swap: true,
        merchant_account: "0.0.2222".to_string(),
        memo: "order 42".to_string(),
        slippage_bps: Some(50),
        associate_settlement_token: false,
    };

    let mut orchestrator = SettlementOrchestrator::new(&chain, &pools, &wallet, &ctx);
    let result = orchestrator.settle(&request).await;
    tracing::info!(success = result.success, state = ?orchestrator.state(), "attempt finished");

    let mut recorder = SettlementRecorder::new();
    recorder.record(&result);
    if let Some(evidence) = recorder.evidence() {
        println!("{}", serde_json::to_string_pretty(evidence)?);
    }

    Ok(())
}
