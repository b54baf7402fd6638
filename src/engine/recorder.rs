//! Settlement evidence capture
//!
//! The order layer consumes exactly six fields of evidence; their names are
//! a fixed compatibility contract. The recorder is pure data capture with
//! one rule: evidence of a settled payment is never overwritten by a failed
//! result from a stale retry.

use serde::{Deserialize, Serialize};

use crate::engine::orchestrator::SettlementResult;
use crate::types::format_units;

/// Evidence handed to the external order system. Field names are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvidence {
    pub payer_account_id: String,
    /// Human-readable decimal amount of the settled token
    pub payment_amount: String,
    pub payment_token_name: String,
    pub payment_token_id: String,
    pub payment_hash: String,
    pub payment_network: String,
}

/// Captures the outcome of payment attempts for one order
#[derive(Debug, Default)]
pub struct SettlementRecorder {
    evidence: Option<PaymentEvidence>,
    settled: bool,
}

impl SettlementRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt's result. Later attempts supersede earlier ones,
    /// except that a failed result never displaces settled evidence.
    pub fn record(&mut self, result: &SettlementResult) {
        if !result.success {
            if self.settled {
                tracing::warn!(
                    attempt = %result.attempt_id,
                    "ignoring failed result for an already settled order"
                );
                return;
            }
            self.evidence = None;
            return;
        }

        let Some(hash) = &result.transaction_reference else {
            tracing::warn!(
                attempt = %result.attempt_id,
                "successful result carries no transaction reference, not recording"
            );
            return;
        };

        self.evidence = Some(PaymentEvidence {
            payer_account_id: result.payer_account.clone(),
            payment_amount: format_units(result.settled_amount, result.settled_token.decimals),
            payment_token_name: result.settled_token.name.clone(),
            payment_token_id: result.settled_token.id.clone(),
            payment_hash: hash.clone(),
            payment_network: result.network.as_str().to_string(),
        });
        self.settled = true;
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn evidence(&self) -> Option<&PaymentEvidence> {
        self.evidence.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::types::TokenDescriptor;

    fn result(success: bool, reference: Option<&str>) -> SettlementResult {
        SettlementResult {
            attempt_id: "attempt".to_string(),
            success,
            payer_account: "0.0.1111".to_string(),
            transaction_reference: reference.map(str::to_string),
            settled_token: TokenDescriptor::hbar(),
            settled_amount: 123_450_000,
            network: Network::Mainnet,
            failure_reason: if success { None } else { Some("swap rejected".into()) },
        }
    }

    #[test]
    fn test_success_records_all_six_fields() {
        let mut recorder = SettlementRecorder::new();
        recorder.record(&result(true, Some("0xabc")));

        let evidence = recorder.evidence().unwrap();
        assert_eq!(evidence.payer_account_id, "0.0.1111");
        assert_eq!(evidence.payment_amount, "1.2345");
        assert_eq!(evidence.payment_token_name, "HBAR");
        assert_eq!(evidence.payment_token_id, "hbar");
        assert_eq!(evidence.payment_hash, "0xabc");
        assert_eq!(evidence.payment_network, "mainnet");
        assert!(recorder.is_settled());
    }

    #[test]
    fn test_stale_failure_cannot_displace_settled_evidence() {
        let mut recorder = SettlementRecorder::new();
        recorder.record(&result(true, Some("0xabc")));
        recorder.record(&result(false, None));

        assert!(recorder.is_settled());
        assert_eq!(recorder.evidence().unwrap().payment_hash, "0xabc");
    }

    #[test]
    fn test_failure_then_success_settles() {
        let mut recorder = SettlementRecorder::new();
        recorder.record(&result(false, None));
        assert!(!recorder.is_settled());
        assert!(recorder.evidence().is_none());

        recorder.record(&result(true, Some("0xdef")));
        assert!(recorder.is_settled());
        assert_eq!(recorder.evidence().unwrap().payment_hash, "0xdef");
    }

    #[test]
    fn test_evidence_serde_names_are_fixed() {
        let mut recorder = SettlementRecorder::new();
        recorder.record(&result(true, Some("0xabc")));
        let json = serde_json::to_value(recorder.evidence().unwrap()).unwrap();
        for field in [
            "payer_account_id",
            "payment_amount",
            "payment_token_name",
            "payment_token_id",
            "payment_hash",
            "payment_network",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json.as_object().unwrap().len(), 6);
    }
}
