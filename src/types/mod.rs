//! Shared types and error handling
//!
//! Token descriptors, smallest-unit amount scaling, Hedera entity-id to
//! EVM address conversion, and the settlement error taxonomy returned by
//! every fallible operation in the crate.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Result type used across the engine
pub type EngineResult<T> = Result<T, SettlementError>;

/// Sentinel token id for the network's native coin (HBAR)
pub const HBAR_TOKEN_ID: &str = "hbar";

/// HBAR is denominated in tinybars
pub const HBAR_DECIMALS: u32 = 8;

/// Settlement error taxonomy
///
/// Components return these instead of throwing across the orchestrator
/// boundary; the orchestrator maps any of them to a `Failed` attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettlementError {
    #[error("no liquidity pool hosts {0}/{1}")]
    PoolNotFound(String, String),

    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("allowance approval rejected: {0}")]
    ApprovalRejected(String),

    #[error("swap rejected: {0}")]
    SwapRejected(String),

    #[error("transfer rejected: {0}")]
    TransferRejected(String),

    #[error("treasury signing service unavailable: {0}")]
    TreasuryUnavailable(String),

    #[error("customer wallet equals merchant settlement account {0}")]
    SelfPaymentRejected(String),

    #[error("malformed amount: {0}")]
    InvalidAmount(String),

    #[error("malformed entity id: {0}")]
    InvalidEntityId(String),

    #[error("mirror node error: {0}")]
    MirrorNode(String),
}

/// A token the checkout can accept
///
/// `id` is either a Hedera entity id ("0.0.x") or [`HBAR_TOKEN_ID`] for the
/// native coin. Immutable once loaded for a quote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub id: String,
    pub name: String,
    pub decimals: u32,
    /// Unit price for display only, never used in settlement math
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
}

impl TokenDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, decimals: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            decimals,
            price_usd: None,
        }
    }

    /// The native coin descriptor
    pub fn hbar() -> Self {
        Self::new(HBAR_TOKEN_ID, "HBAR", HBAR_DECIMALS)
    }

    pub fn is_native(&self) -> bool {
        self.id == HBAR_TOKEN_ID
    }

    /// Identity comparison. Native aliasing (HBAR vs WHBAR) is applied at
    /// pool lookup only, never here: a direct transfer of WHBAR is not a
    /// direct transfer of HBAR.
    pub fn same_token(&self, other: &TokenDescriptor) -> bool {
        self.id == other.id
    }
}

/// Parse a human-readable decimal amount into the token's smallest unit.
///
/// Fraction digits beyond `decimals` are truncated, so the round trip with
/// [`format_units`] is exact to within one smallest unit.
pub fn parse_units(amount: &str, decimals: u32) -> EngineResult<u128> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SettlementError::InvalidAmount(amount.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(SettlementError::InvalidAmount(amount.to_string()));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| SettlementError::InvalidAmount(format!("decimals {decimals} too large")))?;

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| SettlementError::InvalidAmount(amount.to_string()))?
    };

    // Truncate or right-pad the fraction to exactly `decimals` digits
    let mut frac_digits: String = frac_part.chars().take(decimals as usize).collect();
    while (frac_digits.len() as u32) < decimals {
        frac_digits.push('0');
    }
    let frac: u128 = if frac_digits.is_empty() {
        0
    } else {
        frac_digits
            .parse()
            .map_err(|_| SettlementError::InvalidAmount(amount.to_string()))?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| SettlementError::InvalidAmount(format!("{amount} overflows u128")))
}

/// Format a smallest-unit amount as a human-readable decimal string
pub fn format_units(amount: u128, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    let frac_str = format!("{frac:0width$}", width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Parsed Hedera entity id (shard.realm.num)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub fn parse(id: &str) -> EngineResult<Self> {
        let mut parts = id.split('.');
        let (shard, realm, num) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(r), Some(n), None) => (s, r, n),
            _ => return Err(SettlementError::InvalidEntityId(id.to_string())),
        };
        let parse = |s: &str| {
            s.parse::<u64>()
                .map_err(|_| SettlementError::InvalidEntityId(id.to_string()))
        };
        Ok(Self {
            shard: parse(shard)?,
            realm: parse(realm)?,
            num: parse(num)?,
        })
    }

    /// Long-zero EVM address form: shard (4 bytes) | realm (8) | num (8)
    pub fn to_evm_address(self) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&(self.shard as u32).to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.num.to_be_bytes());
        Address::from(bytes)
    }
}

/// Convert an entity id (or an address already in 0x form) to an EVM address
pub fn entity_to_address(id: &str) -> EngineResult<Address> {
    if let Some(hex_part) = id.strip_prefix("0x") {
        let bytes =
            hex::decode(hex_part).map_err(|_| SettlementError::InvalidEntityId(id.to_string()))?;
        if bytes.len() != 20 {
            return Err(SettlementError::InvalidEntityId(id.to_string()));
        }
        return Ok(Address::from_slice(&bytes));
    }
    Ok(EntityId::parse(id)?.to_evm_address())
}

/// Hex string form of [`entity_to_address`], "0x"-prefixed
pub fn entity_to_evm_address(id: &str) -> EngineResult<String> {
    Ok(format!("{:#x}", entity_to_address(id)?))
}

/// Narrow a U256 quote result to u128, failing instead of truncating
pub fn u256_to_u128(value: U256, what: &str) -> EngineResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(SettlementError::QuoteUnavailable(format!(
            "{what} exceeds u128 range"
        )));
    }
    Ok(value.to::<u128>())
}
