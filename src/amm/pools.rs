//! Pool locator
//!
//! Finds which SaucerSwap contract (and protocol version) hosts a liquidity
//! pool for a token pair by querying the versioned pool-listing endpoints.
//! The native-coin alias is normalized to WHBAR before any comparison, and a
//! pair with no pool is a legitimate business outcome, not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::network::NetworkContext;
use crate::types::{EngineResult, SettlementError};

/// AMM protocol version of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmmVersion {
    V1,
    V2,
}

impl AmmVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmmVersion::V1 => "v1",
            AmmVersion::V2 => "v2",
        }
    }
}

/// One entry of a pool-listing response
#[derive(Debug, Clone, Deserialize)]
pub struct PoolListing {
    #[serde(rename = "contractId")]
    pub contract_id: String,
    #[serde(rename = "tokenA")]
    pub token_a: ListedToken,
    #[serde(rename = "tokenB")]
    pub token_b: ListedToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedToken {
    pub id: String,
    pub decimals: u32,
}

/// A located pool, token fields in the caller's requested order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRecord {
    pub contract_id: String,
    pub version: AmmVersion,
    pub token_a: String,
    pub token_a_decimals: u32,
    pub token_b: String,
    pub token_b_decimals: u32,
}

/// Source of pool listings, one call per protocol version
#[async_trait]
pub trait PoolDirectory: Send + Sync {
    async fn pools(&self, version: AmmVersion) -> EngineResult<Vec<PoolListing>>;
}

/// HTTP directory backed by the SaucerSwap REST API
pub struct HttpPoolDirectory {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPoolDirectory {
    pub fn new(ctx: &NetworkContext) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?;
        Ok(Self {
            base_url: ctx.dex_api_base.clone(),
            http,
        })
    }
}

#[async_trait]
impl PoolDirectory for HttpPoolDirectory {
    async fn pools(&self, version: AmmVersion) -> EngineResult<Vec<PoolListing>> {
        let url = match version {
            AmmVersion::V2 => format!("{}/v2/pools/", self.base_url),
            AmmVersion::V1 => format!("{}/pools/", self.base_url),
        };
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .error_for_status()
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))?
            .json()
            .await
            .map_err(|e| SettlementError::MirrorNode(e.to_string()))
    }
}

/// Locates the pool hosting a token pair
pub struct PoolLocator<'a> {
    directory: &'a dyn PoolDirectory,
    ctx: &'a NetworkContext,
}

impl<'a> PoolLocator<'a> {
    pub fn new(directory: &'a dyn PoolDirectory, ctx: &'a NetworkContext) -> Self {
        Self { directory, ctx }
    }

    /// Find the pool for `(token_a, token_b)`, v2 listings first.
    ///
    /// Returns `Ok(None)` when neither version hosts the pair. A failure to
    /// fetch one version's listing downgrades to "no match from this source"
    /// so it never masks a pool the other version does host.
    pub async fn find_pool(
        &self,
        token_a: &str,
        token_b: &str,
    ) -> EngineResult<Option<PoolRecord>> {
        let want_a = self.ctx.normalize_token_id(token_a);
        let want_b = self.ctx.normalize_token_id(token_b);

        for version in [AmmVersion::V2, AmmVersion::V1] {
            match self.directory.pools(version).await {
                Ok(listings) => {
                    if let Some(record) = match_pool(&listings, version, want_a, want_b) {
                        tracing::debug!(
                            pool = %record.contract_id,
                            version = version.as_str(),
                            "pool located for {want_a}/{want_b}"
                        );
                        return Ok(Some(record));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        version = version.as_str(),
                        error = %e,
                        "pool listing fetch failed, treating as no match"
                    );
                }
            }
        }

        Ok(None)
    }
}

/// Match a pair against one version's listings, either token order
fn match_pool(
    listings: &[PoolListing],
    version: AmmVersion,
    want_a: &str,
    want_b: &str,
) -> Option<PoolRecord> {
    for pool in listings {
        if pool.token_a.id == want_a && pool.token_b.id == want_b {
            return Some(PoolRecord {
                contract_id: pool.contract_id.clone(),
                version,
                token_a: want_a.to_string(),
                token_a_decimals: pool.token_a.decimals,
                token_b: want_b.to_string(),
                token_b_decimals: pool.token_b.decimals,
            });
        }
        // Reversed listing: swap decimals back into the caller's order
        if pool.token_b.id == want_a && pool.token_a.id == want_b {
            return Some(PoolRecord {
                contract_id: pool.contract_id.clone(),
                version,
                token_a: want_a.to_string(),
                token_a_decimals: pool.token_b.decimals,
                token_b: want_b.to_string(),
                token_b_decimals: pool.token_a.decimals,
            });
        }
    }
    None
}
