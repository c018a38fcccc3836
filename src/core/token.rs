//! Token Metadata Resolver
//!
//! Balance is always read live with `balanceOf`. Decimals come from the
//! known-token table when the contract is listed there, and from a
//! `decimals()` call otherwise.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{CallRequest, TokenAccountState};
use crate::providers::chain::ChainClient;
use crate::utils::constants::BUILTIN_TOKENS;

sol! {
    function balanceOf(address account) external view returns (uint256);
    function decimals() external view returns (uint8);
}

/// Known-token table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownToken {
    pub name: String,
    pub decimals: u8,
}

/// Side-file entry shape: `{ "Name": "USDC", "Decimals": 6 }`
#[derive(Debug, Deserialize)]
struct KnownTokenEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Decimals")]
    decimals: u8,
}

/// Immutable contract address -> token metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownTokens {
    entries: HashMap<Address, KnownToken>,
}

impl KnownTokens {
    /// Parse `{ "<address>": { "Name": ..., "Decimals": ... } }`
    pub fn from_json(json: &str) -> AppResult<Self> {
        let raw: HashMap<String, KnownTokenEntry> = serde_json::from_str(json).map_err(|e| {
            AppError::with_source(ErrorCode::ConfigInvalidValue, "Malformed known-token table", e)
        })?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let address = Address::from_str(&key).map_err(|_| {
                AppError::invalid_config("KNOWN_TOKENS_FILE", format!("bad address key {}", key))
            })?;
            entries.insert(
                address,
                KnownToken {
                    name: entry.name,
                    decimals: entry.decimals,
                },
            );
        }
        Ok(Self { entries })
    }

    /// Built-in entries plus everything in `json`; file entries win
    pub fn default_with_json(json: &str) -> AppResult<Self> {
        let extra = Self::from_json(json)?;
        let mut table = Self::default();
        table.entries.extend(extra.entries);
        Ok(table)
    }

    pub fn get(&self, address: &Address) -> Option<&KnownToken> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KnownTokens {
    fn default() -> Self {
        let entries = BUILTIN_TOKENS
            .iter()
            .map(|t| {
                (
                    t.address,
                    KnownToken {
                        name: t.name.to_string(),
                        decimals: t.decimals,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

/// Resolves balance and decimals for (token, wallet) pairs
pub struct TokenMetadataResolver<C: ChainClient> {
    client: Arc<C>,
    known: KnownTokens,
}

impl<C: ChainClient> TokenMetadataResolver<C> {
    pub fn new(client: Arc<C>, known: KnownTokens) -> Self {
        Self { client, known }
    }

    pub fn known_tokens(&self) -> &KnownTokens {
        &self.known
    }

    /// Live `balanceOf(wallet)`. A failed read is an error, never zero.
    pub async fn balance_of(&self, token: Address, wallet: Address) -> AppResult<U256> {
        let request = CallRequest {
            from: None,
            to: token,
            value: U256::ZERO,
            data: Bytes::from(balanceOfCall { account: wallet }.abi_encode()),
        };

        let raw = self.client.call(&request).await.map_err(|e| {
            AppError::from_report(ErrorCode::TokenBalanceFailed, "balanceOf call failed", e)
        })?;

        let decoded = balanceOfCall::abi_decode_returns(&raw, true).map_err(|e| {
            AppError::with_source(
                ErrorCode::TokenBalanceFailed,
                format!("balanceOf returned {} undecodable bytes", raw.len()),
                e,
            )
        })?;
        Ok(decoded._0)
    }

    /// Decimals from the known-token table, else from `decimals()`
    pub async fn decimals(&self, token: Address) -> AppResult<u8> {
        if let Some(known) = self.known.get(&token) {
            debug!("Known token {} ({} decimals)", known.name, known.decimals);
            return Ok(known.decimals);
        }

        let request = CallRequest {
            from: None,
            to: token,
            value: U256::ZERO,
            data: Bytes::from(decimalsCall {}.abi_encode()),
        };

        let raw = self.client.call(&request).await.map_err(|e| {
            AppError::from_report(ErrorCode::TokenDecimalsFailed, "decimals call failed", e)
        })?;

        let decoded = decimalsCall::abi_decode_returns(&raw, true).map_err(|e| {
            AppError::with_source(
                ErrorCode::TokenDecimalsFailed,
                format!("decimals returned {} undecodable bytes", raw.len()),
                e,
            )
        })?;

        info!(
            "📡 Resolved decimals on-chain: {} -> {}",
            token.to_checksum(None),
            decoded._0
        );
        Ok(decoded._0)
    }

    /// Snapshot of `wallet`'s holding of `token`
    pub async fn resolve(&self, token: Address, wallet: Address) -> AppResult<TokenAccountState> {
        let decimals = self.decimals(token).await?;
        let balance = self.balance_of(token, wallet).await?;
        Ok(TokenAccountState { balance, decimals })
    }
}
