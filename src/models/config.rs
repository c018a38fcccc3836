//! Configuration for the sweeper
//!
//! All values arrive out-of-band (environment or `.env`) and are validated
//! into a typed `SweeperConfig` before any orchestrator is built. A missing or
//! malformed value is a startup error, never a panic.

use alloy_primitives::{Address, U256};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::Account;
use crate::utils::constants::{
    DEFAULT_DERIVATION_START_INDEX, DEFAULT_MAX_FEE_PER_GAS, DEFAULT_RECEIPT_POLL_MS,
    DEFAULT_RECEIPT_TIMEOUT_SECS, GWEI,
};
use crate::utils::wallet::account_from_private_key;

/// Validated sweeper configuration
#[derive(Clone)]
pub struct SweeperConfig {
    /// Primary JSON-RPC URL (API key suffix already applied)
    pub rpc_url: String,
    /// Optional secondary endpoint
    pub fallback_rpc_url: Option<String>,
    /// Token contract being swept
    pub token: Address,
    /// Wallet paying for gas
    pub provider: Account,
    /// Seed phrase the middleware wallets derive from
    pub middleware_mnemonic: String,
    /// Final recipient of swept balances
    pub destination: Address,
    /// Smallest-unit balance below which a wallet is skipped
    pub min_balance: U256,
    /// Per-gas fee ceiling in wei
    pub max_fee_per_gas: u128,
    /// How long to wait for the funding receipt
    pub receipt_timeout: Duration,
    /// Receipt polling interval
    pub receipt_poll_interval: Duration,
    /// First derivation index to sweep
    pub derivation_start_index: u32,
    /// Number of consecutive middleware wallets to sweep
    pub wallet_count: u32,
    /// Optional JSON side file with extra known tokens
    pub known_tokens_file: Option<PathBuf>,
    /// Telemetry export directory
    pub telemetry_dir: PathBuf,
    /// Wait for each sweep receipt before moving on
    pub wait_for_sweep: bool,
}

impl std::fmt::Debug for SweeperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweeperConfig")
            .field("rpc_url", &mask_url(&self.rpc_url))
            .field("token", &self.token)
            .field("provider", &self.provider)
            .field("destination", &self.destination)
            .field("min_balance", &self.min_balance)
            .field("max_fee_per_gas", &self.max_fee_per_gas)
            .field("wallet_count", &self.wallet_count)
            .finish_non_exhaustive()
    }
}

impl SweeperConfig {
    /// Load from process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| AppError::missing_env(key));

        // RPC_URL may be a bare endpoint or a prefix completed by an API key
        let mut rpc_url = require("RPC_URL")?;
        if let Some(key) = get("RPC_API_KEY").or_else(|| get("INFURA_KEY")) {
            rpc_url.push_str(&key);
        }
        let fallback_rpc_url = get("FALLBACK_RPC_URL");

        let token_raw = get("TOKEN_ADDRESS")
            .or_else(|| get("USDC_ADDRESS"))
            .ok_or_else(|| AppError::missing_env("TOKEN_ADDRESS"))?;
        let token = parse_address("TOKEN_ADDRESS", &token_raw)?;

        let provider_address =
            parse_address("PROVIDER_WALLET_ADDRESS", &require("PROVIDER_WALLET_ADDRESS")?)?;
        let provider = account_from_private_key(&require("PROVIDER_WALLET_PK")?)
            .map_err(|_| AppError::invalid_config("PROVIDER_WALLET_PK", "not a valid private key"))?;
        if provider.address() != provider_address {
            return Err(AppError::invalid_config(
                "PROVIDER_WALLET_PK",
                format!(
                    "key controls {}, not PROVIDER_WALLET_ADDRESS {}",
                    provider.address().to_checksum(None),
                    provider_address.to_checksum(None)
                ),
            ));
        }

        let middleware_mnemonic = get("MIDDLEWARE_MNEMONIC")
            .or_else(|| get("MIDDLEWARE_MNEUMONIC"))
            .ok_or_else(|| AppError::missing_env("MIDDLEWARE_MNEMONIC"))?;

        let destination = match get("DESTINATION_ADDRESS") {
            Some(raw) => parse_address("DESTINATION_ADDRESS", &raw)?,
            None => {
                info!("DESTINATION_ADDRESS not set, sweeping to provider wallet");
                provider_address
            }
        };

        let min_balance = match get("MIN_BALANCE") {
            Some(raw) => U256::from_str(&raw)
                .map_err(|_| AppError::invalid_config("MIN_BALANCE", "expected an unsigned integer"))?,
            None => U256::from(1),
        };

        let max_fee_per_gas = match get("MAX_FEE_PER_GAS_WEI") {
            Some(raw) => parse_number::<u128>("MAX_FEE_PER_GAS_WEI", &raw)?,
            None => DEFAULT_MAX_FEE_PER_GAS,
        };
        if max_fee_per_gas == 0 {
            warn!("MAX_FEE_PER_GAS_WEI is 0: every sweep will be rejected by the fee guard");
        }

        let receipt_timeout = Duration::from_secs(
            get("RECEIPT_TIMEOUT_SECS")
                .map(|raw| parse_number::<u64>("RECEIPT_TIMEOUT_SECS", &raw))
                .transpose()?
                .unwrap_or(DEFAULT_RECEIPT_TIMEOUT_SECS),
        );
        let receipt_poll_interval = Duration::from_millis(
            get("RECEIPT_POLL_MS")
                .map(|raw| parse_number::<u64>("RECEIPT_POLL_MS", &raw))
                .transpose()?
                .unwrap_or(DEFAULT_RECEIPT_POLL_MS),
        );

        let derivation_start_index = get("DERIVATION_START_INDEX")
            .map(|raw| parse_number::<u32>("DERIVATION_START_INDEX", &raw))
            .transpose()?
            .unwrap_or(DEFAULT_DERIVATION_START_INDEX);
        let wallet_count = get("WALLET_COUNT")
            .map(|raw| parse_number::<u32>("WALLET_COUNT", &raw))
            .transpose()?
            .unwrap_or(1);
        if wallet_count == 0 {
            return Err(AppError::invalid_config("WALLET_COUNT", "must be at least 1"));
        }

        let wait_for_sweep = match get("WAIT_FOR_SWEEP").as_deref() {
            None => false,
            Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
            Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
            Some(_) => return Err(AppError::invalid_config("WAIT_FOR_SWEEP", "expected true/false")),
        };

        Ok(Self {
            rpc_url,
            fallback_rpc_url,
            token,
            provider,
            middleware_mnemonic,
            destination,
            min_balance,
            max_fee_per_gas,
            receipt_timeout,
            receipt_poll_interval,
            derivation_start_index,
            wallet_count,
            known_tokens_file: get("KNOWN_TOKENS_FILE").map(PathBuf::from),
            telemetry_dir: get("TELEMETRY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./telemetry")),
            wait_for_sweep,
        })
    }

    /// Fee ceiling in gwei (for display)
    pub fn max_fee_gwei(&self) -> u128 {
        self.max_fee_per_gas / GWEI
    }

    /// Primary RPC URL safe for logging
    pub fn masked_rpc_url(&self) -> String {
        mask_url(&self.rpc_url)
    }
}

fn parse_address(key: &str, raw: &str) -> AppResult<Address> {
    Address::from_str(raw).map_err(|_| AppError::invalid_config(key, "not a 20-byte hex address"))
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.parse::<T>()
        .map_err(|_| AppError::invalid_config(key, "expected an unsigned integer"))
}

/// Hide everything after the host so API keys embedded in paths never reach logs
pub fn mask_url(url: &str) -> String {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(slash) if after_scheme + slash + 1 < url.len() => {
            format!("{}/***HIDDEN***", &url[..after_scheme + slash])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use crate::utils::wallet::derive_indexed;
    use std::collections::HashMap;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const PHRASE: &str = "test test test test test test test test test test test junk";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("RPC_URL", "https://sepolia.infura.io/v3/".to_string()),
            ("INFURA_KEY", "abc123".to_string()),
            ("USDC_ADDRESS", "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238".to_string()),
            ("PROVIDER_WALLET_ADDRESS", DEV_ADDRESS.to_string()),
            ("PROVIDER_WALLET_PK", DEV_KEY.to_string()),
            ("MIDDLEWARE_MNEMONIC", PHRASE.to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> AppResult<SweeperConfig> {
        SweeperConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.rpc_url, "https://sepolia.infura.io/v3/abc123");
        assert_eq!(config.destination, config.provider.address());
        assert_eq!(config.min_balance, U256::from(1));
        assert_eq!(config.max_fee_per_gas, DEFAULT_MAX_FEE_PER_GAS);
        assert_eq!(config.wallet_count, 1);
        assert!(!config.wait_for_sweep);
    }

    #[test]
    fn test_default_start_index_skips_provider() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.derivation_start_index, DEFAULT_DERIVATION_START_INDEX);

        let first = derive_indexed(PHRASE, config.derivation_start_index).unwrap();
        assert_ne!(first.address(), config.provider.address());
        // Index 0 of the dev phrase is the dev provider key
        assert_eq!(derive_indexed(PHRASE, 0).unwrap().address(), config.provider.address());
    }

    #[test]
    fn test_missing_key_is_typed_error() {
        let mut env = base_env();
        env.remove("MIDDLEWARE_MNEMONIC");
        let err = load(&env).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingEnv);
        assert!(err.message.contains("MIDDLEWARE_MNEMONIC"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("RPC_URL", "   ".to_string());
        assert_eq!(load(&env).unwrap_err().code, ErrorCode::ConfigMissingEnv);
    }

    #[test]
    fn test_provider_key_must_match_address() {
        let mut env = base_env();
        env.insert(
            "PROVIDER_WALLET_ADDRESS",
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
        );
        let err = load(&env).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert!(!err.message.contains(DEV_KEY));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("DESTINATION_ADDRESS", "0xf3cE9fE9aD09d5540a4aa07367ebA056bEd45bd0".to_string());
        env.insert("MIN_BALANCE", "20000000".to_string());
        env.insert("MAX_FEE_PER_GAS_WEI", "0".to_string());
        env.insert("WALLET_COUNT", "3".to_string());
        env.insert("DERIVATION_START_INDEX", "50".to_string());
        env.insert("WAIT_FOR_SWEEP", "true".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.min_balance, U256::from(20_000_000u64));
        assert_eq!(config.max_fee_per_gas, 0);
        assert_eq!(config.wallet_count, 3);
        assert_eq!(config.derivation_start_index, 50);
        assert!(config.wait_for_sweep);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let mut env = base_env();
        env.insert("MIN_BALANCE", "-5".to_string());
        assert_eq!(load(&env).unwrap_err().code, ErrorCode::ConfigInvalidValue);

        let mut env = base_env();
        env.insert("WALLET_COUNT", "0".to_string());
        assert_eq!(load(&env).unwrap_err().code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://sepolia.infura.io/v3/abc123"),
            "https://sepolia.infura.io/***HIDDEN***"
        );
        assert_eq!(mask_url("http://127.0.0.1:8545"), "http://127.0.0.1:8545");
        assert_eq!(mask_url("http://127.0.0.1:8545/"), "http://127.0.0.1:8545/");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("junk"));
    }
}
