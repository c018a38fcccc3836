//! Constants Module - Single Source of Truth
//!
//! Protocol constants, chain metadata and the built-in known-token entries.
//! Other modules reference these instead of repeating literals.

use alloy_primitives::{address, Address};

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "TokenSweeper";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for JSON-RPC requests
pub const USER_AGENT: &str = concat!("TokenSweeper/", env!("CARGO_PKG_VERSION"));

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for a single RPC request (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Default time to wait for a funding receipt (seconds)
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 300;

/// Default receipt polling interval (milliseconds)
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 2_000;

// ============================================
// GAS CONSTANTS
// ============================================

/// Gas units of a plain native-currency transfer (the funding leg)
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Gas units assumed for the token transfer when `eth_estimateGas` fails
pub const FALLBACK_TOKEN_TRANSFER_GAS: u64 = 65_000;

/// One gwei in wei
pub const GWEI: u128 = 1_000_000_000;

/// Default per-gas fee ceiling when none is configured (200 gwei)
pub const DEFAULT_MAX_FEE_PER_GAS: u128 = 200 * GWEI;

/// First middleware derivation index. Index 0 of a shared phrase is commonly
/// the funding wallet itself.
pub const DEFAULT_DERIVATION_START_INDEX: u32 = 1;

// ============================================
// WALLET CONSTANTS
// ============================================

/// BIP-44 prefix for Ethereum accounts; the address index is appended
pub const ETH_DERIVATION_PREFIX: &str = "m/44'/60'/0'/0/";

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// Sepolia testnet
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;
/// Local dev chains (anvil / hardhat)
pub const CHAIN_ID_LOCAL: u64 = 31_337;

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_SEPOLIA => "Sepolia",
        CHAIN_ID_LOCAL => "Local",
        _ => "Unknown",
    }
}

/// Get block explorer URL
pub fn get_explorer_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("https://etherscan.io"),
        CHAIN_ID_SEPOLIA => Some("https://sepolia.etherscan.io"),
        _ => None,
    }
}

// ============================================
// KNOWN TOKENS
// ============================================

/// Built-in known token entry
#[derive(Debug, Clone, Copy)]
pub struct KnownTokenInfo {
    pub name: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// Tokens whose decimals never need an on-chain lookup
pub const BUILTIN_TOKENS: [KnownTokenInfo; 3] = [
    KnownTokenInfo {
        name: "USDC (Sepolia)",
        address: address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
        decimals: 6,
    },
    KnownTokenInfo {
        name: "USDC",
        address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        decimals: 6,
    },
    KnownTokenInfo {
        name: "USDT",
        address: address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
        decimals: 6,
    },
];
