//! Wallet derivation and key import
//!
//! Middleware wallets come from a BIP-39 phrase and a BIP-32 path; the
//! provider wallet is imported from a raw hex private key.

use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use std::str::FromStr;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::Account;
use crate::utils::constants::ETH_DERIVATION_PREFIX;

/// Standard Ethereum derivation path for an address index
pub fn derivation_path(index: u32) -> String {
    format!("{}{}", ETH_DERIVATION_PREFIX, index)
}

/// Derive one account from a seed phrase and a derivation path string
pub fn derive_account(phrase: &str, path: &str) -> AppResult<Account> {
    let signer = MnemonicBuilder::<English>::default()
        .phrase(phrase.trim())
        .derivation_path(path)
        .map_err(|e| {
            AppError::with_source(
                ErrorCode::WalletDerivationFailed,
                format!("Invalid derivation path: {}", path),
                e,
            )
        })?
        .build()
        .map_err(|e| {
            AppError::with_source(ErrorCode::WalletDerivationFailed, "Cannot derive wallet", e)
        })?;

    Ok(Account::new(signer))
}

/// Derive the account at `m/44'/60'/0'/0/<index>`
pub fn derive_indexed(phrase: &str, index: u32) -> AppResult<Account> {
    derive_account(phrase, &derivation_path(index))
}

/// Import an account from a hex private key (with or without `0x`)
pub fn account_from_private_key(key: &str) -> AppResult<Account> {
    let trimmed = key.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    // Never echo the key itself in the error.
    let signer = PrivateKeySigner::from_str(hex_key).map_err(|_| {
        AppError::new(ErrorCode::ConfigInvalidValue, "Private key is not a valid secp256k1 key")
    })?;
    Ok(Account::new(signer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    // Well-known development phrase (hardhat / anvil default accounts).
    const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_derivation_path() {
        assert_eq!(derivation_path(42), "m/44'/60'/0'/0/42");
    }

    #[test]
    fn test_derive_first_dev_account() {
        let account = derive_indexed(TEST_PHRASE, 0).unwrap();
        assert_eq!(
            account.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive_indexed(TEST_PHRASE, 7).unwrap();
        let b = derive_account(TEST_PHRASE, "m/44'/60'/0'/0/7").unwrap();
        assert_eq!(a.address(), b.address());
        assert_ne!(a.address(), derive_indexed(TEST_PHRASE, 8).unwrap().address());
    }

    #[test]
    fn test_bad_phrase_rejected() {
        let err = derive_indexed("not a real phrase", 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::WalletDerivationFailed);
    }

    #[test]
    fn test_private_key_import() {
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let account = account_from_private_key(key).unwrap();
        assert_eq!(
            account.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        let bare = account_from_private_key(&key[2..]).unwrap();
        assert_eq!(bare.address(), account.address());
    }

    #[test]
    fn test_private_key_error_hides_key() {
        let err = account_from_private_key("0xdeadbeef").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert!(!err.to_string().contains("deadbeef"));
    }
}
