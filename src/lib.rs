//! Token Sweeper Library
//!
//! Moves an ERC-20 balance out of intermediary ("middleware") wallets into a
//! destination wallet, paying each middleware wallet's gas from a provider
//! wallet:
//! - Resolve the balance and check it against a minimum
//! - Price the transfer under EIP-1559 with a fee-cap ceiling
//! - Fund the middleware wallet with exactly the gas it needs
//! - Wait for the funding receipt, then send the token transfer

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    GasFeePlanner, KnownTokens, SweepContext, SweepPolicy, Sweeper, TokenMetadataResolver,
    TransactionBuilder,
};
pub use models::{
    Account, AppError, AppResult, ErrorCode, ErrorKind, FeePlan, FeeQuote, GasSource, SweepFailure,
    SweepResult, SweepStage, SweeperConfig, TokenAccountState, TransferIntent, TxReceipt,
};
pub use providers::{ChainClient, RpcProvider};
pub use utils::{SweepTelemetry, TransferEncoder, WalletLocks};
