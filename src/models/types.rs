//! Type definitions for the sweeper
//! Accounts, fee plans, transfer intents and the per-sweep result record

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::amount::format_units;
use crate::utils::constants::NATIVE_TRANSFER_GAS;

/// An address plus its exclusively-owned signing key
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Token balance snapshot for one wallet, taken once per sweep attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccountState {
    /// Balance in the token's smallest unit
    pub balance: U256,
    pub decimals: u8,
}

impl TokenAccountState {
    /// Balance rendered in display units
    pub fn display_balance(&self) -> String {
        format_units(self.balance, self.decimals)
    }
}

/// Where a plan's gas unit count came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasSource {
    /// `eth_estimateGas` against the real payload
    Estimated,
    /// Estimation failed; the fixed fallback was used
    Fallback,
}

/// Fee-market reading taken before the ceiling check. Wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub base_fee: u128,
    pub priority_fee: u128,
    /// `base_fee + priority_fee`, saturating at `u128::MAX`
    pub fee_cap: u128,
}

impl FeeQuote {
    pub fn new(base_fee: u128, priority_fee: u128) -> Self {
        Self {
            base_fee,
            priority_fee,
            fee_cap: base_fee.saturating_add(priority_fee),
        }
    }
}

/// Fee-market pricing for one sweep. Fees are wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePlan {
    pub base_fee: u128,
    pub priority_fee: u128,
    /// `base_fee + priority_fee`
    pub fee_cap: u128,
    /// Gas limit for the token transfer
    pub gas_units: u64,
    pub gas_source: GasSource,
}

impl FeePlan {
    /// Worst-case native cost of the sweep leg: `fee_cap * gas_units`
    pub fn max_cost(&self) -> U256 {
        U256::from(self.fee_cap) * U256::from(self.gas_units)
    }
}

/// Universal transfer shape consumed by the transaction builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: Address,
    pub to: Address,
    /// Native value in wei
    pub value: U256,
    pub fee_cap: u128,
    pub priority_fee: u128,
    pub gas_units: u64,
    pub payload: Option<Bytes>,
}

impl TransferIntent {
    /// Plain native-currency transfer priced with `plan`, limited to 21000 gas
    pub fn native(from: Address, to: Address, value: U256, plan: &FeePlan) -> Self {
        Self {
            from,
            to,
            value,
            fee_cap: plan.fee_cap,
            priority_fee: plan.priority_fee,
            gas_units: NATIVE_TRANSFER_GAS,
            payload: None,
        }
    }

    /// Contract call to `token` carrying `payload`, limited to the plan's gas units
    pub fn contract_call(from: Address, token: Address, payload: Bytes, plan: &FeePlan) -> Self {
        Self {
            from,
            to: token,
            value: U256::ZERO,
            fee_cap: plan.fee_cap,
            priority_fee: plan.priority_fee,
            gas_units: plan.gas_units,
            payload: Some(payload),
        }
    }
}

/// Read-only call / gas-estimation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// Handle for a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub chain_id: u64,
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// True when the transaction executed successfully
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Protocol position of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SweepStage {
    Start,
    BalanceChecked,
    FeePlanned,
    FundingSubmitted,
    FundingConfirmed,
    SweepSubmitted,
    Done,
}

impl SweepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStage::Start => "START",
            SweepStage::BalanceChecked => "BALANCE_CHECKED",
            SweepStage::FeePlanned => "FEE_PLANNED",
            SweepStage::FundingSubmitted => "FUNDING_SUBMITTED",
            SweepStage::FundingConfirmed => "FUNDING_CONFIRMED",
            SweepStage::SweepSubmitted => "SWEEP_SUBMITTED",
            SweepStage::Done => "DONE",
        }
    }
}

/// Everything one sweep produced, filled in protocol order.
///
/// Returned on success and on failure alike, so callers can see exactly which
/// on-chain artifacts exist (e.g. a confirmed funding transfer whose sweep leg
/// never went out) and recover by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepResult {
    pub middleware: Address,
    pub stage: SweepStage,
    pub token_state: Option<TokenAccountState>,
    /// Fees read from the chain, kept even when the ceiling rejected them
    pub fee_quote: Option<FeeQuote>,
    pub fee_plan: Option<FeePlan>,
    /// Native amount sent from the provider wallet
    pub funding_amount: Option<U256>,
    pub funding_tx: Option<PendingTx>,
    pub funding_receipt: Option<TxReceipt>,
    pub sweep_tx: Option<PendingTx>,
}

impl SweepResult {
    pub fn new(middleware: Address) -> Self {
        Self {
            middleware,
            stage: SweepStage::Start,
            token_state: None,
            fee_quote: None,
            fee_plan: None,
            funding_amount: None,
            funding_tx: None,
            funding_receipt: None,
            sweep_tx: None,
        }
    }

    /// Hash of the token transfer, once broadcast
    pub fn sweep_tx_hash(&self) -> Option<B256> {
        self.sweep_tx.map(|tx| tx.hash)
    }

    /// True once funds have left the provider wallet
    pub fn funding_sent(&self) -> bool {
        self.funding_tx.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.stage == SweepStage::Done
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let balance = self
            .token_state
            .map(|s| s.display_balance())
            .unwrap_or_else(|| "-".to_string());
        let fee_cap = self
            .fee_quote
            .map(|q| q.fee_cap.to_string())
            .unwrap_or_else(|| "-".to_string());
        let funding = self
            .funding_tx
            .map(|tx| format!("{:#x}", tx.hash))
            .unwrap_or_else(|| "-".to_string());
        let sweep = self
            .sweep_tx_hash()
            .map(|h| format!("{:#x}", h))
            .unwrap_or_else(|| "-".to_string());

        format!(
            "Wallet: {} | Stage: {} | Balance: {} | FeeCap: {} wei | Funding: {} | Sweep: {}",
            self.middleware.to_checksum(None),
            self.stage.as_str(),
            balance,
            fee_cap,
            funding,
            sweep
        )
    }
}
