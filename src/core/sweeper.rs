//! Sweep Orchestrator
//!
//! One sweep moves a middleware wallet's whole token balance to the
//! destination, funding the gas from the provider wallet first:
//!
//! ```text
//! Start -> BalanceChecked -> FeePlanned -> FundingSubmitted
//!       -> FundingConfirmed -> SweepSubmitted -> Done
//! ```
//!
//! Any step may fail; the failure carries the `SweepResult` filled so far.
//! The token transfer is never submitted unless the funding receipt reports
//! success. No step is retried here.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::fees::GasFeePlanner;
use crate::core::token::{KnownTokens, TokenMetadataResolver};
use crate::core::transaction::TransactionBuilder;
use crate::models::config::SweeperConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode, SweepFailure};
use crate::models::types::{Account, CallRequest, SweepResult, SweepStage, TransferIntent, TxReceipt};
use crate::providers::chain::ChainClient;
use crate::utils::constants::{DEFAULT_MAX_FEE_PER_GAS, DEFAULT_RECEIPT_POLL_MS, DEFAULT_RECEIPT_TIMEOUT_SECS};
use crate::utils::encoder::TransferEncoder;
use crate::utils::locks::WalletLocks;

/// Who is involved in every sweep
#[derive(Debug, Clone)]
pub struct SweepContext {
    /// Token contract
    pub token: Address,
    /// Final recipient
    pub destination: Address,
    /// Gas payer
    pub provider: Account,
}

/// Guards and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Smallest-unit balance below which the wallet is skipped
    pub min_balance: U256,
    /// Fee cap ceiling, wei per gas
    pub max_fee_per_gas: u128,
    /// Wait bound for receipts
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            min_balance: U256::from(1),
            max_fee_per_gas: DEFAULT_MAX_FEE_PER_GAS,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
        }
    }
}

impl From<&SweeperConfig> for SweepPolicy {
    fn from(config: &SweeperConfig) -> Self {
        Self {
            min_balance: config.min_balance,
            max_fee_per_gas: config.max_fee_per_gas,
            receipt_timeout: config.receipt_timeout,
            poll_interval: config.receipt_poll_interval,
        }
    }
}

impl From<&SweeperConfig> for SweepContext {
    fn from(config: &SweeperConfig) -> Self {
        Self {
            token: config.token,
            destination: config.destination,
            provider: config.provider.clone(),
        }
    }
}

/// Funding -> confirm -> sweep orchestrator
pub struct Sweeper<C: ChainClient> {
    resolver: TokenMetadataResolver<C>,
    planner: GasFeePlanner<C>,
    builder: TransactionBuilder<C>,
    context: SweepContext,
    policy: SweepPolicy,
    locks: WalletLocks,
}

impl<C: ChainClient> Sweeper<C> {
    pub fn new(client: Arc<C>, known: KnownTokens, context: SweepContext, policy: SweepPolicy) -> Self {
        Self {
            resolver: TokenMetadataResolver::new(client.clone(), known),
            planner: GasFeePlanner::new(client.clone()),
            builder: TransactionBuilder::new(client),
            context,
            policy,
            locks: WalletLocks::new(),
        }
    }

    /// Share a lock registry with other sweepers on the same wallets
    pub fn with_locks(mut self, locks: WalletLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn context(&self) -> &SweepContext {
        &self.context
    }

    pub fn policy(&self) -> &SweepPolicy {
        &self.policy
    }

    /// Run one sweep of `middleware`
    pub async fn sweep(&self, middleware: &Account) -> Result<SweepResult, SweepFailure> {
        let wallet = middleware.address();
        let provider = &self.context.provider;
        let token = self.context.token;
        let mut result = SweepResult::new(wallet);

        if wallet == provider.address() {
            return Err(SweepFailure::new(
                AppError::invalid_config("MIDDLEWARE_MNEMONIC", "derived wallet is the provider wallet"),
                result,
            ));
        }

        let (_wallet_guard, provider_guard) = self.locks.lock_pair(wallet, provider.address()).await;
        info!("🧹 Sweeping {}", wallet.to_checksum(None));

        // Start -> BalanceChecked
        let state = match self.resolver.resolve(token, wallet).await {
            Ok(state) => state,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.token_state = Some(state);

        if state.balance < self.policy.min_balance {
            return Err(SweepFailure::new(
                AppError::insufficient_balance(format!(
                    "Balance {} below minimum {}",
                    state.balance, self.policy.min_balance
                )),
                result,
            ));
        }
        result.stage = SweepStage::BalanceChecked;
        info!("💰 Balance: {} (decimals {})", state.display_balance(), state.decimals);

        // BalanceChecked -> FeePlanned, priced on the real sweep payload
        let payload = TransferEncoder::encode(self.context.destination, state.balance);
        let simulated = CallRequest {
            from: Some(wallet),
            to: token,
            value: U256::ZERO,
            data: payload.clone(),
        };
        let quote = match self.planner.quote().await {
            Ok(quote) => quote,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.fee_quote = Some(quote);

        let plan = match self
            .planner
            .plan(&quote, self.policy.max_fee_per_gas, &simulated)
            .await
        {
            Ok(plan) => plan,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.fee_plan = Some(plan);
        result.stage = SweepStage::FeePlanned;

        // FeePlanned -> FundingSubmitted
        let funding_amount = plan.max_cost();
        result.funding_amount = Some(funding_amount);
        let funding = TransferIntent::native(provider.address(), wallet, funding_amount, &plan);

        let funding_tx = self.builder.submit(&funding, provider.signer()).await;
        drop(provider_guard);
        let funding_tx = match funding_tx {
            Ok(tx) => tx,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.funding_tx = Some(funding_tx);
        result.stage = SweepStage::FundingSubmitted;
        info!("⛽ Funding {} wei sent: {:#x}", funding_amount, funding_tx.hash);

        // FundingSubmitted -> FundingConfirmed
        let receipt = match self
            .builder
            .wait_for_receipt(funding_tx.hash, self.policy.receipt_timeout, self.policy.poll_interval)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.funding_receipt = Some(receipt);

        if !receipt.success {
            warn!("❌ Funding {:#x} failed on-chain, sweep skipped", funding_tx.hash);
            return Err(SweepFailure::new(
                AppError::funding_failed(format!(
                    "Funding transaction {:#x} failed on-chain",
                    funding_tx.hash
                )),
                result,
            ));
        }
        result.stage = SweepStage::FundingConfirmed;

        // FundingConfirmed -> SweepSubmitted
        let sweep = TransferIntent::contract_call(wallet, token, payload, &plan);
        let sweep_tx = match self.builder.submit(&sweep, middleware.signer()).await {
            Ok(tx) => tx,
            Err(e) => return Err(SweepFailure::new(e, result)),
        };
        result.sweep_tx = Some(sweep_tx);
        result.stage = SweepStage::SweepSubmitted;

        // Confirmation of the sweep leg is the caller's business
        result.stage = SweepStage::Done;
        info!("✅ {}", result.summary());
        Ok(result)
    }

    /// Wait for the token transfer of a finished sweep to be mined
    pub async fn wait_for_sweep(&self, result: &SweepResult) -> AppResult<TxReceipt> {
        let hash = result.sweep_tx_hash().ok_or_else(|| {
            AppError::new(ErrorCode::TxReceiptFailed, "Sweep transaction was never submitted")
        })?;
        self.builder
            .wait_for_receipt(hash, self.policy.receipt_timeout, self.policy.poll_interval)
            .await
    }
}
