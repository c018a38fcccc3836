//! Gas Fee Planner
//!
//! `fee_cap = base_fee + priority_fee`, checked against the ceiling before
//! anything else happens. The raw quote is read first so a rejected sweep
//! still reports what the chain charged. Gas units come from `eth_estimateGas`
//! on the real sweep payload, or from a fixed fallback when estimation errors.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{CallRequest, FeePlan, FeeQuote, GasSource};
use crate::providers::chain::ChainClient;
use crate::utils::constants::FALLBACK_TOKEN_TRANSFER_GAS;

/// `base_fee + priority_fee`, rejected when it exceeds `ceiling` or overflows
pub fn compose_fee_cap(base_fee: u128, priority_fee: u128, ceiling: u128) -> AppResult<u128> {
    let fee_cap = base_fee
        .checked_add(priority_fee)
        .ok_or_else(|| AppError::fee_too_high(u128::MAX, ceiling))?;
    if fee_cap > ceiling {
        return Err(AppError::fee_too_high(fee_cap, ceiling));
    }
    Ok(fee_cap)
}

/// Prices one sweep leg from current chain conditions
pub struct GasFeePlanner<C: ChainClient> {
    client: Arc<C>,
    fallback_gas: u64,
}

impl<C: ChainClient> GasFeePlanner<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            fallback_gas: FALLBACK_TOKEN_TRANSFER_GAS,
        }
    }

    /// Override the gas units used when estimation fails
    pub fn with_fallback_gas(mut self, fallback_gas: u64) -> Self {
        self.fallback_gas = fallback_gas;
        self
    }

    /// Read base fee and priority fee from the chain
    pub async fn quote(&self) -> AppResult<FeeQuote> {
        let base_fee = self.client.latest_base_fee().await.map_err(|e| {
            AppError::from_report(ErrorCode::SweepFeeUnavailable, "Cannot read base fee", e)
        })?;
        let priority_fee = self.client.suggest_priority_fee().await.map_err(|e| {
            AppError::from_report(ErrorCode::SweepFeeUnavailable, "Cannot read priority fee", e)
        })?;
        Ok(FeeQuote::new(base_fee, priority_fee))
    }

    /// Price `payload` from `quote`, or fail with `SWEEP_FEE_TOO_HIGH` before estimating
    pub async fn plan(&self, quote: &FeeQuote, ceiling: u128, payload: &CallRequest) -> AppResult<FeePlan> {
        let FeeQuote {
            base_fee,
            priority_fee,
            ..
        } = *quote;
        let fee_cap = compose_fee_cap(base_fee, priority_fee, ceiling)?;

        let (gas_units, gas_source) = match self.client.estimate_gas(payload).await {
            Ok(units) => (units, GasSource::Estimated),
            Err(e) => {
                warn!(
                    "⚠️ Gas estimation failed, using fallback of {} units: {}",
                    self.fallback_gas, e
                );
                (self.fallback_gas, GasSource::Fallback)
            }
        };

        debug!(
            "Fee plan: base={} tip={} cap={} gas={} ({:?})",
            base_fee, priority_fee, fee_cap, gas_units, gas_source
        );

        Ok(FeePlan {
            base_fee,
            priority_fee,
            fee_cap,
            gas_units,
            gas_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorKind;
    use crate::models::types::TxReceipt;
    use alloy_primitives::{Address, Bytes, B256, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    struct FeeStub {
        base_fee: u128,
        priority_fee: u128,
        estimate: Option<u64>,
        estimates: AtomicUsize,
        sends: AtomicUsize,
    }

    impl FeeStub {
        fn new(base_fee: u128, priority_fee: u128, estimate: Option<u64>) -> Arc<Self> {
            Arc::new(Self {
                base_fee,
                priority_fee,
                estimate,
                estimates: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChainClient for FeeStub {
        async fn latest_base_fee(&self) -> eyre::Result<u128> {
            Ok(self.base_fee)
        }
        async fn suggest_priority_fee(&self) -> eyre::Result<u128> {
            Ok(self.priority_fee)
        }
        async fn pending_nonce(&self, _: Address) -> eyre::Result<u64> {
            Ok(0)
        }
        async fn chain_id(&self) -> eyre::Result<u64> {
            Ok(1)
        }
        async fn call(&self, _: &CallRequest) -> eyre::Result<Bytes> {
            Ok(Bytes::new())
        }
        async fn estimate_gas(&self, _: &CallRequest) -> eyre::Result<u64> {
            self.estimates.fetch_add(1, Ordering::SeqCst);
            self.estimate
                .ok_or_else(|| eyre::eyre!("execution reverted"))
        }
        async fn send_raw_transaction(&self, _: &[u8]) -> eyre::Result<B256> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(B256::ZERO)
        }
        async fn transaction_receipt(&self, _: B256) -> eyre::Result<Option<TxReceipt>> {
            Ok(None)
        }
    }

    fn payload() -> CallRequest {
        CallRequest {
            from: Some(Address::repeat_byte(1)),
            to: Address::repeat_byte(2),
            value: U256::ZERO,
            data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        }
    }

    async fn plan_with(planner: GasFeePlanner<FeeStub>, ceiling: u128) -> AppResult<FeePlan> {
        let quote = planner.quote().await?;
        planner.plan(&quote, ceiling, &payload()).await
    }

    /// Counts WARN and ERROR events
    #[derive(Clone, Default)]
    struct LevelCounter {
        warnings: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> Layer<S> for LevelCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            match *event.metadata().level() {
                Level::WARN => {
                    self.warnings.fetch_add(1, Ordering::SeqCst);
                }
                Level::ERROR => {
                    self.errors.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_compose_fee_cap() {
        assert_eq!(compose_fee_cap(100, 50, 150).unwrap(), 150);
        assert_eq!(compose_fee_cap(100, 50, 149).unwrap_err().code, ErrorCode::SweepFeeTooHigh);
        assert_eq!(
            compose_fee_cap(u128::MAX, 1, u128::MAX).unwrap_err().kind(),
            ErrorKind::FeeTooHigh
        );
    }

    #[tokio::test]
    async fn test_rejects_before_estimating() {
        let client = FeeStub::new(100, 50, Some(50_000));
        let planner = GasFeePlanner::new(client.clone());

        let quote = planner.quote().await.unwrap();
        assert_eq!(quote, FeeQuote::new(100, 50));
        let err = planner.plan(&quote, 10, &payload()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FeeTooHigh);
        assert_eq!(client.estimates.load(Ordering::SeqCst), 0);
        assert_eq!(client.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_estimated_plan() {
        let client = FeeStub::new(100, 50, Some(51_234));
        let plan = plan_with(GasFeePlanner::new(client), 1_000).await.unwrap();

        assert_eq!(plan.fee_cap, plan.base_fee + plan.priority_fee);
        assert_eq!(plan.gas_units, 51_234);
        assert_eq!(plan.gas_source, GasSource::Estimated);
    }

    #[tokio::test]
    async fn test_estimation_failure_falls_back() {
        let client = FeeStub::new(100, 50, None);
        let plan = plan_with(GasFeePlanner::new(client), 1_000).await.unwrap();

        assert_eq!(plan.gas_units, FALLBACK_TOKEN_TRANSFER_GAS);
        assert_eq!(plan.gas_source, GasSource::Fallback);
        assert_eq!(plan.max_cost(), U256::from(150u64 * 65_000));
    }

    #[tokio::test]
    async fn test_fallback_is_logged_as_warning() {
        let counter = LevelCounter::default();
        let _guard = tracing::subscriber::set_default(Registry::default().with(counter.clone()));

        let client = FeeStub::new(100, 50, None);
        let plan = plan_with(GasFeePlanner::new(client), 1_000).await.unwrap();

        assert_eq!(plan.gas_source, GasSource::Fallback);
        assert_eq!(counter.warnings.load(Ordering::SeqCst), 1);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_estimated_plan_logs_no_warning() {
        let counter = LevelCounter::default();
        let _guard = tracing::subscriber::set_default(Registry::default().with(counter.clone()));

        let client = FeeStub::new(100, 50, Some(40_000));
        plan_with(GasFeePlanner::new(client), 1_000).await.unwrap();

        assert_eq!(counter.warnings.load(Ordering::SeqCst), 0);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_fallback() {
        let client = FeeStub::new(1, 1, None);
        let plan = plan_with(GasFeePlanner::new(client).with_fallback_gas(90_000), 2)
            .await
            .unwrap();
        assert_eq!(plan.gas_units, 90_000);
    }
}
