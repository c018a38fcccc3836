//! Token Sweeper - gas-funded ERC-20 sweep
//!
//! Derives middleware wallets from a seed phrase and sweeps each one's token
//! balance to the destination, funding gas from the provider wallet.
//! Wallets are processed one after another; a failed wallet does not stop
//! the run.

use token_sweeper::models::ErrorKind;
use token_sweeper::utils::constants::{get_chain_name, get_explorer_url, APP_NAME, APP_VERSION};
use token_sweeper::utils::wallet::derive_indexed;
use token_sweeper::{
    ChainClient, KnownTokens, RpcProvider, SweepContext, SweepPolicy, SweepTelemetry, Sweeper,
    SweeperConfig,
};

use eyre::{eyre, Result, WrapErr};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("🚀 {} v{}", APP_NAME, APP_VERSION);

    // Load configuration
    let config = SweeperConfig::from_env().wrap_err("Invalid configuration")?;
    info!(
        "⚙️ RPC {} | token {} | destination {} | fee ceiling {} gwei",
        config.masked_rpc_url(),
        config.token.to_checksum(None),
        config.destination.to_checksum(None),
        config.max_fee_gwei()
    );

    let known = match &config.known_tokens_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Cannot read known-token file {}", path.display()))?;
            KnownTokens::default_with_json(&json)?
        }
        None => KnownTokens::default(),
    };

    let client = Arc::new(RpcProvider::new(config.rpc_url.clone(), config.fallback_rpc_url.clone())?);
    match client.chain_id().await {
        Ok(id) => info!("🔗 Connected to {} (chain {})", get_chain_name(id), id),
        Err(e) => warn!("⚠️ Cannot read chain id yet: {}", e),
    }

    let sweeper = Sweeper::new(
        client,
        known,
        SweepContext::from(&config),
        SweepPolicy::from(&config),
    );
    let telemetry = SweepTelemetry::new();

    let first = config.derivation_start_index;
    let last = first
        .checked_add(config.wallet_count - 1)
        .ok_or_else(|| eyre!("Derivation index range overflows"))?;

    let mut hard_failures = 0u32;
    for index in first..=last {
        let middleware = derive_indexed(&config.middleware_mnemonic, index)?;
        let started = Instant::now();

        match sweeper.sweep(&middleware).await {
            Ok(result) => {
                telemetry.record_success(&result, started.elapsed().as_millis() as u64);
                info!("📋 [{}] {}", index, result.summary());
                if let Some(tx) = result.sweep_tx {
                    if let Some(explorer) = get_explorer_url(tx.chain_id) {
                        info!("🔍 [{}] {}/tx/{:#x}", index, explorer, tx.hash);
                    }
                }

                if config.wait_for_sweep {
                    match sweeper.wait_for_sweep(&result).await {
                        Ok(receipt) if receipt.success => {
                            info!("✅ [{}] Sweep mined in block {:?}", index, receipt.block_number)
                        }
                        Ok(receipt) => error!(
                            "❌ [{}] Sweep {:#x} reverted on-chain",
                            index, receipt.transaction_hash
                        ),
                        Err(e) => error!("❌ [{}] {}", index, e),
                    }
                }
            }
            Err(failure) => {
                telemetry.record_failure(&failure, started.elapsed().as_millis() as u64);
                if !failure.code().is_per_wallet() {
                    return Err(failure.into());
                }
                if failure.error.kind() == ErrorKind::InsufficientBalance {
                    info!("⏭️ [{}] Skipped: {}", index, failure.error);
                    continue;
                }

                hard_failures += 1;
                error!("❌ [{}] {}", index, failure);
                error!("📋 [{}] {}", index, failure.partial.summary());
                if failure.partial.funding_sent() {
                    warn!(
                        "⚠️ [{}] Gas funding already left the provider wallet; it now sits in {}",
                        index,
                        failure.partial.middleware.to_checksum(None)
                    );
                }
            }
        }
    }

    let stats = telemetry.get_stats();
    info!("📊 {}", stats.summary());
    match telemetry.export(&config.telemetry_dir) {
        Ok(path) => info!("📊 Telemetry exported to {}", path.display()),
        Err(e) => warn!("⚠️ Telemetry export failed: {}", e),
    }

    if stats.attempted > 0 && u64::from(hard_failures) == stats.attempted {
        return Err(eyre!("Every sweep failed ({} wallets)", hard_failures));
    }
    Ok(())
}
