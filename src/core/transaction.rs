//! Transaction Builder/Signer
//!
//! Turns a `TransferIntent` into a signed EIP-1559 transaction and broadcasts
//! it. Broadcast is irrevocable: there is no cancel or replace.

use alloy::consensus::{SignableTransaction as _, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::signers::{local::PrivateKeySigner, SignerSync as _};
use alloy_primitives::{TxKind, B256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{PendingTx, TransferIntent, TxReceipt};
use crate::providers::chain::ChainClient;

/// Sign `intent` with `signer` at `nonce` / `chain_id`. Pure: no network.
pub fn sign_intent(
    intent: &TransferIntent,
    nonce: u64,
    chain_id: u64,
    signer: &PrivateKeySigner,
) -> AppResult<(TxEnvelope, B256)> {
    if signer.address() != intent.from {
        return Err(AppError::new(
            ErrorCode::TxSignerMismatch,
            format!(
                "Signer {} cannot send from {}",
                signer.address().to_checksum(None),
                intent.from.to_checksum(None)
            ),
        ));
    }

    let consensus_tx = TxEip1559 {
        chain_id,
        nonce,
        gas_limit: intent.gas_units,
        max_fee_per_gas: intent.fee_cap,
        max_priority_fee_per_gas: intent.priority_fee,
        to: TxKind::Call(intent.to),
        value: intent.value,
        input: intent.payload.clone().unwrap_or_default(),
        access_list: Default::default(),
    };

    let hash = consensus_tx.signature_hash();
    let sig = signer
        .sign_hash_sync(&hash)
        .map_err(|e| AppError::with_source(ErrorCode::TxSignFailed, "Signing failed", e))?;
    let signed_tx = consensus_tx.into_signed(sig);
    let tx_hash = *signed_tx.hash();
    Ok((TxEnvelope::Eip1559(signed_tx), tx_hash))
}

/// Builds, signs and broadcasts transfer intents
pub struct TransactionBuilder<C: ChainClient> {
    client: Arc<C>,
}

impl<C: ChainClient> TransactionBuilder<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Nonce + chain id from the node, sign, broadcast.
    /// Callers serialize per sender; see `WalletLocks`.
    pub async fn submit(&self, intent: &TransferIntent, signer: &PrivateKeySigner) -> AppResult<PendingTx> {
        if signer.address() != intent.from {
            return Err(AppError::new(
                ErrorCode::TxSignerMismatch,
                format!("Signer does not control {}", intent.from.to_checksum(None)),
            ));
        }

        let nonce = self.client.pending_nonce(intent.from).await.map_err(|e| {
            AppError::from_report(ErrorCode::TxNonceFailed, "Cannot read pending nonce", e)
        })?;
        let chain_id = self.client.chain_id().await.map_err(|e| {
            AppError::from_report(ErrorCode::TxChainIdFailed, "Cannot read chain id", e)
        })?;

        let (envelope, tx_hash) = sign_intent(intent, nonce, chain_id, signer)?;
        let raw = envelope.encoded_2718();

        let reported = self.client.send_raw_transaction(&raw).await.map_err(|e| {
            AppError::from_report(ErrorCode::TxBroadcastFailed, "Broadcast failed", e)
        })?;
        if reported != tx_hash {
            warn!(
                "Node reported hash {:#x}, locally computed {:#x}",
                reported, tx_hash
            );
        }

        info!(
            "📤 Sent {:#x} from {} (nonce {}, chain {})",
            tx_hash,
            intent.from.to_checksum(None),
            nonce,
            chain_id
        );

        Ok(PendingTx {
            hash: tx_hash,
            from: intent.from,
            to: intent.to,
            nonce,
            chain_id,
        })
    }

    /// Poll until the receipt exists. The timeout bounds only the wait;
    /// the transaction stays broadcast either way.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> AppResult<TxReceipt> {
        let started = Instant::now();
        let mut last_error: Option<eyre::Report> = None;

        loop {
            match self.client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    debug!(
                        "Receipt for {:#x} after {}ms (success: {})",
                        hash,
                        started.elapsed().as_millis(),
                        receipt.success
                    );
                    return Ok(receipt);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Receipt poll for {:#x} failed: {}", hash, e);
                    last_error = Some(e);
                }
            }

            if started.elapsed() + poll_interval > timeout {
                let message = format!(
                    "No receipt for {:#x} within {}s",
                    hash,
                    timeout.as_secs()
                );
                return Err(match last_error {
                    Some(e) => AppError::from_report(ErrorCode::TxReceiptTimeout, message, e),
                    None => AppError::new(ErrorCode::TxReceiptTimeout, message),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
