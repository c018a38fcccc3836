//! Telemetry Module - sweep run statistics
//!
//! Counts attempted, completed and failed sweeps, native spend on funding,
//! and keeps a per-sweep event log. Events carry addresses and transaction
//! hashes so a half-finished sweep can be recovered by hand from the export.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::models::errors::SweepFailure;
use crate::models::types::SweepResult;
use crate::utils::amount::format_units;

/// One sweep outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEvent {
    pub timestamp: DateTime<Utc>,
    pub middleware: Address,
    /// Last stage reached
    pub stage: String,
    /// Error code for failed sweeps
    pub error_code: Option<String>,
    pub funding_amount_wei: Option<U256>,
    pub funding_tx: Option<B256>,
    pub sweep_tx: Option<B256>,
    pub latency_ms: u64,
}

impl SweepEvent {
    fn from_result(result: &SweepResult, error_code: Option<&str>, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            middleware: result.middleware,
            stage: result.stage.as_str().to_string(),
            error_code: error_code.map(str::to_string),
            funding_amount_wei: result.funding_tx.and(result.funding_amount),
            funding_tx: result.funding_tx.map(|tx| tx.hash),
            sweep_tx: result.sweep_tx_hash(),
            latency_ms,
        }
    }
}

/// Aggregated statistics for one run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepStats {
    pub attempted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Failures keyed by error code
    pub failures_by_code: HashMap<String, u64>,
    /// Native currency sent by the provider wallet, in wei
    pub total_funded_wei: U256,
    pub avg_latency_ms: f64,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

impl SweepStats {
    /// Export as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Human-readable run summary
    pub fn summary(&self) -> String {
        let mut codes: Vec<_> = self.failures_by_code.iter().collect();
        codes.sort();
        let codes = codes
            .into_iter()
            .map(|(code, n)| format!("{}={}", code, n))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Sweeps: {} attempted, {} done, {} failed | Funded: {} ETH | Avg: {:.0}ms{}",
            self.attempted,
            self.completed,
            self.failed,
            format_units(self.total_funded_wei, 18),
            self.avg_latency_ms,
            if codes.is_empty() { String::new() } else { format!(" | Failures: {}", codes) }
        )
    }
}

/// Run-wide sweep telemetry collector
pub struct SweepTelemetry {
    events: RwLock<Vec<SweepEvent>>,
    attempted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    total_latency_ms: AtomicU64,
    total_funded_wei: RwLock<U256>,
    failure_counts: RwLock<HashMap<&'static str, u64>>,
    session_start: DateTime<Utc>,
}

impl SweepTelemetry {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            attempted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            total_funded_wei: RwLock::new(U256::ZERO),
            failure_counts: RwLock::new(HashMap::new()),
            session_start: Utc::now(),
        }
    }

    /// Record a completed sweep
    pub fn record_success(&self, result: &SweepResult, latency_ms: u64) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.record_common(result, None, latency_ms);
    }

    /// Record a failed sweep (partial results included)
    pub fn record_failure(&self, failure: &SweepFailure, latency_ms: u64) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);

        let code = failure.error.code_str();
        if let Ok(mut counts) = self.failure_counts.write() {
            *counts.entry(code).or_insert(0) += 1;
        }
        self.record_common(&failure.partial, Some(code), latency_ms);
    }

    fn record_common(&self, result: &SweepResult, code: Option<&str>, latency_ms: u64) {
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        // Funding counts once it has been broadcast, whatever happened after
        if let (Some(_), Some(amount)) = (result.funding_tx, result.funding_amount) {
            if let Ok(mut total) = self.total_funded_wei.write() {
                *total = total.saturating_add(amount);
            }
        }

        if let Ok(mut events) = self.events.write() {
            events.push(SweepEvent::from_result(result, code, latency_ms));
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> SweepStats {
        let attempted = self.attempted.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if attempted > 0 {
            total_latency as f64 / attempted as f64
        } else {
            0.0
        };

        let failures_by_code = self
            .failure_counts
            .read()
            .map(|counts| counts.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();

        SweepStats {
            attempted,
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            failures_by_code,
            total_funded_wei: self.total_funded_wei.read().map(|v| *v).unwrap_or_default(),
            avg_latency_ms,
            period_start: Some(self.session_start),
            period_end: Some(Utc::now()),
        }
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Write `sweep_stats_<ts>.json` and `sweep_events_<ts>.jsonl` into `dir`.
    /// Returns the stats file path.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(dir)?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");

        let stats_path = dir.join(format!("sweep_stats_{}.json", stamp));
        fs::write(&stats_path, self.get_stats().to_json())?;

        let events = self.events();
        if !events.is_empty() {
            let events_path = dir.join(format!("sweep_events_{}.jsonl", stamp));
            let mut file = OpenOptions::new().create(true).append(true).open(&events_path)?;
            for event in &events {
                writeln!(file, "{}", serde_json::to_string(event)?)?;
            }
        }

        Ok(stats_path)
    }
}

impl Default for SweepTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;
    use crate::models::types::{PendingTx, SweepStage};

    fn funded_result() -> SweepResult {
        let mut result = SweepResult::new(Address::repeat_byte(7));
        result.stage = SweepStage::FundingSubmitted;
        result.funding_amount = Some(U256::from(1_000u64));
        result.funding_tx = Some(PendingTx {
            hash: B256::repeat_byte(1),
            from: Address::repeat_byte(2),
            to: Address::repeat_byte(7),
            nonce: 0,
            chain_id: 31_337,
        });
        result
    }

    #[test]
    fn test_counts_and_funding() {
        let telemetry = SweepTelemetry::new();

        let mut done = funded_result();
        done.stage = SweepStage::Done;
        telemetry.record_success(&done, 10);

        let failure = SweepFailure::new(AppError::funding_failed("reverted"), funded_result());
        telemetry.record_failure(&failure, 30);

        let skipped = SweepFailure::new(
            AppError::insufficient_balance("empty"),
            SweepResult::new(Address::repeat_byte(8)),
        );
        telemetry.record_failure(&skipped, 2);

        let stats = telemetry.get_stats();
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.total_funded_wei, U256::from(2_000u64));
        assert_eq!(stats.failures_by_code.get("SWEEP_FUNDING_FAILED"), Some(&1));
        assert_eq!(stats.failures_by_code.get("SWEEP_INSUFFICIENT_BALANCE"), Some(&1));
        assert!(stats.summary().contains("3 attempted"));
    }

    #[test]
    fn test_unsent_funding_not_counted() {
        let telemetry = SweepTelemetry::new();
        let mut result = SweepResult::new(Address::ZERO);
        result.funding_amount = Some(U256::from(5u64));
        let failure = SweepFailure::new(AppError::fee_too_high(2, 1), result);
        telemetry.record_failure(&failure, 1);
        assert_eq!(telemetry.get_stats().total_funded_wei, U256::ZERO);
        assert_eq!(telemetry.events()[0].funding_amount_wei, None);
    }

    #[test]
    fn test_export_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = SweepTelemetry::new();
        telemetry.record_success(&funded_result(), 5);

        let path = telemetry.export(dir.path()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"attempted\": 1"));

        let jsonl = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".jsonl"))
            .count();
        assert_eq!(jsonl, 1);
    }
}
