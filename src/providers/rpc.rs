//! RPC Client Module - JSON-RPC over HTTP
//!
//! 1. Primary endpoint with optional fallback endpoint
//! 2. Exponential backoff with jitter on transport failures and rate limits
//! 3. User-Agent header, gzip, API key masking in logs
//!
//! Node-side errors (reverts, "nonce too low", bad params) are returned
//! immediately; only transport failures and rate limits are retried.

use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::mask_url;
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT_SECS, USER_AGENT as USER_AGENT_CONST};

// ============================================
// RETRY CONSTANTS
// ============================================

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 500;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 8_000;

/// Maximum attempts per endpoint (500ms→1s→2s→4s)
pub const MAX_RETRIES: u32 = 5;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Backoff delay before `attempt` (1-based retry count), jitter included
pub fn backoff_delay(attempt: u32) -> Duration {
    let base_delay = BASE_RETRY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped_delay = base_delay.min(MAX_RETRY_MS);

    let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    Duration::from_millis((capped_delay as i64 + jitter).max(100) as u64)
}

/// RPC provider with retry logic and fallback support
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL
    primary_url: String,
    /// Secondary RPC URL
    fallback_url: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    /// Attempts per endpoint
    max_retries: u32,
}

impl RpcProvider {
    /// Create a provider for `primary_url`, optionally backed by `fallback_url`
    pub fn new(primary_url: impl Into<String>, fallback_url: Option<String>) -> Result<Self> {
        let primary_url = primary_url.into();
        if !primary_url.starts_with("http://") && !primary_url.starts_with("https://") {
            return Err(eyre!("RPC URL must be http(s): {}", mask_url(&primary_url)));
        }

        Ok(Self {
            primary_url,
            fallback_url,
            client: Self::build_client()?,
            max_retries: MAX_RETRIES,
        })
    }

    /// Override attempts per endpoint (minimum 1)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Build HTTP client with custom headers
    fn build_client() -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Execute JSON-RPC call with retry logic and fallback.
    /// A `null` result is an error; use [`call_optional`](Self::call_optional) where null is meaningful.
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| eyre!("No result in response to {}", method))
    }

    /// Execute JSON-RPC call where a `null` result is a valid answer
    pub async fn call_optional<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let primary_err = match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        // The node answered; a second node would answer the same way.
        if primary_err.downcast_ref::<RpcError>().is_some() {
            return Err(primary_err);
        }
        warn!("⚠️ Primary RPC failed for {}: {}", method, primary_err);

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC {} for {}", mask_url(fallback), method);
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!("⚠️ Fallback RPC also failed: {}", e);
                    return Err(e);
                }
            }
        }

        Err(primary_err)
    }

    /// Execute call with exponential backoff
    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<T>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, self.max_retries, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    match e.downcast_ref::<RpcError>() {
                        Some(rpc_err) if rpc_err.is_rate_limit() => {
                            warn!("⏳ Rate limited, backing off (attempt {}/{})", attempt + 1, self.max_retries);
                        }
                        Some(_) => return Err(e),
                        None => {}
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("Unknown error after {} retries", self.max_retries)))
    }

    /// Execute single RPC call
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<T>> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e.without_url()))?;

        let status = response.status();
        if status == 429 {
            return Err(RpcError::rate_limited().into());
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e.without_url()))?;

        if let Some(error) = json.error {
            return Err(error.into());
        }

        Ok(json.result)
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> String {
        mask_url(&self.primary_url)
    }

    /// True if a secondary endpoint is configured
    pub fn has_fallback(&self) -> bool {
        self.fallback_url.is_some()
    }
}

impl fmt::Debug for RpcProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcProvider")
            .field("primary_url", &self.masked_url())
            .field("has_fallback", &self.has_fallback())
            .finish()
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn rate_limited() -> Self {
        Self {
            code: -32005,
            message: "Rate limited (HTTP 429)".to_string(),
        }
    }

    /// Check if this is a rate limit error (HTTP 429 or code -32005)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error: {} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_constants() {
        assert!(BASE_RETRY_MS < MAX_RETRY_MS);
        assert!(MAX_RETRIES >= 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        for attempt in 1..20 {
            let delay = backoff_delay(attempt).as_millis() as u64;
            assert!(delay >= 100);
            assert!(delay <= MAX_RETRY_MS + MAX_RETRY_MS * RETRY_JITTER_PERCENT / 100);
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(RpcProvider::new("ws://localhost:8546", None).is_err());
        assert!(RpcProvider::new("http://localhost:8545", None).is_ok());
    }

    #[test]
    fn test_masked_url_hides_key() {
        let provider = RpcProvider::new("https://sepolia.infura.io/v3/secret", None).unwrap();
        assert!(!provider.masked_url().contains("secret"));
        assert!(!format!("{:?}", provider).contains("secret"));
    }

    #[test]
    fn test_rpc_error_classification() {
        let rate_limit_error = RpcError {
            code: -32005,
            message: "Rate limit exceeded".to_string(),
        };
        assert!(rate_limit_error.is_rate_limit());

        let reverted = RpcError {
            code: 3,
            message: "execution reverted: ERC20: transfer amount exceeds balance".to_string(),
        };
        assert!(!reverted.is_rate_limit());
    }

    #[test]
    fn test_rpc_error_survives_report() {
        let report: eyre::Report = RpcError::rate_limited().into();
        assert!(report.downcast_ref::<RpcError>().is_some());
    }

    #[test]
    fn test_response_parsing() {
        let ok: RpcResponse<String> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).unwrap();
        assert_eq!(ok.result.as_deref(), Some("0x1"));

        let null: RpcResponse<String> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(null.result.is_none());

        let err: RpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.unwrap().message, "nonce too low");
    }
}
