//! Centralized Error Handling Module
//!
//! Every failure carries a unique code so logs can be grepped and callers can
//! branch on the failure class without parsing messages.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: transport errors
//! - TOKEN_xxx: balance/decimals resolution
//! - SWEEP_xxx: orchestrator guards and funding outcome
//! - TX_xxx: signing, broadcast and receipt waiting
//! - CFG_xxx / WALLET_xxx: startup configuration

use std::fmt;

use crate::models::types::{SweepResult, SweepStage};

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create AppError wrapping an eyre report (transport failures)
    pub fn from_report(code: ErrorCode, message: impl Into<String>, report: eyre::Report) -> Self {
        let message = format!("{}: {}", message.into(), report);
        let source: Box<dyn std::error::Error + Send + Sync> = report.into();
        Self {
            code,
            message,
            source: Some(source),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Which taxonomy class this error belongs to
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Balance/decimals read failed (transport or ABI mismatch)
    Resolution,
    /// Balance below the configured minimum; affects this wallet only
    InsufficientBalance,
    /// Fee cap above the configured ceiling
    FeeTooHigh,
    /// Funding transaction mined but failed; sweep leg skipped
    FundingFailed,
    /// Signing, broadcast or receipt wait failed at either leg
    TransactionSubmission,
    /// Startup configuration or wallet setup
    Configuration,
    /// Raw transport failure outside a protocol step
    Transport,
    Other,
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // RPC Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC returned error response
    RpcError,
    /// Invalid RPC response
    RpcInvalidResponse,

    // ============================================
    // Token Resolution Errors
    // ============================================
    /// balanceOf() call failed
    TokenBalanceFailed,
    /// decimals() call failed
    TokenDecimalsFailed,

    // ============================================
    // Sweep Guard Errors
    // ============================================
    /// Balance below minimum threshold
    SweepInsufficientBalance,
    /// Chain fee state could not be read
    SweepFeeUnavailable,
    /// Fee cap exceeds ceiling
    SweepFeeTooHigh,
    /// Funding transaction reverted
    SweepFundingFailed,

    // ============================================
    // Transaction Errors
    // ============================================
    /// Signer address differs from the intent sender
    TxSignerMismatch,
    /// Pending nonce read failed
    TxNonceFailed,
    /// Chain id read failed
    TxChainIdFailed,
    /// Signing failed
    TxSignFailed,
    /// Broadcast rejected
    TxBroadcastFailed,
    /// Receipt polling failed
    TxReceiptFailed,
    /// Receipt did not arrive in time
    TxReceiptTimeout,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Wallet derivation failed
    WalletDerivationFailed,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::TokenBalanceFailed => "TOKEN_BALANCE_FAILED",
            Self::TokenDecimalsFailed => "TOKEN_DECIMALS_FAILED",

            Self::SweepInsufficientBalance => "SWEEP_INSUFFICIENT_BALANCE",
            Self::SweepFeeUnavailable => "SWEEP_FEE_UNAVAILABLE",
            Self::SweepFeeTooHigh => "SWEEP_FEE_TOO_HIGH",
            Self::SweepFundingFailed => "SWEEP_FUNDING_FAILED",

            Self::TxSignerMismatch => "TX_SIGNER_MISMATCH",
            Self::TxNonceFailed => "TX_NONCE_FAILED",
            Self::TxChainIdFailed => "TX_CHAIN_ID_FAILED",
            Self::TxSignFailed => "TX_SIGN_FAILED",
            Self::TxBroadcastFailed => "TX_BROADCAST_FAILED",
            Self::TxReceiptFailed => "TX_RECEIPT_FAILED",
            Self::TxReceiptTimeout => "TX_RECEIPT_TIMEOUT",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::WalletDerivationFailed => "WALLET_DERIVATION_FAILED",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Taxonomy class of this code
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenBalanceFailed | Self::TokenDecimalsFailed => ErrorKind::Resolution,
            Self::SweepInsufficientBalance => ErrorKind::InsufficientBalance,
            Self::SweepFeeTooHigh => ErrorKind::FeeTooHigh,
            Self::SweepFundingFailed => ErrorKind::FundingFailed,
            Self::SweepFeeUnavailable
            | Self::TxSignerMismatch
            | Self::TxNonceFailed
            | Self::TxChainIdFailed
            | Self::TxSignFailed
            | Self::TxBroadcastFailed
            | Self::TxReceiptFailed
            | Self::TxReceiptTimeout => ErrorKind::TransactionSubmission,
            Self::ConfigMissingEnv | Self::ConfigInvalidValue | Self::WalletDerivationFailed => {
                ErrorKind::Configuration
            }
            Self::RpcConnectionFailed
            | Self::RpcTimeout
            | Self::RpcError
            | Self::RpcInvalidResponse => ErrorKind::Transport,
            Self::Unknown => ErrorKind::Other,
        }
    }

    /// True if the failure concerns only the current wallet and a run may move on
    pub fn is_per_wallet(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Configuration)
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Missing environment variable
    pub fn missing_env(key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", key),
        )
    }

    /// Invalid configuration value (never echoes the value itself)
    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {}", key, reason.into()),
        )
    }

    /// Balance below minimum
    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SweepInsufficientBalance, msg)
    }

    /// Fee cap above ceiling
    pub fn fee_too_high(fee_cap: u128, ceiling: u128) -> Self {
        Self::new(
            ErrorCode::SweepFeeTooHigh,
            format!("Fee cap {} wei exceeds ceiling {} wei", fee_cap, ceiling),
        )
    }

    /// Funding transaction failed on-chain
    pub fn funding_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SweepFundingFailed, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Sweep failure
// ============================================

/// A failed sweep: the error plus everything the sweep produced before it
#[derive(Debug)]
pub struct SweepFailure {
    pub error: AppError,
    pub partial: SweepResult,
}

impl SweepFailure {
    pub fn new(error: AppError, partial: SweepResult) -> Self {
        Self { error, partial }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code
    }

    /// Last stage the sweep reached before failing
    pub fn stage(&self) -> SweepStage {
        self.partial.stage
    }
}

impl fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sweep of {} failed after {}: {}",
            self.partial.middleware.to_checksum(None),
            self.partial.stage.as_str(),
            self.error
        )
    }
}

impl std::error::Error for SweepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::from_report(ErrorCode::Unknown, "Unexpected failure", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::RpcTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::RpcError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}
