//! Utils Module - Helper Functions & Shared Utilities
//!
//! Pure helpers (amounts, calldata, constants) plus wallet derivation,
//! per-address locks and run telemetry.

pub mod amount;
pub mod constants;
pub mod encoder;
pub mod locks;
pub mod telemetry;
pub mod wallet;

pub use amount::*;
pub use constants::*;
pub use encoder::{TransferEncoder, TRANSFER_CALLDATA_LEN};
pub use locks::WalletLocks;
pub use telemetry::{SweepEvent, SweepStats, SweepTelemetry};
pub use wallet::*;
