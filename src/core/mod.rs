//! Core Module - Sweep protocol
//!
//! Token resolution, fee planning, transaction building and the
//! orchestrator that chains them.

pub mod fees;
pub mod sweeper;
pub mod token;
pub mod transaction;

pub use fees::{compose_fee_cap, GasFeePlanner};
pub use sweeper::{SweepContext, SweepPolicy, Sweeper};
pub use token::{KnownToken, KnownTokens, TokenMetadataResolver};
pub use transaction::{sign_intent, TransactionBuilder};
