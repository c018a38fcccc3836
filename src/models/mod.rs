//! Models Module - Data Structures & Configuration
//!
//! Shared types, the error taxonomy and validated configuration.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
