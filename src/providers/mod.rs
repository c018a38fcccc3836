//! Providers Module - Chain access
//!
//! JSON-RPC transport and the `ChainClient` seam built on it.

pub mod chain;
pub mod rpc;

pub use chain::{ChainClient, RpcBlockHeader, RpcReceipt};
pub use rpc::{RpcError, RpcProvider};
