//! ERC-20 transfer calldata encoder
//! Builds `transfer(address,uint256)` payloads for the sweep leg

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

/// Encoded length of a transfer call: selector + two 32-byte words
pub const TRANSFER_CALLDATA_LEN: usize = 4 + 32 + 32;

/// Encoder for ERC-20 transfer calls
pub struct TransferEncoder;

impl TransferEncoder {
    /// Method selector: first 4 bytes of keccak256("transfer(address,uint256)")
    pub const SELECTOR: [u8; 4] = transferCall::SELECTOR;

    /// Encode `transfer(to, amount)`. Always 68 bytes.
    pub fn encode(to: Address, amount: U256) -> Bytes {
        Bytes::from(transferCall { to, amount }.abi_encode())
    }
}
