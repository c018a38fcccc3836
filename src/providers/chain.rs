//! Chain access seam
//!
//! `ChainClient` is everything the sweeper asks of a node. `RpcProvider`
//! implements it over JSON-RPC; tests substitute scripted doubles.

use alloy_primitives::{Address, Bytes, B256, U128, U64};
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Deserialize;
use serde_json::json;

use crate::models::types::{CallRequest, TxReceipt};
use crate::providers::rpc::RpcProvider;

/// Node operations used by the sweep protocol
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Base fee of the latest block, wei per gas
    async fn latest_base_fee(&self) -> Result<u128>;

    /// Node-suggested priority fee, wei per gas
    async fn suggest_priority_fee(&self) -> Result<u128>;

    /// Next nonce including pending transactions
    async fn pending_nonce(&self, address: Address) -> Result<u64>;

    async fn chain_id(&self) -> Result<u64>;

    /// Read-only contract call at the latest block
    async fn call(&self, request: &CallRequest) -> Result<Bytes>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64>;

    /// Broadcast EIP-2718 encoded bytes, returning the node-reported hash
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;

    /// Receipt of a mined transaction; `None` while pending
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;
}

/// `eth_getBlockByNumber` header subset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockHeader {
    pub number: Option<U64>,
    pub base_fee_per_gas: Option<U128>,
}

/// `eth_getTransactionReceipt` subset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    /// `0x1` success, `0x0` failure; absent on pre-Byzantium chains
    pub status: Option<U64>,
    pub block_number: Option<U64>,
    pub gas_used: U64,
}

impl From<RpcReceipt> for TxReceipt {
    fn from(r: RpcReceipt) -> Self {
        TxReceipt {
            transaction_hash: r.transaction_hash,
            success: r.status.map(|s| s == U64::from(1)).unwrap_or(false),
            block_number: r.block_number.map(|n| n.to::<u64>()),
            gas_used: r.gas_used.to::<u64>(),
        }
    }
}

fn call_object(request: &CallRequest) -> serde_json::Value {
    let mut object = json!({
        "to": request.to,
        "data": request.data,
    });
    if let Some(from) = request.from {
        object["from"] = json!(from);
    }
    if !request.value.is_zero() {
        object["value"] = json!(request.value);
    }
    object
}

#[async_trait]
impl ChainClient for RpcProvider {
    async fn latest_base_fee(&self) -> Result<u128> {
        let header: RpcBlockHeader =
            RpcProvider::call(self, "eth_getBlockByNumber", json!(["latest", false])).await?;
        header
            .base_fee_per_gas
            .map(|fee| fee.to::<u128>())
            .ok_or_else(|| eyre!("Latest block has no baseFeePerGas (pre-London chain?)"))
    }

    async fn suggest_priority_fee(&self) -> Result<u128> {
        let tip: U128 = RpcProvider::call(self, "eth_maxPriorityFeePerGas", json!([])).await?;
        Ok(tip.to::<u128>())
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let nonce: U64 =
            RpcProvider::call(self, "eth_getTransactionCount", json!([address, "pending"])).await?;
        Ok(nonce.to::<u64>())
    }

    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = RpcProvider::call(self, "eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        RpcProvider::call(self, "eth_call", json!([call_object(request), "latest"])).await
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        let gas: U64 = RpcProvider::call(self, "eth_estimateGas", json!([call_object(request)])).await?;
        Ok(gas.to::<u64>())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let encoded = format!("0x{}", hex::encode(raw));
        RpcProvider::call(self, "eth_sendRawTransaction", json!([encoded])).await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .call_optional("eth_getTransactionReceipt", json!([hash]))
            .await?;
        Ok(receipt.map(TxReceipt::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};

    #[test]
    fn test_receipt_parsing() {
        let raw = r#"{
            "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "status": "0x1",
            "blockNumber": "0x5daf3b",
            "gasUsed": "0x5208",
            "logs": []
        }"#;
        let receipt: TxReceipt = serde_json::from_str::<RpcReceipt>(raw).unwrap().into();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, Some(0x5daf3b));
        assert_eq!(receipt.gas_used, 21_000);
    }

    #[test]
    fn test_failed_receipt() {
        let raw = r#"{
            "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "status": "0x0",
            "blockNumber": "0x1",
            "gasUsed": "0x5208"
        }"#;
        let receipt: TxReceipt = serde_json::from_str::<RpcReceipt>(raw).unwrap().into();
        assert!(!receipt.success);
    }

    #[test]
    fn test_block_header_base_fee() {
        let raw = r#"{"number":"0x10","baseFeePerGas":"0x3b9aca00","hash":"0x00"}"#;
        let header: RpcBlockHeader = serde_json::from_str(raw).unwrap();
        assert_eq!(header.base_fee_per_gas.map(|f| f.to::<u128>()), Some(1_000_000_000));

        let legacy: RpcBlockHeader = serde_json::from_str(r#"{"number":"0x10"}"#).unwrap();
        assert!(legacy.base_fee_per_gas.is_none());
    }

    #[test]
    fn test_call_object_shape() {
        let request = CallRequest {
            from: Some(address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")),
            to: address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
            value: U256::ZERO,
            data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        };
        let object = call_object(&request);
        assert_eq!(object["data"], "0xa9059cbb");
        assert!(object.get("value").is_none());
        assert!(object["from"].is_string());

        let anonymous = CallRequest { from: None, ..request };
        assert!(call_object(&anonymous).get("from").is_none());
    }
}
