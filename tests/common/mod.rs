//! Shared test helpers and utilities.
//!
//! Factories for rates, ABI text, receipts and logs, a scripted chain
//! backend, and a helper to serve a fake HTTP API on a random local port.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::eth::TransactionRequest;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use eth_client::{ChainBackend, Reverted};
use eth_currency::{ExchangeRates, RateOrigin, RawLog, ReceiptSummary};

/// ABI of the `Basic` key/value contract as emitted by solc.
pub const BASIC_ABI: &str = r#"[
  {"type": "function", "name": "Version", "stateMutability": "view", "inputs": [],
   "outputs": [{"name": "", "type": "string", "internalType": "string"}]},
  {"type": "function", "name": "Items", "stateMutability": "view",
   "inputs": [{"name": "", "type": "string", "internalType": "string"}],
   "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}]},
  {"type": "function", "name": "SetItem", "stateMutability": "nonpayable",
   "inputs": [{"name": "key", "type": "string", "internalType": "string"},
              {"name": "value", "type": "uint256", "internalType": "uint256"}],
   "outputs": []},
  {"type": "event", "name": "ItemSet", "anonymous": false,
   "inputs": [{"name": "key", "type": "string", "indexed": false, "internalType": "string"},
              {"name": "value", "type": "uint256", "indexed": false, "internalType": "uint256"}]}
]"#;

/// ABI with a single `Transfer(address indexed to, uint256 amount)` event.
pub const TRANSFER_ABI: &str = r#"[
  {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
    {"name": "to", "type": "address", "indexed": true},
    {"name": "amount", "type": "uint256", "indexed": false}
  ]}
]"#;

/// Parses a decimal literal.
pub fn dec(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).expect("valid decimal literal")
}

/// Round-number rates: 1 ETH = 2000 USD, 1 USD = 0.0005 ETH.
pub fn sample_rates() -> ExchangeRates {
    ExchangeRates {
        eth_to_usd: dec("2000"),
        usd_to_eth: dec("0.0005"),
        origin: RateOrigin::Live,
    }
}

/// `ItemSet(key, value)` log as the `Basic` contract emits it.
pub fn item_set_log(key: &str, value: u64) -> RawLog {
    let data = DynSolValue::Tuple(vec![
        DynSolValue::String(key.to_string()),
        DynSolValue::Uint(U256::from(value), 256),
    ])
    .abi_encode_params();

    RawLog {
        topics: vec![keccak256("ItemSet(string,uint256)")],
        data: Bytes::from(data),
    }
}

/// `Transfer(to, amount)` log with `to` as the indexed topic.
pub fn transfer_log(to: Address, amount: u64) -> RawLog {
    RawLog {
        topics: vec![keccak256("Transfer(address,uint256)"), to.into_word()],
        data: Bytes::from(U256::from(amount).to_be_bytes::<32>().to_vec()),
    }
}

/// Mined receipt with the given status and logs.
///
/// 50 000 gas at 20 GWei.
pub fn sample_receipt(hash: B256, status: bool, logs: Vec<RawLog>) -> ReceiptSummary {
    ReceiptSummary {
        hash,
        status,
        gas_used: 50_000,
        effective_gas_price: 20_000_000_000,
        contract_address: None,
        logs,
    }
}

/// [`ChainBackend`] that answers from a script.
///
/// Receipt polls pop from `receipts` (an exhausted script keeps answering
/// `None`); `call` returns `call_result`, or reverts with `revert_reason`.
#[derive(Default)]
pub struct ScriptedBackend {
    pub balance: Mutex<U256>,
    pub nonce: u64,
    pub gas_price: u128,
    pub receipts: Mutex<VecDeque<Option<ReceiptSummary>>>,
    pub call_result: Bytes,
    pub revert_reason: Option<String>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub polls: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn with_receipts(receipts: Vec<Option<ReceiptSummary>>) -> Self {
        Self {
            receipts: Mutex::new(receipts.into()),
            gas_price: 3_000_000_000,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn polls(&self) -> usize {
        *self.polls.lock().expect("lock")
    }
}

#[async_trait]
impl ChainBackend for ScriptedBackend {
    fn network(&self) -> &str {
        "scripted"
    }

    async fn chain_id(&self) -> eyre::Result<u64> {
        Ok(31337)
    }

    async fn balance_at(&self, _account: Address) -> eyre::Result<U256> {
        Ok(*self.balance.lock().expect("lock"))
    }

    async fn pending_nonce_at(&self, _account: Address) -> eyre::Result<u64> {
        Ok(self.nonce)
    }

    async fn suggest_gas_price(&self) -> eyre::Result<u128> {
        Ok(self.gas_price)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> eyre::Result<B256> {
        let mut sent = self.sent.lock().expect("lock");
        sent.push(tx);
        Ok(B256::with_last_byte(sent.len() as u8))
    }

    async fn transaction_receipt(&self, _hash: B256) -> eyre::Result<Option<ReceiptSummary>> {
        *self.polls.lock().expect("lock") += 1;
        Ok(self.receipts.lock().expect("lock").pop_front().flatten())
    }

    async fn call(&self, _tx: TransactionRequest) -> eyre::Result<Bytes> {
        match &self.revert_reason {
            Some(reason) => Err(Reverted {
                reason: reason.clone(),
            }
            .into()),
            None => Ok(self.call_result.clone()),
        }
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let address = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve fake API");
    });
    format!("http://{address}")
}
