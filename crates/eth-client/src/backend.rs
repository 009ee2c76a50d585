//! Node access behind a small async trait.
//!
//! [`DialedBackend`] talks to a real JSON-RPC endpoint through an alloy
//! provider with a signing wallet. Tests substitute a scripted backend.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::eth::{BlockNumberOrTag, TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use eth_currency::{RawLog, ReceiptSummary};
use eyre::{Context, Result};

use crate::error::Reverted;

/// Operations the [`crate::Client`] needs from a node.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Human-readable endpoint name, for logs.
    fn network(&self) -> &str;

    /// Chain id reported by the node.
    async fn chain_id(&self) -> Result<u64>;

    /// Latest balance of `account`, in Wei.
    async fn balance_at(&self, account: Address) -> Result<U256>;

    /// Nonce including transactions still in the pool.
    async fn pending_nonce_at(&self, account: Address) -> Result<u64>;

    /// Node-suggested legacy gas price, in Wei.
    async fn suggest_gas_price(&self) -> Result<u128>;

    /// Signs and submits a transaction; returns its hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;

    /// Receipt of a mined transaction, `None` while pending.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>>;

    /// Executes `tx` against the latest block without submitting it.
    ///
    /// A revert surfaces as a [`Reverted`] error.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes>;
}

/// [`ChainBackend`] over HTTP JSON-RPC.
pub struct DialedBackend {
    url: String,
    provider: DynProvider,
}

impl DialedBackend {
    /// Dials `rpc_url` with `signer` as the sending wallet and checks connectivity.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or `eth_chainId` fails.
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url))]
    pub async fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_http(rpc_url.parse().wrap_err("invalid RPC URL format")?)
            .erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .wrap_err("failed to test RPC connectivity with eth_chainId")?;

        tracing::info!(rpc_url = %rpc_url, chain_id, "RPC connection successful");

        Ok(Self {
            url: rpc_url.to_string(),
            provider,
        })
    }
}

#[async_trait]
impl ChainBackend for DialedBackend {
    fn network(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .wrap_err("failed to fetch chain id")
    }

    async fn balance_at(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .wrap_err_with(|| format!("failed to fetch balance of {account}"))
    }

    async fn pending_nonce_at(&self, account: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .wrap_err_with(|| format!("failed to fetch pending nonce of {account}"))
    }

    async fn suggest_gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .wrap_err("failed to fetch suggested gas price")
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .wrap_err("failed to send transaction")?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .wrap_err_with(|| format!("failed to fetch receipt {hash}"))?;
        Ok(receipt.map(receipt_summary))
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.provider
            .raw_request::<_, Bytes>("eth_call".into(), (tx, BlockNumberOrTag::Latest))
            .await
            .map_err(call_error)
    }
}

/// Turns a node revert into [`Reverted`]; other transport errors pass through.
fn call_error(error: TransportError) -> eyre::Report {
    if let Some(payload) = error.as_error_resp() {
        let reason = match payload.as_revert_data() {
            Some(data) => alloy::sol_types::decode_revert_reason(&data)
                .unwrap_or_else(|| format!("0x{}", alloy::hex::encode(&data))),
            None => payload.message.to_string(),
        };
        return Reverted { reason }.into();
    }

    eyre::Report::new(error).wrap_err("eth_call failed")
}

fn receipt_summary(receipt: TransactionReceipt) -> ReceiptSummary {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| RawLog {
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
        .collect();

    ReceiptSummary {
        hash: receipt.transaction_hash,
        status: receipt.status(),
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        contract_address: receipt.contract_address,
        logs,
    }
}
