//! Signing client bound to one account.
//!
//! Wraps a [`ChainBackend`] with the sender address and chain id, builds
//! legacy transactions with explicit nonce and gas settings, and waits for
//! them to be mined.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::eth::TransactionRequest;
use bigdecimal::BigDecimal;
use eth_currency::units::{bigint_to_u256, gwei_to_wei};
use eth_currency::{ReceiptSummary, TxSummary};
use eyre::{eyre, Context, Result};
use num_traits::{ToPrimitive, Zero};
use tracing::{debug, info, warn};

use crate::backend::ChainBackend;
use crate::error::{Reverted, TransactionFailed, WaitTimeout};

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Nonce, gas and value settings for one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactOpts {
    /// Sender.
    pub from: Address,
    /// Pending nonce at the time the options were built.
    pub nonce: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Legacy gas price, in Wei.
    pub gas_price: u128,
    /// Value to transfer, in Wei.
    pub value: U256,
}

impl TransactOpts {
    /// Address a contract created with these options will be deployed at.
    pub fn create_address(&self) -> Address {
        self.from.create(self.nonce)
    }
}

/// A submitted transaction.
#[derive(Clone, Debug)]
pub struct SentTransaction {
    /// Cost-relevant fields for reporting.
    pub summary: TxSummary,
    /// The request as sent, kept to replay a failure as a call.
    pub request: TransactionRequest,
}

impl SentTransaction {
    /// Transaction hash.
    pub fn hash(&self) -> B256 {
        self.summary.hash
    }
}

/// Account-bound access to a node.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn ChainBackend>,
    address: Address,
    chain_id: u64,
    poll_interval: Duration,
}

impl Client {
    /// Binds `address` to `backend` and reads the chain id.
    ///
    /// # Errors
    /// Returns error if the chain id cannot be read.
    pub async fn new(backend: Arc<dyn ChainBackend>, address: Address) -> Result<Self> {
        let chain_id = backend.chain_id().await?;
        debug!(network = backend.network(), chain_id, %address, "client ready");

        Ok(Self {
            backend,
            address,
            chain_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Overrides the receipt polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sender address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Endpoint name of the backend.
    pub fn network(&self) -> &str {
        self.backend.network()
    }

    /// Chain id read at construction.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current balance of the sender, in Wei.
    pub async fn balance(&self) -> Result<U256> {
        self.backend.balance_at(self.address).await
    }

    /// Builds transaction options for the sender.
    ///
    /// A zero `gas_price_gwei` asks the node for a price. `value_gwei` is
    /// converted to Wei, dropping fractional Wei.
    ///
    /// # Errors
    /// Returns error if the node cannot be reached, or if an amount is
    /// negative or too large for the chain's integer types.
    pub async fn transact_opts(
        &self,
        gas_limit: u64,
        gas_price_gwei: &BigDecimal,
        value_gwei: &BigDecimal,
    ) -> Result<TransactOpts> {
        let nonce = self
            .backend
            .pending_nonce_at(self.address)
            .await
            .wrap_err("retrieving next nonce")?;

        let gas_price = if gas_price_gwei.is_zero() {
            self.backend
                .suggest_gas_price()
                .await
                .wrap_err("retrieving suggested gas price")?
        } else {
            gwei_to_wei(gas_price_gwei)
                .to_u128()
                .ok_or_else(|| eyre!("gas price {gas_price_gwei} GWei out of range"))?
        };

        let value = bigint_to_u256(&gwei_to_wei(value_gwei))
            .ok_or_else(|| eyre!("value {value_gwei} GWei out of range"))?;

        Ok(TransactOpts {
            from: self.address,
            nonce,
            gas_limit,
            gas_price,
            value,
        })
    }

    /// Submits a contract creation with `bytecode` as init code.
    #[tracing::instrument(skip_all, fields(nonce = opts.nonce))]
    pub async fn deploy(&self, opts: &TransactOpts, bytecode: Bytes) -> Result<SentTransaction> {
        let request = self.request(opts).with_deploy_code(bytecode);
        self.submit(opts, request).await.wrap_err("deploying contract")
    }

    /// Submits a call to `to` with `calldata`.
    #[tracing::instrument(skip_all, fields(nonce = opts.nonce, to = %to))]
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        to: Address,
        calldata: Bytes,
    ) -> Result<SentTransaction> {
        let request = self.request(opts).with_to(to).with_input(calldata);
        self.submit(opts, request).await.wrap_err("sending transaction")
    }

    /// Read-only call against the latest block.
    ///
    /// # Errors
    /// A revert is returned as [`Reverted`] inside the report.
    pub async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata);
        self.backend.call(request).await
    }

    /// Polls for the receipt of `sent` until it is mined or `timeout` elapses.
    ///
    /// A receipt with a failed status is replayed as a call to recover the
    /// revert reason and returned as [`TransactionFailed`].
    ///
    /// # Errors
    /// [`WaitTimeout`] when no receipt appears in time, [`TransactionFailed`]
    /// on a failed status, or the backend's error when polling fails.
    #[tracing::instrument(skip_all, fields(hash = %sent.hash()))]
    pub async fn wait_mined(
        &self,
        sent: &SentTransaction,
        timeout: Duration,
    ) -> Result<ReceiptSummary> {
        let hash = sent.hash();
        let receipt = tokio::time::timeout(timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| WaitTimeout {
                hash,
                waited: timeout,
            })??;

        if receipt.status {
            info!(gas_used = receipt.gas_used, "transaction mined");
            return Ok(receipt);
        }

        let reason = self.revert_reason(sent).await;
        warn!(%reason, "transaction failed");
        Err(TransactionFailed {
            hash,
            reason,
            receipt: Box::new(receipt),
        }
        .into())
    }

    async fn poll_receipt(&self, hash: B256) -> Result<ReceiptSummary> {
        loop {
            if let Some(receipt) = self.backend.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            debug!("receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn revert_reason(&self, sent: &SentTransaction) -> String {
        match self.backend.call(sent.request.clone()).await {
            Ok(_) => "status 0, call replay did not revert".to_string(),
            Err(error) => match error.downcast_ref::<Reverted>() {
                Some(reverted) => reverted.reason.clone(),
                None => format!("status 0, call replay failed: {error}"),
            },
        }
    }

    fn request(&self, opts: &TransactOpts) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(opts.from)
            .with_nonce(opts.nonce)
            .with_gas_limit(opts.gas_limit)
            .with_gas_price(opts.gas_price)
            .with_value(opts.value)
            .with_chain_id(self.chain_id)
    }

    async fn submit(
        &self,
        opts: &TransactOpts,
        request: TransactionRequest,
    ) -> Result<SentTransaction> {
        let hash = self.backend.send_transaction(request.clone()).await?;
        info!(%hash, "transaction submitted");

        Ok(SentTransaction {
            summary: TxSummary {
                hash,
                nonce: opts.nonce,
                gas_limit: opts.gas_limit,
                gas_price: opts.gas_price,
                value: opts.value,
            },
            request,
        })
    }
}
