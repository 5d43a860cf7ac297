//! The narrow chain-client surface the orchestrator depends on.
//!
//! Signing, nonce management and confirmation tracking belong to the node; the
//! orchestrator only submits transactions from the node's account, waits for a
//! number of confirmations and reads receipts and their logs.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use alloy_core::sol_types::SolEvent;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::artifacts::ContractArtifact;

/// A transaction to submit from the node-managed sender account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionRequest {
    /// Sender account. Must be unlocked on the node.
    pub from: Address,
    /// Destination, `None` for a contract creation.
    pub to: Option<Address>,
    /// Calldata, or init code for a creation.
    pub input: Bytes,
    /// Gas allowance. The node estimates it when absent.
    pub gas: Option<u64>,
}

/// A log emitted while executing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// A confirmed transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// `false` when execution reverted.
    pub status: bool,
    /// Set for contract creations.
    pub contract_address: Option<Address>,
    pub logs: Vec<LogEntry>,
}

impl TxReceipt {
    /// Find and decode the first log of event `E` emitted by `emitter`.
    ///
    /// Logs are matched on the event signature hash rather than on their index in
    /// the receipt, so unrelated events emitted by other contracts in the same
    /// transaction don't shift the lookup.
    pub fn find_event<E: SolEvent>(&self, emitter: Address) -> Option<E> {
        self.logs
            .iter()
            .filter(|log| log.address == emitter)
            .filter(|log| log.topics.first() == Some(&E::SIGNATURE_HASH))
            .find_map(|log| E::decode_raw_log(log.topics.iter().copied(), &log.data, true).ok())
    }
}

/// Client for an EVM chain.
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the node.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Account transactions are sent from.
    fn default_sender(&self) -> Address;

    /// Submit a transaction, returning its hash without waiting for inclusion.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<B256>> + Send;

    /// Wait until the transaction has `confirmations` confirmations and return its receipt.
    fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;

    /// Execute a read-only call against the latest state.
    fn call(&self, to: Address, input: Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}

/// A failed transaction step: what went wrong and, if the transaction was
/// submitted, its hash.
#[derive(Debug, thiserror::Error)]
#[error("{reason:#}")]
pub struct TxFailure {
    pub tx_hash: Option<B256>,
    pub reason: anyhow::Error,
}

impl TxFailure {
    fn unsent(reason: anyhow::Error) -> Self {
        Self {
            tx_hash: None,
            reason,
        }
    }
}

/// Outcome of a contract creation.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub address: Address,
    pub receipt: TxReceipt,
}

/// Submit a transaction and wait for its confirmation, failing on revert.
pub async fn send_and_confirm<C: ChainClient>(
    client: &C,
    tx: TransactionRequest,
    confirmations: u64,
) -> Result<TxReceipt, TxFailure> {
    let tx_hash = client
        .send_transaction(tx)
        .await
        .map_err(TxFailure::unsent)?;

    tracing::debug!(tx_hash = %tx_hash, confirmations, "Transaction submitted, waiting for confirmations");

    let receipt = client
        .wait_for_receipt(tx_hash, confirmations)
        .await
        .map_err(|reason| TxFailure {
            tx_hash: Some(tx_hash),
            reason,
        })?;

    if !receipt.status {
        return Err(TxFailure {
            tx_hash: Some(tx_hash),
            reason: anyhow::anyhow!("transaction reverted in block {}", receipt.block_number),
        });
    }

    Ok(receipt)
}

/// Deploy a contract: its bytecode followed by the ABI-encoded constructor arguments.
pub async fn deploy_contract<C: ChainClient>(
    client: &C,
    artifact: &ContractArtifact,
    constructor_args: &[u8],
    confirmations: u64,
) -> Result<Deployment, TxFailure> {
    let mut init_code = artifact.bytecode.to_vec();
    init_code.extend_from_slice(constructor_args);

    let tx = TransactionRequest {
        from: client.default_sender(),
        to: None,
        input: init_code.into(),
        gas: None,
    };

    let receipt = send_and_confirm(client, tx, confirmations).await?;
    let address = receipt.contract_address.ok_or_else(|| TxFailure {
        tx_hash: Some(receipt.transaction_hash),
        reason: anyhow::anyhow!("receipt of {} has no contract address", artifact.name),
    })?;

    Ok(Deployment { address, receipt })
}

/// Call a contract method in a confirmed transaction.
pub async fn send_call<C: ChainClient>(
    client: &C,
    to: Address,
    input: Vec<u8>,
    gas: Option<u64>,
    confirmations: u64,
) -> Result<TxReceipt, TxFailure> {
    let tx = TransactionRequest {
        from: client.default_sender(),
        to: Some(to),
        input: input.into(),
        gas,
    };

    send_and_confirm(client, tx, confirmations).await
}
