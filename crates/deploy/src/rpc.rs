//! JSON-RPC chain client.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::chain::{ChainClient, LogEntry, TransactionRequest, TxReceipt};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between polling attempts when waiting for a receipt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// `check_fn` returns `Ok(None)` while the awaited condition doesn't hold yet.
/// Errors are returned immediately. Without a timeout, waits indefinitely.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    interval: Duration,
    timeout: Option<Duration>,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    loop {
        if let Some(value) = check_fn().await? {
            return Ok(value);
        }

        if let Some(max_duration) = timeout {
            if start.elapsed() > max_duration {
                anyhow::bail!("Timeout waiting for {}", name);
            }
        }

        tracing::trace!(waiting_for = %name, "Not ready yet, retrying...");
        tokio::time::sleep(interval).await;
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    gas_used: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    status: u64,
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<LogEntry>,
}

impl From<RpcReceipt> for TxReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            status: receipt.status == 1,
            contract_address: receipt.contract_address,
            logs: receipt.logs,
        }
    }
}

/// Chain client sending transactions from an account unlocked on the node
/// (anvil, hardhat node, or a node fronting a remote signer).
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    sender: Address,
    poll_interval: Duration,
    confirmation_timeout: Option<Duration>,
}

impl JsonRpcClient {
    /// Connect to `url`. Transactions are sent from `sender`, or from the node's
    /// first account when not given.
    pub async fn connect(url: &Url, sender: Option<Address>) -> Result<Self, anyhow::Error> {
        let client = create_client()?;
        let url = url.to_string();

        let sender = match sender {
            Some(sender) => sender,
            None => {
                let accounts: Vec<Address> = json_rpc_call(&client, &url, "eth_accounts", vec![])
                    .await
                    .context("Failed to list node accounts")?;
                *accounts
                    .first()
                    .context("The node exposes no unlocked account to deploy from")?
            }
        };

        tracing::debug!(url = %url, sender = %sender, "Connected to RPC endpoint");

        Ok(Self {
            client,
            url,
            sender,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: None,
        })
    }

    /// Interval between receipt polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on confirmation waits. Unbounded by default.
    pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    async fn block_number(&self) -> Result<u64, anyhow::Error> {
        let hex: String = json_rpc_call(&self.client, &self.url, "eth_blockNumber", vec![]).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .with_context(|| format!("Invalid block number: {hex}"))
    }
}

/// JSON body of an `eth_sendTransaction` request.
fn transaction_json(tx: &TransactionRequest) -> Value {
    let mut json = serde_json::json!({
        "from": tx.from,
        "data": tx.input,
    });
    if let Some(to) = tx.to {
        json["to"] = serde_json::json!(to);
    }
    if let Some(gas) = tx.gas {
        json["gas"] = Value::String(format!("0x{:x}", gas));
    }
    json
}

impl ChainClient for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64, anyhow::Error> {
        let hex: String = json_rpc_call(&self.client, &self.url, "eth_chainId", vec![]).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .with_context(|| format!("Invalid chain id: {hex}"))
    }

    fn default_sender(&self) -> Address {
        self.sender
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, anyhow::Error> {
        json_rpc_call(
            &self.client,
            &self.url,
            "eth_sendTransaction",
            vec![transaction_json(&tx)],
        )
        .await
        .context("Failed to send transaction")
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TxReceipt, anyhow::Error> {
        let name = format!("receipt of {tx_hash}");
        let receipt: RpcReceipt =
            poll_until(&name, self.poll_interval, self.confirmation_timeout, move || async move {
                json_rpc_call::<Option<RpcReceipt>>(
                    &self.client,
                    &self.url,
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await
            })
            .await?;

        let included_in = receipt.block_number;
        let name = format!("{confirmations} confirmations of {tx_hash}");
        poll_until(&name, self.poll_interval, self.confirmation_timeout, move || async move {
            let head = self.block_number().await?;
            Ok((head.saturating_add(1) >= included_in.saturating_add(confirmations)).then_some(()))
        })
        .await?;

        Ok(receipt.into())
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, anyhow::Error> {
        json_rpc_call(
            &self.client,
            &self.url,
            "eth_call",
            vec![
                serde_json::json!({ "to": to, "data": input }),
                serde_json::json!("latest"),
            ],
        )
        .await
    }
}
