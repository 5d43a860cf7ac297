//! Error kinds surfaced by a deployment run.

use alloy_core::primitives::B256;

use crate::network::Dependency;

/// Boxed underlying cause of a failed step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal errors of a deployment run.
///
/// None of them is retried: the run stops and reports the network, the step and
/// the transaction hash (when a transaction was submitted) for manual diagnosis.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("unknown network {network_id}: no registry entry")]
    UnknownNetwork { network_id: u64 },

    #[error("network {network} ({network_id}) has no {dependency} address configured")]
    MissingDependencyAddress {
        network_id: u64,
        network: String,
        dependency: Dependency,
    },

    #[error("deployment of {contract} on network {network_id} failed{}", tx_suffix(.tx_hash))]
    DeploymentFailed {
        network_id: u64,
        contract: String,
        tx_hash: Option<B256>,
        #[source]
        source: BoxError,
    },

    #[error("activation step `{step}` failed{}", tx_suffix(.tx_hash))]
    ActivationFailed {
        step: &'static str,
        tx_hash: Option<B256>,
        #[source]
        source: BoxError,
    },

    #[error("callback simulation step `{step}` failed{}", tx_suffix(.tx_hash))]
    CallbackSimulationFailed {
        step: &'static str,
        tx_hash: Option<B256>,
        #[source]
        source: BoxError,
    },

    #[error("minting on {contract} failed{}", tx_suffix(.tx_hash))]
    MintFailed {
        contract: String,
        tx_hash: Option<B256>,
        #[source]
        source: BoxError,
    },

    #[error("node serves chain {actual}, but network {expected} was requested")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("chain client error")]
    Client(#[source] BoxError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    /// Transaction hash attached to the error, if a transaction was submitted.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::DeploymentFailed { tx_hash, .. }
            | Self::ActivationFailed { tx_hash, .. }
            | Self::CallbackSimulationFailed { tx_hash, .. }
            | Self::MintFailed { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}

fn tx_suffix(tx_hash: &Option<B256>) -> String {
    match tx_hash {
        Some(hash) => format!(" (tx {hash})"),
        None => String::new(),
    }
}
