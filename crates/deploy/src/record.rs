//! Persisted record of a completed deployment, used to avoid deploying the same
//! suite twice on a network.

use std::path::{Path, PathBuf};

use alloy_core::primitives::U256;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ArtifactStore, ContractKind, DeployedContractRef, DeploymentPlan, NetworkConfig};

/// Everything that, when changed, requires deploying again.
///
/// Runtime-only settings (RPC URL, confirmations, random value) are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfigHash {
    pub network: NetworkConfig,
    pub svg_nft: bool,
    pub random_svg: bool,
    /// SHA-256 of each deployed contract's creation bytecode.
    pub bytecode_hashes: Vec<(ContractKind, String)>,
}

impl DeploymentConfigHash {
    pub fn new(network: &NetworkConfig, plan: DeploymentPlan, artifacts: &ArtifactStore) -> Self {
        let mut kinds = Vec::new();
        if plan.svg_nft {
            kinds.push(ContractKind::SVGNFT);
        }
        if plan.random_svg {
            kinds.push(ContractKind::RandomSVG);
        }

        let bytecode_hashes = kinds
            .into_iter()
            .filter_map(|kind| {
                let artifact = artifacts.get(kind).ok()?;
                Some((kind, hex::encode(Sha256::digest(&artifact.bytecode))))
            })
            .collect();

        Self {
            network: network.clone(),
            svg_nft: plan.svg_nft,
            random_svg: plan.random_svg,
            bytecode_hashes,
        }
    }

    /// Compute a SHA-256 hash of this configuration.
    ///
    /// The hash is deterministic: the same configuration always produces the same hash.
    pub fn compute_hash(&self) -> Result<String> {
        let json =
            serde_json::to_string(self).context("Failed to serialize deployment configuration")?;
        Ok(hex::encode(Sha256::digest(json.as_bytes())))
    }
}

/// Record of a successful deployment, saved to
/// `{outdata}/deployments/<network-id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network_id: u64,
    /// SHA-256 hash of the deployment configuration.
    pub config_hash: String,
    /// Unix timestamp when this deployment was created.
    pub deployed_at: i64,
    /// Mintcake version that created this deployment.
    pub mintcake_version: String,
    pub contracts: Vec<DeployedContractRef>,
    /// Token minted on the plain SVG NFT, once minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_token_id: Option<U256>,
    /// `false` while the steps following the deployment haven't all succeeded.
    #[serde(default)]
    pub completed: bool,
}

impl DeploymentRecord {
    /// Create a record of freshly deployed contracts, stamped with the current
    /// time and crate version. The run is not completed yet.
    pub fn new(network_id: u64, config_hash: String, contracts: Vec<DeployedContractRef>) -> Self {
        Self {
            network_id,
            config_hash,
            deployed_at: chrono::Utc::now().timestamp(),
            mintcake_version: env!("CARGO_PKG_VERSION").to_string(),
            contracts,
            svg_token_id: None,
            completed: false,
        }
    }

    /// Location of the record of `network_id` under `outdata`.
    pub fn path(outdata: &Path, network_id: u64) -> PathBuf {
        outdata.join("deployments").join(format!("{network_id}.json"))
    }

    /// The recorded contract of a given kind.
    pub fn get(&self, kind: ContractKind) -> Option<&DeployedContractRef> {
        self.contracts.iter().find(|contract| contract.kind == kind)
    }

    /// Save this record as formatted JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Deployment record saved");
        Ok(())
    }

    /// Load a record.
    ///
    /// Returns an error if the file doesn't exist, is malformed, or cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record from {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse deployment record JSON")
    }

    /// Load the record of `network_id` if one matches `config_hash`.
    ///
    /// A missing, unreadable or outdated record yields `None`.
    pub fn find_matching(outdata: &Path, network_id: u64, config_hash: &str) -> Option<Self> {
        let path = Self::path(outdata, network_id);
        if !path.exists() {
            return None;
        }

        match Self::load_from_file(&path) {
            Ok(record) if record.config_hash == config_hash => Some(record),
            Ok(record) => {
                tracing::info!(
                    recorded = %record.config_hash,
                    current = %config_hash,
                    "Deployment configuration changed since the last run"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Ignoring unreadable deployment record");
                None
            }
        }
    }
}
