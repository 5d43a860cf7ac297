//! Compiled contract artifacts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::contracts::ContractKind;

/// Creation bytecode of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Parse a hardhat (`"bytecode": "0x.."`) or forge (`"bytecode": {"object": "0x.."}`)
    /// artifact.
    pub fn from_json(name: &str, content: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(content)
            .with_context(|| format!("Failed to parse artifact for {name}"))?;

        let bytecode_hex = match &json["bytecode"] {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj
                .get("object")
                .and_then(Value::as_str)
                .context("bytecode.object missing")?,
            _ => anyhow::bail!("Artifact for {name} has no bytecode"),
        };

        let bytecode = hex::decode(bytecode_hex.trim_start_matches("0x"))
            .with_context(|| format!("Invalid bytecode hex in artifact for {name}"))?;

        if bytecode.is_empty() {
            anyhow::bail!("Artifact for {name} has empty bytecode (abstract contract?)");
        }

        Ok(Self {
            name: name.to_string(),
            bytecode: bytecode.into(),
        })
    }
}

/// Artifacts available to a run, keyed by contract.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    artifacts: BTreeMap<ContractKind, ContractArtifact>,
}

impl ArtifactStore {
    /// Load every known contract found under `root`.
    ///
    /// Contracts without an artifact are skipped; asking for them later fails.
    pub fn load_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Artifacts directory not found: {}", root.display());
        }

        let mut artifacts = BTreeMap::new();
        for kind in ContractKind::iter() {
            let name = kind.to_string();
            let Some(path) = Self::locate(root, &name) else {
                tracing::debug!(contract = %name, root = %root.display(), "No artifact found");
                continue;
            };

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let artifact = ContractArtifact::from_json(&name, &content)?;
            tracing::debug!(contract = %name, path = %path.display(), size = artifact.bytecode.len(), "Artifact loaded");
            artifacts.insert(kind, artifact);
        }

        Ok(Self { artifacts })
    }

    /// Register an artifact.
    pub fn insert(&mut self, kind: ContractKind, artifact: ContractArtifact) {
        self.artifacts.insert(kind, artifact);
    }

    /// Artifact for a contract.
    pub fn get(&self, kind: ContractKind) -> Result<&ContractArtifact> {
        self.artifacts
            .get(&kind)
            .with_context(|| format!("No artifact loaded for {kind}"))
    }

    /// Whether an artifact is available.
    pub fn contains(&self, kind: ContractKind) -> bool {
        self.artifacts.contains_key(&kind)
    }

    // Flat hardhat-deploy layout, then hardhat, then forge.
    fn locate(root: &Path, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.json");
        let sol_dir = format!("{name}.sol");

        [
            root.join(&file),
            root.join("contracts").join(&sol_dir).join(&file),
            root.join(&sol_dir).join(&file),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }
}

impl FromIterator<(ContractKind, ContractArtifact)> for ArtifactStore {
    fn from_iter<I: IntoIterator<Item = (ContractKind, ContractArtifact)>>(iter: I) -> Self {
        Self {
            artifacts: iter.into_iter().collect(),
        }
    }
}
