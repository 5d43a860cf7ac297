//! Network registry: where dependencies come from and which VRF parameters apply
//! on each supported chain.

use std::collections::BTreeMap;
use std::path::Path;

use alloy_core::primitives::{Address, B256, U256, address, b256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::DeployError;

/// Chain id of the local development network (hardhat / anvil).
pub const LOCAL_NETWORK_ID: u64 = 31337;

/// External contracts the random NFT depends on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Dependency {
    /// The LINK token used to pay the VRF fee.
    LinkToken,
    /// The VRF coordinator delivering random numbers.
    VrfCoordinator,
}

/// Configuration record for a single network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain id of the network.
    pub id: u64,
    /// Human readable name, also used in verification hints.
    pub name: String,
    /// Production dependency addresses. Absent entries are provided by mocks on the
    /// local network and are a configuration error anywhere else.
    #[serde(default)]
    pub dependencies: BTreeMap<Dependency, Address>,
    /// VRF key hash identifying the oracle's proving key.
    pub key_hash: B256,
    /// VRF fee, in LINK base units.
    #[serde(
        serialize_with = "serialize_decimal",
        deserialize_with = "deserialize_decimal"
    )]
    pub fee: U256,
}

impl NetworkConfig {
    /// Address of a dependency, if configured.
    pub fn dependency(&self, dependency: Dependency) -> Option<Address> {
        self.dependencies.get(&dependency).copied()
    }
}

/// Immutable table of known networks.
///
/// Built once at startup and passed explicitly to every component that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    /// The reserved id that triggers mock provisioning and callback simulation.
    #[serde(default = "default_local_network_id")]
    pub local_network_id: u64,
    networks: Vec<NetworkConfig>,
}

fn default_local_network_id() -> u64 {
    LOCAL_NETWORK_ID
}

impl NetworkRegistry {
    /// Create a registry, validating every entry.
    pub fn new(local_network_id: u64, networks: Vec<NetworkConfig>) -> Result<Self, DeployError> {
        let registry = Self {
            local_network_id,
            networks,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// The stock networks: localhost, rinkeby and polygon.
    pub fn builtin() -> Self {
        const KEY_HASH: B256 =
            b256!("2ed0feb3e7fd2022120aa84fab1945545a9f2ffc9076fd6156fa96eaff4c1311");

        Self {
            local_network_id: LOCAL_NETWORK_ID,
            networks: vec![
                NetworkConfig {
                    id: LOCAL_NETWORK_ID,
                    name: "localhost".to_string(),
                    dependencies: BTreeMap::new(),
                    key_hash: KEY_HASH,
                    fee: U256::from(100_000_000_000_000_000u128),
                },
                NetworkConfig {
                    id: 4,
                    name: "rinkeby".to_string(),
                    dependencies: BTreeMap::from([
                        (
                            Dependency::LinkToken,
                            address!("01BE23585060835E02B77ef475b0Cc51aA1e0709"),
                        ),
                        (
                            Dependency::VrfCoordinator,
                            address!("b3dCcb4Cf7a26f6cf6B120Cf5A73875B7BBc655B"),
                        ),
                    ]),
                    key_hash: KEY_HASH,
                    fee: U256::from(100_000_000_000_000_000u128),
                },
                NetworkConfig {
                    id: 137,
                    name: "polygon".to_string(),
                    dependencies: BTreeMap::from([
                        (
                            Dependency::LinkToken,
                            address!("b0897686c545045aFc77CF20eC7A532E3120E0F1"),
                        ),
                        (
                            Dependency::VrfCoordinator,
                            address!("3d2341ADb2D31f1c5530cDC622016af293177AE0"),
                        ),
                    ]),
                    key_hash: b256!(
                        "f86195cf7690c55907b2b611ebb7343a6f649bff128701cc542f0569e2c549da"
                    ),
                    fee: U256::from(100_000_000_000_000u128),
                },
            ],
        }
    }

    /// Parse a registry from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, DeployError> {
        let registry: Self = toml::from_str(content)
            .map_err(|e| DeployError::Config(format!("failed to parse network registry: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network registry {}", path.display()))?;
        let registry = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), networks = registry.networks.len(), "Network registry loaded");
        Ok(registry)
    }

    /// Look up the configuration of a network.
    pub fn resolve(&self, network_id: u64) -> Result<&NetworkConfig, DeployError> {
        self.networks
            .iter()
            .find(|network| network.id == network_id)
            .ok_or(DeployError::UnknownNetwork { network_id })
    }

    /// Resolve a network given either its chain id or its name.
    pub fn find(&self, name_or_id: &str) -> Result<&NetworkConfig, DeployError> {
        if let Ok(network_id) = name_or_id.parse::<u64>() {
            return self.resolve(network_id);
        }

        self.networks
            .iter()
            .find(|network| network.name.eq_ignore_ascii_case(name_or_id))
            .ok_or_else(|| {
                DeployError::Config(format!("no network named `{name_or_id}` in the registry"))
            })
    }

    /// Whether the id designates the local development network.
    pub fn is_local(&self, network_id: u64) -> bool {
        network_id == self.local_network_id
    }

    /// All configured networks, in registry order.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.iter()
    }

    fn validate(&self) -> Result<(), DeployError> {
        let mut seen = BTreeMap::new();

        for network in &self.networks {
            if network.name.trim().is_empty() {
                return Err(DeployError::Config(format!(
                    "network {} has an empty name",
                    network.id
                )));
            }
            if network.fee.is_zero() {
                return Err(DeployError::Config(format!(
                    "network {} ({}) must have a positive fee",
                    network.name, network.id
                )));
            }
            if seen.insert(network.id, &network.name).is_some() {
                return Err(DeployError::Config(format!(
                    "network id {} is defined more than once",
                    network.id
                )));
            }
        }

        if !seen.contains_key(&self.local_network_id) {
            return Err(DeployError::Config(format!(
                "local network {} has no registry entry",
                self.local_network_id
            )));
        }

        Ok(())
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Serialize a U256 as a decimal string of base units.
pub(crate) fn serialize_decimal<S: Serializer>(
    value: &U256,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Deserialize a U256 from a decimal string of base units.
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    U256::from_str_radix(s.trim(), 10).map_err(serde::de::Error::custom)
}
