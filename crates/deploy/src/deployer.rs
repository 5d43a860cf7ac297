use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ArtifactStore, ChainClient, ContractKind, DeployError, DeployedContractRef,
    DeploymentConfigHash, DeploymentPlan, DeploymentRecord, DeploymentSequencer, JsonRpcClient,
    NetworkConfig, NetworkRegistry, RequestContext, registry_dependencies,
    mint::{mint_svg, token_uri},
    network::{deserialize_decimal, serialize_decimal},
    oracle::{
        CallbackSimulator, DEFAULT_RANDOM_VALUE, ExternalOracle, RandomnessOracle,
        SimulatedOracle,
    },
};

/// The default name for the mintcake configuration file.
pub const CONFIG_FILENAME: &str = "Mintcake.toml";

/// A named subset of the deployment, selectable from the command line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeployTag {
    /// Everything below.
    All,
    /// Local stand-ins only.
    Mocks,
    /// The plain SVG NFT, minted with the configured SVG.
    Svg,
    /// The random SVG NFT, funded, requested and (locally) fulfilled.
    Rsvg,
}

impl DeployTag {
    /// Union of the deployment steps selected by `tags`. No tag means everything.
    pub fn plan(tags: &[DeployTag]) -> DeploymentPlan {
        if tags.is_empty() {
            return DeploymentPlan::ALL;
        }

        tags.iter().fold(
            DeploymentPlan {
                mocks: false,
                svg_nft: false,
                random_svg: false,
            },
            |plan, tag| match tag {
                DeployTag::All => DeploymentPlan::ALL,
                DeployTag::Mocks => DeploymentPlan {
                    mocks: true,
                    ..plan
                },
                DeployTag::Svg => DeploymentPlan {
                    mocks: true,
                    svg_nft: true,
                    ..plan
                },
                DeployTag::Rsvg => DeploymentPlan {
                    mocks: true,
                    random_svg: true,
                    ..plan
                },
            },
        )
    }
}

/// Configuration of a deployment run.
///
/// Can be serialized to/from TOML; the binary layers it with environment
/// variables and command line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Target network, by name or chain id.
    pub network: String,
    /// JSON-RPC endpoint of the target network.
    pub rpc_url: Url,
    /// Account to deploy from. Defaults to the node's first unlocked account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    /// Directory holding the compiled contract artifacts.
    pub artifacts: PathBuf,
    /// Deployment tags to run.
    pub tags: Vec<DeployTag>,
    /// Confirmations awaited after every transaction.
    pub confirmations: u64,
    /// Random value delivered by the simulated oracle on the local network.
    #[serde(
        serialize_with = "serialize_decimal",
        deserialize_with = "deserialize_decimal"
    )]
    pub random_value: U256,
    /// SVG file minted on the plain NFT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<PathBuf>,
    /// Output directory for deployment records and the effective configuration.
    pub outdata: PathBuf,
    /// Network registry file. The builtin registry is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<PathBuf>,
    /// Deploy again even if a matching deployment was recorded.
    pub redeploy: bool,
    /// Interval between receipt polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Give up waiting for confirmations after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            network: "localhost".to_string(),
            rpc_url: Url::parse("http://127.0.0.1:8545").expect("static URL is valid"),
            sender: None,
            artifacts: PathBuf::from("artifacts"),
            tags: vec![DeployTag::All],
            confirmations: 1,
            random_value: U256::from(DEFAULT_RANDOM_VALUE),
            svg: None,
            outdata: PathBuf::from("data"),
            networks: None,
            redeploy: false,
            poll_interval_ms: 1000,
            confirmation_timeout_secs: None,
        }
    }
}

impl DeployConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from the config file inside a directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file or directory not found: {}",
                path.display()
            ));
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration to the default location (Mintcake.toml in outdata).
    pub fn save_config(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.outdata)
            .with_context(|| format!("Failed to create {}", self.outdata.display()))?;
        let config_path = self.outdata.join(CONFIG_FILENAME);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// The network registry: the configured file, or the builtin table.
    pub fn registry(&self) -> Result<NetworkRegistry> {
        match &self.networks {
            Some(path) => NetworkRegistry::load_from_file(path),
            None => Ok(NetworkRegistry::builtin()),
        }
    }

    /// Run the deployment against the configured RPC endpoint.
    pub async fn deploy(self) -> Result<DeploymentReport> {
        let registry = self.registry()?;
        let network_id = registry.find(&self.network)?.id;

        let artifacts = ArtifactStore::load_dir(&self.artifacts)
            .context("Failed to load contract artifacts")?;

        let svg = self
            .svg
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read SVG file {}", path.display()))
            })
            .transpose()?;

        let client = JsonRpcClient::connect(&self.rpc_url, self.sender)
            .await
            .with_context(|| format!("Failed to connect to {}", self.rpc_url))?
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_confirmation_timeout(self.confirmation_timeout_secs.map(Duration::from_secs));

        let orchestrator = Orchestrator::new(&client, &registry, &artifacts)
            .confirmations(self.confirmations)
            .random_value(self.random_value)
            .svg(svg)
            .outdata(Some(self.outdata.clone()))
            .redeploy(self.redeploy);

        let report = orchestrator.run(network_id, &self.tags).await?;
        Ok(report)
    }
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub network: NetworkConfig,
    /// Contracts of this deployment, in deployment order.
    pub contracts: Vec<DeployedContractRef>,
    /// `true` when the contracts were taken from a previous run's record.
    pub reused: bool,
    /// Token URI of the minted plain SVG NFT.
    pub svg_token_uri: Option<String>,
    /// The randomness request of the random NFT mint.
    pub request: Option<RequestContext>,
    /// Token URI of the random NFT, once its mint finished.
    pub random_token_uri: Option<String>,
}

impl DeploymentReport {
    /// The deployed contract of a given kind.
    pub fn get(&self, kind: ContractKind) -> Option<&DeployedContractRef> {
        self.contracts.iter().find(|contract| contract.kind == kind)
    }
}

/// Runs the deployment steps selected by tags, in order, against one chain.
pub struct Orchestrator<'a, C> {
    client: &'a C,
    registry: &'a NetworkRegistry,
    artifacts: &'a ArtifactStore,
    confirmations: u64,
    random_value: U256,
    svg: Option<String>,
    outdata: Option<PathBuf>,
    redeploy: bool,
}

impl<'a, C: ChainClient> Orchestrator<'a, C> {
    pub fn new(client: &'a C, registry: &'a NetworkRegistry, artifacts: &'a ArtifactStore) -> Self {
        Self {
            client,
            registry,
            artifacts,
            confirmations: 1,
            random_value: U256::from(DEFAULT_RANDOM_VALUE),
            svg: None,
            outdata: None,
            redeploy: false,
        }
    }

    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn random_value(mut self, random_value: U256) -> Self {
        self.random_value = random_value;
        self
    }

    /// SVG document minted on the plain NFT.
    pub fn svg(mut self, svg: Option<String>) -> Self {
        self.svg = svg;
        self
    }

    /// Directory for deployment records. Without it, no record is kept.
    pub fn outdata(mut self, outdata: Option<PathBuf>) -> Self {
        self.outdata = outdata;
        self
    }

    pub fn redeploy(mut self, redeploy: bool) -> Self {
        self.redeploy = redeploy;
        self
    }

    /// Run the steps selected by `tags` on `network_id`.
    pub async fn run(
        &self,
        network_id: u64,
        tags: &[DeployTag],
    ) -> Result<DeploymentReport, DeployError> {
        let network = self.registry.resolve(network_id)?.clone();
        let is_local = self.registry.is_local(network_id);
        let plan = DeployTag::plan(tags);

        let actual = self
            .client
            .chain_id()
            .await
            .map_err(|e| DeployError::Client(e.into()))?;
        if actual != network_id {
            return Err(DeployError::ChainMismatch {
                expected: network_id,
                actual,
            });
        }

        let config_hash = DeploymentConfigHash::new(&network, plan, self.artifacts)
            .compute_hash()
            .map_err(|e| DeployError::Config(format!("{e:#}")))?;

        // The local chain is ephemeral, a record of it says nothing about its state.
        let previous = if !is_local && !self.redeploy {
            self.outdata.as_deref().and_then(|outdata| {
                DeploymentRecord::find_matching(outdata, network_id, &config_hash)
            })
        } else {
            None
        };

        let resumed = previous.is_some();
        let (mut record, dependencies) = match previous {
            Some(record) if record.completed => {
                tracing::info!(
                    network = %network.name,
                    deployed_at = record.deployed_at,
                    "Contracts already deployed with this configuration, skipping deployment"
                );
                return Ok(DeploymentReport {
                    network,
                    contracts: record.contracts,
                    reused: true,
                    svg_token_uri: None,
                    request: None,
                    random_token_uri: None,
                });
            }
            Some(record) => {
                tracing::info!(
                    network = %network.name,
                    deployed_at = record.deployed_at,
                    "Resuming an interrupted run with the recorded contracts"
                );
                let dependencies = if plan.random_svg {
                    Some(registry_dependencies(&network)?)
                } else {
                    None
                };
                (record, dependencies)
            }
            None => {
                let outcome = DeploymentSequencer::new(self.client, self.registry, self.artifacts)
                    .confirmations(self.confirmations)
                    .deploy_plan(network_id, plan)
                    .await?;

                // Saved before activation: an aborted run resumes from it.
                let record = DeploymentRecord::new(network_id, config_hash, outcome.contracts);
                self.save_record(&record)?;
                (record, outcome.dependencies)
            }
        };

        let mut report = DeploymentReport {
            network,
            contracts: record.contracts.clone(),
            reused: resumed,
            svg_token_uri: None,
            request: None,
            random_token_uri: None,
        };

        let svg_nft = report.get(ContractKind::SVGNFT).cloned();
        if let (Some(svg_nft), Some(svg)) = (svg_nft, &self.svg) {
            let token_id = match record.svg_token_id {
                Some(token_id) => token_id,
                None => {
                    let token_id =
                        mint_svg(self.client, svg_nft.address, svg, self.confirmations).await?;
                    record.svg_token_id = Some(token_id);
                    self.save_record(&record)?;
                    token_id
                }
            };
            let uri = self.read_token_uri("SVGNFT", svg_nft.address, token_id).await?;
            tracing::info!("You can view the tokenURI here {}", uri);
            report.svg_token_uri = Some(uri);
        }

        if let (Some(random_svg), Some(deps)) =
            (report.get(ContractKind::RandomSVG).cloned(), dependencies)
        {
            let mut request = crate::activate_random_mint(
                self.client,
                deps.link_token,
                random_svg.address,
                report.network.fee,
                self.confirmations,
            )
            .await?;

            if is_local {
                let simulator = CallbackSimulator::new(self.client, self.confirmations);
                SimulatedOracle::new(
                    simulator,
                    deps.vrf_coordinator,
                    random_svg.address,
                    self.random_value,
                )
                .on_randomness_requested(&mut request)
                .await?;

                let uri = self
                    .read_token_uri("RandomSVG", random_svg.address, request.token_id)
                    .await?;
                tracing::info!("You can view the tokenURI here: {}", uri);
                report.random_token_uri = Some(uri);
            } else {
                ExternalOracle.on_randomness_requested(&mut request).await?;
            }

            report.request = Some(request);
        }

        record.completed = true;
        self.save_record(&record)?;

        Ok(report)
    }

    fn save_record(&self, record: &DeploymentRecord) -> Result<(), DeployError> {
        let Some(outdata) = &self.outdata else {
            return Ok(());
        };
        record
            .save_to_file(&DeploymentRecord::path(outdata, record.network_id))
            .map_err(|e| DeployError::Config(format!("{e:#}")))
    }

    async fn read_token_uri(
        &self,
        contract: &str,
        nft: Address,
        token_id: U256,
    ) -> Result<String, DeployError> {
        token_uri(self.client, nft, token_id)
            .await
            .map_err(|e| DeployError::MintFailed {
                contract: contract.to_string(),
                tx_hash: None,
                source: e.into(),
            })
    }
}
