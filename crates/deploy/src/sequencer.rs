//! Deployment sequencing: resolve dependencies, then deploy each contract once its
//! constructor arguments are known.

use alloy_core::primitives::{Address, B256, Bytes};
use alloy_core::sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::{
    ArtifactStore, ChainClient, ContractKind, DeployError, NetworkConfig, NetworkRegistry,
    chain::{self, TxFailure},
    mocks,
    network::Dependency,
};

/// A contract deployed during this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContractRef {
    /// Which contract this is; selects the interface used to talk to it.
    pub kind: ContractKind,
    pub address: Address,
    pub deployment: DeploymentTx,
}

/// Metadata of the creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTx {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Bytes,
    /// Constructor arguments as passed on a command line.
    pub args: Vec<String>,
}

impl DeployedContractRef {
    /// Command verifying the contract source on a block explorer.
    pub fn verify_command(&self, network_name: &str) -> String {
        let mut cmd = format!("npx hardhat verify --network {network_name} {}", self.address);
        for arg in &self.deployment.args {
            cmd.push(' ');
            cmd.push_str(arg);
        }
        cmd
    }
}

/// Where the dependency addresses of a run come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySource {
    /// Stand-ins deployed by this run on the local network.
    Mocks,
    /// Production addresses from the network registry.
    Registry,
}

/// Resolved dependency addresses for the random NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencySet {
    pub link_token: Address,
    pub vrf_coordinator: Address,
    pub source: DependencySource,
}

/// Which parts of the suite a run deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Provision the local stand-ins even if no contract needs them.
    pub mocks: bool,
    pub svg_nft: bool,
    pub random_svg: bool,
}

impl DeploymentPlan {
    pub const ALL: Self = Self {
        mocks: true,
        svg_nft: true,
        random_svg: true,
    };

    /// Whether the dependency set must be resolved. Mocks alone only matter on
    /// the local network.
    pub fn needs_dependencies(&self, is_local: bool) -> bool {
        self.random_svg || (self.mocks && is_local)
    }
}

/// Result of a sequenced deployment.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub network: NetworkConfig,
    /// `None` when the plan needed no dependency.
    pub dependencies: Option<DependencySet>,
    /// Deployed contracts, in deployment order.
    pub contracts: Vec<DeployedContractRef>,
}

impl DeploymentOutcome {
    /// The deployed contract of a given kind.
    pub fn get(&self, kind: ContractKind) -> Option<&DeployedContractRef> {
        self.contracts.iter().find(|contract| contract.kind == kind)
    }
}

/// Deploys the contract suite on a network, one confirmed transaction at a time.
pub struct DeploymentSequencer<'a, C> {
    client: &'a C,
    registry: &'a NetworkRegistry,
    artifacts: &'a ArtifactStore,
    confirmations: u64,
}

impl<'a, C: ChainClient> DeploymentSequencer<'a, C> {
    pub fn new(client: &'a C, registry: &'a NetworkRegistry, artifacts: &'a ArtifactStore) -> Self {
        Self {
            client,
            registry,
            artifacts,
            confirmations: 1,
        }
    }

    /// Number of confirmations awaited after each deployment.
    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Deploy the whole suite on `network_id`.
    pub async fn deploy(&self, network_id: u64) -> Result<Vec<DeployedContractRef>, DeployError> {
        Ok(self.deploy_plan(network_id, DeploymentPlan::ALL).await?.contracts)
    }

    /// Deploy the parts of the suite selected by `plan`.
    pub async fn deploy_plan(
        &self,
        network_id: u64,
        plan: DeploymentPlan,
    ) -> Result<DeploymentOutcome, DeployError> {
        let network = self.registry.resolve(network_id)?.clone();
        let mut contracts = Vec::new();

        tracing::info!(network = %network.name, network_id, ?plan, "Starting deployment");

        // Dependencies are resolved before anything is sent, so an incomplete
        // production entry aborts the run without a single transaction.
        let is_local = self.registry.is_local(network_id);
        let dependencies = if plan.needs_dependencies(is_local) {
            let dependencies = self.resolve_dependencies(&network, &mut contracts).await?;
            Some(dependencies)
        } else {
            if plan.mocks {
                tracing::info!(network = %network.name, "Not a local network, no mocks to deploy");
            }
            None
        };

        if plan.svg_nft {
            tracing::info!("-------------------------------------------------------");
            let svg_nft = self
                .deploy_contract(network_id, ContractKind::SVGNFT, Bytes::new(), vec![])
                .await?;
            tracing::info!(address = %svg_nft.address, "You have deployed an NFT contract");
            tracing::info!("Verify with:\n {}", svg_nft.verify_command(&network.name));
            contracts.push(svg_nft);
        }

        if plan.random_svg {
            let Some(deps) = dependencies else {
                return Err(DeployError::Config(
                    "RandomSVG requires a resolved dependency set".to_string(),
                ));
            };

            tracing::info!("-------------------------------------------------------");
            let (constructor_args, args) = random_svg_args(&deps, &network);
            let random_svg = self
                .deploy_contract(network_id, ContractKind::RandomSVG, constructor_args, args)
                .await?;
            tracing::info!(
                address = %random_svg.address,
                "You have deployed your random NFT contract"
            );
            tracing::info!("Verify with:\n {}", random_svg.verify_command(&network.name));
            contracts.push(random_svg);
        }

        Ok(DeploymentOutcome {
            network,
            dependencies,
            contracts,
        })
    }

    /// Resolve the dependency set: local stand-ins, or registry addresses.
    async fn resolve_dependencies(
        &self,
        network: &NetworkConfig,
        contracts: &mut Vec<DeployedContractRef>,
    ) -> Result<DependencySet, DeployError> {
        if self.registry.is_local(network.id) {
            tracing::info!("Local network detected! Deploying mocks...");
            let mocks =
                mocks::provision_mocks(self.client, self.artifacts, network.id, self.confirmations)
                    .await?;
            let dependencies = mocks.dependency_set();
            contracts.push(mocks.link_token);
            contracts.push(mocks.vrf_coordinator);
            tracing::info!("Mocks deployed!");
            return Ok(dependencies);
        }

        registry_dependencies(network)
    }

    async fn deploy_contract(
        &self,
        network_id: u64,
        kind: ContractKind,
        constructor_args: Bytes,
        args: Vec<String>,
    ) -> Result<DeployedContractRef, DeployError> {
        deploy_kind(
            self.client,
            self.artifacts,
            network_id,
            kind,
            constructor_args,
            args,
            self.confirmations,
        )
        .await
    }
}

/// The production dependency addresses of `network`.
pub fn registry_dependencies(network: &NetworkConfig) -> Result<DependencySet, DeployError> {
    let required = |dependency: Dependency| {
        network
            .dependency(dependency)
            .ok_or_else(|| DeployError::MissingDependencyAddress {
                network_id: network.id,
                network: network.name.clone(),
                dependency,
            })
    };

    Ok(DependencySet {
        link_token: required(Dependency::LinkToken)?,
        vrf_coordinator: required(Dependency::VrfCoordinator)?,
        source: DependencySource::Registry,
    })
}

/// Constructor arguments of `RandomSVG(vrfCoordinator, link, keyHash, fee)`.
fn random_svg_args(deps: &DependencySet, network: &NetworkConfig) -> (Bytes, Vec<String>) {
    let encoded = (
        deps.vrf_coordinator,
        deps.link_token,
        network.key_hash,
        network.fee,
    )
        .abi_encode_params();

    let args = vec![
        deps.vrf_coordinator.to_string(),
        deps.link_token.to_string(),
        network.key_hash.to_string(),
        network.fee.to_string(),
    ];

    (encoded.into(), args)
}

/// Deploy one contract and wait for its confirmation.
pub(crate) async fn deploy_kind<C: ChainClient>(
    client: &C,
    artifacts: &ArtifactStore,
    network_id: u64,
    kind: ContractKind,
    constructor_args: Bytes,
    args: Vec<String>,
    confirmations: u64,
) -> Result<DeployedContractRef, DeployError> {
    let failed = |failure: TxFailure| DeployError::DeploymentFailed {
        network_id,
        contract: kind.to_string(),
        tx_hash: failure.tx_hash,
        source: failure.reason.into(),
    };

    let artifact = artifacts.get(kind).map_err(|reason| {
        failed(TxFailure {
            tx_hash: None,
            reason,
        })
    })?;

    tracing::info!(contract = %kind, args = ?args, "Deploying contract");

    let deployment = chain::deploy_contract(client, artifact, &constructor_args, confirmations)
        .await
        .map_err(failed)?;

    tracing::info!(
        contract = %kind,
        address = %deployment.address,
        tx_hash = %deployment.receipt.transaction_hash,
        gas_used = deployment.receipt.gas_used,
        "Contract deployed"
    );

    Ok(DeployedContractRef {
        kind,
        address: deployment.address,
        deployment: DeploymentTx {
            tx_hash: deployment.receipt.transaction_hash,
            block_number: deployment.receipt.block_number,
            gas_used: deployment.receipt.gas_used,
            constructor_args,
            args,
        },
    })
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{U256, address};

    use super::*;

    #[test]
    fn test_random_svg_args_order() {
        let registry = NetworkRegistry::builtin();
        let network = registry.resolve(4).unwrap();
        let deps = DependencySet {
            link_token: address!("01BE23585060835E02B77ef475b0Cc51aA1e0709"),
            vrf_coordinator: address!("b3dCcb4Cf7a26f6cf6B120Cf5A73875B7BBc655B"),
            source: DependencySource::Registry,
        };

        let (encoded, args) = random_svg_args(&deps, network);

        // Four static words: coordinator, link, key hash, fee.
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(&encoded[12..32], deps.vrf_coordinator.as_slice());
        assert_eq!(&encoded[44..64], deps.link_token.as_slice());
        assert_eq!(&encoded[64..96], network.key_hash.as_slice());
        assert_eq!(U256::from_be_slice(&encoded[96..128]), network.fee);

        assert_eq!(args.len(), 4);
        assert_eq!(args[3], "100000000000000000");
    }

    #[test]
    fn test_verify_command() {
        let contract = DeployedContractRef {
            kind: ContractKind::RandomSVG,
            address: Address::repeat_byte(0x11),
            deployment: DeploymentTx {
                tx_hash: B256::ZERO,
                block_number: 1,
                gas_used: 1,
                constructor_args: Bytes::new(),
                args: vec!["0xabc".to_string(), "42".to_string()],
            },
        };

        assert_eq!(
            contract.verify_command("rinkeby"),
            format!(
                "npx hardhat verify --network rinkeby {} 0xabc 42",
                Address::repeat_byte(0x11)
            )
        );
    }

    #[test]
    fn test_plan_dependencies() {
        assert!(DeploymentPlan::ALL.needs_dependencies(true));
        assert!(DeploymentPlan::ALL.needs_dependencies(false));

        let svg_only = DeploymentPlan {
            mocks: false,
            svg_nft: true,
            random_svg: false,
        };
        assert!(!svg_only.needs_dependencies(true));

        let mocks_only = DeploymentPlan {
            mocks: true,
            svg_nft: false,
            random_svg: false,
        };
        assert!(mocks_only.needs_dependencies(true));
        assert!(!mocks_only.needs_dependencies(false));
    }
}
