//! Local stand-ins for the LINK token and the VRF coordinator.

use alloy_core::primitives::Bytes;
use alloy_core::sol_types::SolValue;

use crate::{
    ArtifactStore, ChainClient, ContractKind, DeployError,
    sequencer::{DependencySet, DependencySource, DeployedContractRef, deploy_kind},
};

/// The two stand-ins deployed on the local network.
#[derive(Debug, Clone)]
pub struct MockSet {
    pub link_token: DeployedContractRef,
    pub vrf_coordinator: DeployedContractRef,
}

impl MockSet {
    pub fn dependency_set(&self) -> DependencySet {
        DependencySet {
            link_token: self.link_token.address,
            vrf_coordinator: self.vrf_coordinator.address,
            source: DependencySource::Mocks,
        }
    }
}

/// Deploy `LinkToken`, then `VRFCoordinatorMock(linkToken)`.
///
/// Only meaningful on the local network. A failure of either deployment aborts
/// the run; a token deployed before a failed coordinator is left behind.
pub async fn provision_mocks<C: ChainClient>(
    client: &C,
    artifacts: &ArtifactStore,
    network_id: u64,
    confirmations: u64,
) -> Result<MockSet, DeployError> {
    let link_token = deploy_kind(
        client,
        artifacts,
        network_id,
        ContractKind::LinkToken,
        Bytes::new(),
        vec![],
        confirmations,
    )
    .await?;

    let vrf_coordinator = deploy_kind(
        client,
        artifacts,
        network_id,
        ContractKind::VRFCoordinatorMock,
        link_token.address.abi_encode().into(),
        vec![link_token.address.to_string()],
        confirmations,
    )
    .await?;

    Ok(MockSet {
        link_token,
        vrf_coordinator,
    })
}
