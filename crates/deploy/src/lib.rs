//! mintcake-deploy - Deployment library for the SVG NFT contract suite.
//!
//! This crate deploys `LinkToken`, `VRFCoordinatorMock`, `SVGNFT` and `RandomSVG`
//! on a target network, provisioning local stand-ins for the randomness oracle's
//! dependencies and simulating its callback on the local development network.

mod activation;
pub use activation::{CREATE_GAS_LIMIT, activate_random_mint};

mod artifacts;
pub use artifacts::{ArtifactStore, ContractArtifact};

pub mod chain;
pub use chain::{ChainClient, LogEntry, TransactionRequest, TxReceipt};

pub mod contracts;
pub use contracts::ContractKind;

mod deployer;
pub use deployer::{CONFIG_FILENAME, DeployConfig, DeployTag, DeploymentReport, Orchestrator};

mod error;
pub use error::{BoxError, DeployError};

mod mint;
pub use mint::{mint_svg, token_uri};

mod mocks;
pub use mocks::{MockSet, provision_mocks};

pub mod network;
pub use network::{Dependency, LOCAL_NETWORK_ID, NetworkConfig, NetworkRegistry};

pub mod oracle;
pub use oracle::{
    CallbackSimulator, ExternalOracle, RandomnessOracle, SimulatedFulfillment, SimulatedOracle,
};

mod record;
pub use record::{DeploymentConfigHash, DeploymentRecord};

mod request;
pub use request::{RequestContext, RequestState, TransitionError};

pub mod rpc;
pub use rpc::JsonRpcClient;

mod sequencer;
pub use sequencer::{
    DependencySet, DependencySource, DeployedContractRef, DeploymentOutcome, DeploymentPlan,
    DeploymentSequencer, DeploymentTx, registry_dependencies,
};
