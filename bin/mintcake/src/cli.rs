use clap::Parser;
use mintcake_deploy::DeployTag;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "mintcake")]
#[command(
    author,
    version,
    about = "Deploy the SVG NFT contract suite, with local VRF mocks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "MINTCAKE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to an existing Mintcake.toml configuration file (or its directory) to load.
    ///
    /// Flags given on the command line take precedence over the file.
    #[arg(long, alias = "conf", env = "MINTCAKE_CONFIG")]
    pub config: Option<String>,

    #[clap(flatten)]
    pub overrides: ConfigOverrides,
}

/// Settings overriding the configuration file. Unset flags keep the file's value.
#[derive(Debug, Clone, Default, Parser, Serialize)]
pub struct ConfigOverrides {
    /// The target network, by name or chain id.
    #[arg(short, long, env = "MINTCAKE_NETWORK")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// The JSON-RPC endpoint of the target network.
    #[arg(long, alias = "rpc", env = "MINTCAKE_RPC_URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,

    /// The deployment tags to run: all, mocks, svg, rsvg.
    #[arg(short, long, value_delimiter = ',', env = "MINTCAKE_TAGS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<DeployTag>>,

    /// A network registry TOML file replacing the builtin networks.
    #[arg(long, env = "MINTCAKE_NETWORKS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<String>,

    /// The directory holding the compiled contract artifacts.
    #[arg(long, env = "MINTCAKE_ARTIFACTS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<String>,

    /// The number of confirmations to wait for after each transaction.
    #[arg(long, env = "MINTCAKE_CONFIRMATIONS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,

    /// The random value delivered by the simulated oracle on the local network.
    #[arg(long, env = "MINTCAKE_RANDOM_VALUE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_value: Option<String>,

    /// An SVG file to mint on the plain SVG NFT.
    #[arg(long, env = "MINTCAKE_SVG")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,

    /// The path to the output data directory.
    #[arg(long, env = "MINTCAKE_OUTDATA")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdata: Option<String>,

    /// Redeploy all contracts.
    /// If not provided and a matching deployment was recorded, the contracts will not be
    /// redeployed.
    #[arg(long, env = "MINTCAKE_REDEPLOY")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub redeploy: bool,
}
