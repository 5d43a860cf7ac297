//! mintcake is a CLI tool to deploy the SVG NFT contract suite on a local or production network.

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};

use cli::{Cli, ConfigOverrides};
use mintcake_deploy::{CONFIG_FILENAME, DeployConfig, DeploymentReport};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = resolve_config(cli.config.as_deref().map(Path::new), &cli.overrides)?;

    tracing::info!(
        network = %config.network,
        rpc_url = %config.rpc_url,
        tags = ?config.tags,
        outdata = %config.outdata.display(),
        "Starting deployment..."
    );

    // Save the configuration to Mintcake.toml before deploying
    config.save_config()?;

    let report = config.deploy().await?;
    println!("{}", summary(&report));

    Ok(())
}

/// Layer the configuration: builtin defaults, then the config file, then command line flags.
fn resolve_config(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<DeployConfig> {
    let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

    if let Some(path) = config_path {
        let path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        tracing::info!(path = %path.display(), "Loading configuration file");
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Serialized::defaults(overrides))
        .extract()
        .context("Invalid deployment configuration")
}

/// Table of the deployed contracts.
fn summary(report: &DeploymentReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Contract",
        "Address",
        "Transaction",
        "Block",
        "Gas used",
    ]);

    for contract in &report.contracts {
        table.add_row(vec![
            contract.kind.to_string(),
            contract.address.to_string(),
            contract.deployment.tx_hash.to_string(),
            contract.deployment.block_number.to_string(),
            contract.deployment.gas_used.to_string(),
        ]);
    }

    if let Some(request) = &report.request {
        table.add_row(vec![
            "Random mint".to_string(),
            format!("token {}", request.token_id),
            request.activation_tx.to_string(),
            String::new(),
            request.state().to_string(),
        ]);
    }

    table
}
