//! Minting on the plain SVG NFT and token URI queries.

use alloy_core::primitives::{Address, U256};
use alloy_core::sol_types::SolCall;
use anyhow::Context;

use crate::{
    ChainClient, DeployError,
    chain::{self, TxFailure},
    contracts::{RandomSVG, SVGNFT},
};

/// Mint `svg` on the `SVGNFT` contract, returning the new token id.
pub async fn mint_svg<C: ChainClient>(
    client: &C,
    svg_nft: Address,
    svg: &str,
    confirmations: u64,
) -> Result<U256, DeployError> {
    let failed = |failure: TxFailure| DeployError::MintFailed {
        contract: "SVGNFT".to_string(),
        tx_hash: failure.tx_hash,
        source: failure.reason.into(),
    };

    tracing::info!(contract = %svg_nft, svg_len = svg.len(), "Minting SVG");
    let call = SVGNFT::createCall {
        svg: svg.to_string(),
    };
    let receipt = chain::send_call(client, svg_nft, call.abi_encode(), None, confirmations)
        .await
        .map_err(failed)?;

    let event = receipt
        .find_event::<SVGNFT::CreatedSVGNFT>(svg_nft)
        .ok_or_else(|| DeployError::MintFailed {
            contract: "SVGNFT".to_string(),
            tx_hash: Some(receipt.transaction_hash),
            source: "CreatedSVGNFT event not found in receipt".into(),
        })?;

    tracing::info!(token_id = %event.tokenId, "You've made an NFT");
    Ok(event.tokenId)
}

/// Read `tokenURI(token_id)` from an NFT contract.
///
/// Both NFTs share the ERC-721 metadata selector.
pub async fn token_uri<C: ChainClient>(
    client: &C,
    nft: Address,
    token_id: U256,
) -> anyhow::Result<String> {
    let call = RandomSVG::tokenURICall { tokenId: token_id };
    let output = client
        .call(nft, call.abi_encode().into())
        .await
        .with_context(|| format!("Failed to call tokenURI({token_id}) on {nft}"))?;

    let decoded = RandomSVG::tokenURICall::abi_decode_returns(&output, true)
        .context("Failed to decode tokenURI output")?;
    Ok(decoded.uri)
}
