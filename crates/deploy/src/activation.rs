//! Funding and activation of the random NFT: pay the VRF fee, then request a mint.

use alloy_core::primitives::{Address, U256};
use alloy_core::sol_types::SolCall;

use crate::{
    ChainClient, DeployError, RequestContext,
    chain::{self, TxFailure},
    contracts::{LinkToken, RandomSVG},
};

/// Gas allowance of `RandomSVG.create()`.
pub const CREATE_GAS_LIMIT: u64 = 300_000;

/// Fund `random_svg` with `fee` LINK and request a random mint.
///
/// Returns the request in the `Requested` state, with the token and request ids
/// read from the `requestedRandomSVG` event.
pub async fn activate_random_mint<C: ChainClient>(
    client: &C,
    link_token: Address,
    random_svg: Address,
    fee: U256,
    confirmations: u64,
) -> Result<RequestContext, DeployError> {
    let failed = |step: &'static str| {
        move |failure: TxFailure| DeployError::ActivationFailed {
            step,
            tx_hash: failure.tx_hash,
            source: failure.reason.into(),
        }
    };

    tracing::info!(link_token = %link_token, to = %random_svg, fee = %fee, "Funding with LINK");
    let transfer = LinkToken::transferCall {
        to: random_svg,
        value: fee,
    };
    chain::send_call(client, link_token, transfer.abi_encode(), None, confirmations)
        .await
        .map_err(failed("fund"))?;

    let receipt = chain::send_call(
        client,
        random_svg,
        RandomSVG::createCall {}.abi_encode(),
        Some(CREATE_GAS_LIMIT),
        confirmations,
    )
    .await
    .map_err(failed("create"))?;

    let event = receipt
        .find_event::<RandomSVG::requestedRandomSVG>(random_svg)
        .ok_or_else(|| DeployError::ActivationFailed {
            step: "create",
            tx_hash: Some(receipt.transaction_hash),
            source: "requestedRandomSVG event not found in receipt".into(),
        })?;

    tracing::info!(
        token_id = %event.tokenId,
        request_id = %event.requestId,
        tx_hash = %receipt.transaction_hash,
        "You've made your NFT! Waiting for the VRF response..."
    );

    Ok(RequestContext::requested(
        event.tokenId,
        event.requestId,
        receipt.transaction_hash,
    ))
}
