//! Delivery of VRF randomness.
//!
//! A randomness request has two entry points: the request itself (see
//! [`activate_random_mint`](crate::activate_random_mint)) and the fulfillment,
//! delivered later by an oracle. In production the oracle network answers on its
//! own schedule. On the local network the [`SimulatedOracle`] answers in-process
//! right away through the coordinator mock, then completes the mint.

use std::future::Future;

use alloy_core::primitives::{Address, B256, U256};
use alloy_core::sol_types::SolCall;

use crate::{
    ChainClient, DeployError, RequestContext,
    chain::{self, TxFailure, TxReceipt},
    contracts::{RandomSVG, VRFCoordinatorMock},
    request::TransitionError,
};

/// Gas allowance of `RandomSVG.finishMint()`; the SVG is generated on-chain.
pub const FINISH_MINT_GAS_LIMIT: u64 = 2_000_000;

/// Random value used by the local simulation unless configured otherwise.
pub const DEFAULT_RANDOM_VALUE: u64 = 77777;

/// Something that answers randomness requests.
pub trait RandomnessOracle: Send + Sync {
    /// Called once a request has been submitted. Advances the request as far as
    /// this oracle can drive it.
    fn on_randomness_requested(
        &self,
        request: &mut RequestContext,
    ) -> impl Future<Output = Result<(), DeployError>> + Send;
}

/// The oracle network of a production chain. Fulfillment and mint completion
/// happen out of band, so the request stays `Requested`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalOracle;

impl RandomnessOracle for ExternalOracle {
    async fn on_randomness_requested(
        &self,
        request: &mut RequestContext,
    ) -> Result<(), DeployError> {
        tracing::info!(
            token_id = %request.token_id,
            request_id = %request.request_id,
            "Let's wait for the Chainlink node to respond. Call finishMint once the randomness is delivered."
        );
        Ok(())
    }
}

/// Answers requests immediately through the local coordinator mock.
pub struct SimulatedOracle<'a, C> {
    simulator: CallbackSimulator<'a, C>,
    vrf_coordinator: Address,
    random_svg: Address,
    random_value: U256,
}

impl<'a, C: ChainClient> SimulatedOracle<'a, C> {
    pub fn new(
        simulator: CallbackSimulator<'a, C>,
        vrf_coordinator: Address,
        random_svg: Address,
        random_value: U256,
    ) -> Self {
        Self {
            simulator,
            vrf_coordinator,
            random_svg,
            random_value,
        }
    }
}

impl<C: ChainClient> RandomnessOracle for SimulatedOracle<'_, C> {
    async fn on_randomness_requested(
        &self,
        request: &mut RequestContext,
    ) -> Result<(), DeployError> {
        let fulfillment = self
            .simulator
            .simulate_callback(
                request.request_id,
                self.random_value,
                self.vrf_coordinator,
                self.random_svg,
                request.token_id,
            )
            .await?;

        request.fulfill(self.random_value).map_err(|e| {
            transition_failed("callback", fulfillment.callback.transaction_hash, e)
        })?;
        request.finish().map_err(|e| {
            transition_failed("finishMint", fulfillment.finish_mint.transaction_hash, e)
        })?;

        Ok(())
    }
}

fn transition_failed(step: &'static str, tx_hash: B256, err: TransitionError) -> DeployError {
    DeployError::CallbackSimulationFailed {
        step,
        tx_hash: Some(tx_hash),
        source: Box::new(err),
    }
}

/// Receipts of a simulated fulfillment.
#[derive(Debug, Clone)]
pub struct SimulatedFulfillment {
    /// The coordinator mock forwarding the random number.
    pub callback: TxReceipt,
    /// The mint completed from that number.
    pub finish_mint: TxReceipt,
}

/// Plays the part of the oracle network on the local chain.
pub struct CallbackSimulator<'a, C> {
    client: &'a C,
    confirmations: u64,
}

impl<'a, C: ChainClient> CallbackSimulator<'a, C> {
    pub fn new(client: &'a C, confirmations: u64) -> Self {
        Self {
            client,
            confirmations,
        }
    }

    /// Answer `request_id` with `random_value`, then complete the mint of `token_id`.
    pub async fn simulate_callback(
        &self,
        request_id: B256,
        random_value: U256,
        vrf_coordinator: Address,
        random_svg: Address,
        token_id: U256,
    ) -> Result<SimulatedFulfillment, DeployError> {
        let callback = self
            .callback(request_id, random_value, vrf_coordinator, random_svg)
            .await?;

        tracing::info!("Now let's finish the mint!");

        let finish_mint = self.finish_mint(random_svg, token_id).await?;
        Ok(SimulatedFulfillment {
            callback,
            finish_mint,
        })
    }

    /// Have the coordinator mock forward `random_value` to `consumer`.
    pub async fn callback(
        &self,
        request_id: B256,
        random_value: U256,
        vrf_coordinator: Address,
        consumer: Address,
    ) -> Result<TxReceipt, DeployError> {
        tracing::info!(
            request_id = %request_id,
            random_value = %random_value,
            coordinator = %vrf_coordinator,
            "Simulating VRF callback"
        );

        let call = VRFCoordinatorMock::callBackWithRandomnessCall {
            requestId: request_id,
            randomness: random_value,
            consumerContract: consumer,
        };
        chain::send_call(
            self.client,
            vrf_coordinator,
            call.abi_encode(),
            None,
            self.confirmations,
        )
        .await
        .map_err(simulation_failed("callback"))
    }

    /// Complete the two-phase mint once the random number was delivered.
    pub async fn finish_mint(
        &self,
        random_svg: Address,
        token_id: U256,
    ) -> Result<TxReceipt, DeployError> {
        let call = RandomSVG::finishMintCall { tokenId: token_id };
        chain::send_call(
            self.client,
            random_svg,
            call.abi_encode(),
            Some(FINISH_MINT_GAS_LIMIT),
            self.confirmations,
        )
        .await
        .map_err(simulation_failed("finishMint"))
    }
}

fn simulation_failed(step: &'static str) -> impl Fn(TxFailure) -> DeployError {
    move |failure| DeployError::CallbackSimulationFailed {
        step,
        tx_hash: failure.tx_hash,
        source: failure.reason.into(),
    }
}
