//! Lifecycle of a VRF randomness request.
//!
//! `Requested -> Fulfilled -> Finished`, with no way back. The same state machine
//! is driven by the simulated oracle on the local network and by the oracle
//! network in production.

use alloy_core::primitives::{B256, U256};
use derive_more::Display;

/// Where a randomness request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RequestState {
    /// The mint was paid for and randomness requested.
    #[display("requested")]
    Requested,
    /// The oracle delivered a random number to the NFT contract.
    #[display("fulfilled")]
    Fulfilled { random_value: U256 },
    /// The NFT was minted from the random number.
    #[display("finished")]
    Finished { random_value: U256 },
}

/// An illegal state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request {request_id} for token {token_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub request_id: B256,
    pub token_id: U256,
    pub from: RequestState,
    pub to: &'static str,
}

/// A single randomness request created by the activation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub token_id: U256,
    pub request_id: B256,
    /// Hash of the `create()` transaction that emitted the request.
    pub activation_tx: B256,
    state: RequestState,
}

impl RequestContext {
    pub fn requested(token_id: U256, request_id: B256, activation_tx: B256) -> Self {
        Self {
            token_id,
            request_id,
            activation_tx,
            state: RequestState::Requested,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Random value delivered by the oracle, once fulfilled.
    pub fn random_value(&self) -> Option<U256> {
        match self.state {
            RequestState::Requested => None,
            RequestState::Fulfilled { random_value } | RequestState::Finished { random_value } => {
                Some(random_value)
            }
        }
    }

    /// Record the oracle callback.
    pub fn fulfill(&mut self, random_value: U256) -> Result<(), TransitionError> {
        match self.state {
            RequestState::Requested => {
                self.state = RequestState::Fulfilled { random_value };
                Ok(())
            }
            from => Err(self.illegal(from, "fulfilled")),
        }
    }

    /// Record the completed mint.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        match self.state {
            RequestState::Fulfilled { random_value } => {
                self.state = RequestState::Finished { random_value };
                Ok(())
            }
            from => Err(self.illegal(from, "finished")),
        }
    }

    fn illegal(&self, from: RequestState, to: &'static str) -> TransitionError {
        TransitionError {
            request_id: self.request_id,
            token_id: self.token_id,
            from,
            to,
        }
    }
}
