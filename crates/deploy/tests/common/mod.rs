//! In-memory EVM stand-in emulating the four contracts of the suite.
//!
//! Contract creations are recognized by their init code: every test artifact's
//! bytecode is the contract name, followed by the ABI-encoded constructor
//! arguments. Calls are dispatched on their selector.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_core::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_core::sol_types::{SolCall, SolEvent};
use anyhow::Result;
use mintcake_deploy::contracts::{LinkToken, RandomSVG, SVGNFT, VRFCoordinatorMock};
use mintcake_deploy::{
    ArtifactStore, ChainClient, ContractArtifact, ContractKind, LogEntry, TransactionRequest,
    TxReceipt,
};
use strum::IntoEnumIterator;

/// LINK balance of the sender account on a fresh chain.
pub const INITIAL_LINK_BALANCE: u128 = 1_000_000_000_000_000_000_000_000;

/// Route test logs through the fmt subscriber, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Artifacts whose bytecode is the contract name.
pub fn artifacts() -> ArtifactStore {
    ContractKind::iter()
        .map(|kind| {
            (
                kind,
                ContractArtifact {
                    name: kind.to_string(),
                    bytecode: Bytes::from(kind.to_string().into_bytes()),
                },
            )
        })
        .collect()
}

/// Token URI the emulated `RandomSVG` derives from a random number.
pub fn random_svg_uri(random_number: U256) -> String {
    format!("data:image/svg+xml;seed={random_number}")
}

/// Token URI the emulated `SVGNFT` stores for a minted SVG.
pub fn svg_uri(svg: &str) -> String {
    format!("data:image/svg+xml,{svg}")
}

#[derive(Debug, Clone, Default)]
struct LinkTokenState {
    balances: HashMap<Address, U256>,
}

#[derive(Debug, Clone, Default)]
struct SvgNftState {
    token_counter: U256,
    token_uris: HashMap<U256, String>,
}

#[derive(Debug, Clone)]
struct RandomSvgState {
    vrf_coordinator: Address,
    link_token: Address,
    key_hash: B256,
    fee: U256,
    token_counter: U256,
    requests: HashMap<B256, U256>,
    random_numbers: HashMap<U256, U256>,
    token_uris: HashMap<U256, String>,
}

#[derive(Debug, Clone)]
enum Contract {
    LinkToken(LinkTokenState),
    VrfCoordinator { link_token: Address },
    SvgNft(SvgNftState),
    RandomSvg(RandomSvgState),
}

#[derive(Debug, Default)]
struct ChainState {
    nonce: u64,
    block_number: u64,
    contracts: HashMap<Address, Contract>,
    receipts: HashMap<B256, TxReceipt>,
    sent: Vec<TransactionRequest>,
    confirmations: Vec<u64>,
    reverting_creations: Vec<ContractKind>,
    reverting_selectors: Vec<[u8; 4]>,
    silent_requests: bool,
}

/// Effects of a successful transaction.
struct Execution {
    contract_address: Option<Address>,
    logs: Vec<LogEntry>,
}

fn log<E: SolEvent>(address: Address, event: &E) -> LogEntry {
    let data = event.encode_log_data();
    LogEntry {
        address,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
    }
}

fn word(data: &[u8], index: usize) -> Result<&[u8], String> {
    data.get(index * 32..(index + 1) * 32)
        .ok_or_else(|| format!("constructor argument {index} missing"))
}

fn address_arg(data: &[u8], index: usize) -> Result<Address, String> {
    Ok(Address::from_slice(&word(data, index)?[12..]))
}

/// A single-node chain executing transactions instantly, one block each.
pub struct InMemoryChain {
    chain_id: u64,
    sender: Address,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            sender: Address::repeat_byte(0xde),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Install a LINK token at a fixed address, funding the sender.
    pub fn with_link_token(self, address: Address) -> Self {
        let balances = HashMap::from([(self.sender, U256::from(INITIAL_LINK_BALANCE))]);
        self.install(address, Contract::LinkToken(LinkTokenState { balances }))
    }

    /// Install a VRF coordinator at a fixed address.
    pub fn with_vrf_coordinator(self, address: Address, link_token: Address) -> Self {
        self.install(address, Contract::VrfCoordinator { link_token })
    }

    /// Make every creation of `kind` revert.
    pub fn reverting_creation_of(self, kind: ContractKind) -> Self {
        self.state.lock().unwrap().reverting_creations.push(kind);
        self
    }

    /// Make every call with this selector revert, until allowed again.
    pub fn revert_calls(&self, selector: [u8; 4]) {
        self.state.lock().unwrap().reverting_selectors.push(selector);
    }

    pub fn allow_calls(&self, selector: [u8; 4]) {
        self.state
            .lock()
            .unwrap()
            .reverting_selectors
            .retain(|s| *s != selector);
    }

    /// Have `RandomSVG.create()` succeed without emitting `requestedRandomSVG`.
    pub fn silence_random_requests(self) -> Self {
        self.state.lock().unwrap().silent_requests = true;
        self
    }

    fn install(self, address: Address, contract: Contract) -> Self {
        self.state.lock().unwrap().contracts.insert(address, contract);
        self
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Every transaction submitted so far.
    pub fn transactions(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Number of creations of `kind` submitted so far.
    pub fn creations_of(&self, kind: ContractKind) -> usize {
        let name = kind.to_string();
        self.transactions()
            .iter()
            .filter(|tx| tx.to.is_none() && tx.input.starts_with(name.as_bytes()))
            .count()
    }

    /// Confirmation counts requested while waiting for receipts.
    pub fn confirmations_requested(&self) -> Vec<u64> {
        self.state.lock().unwrap().confirmations.clone()
    }

    /// LINK balance of `owner` on the token at `link_token`.
    pub fn link_balance(&self, link_token: Address, owner: Address) -> U256 {
        match self.state.lock().unwrap().contracts.get(&link_token) {
            Some(Contract::LinkToken(token)) => {
                token.balances.get(&owner).copied().unwrap_or_default()
            }
            _ => U256::ZERO,
        }
    }
}

impl ChainState {
    fn execute(&mut self, sender: Address, tx: &TransactionRequest) -> Result<Execution, String> {
        match tx.to {
            None => self.create(sender, &tx.input),
            Some(to) => self.call(sender, to, &tx.input),
        }
    }

    fn create(&mut self, sender: Address, init_code: &[u8]) -> Result<Execution, String> {
        let kind = ContractKind::iter()
            .find(|kind| init_code.starts_with(kind.to_string().as_bytes()))
            .ok_or("unknown init code")?;
        if self.reverting_creations.contains(&kind) {
            return Err(format!("{kind} constructor reverted"));
        }

        let args = &init_code[kind.to_string().len()..];
        let contract = match kind {
            ContractKind::LinkToken => Contract::LinkToken(LinkTokenState {
                balances: HashMap::from([(sender, U256::from(INITIAL_LINK_BALANCE))]),
            }),
            ContractKind::VRFCoordinatorMock => Contract::VrfCoordinator {
                link_token: address_arg(args, 0)?,
            },
            ContractKind::SVGNFT => Contract::SvgNft(SvgNftState::default()),
            ContractKind::RandomSVG => Contract::RandomSvg(RandomSvgState {
                vrf_coordinator: address_arg(args, 0)?,
                link_token: address_arg(args, 1)?,
                key_hash: B256::from_slice(word(args, 2)?),
                fee: U256::from_be_slice(word(args, 3)?),
                token_counter: U256::ZERO,
                requests: HashMap::new(),
                random_numbers: HashMap::new(),
                token_uris: HashMap::new(),
            }),
        };

        let address = Address::from_word(keccak256(
            [sender.as_slice(), self.nonce.to_be_bytes().as_slice()].concat(),
        ));
        self.contracts.insert(address, contract);
        Ok(Execution {
            contract_address: Some(address),
            logs: vec![],
        })
    }

    fn call(&mut self, sender: Address, to: Address, input: &[u8]) -> Result<Execution, String> {
        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or("missing selector")?;
        if self.reverting_selectors.contains(&selector) {
            return Err("execution reverted".to_string());
        }
        let contract = self.contracts.get(&to).cloned().ok_or("call to an empty account")?;

        let logs = match contract {
            Contract::LinkToken(_) if selector == LinkToken::transferCall::SELECTOR => {
                let call = LinkToken::transferCall::abi_decode(input, true)
                    .map_err(|e| e.to_string())?;
                vec![self.transfer(to, sender, call.to, call.value)?]
            }
            Contract::SvgNft(_) if selector == SVGNFT::createCall::SELECTOR => {
                let call =
                    SVGNFT::createCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                let Some(Contract::SvgNft(nft)) = self.contracts.get_mut(&to) else {
                    unreachable!()
                };
                let token_id = nft.token_counter;
                let uri = svg_uri(&call.svg);
                nft.token_uris.insert(token_id, uri.clone());
                nft.token_counter += U256::from(1);
                vec![log(
                    to,
                    &SVGNFT::CreatedSVGNFT {
                        tokenId: token_id,
                        tokenURI: uri,
                    },
                )]
            }
            Contract::RandomSvg(nft) if selector == RandomSVG::createCall::SELECTOR => {
                // requestRandomness pays the fee to the coordinator first.
                let transfer = self.transfer(nft.link_token, to, nft.vrf_coordinator, nft.fee)?;
                let token_id = nft.token_counter;
                let request_id = keccak256(
                    [nft.key_hash.as_slice(), token_id.to_be_bytes::<32>().as_slice()].concat(),
                );

                let Some(Contract::RandomSvg(state)) = self.contracts.get_mut(&to) else {
                    unreachable!()
                };
                state.requests.insert(request_id, token_id);
                state.token_counter += U256::from(1);

                let mut logs = vec![
                    transfer,
                    log(
                        nft.vrf_coordinator,
                        &VRFCoordinatorMock::RandomnessRequest {
                            sender: to,
                            keyHash: nft.key_hash,
                            seed: token_id,
                        },
                    ),
                ];
                if !self.silent_requests {
                    logs.push(log(
                        to,
                        &RandomSVG::requestedRandomSVG {
                            requestId: request_id,
                            tokenId: token_id,
                        },
                    ));
                }
                logs
            }
            Contract::VrfCoordinator { .. }
                if selector == VRFCoordinatorMock::callBackWithRandomnessCall::SELECTOR => {
                let call = VRFCoordinatorMock::callBackWithRandomnessCall::abi_decode(input, true)
                    .map_err(|e| e.to_string())?;
                let consumer = self.contracts.get_mut(&call.consumerContract);
                let Some(Contract::RandomSvg(consumer)) = consumer else {
                    return Err("consumer is not a RandomSVG".to_string());
                };
                if consumer.vrf_coordinator != to {
                    return Err("only the VRF coordinator can fulfill".to_string());
                }
                let token_id = *consumer
                    .requests
                    .get(&call.requestId)
                    .ok_or("unknown request id")?;
                if consumer.random_numbers.contains_key(&token_id) {
                    return Err("request already fulfilled".to_string());
                }
                consumer.random_numbers.insert(token_id, call.randomness);

                vec![log(
                    call.consumerContract,
                    &RandomSVG::CreatedUnfinishedRandomSVG {
                        tokenId: token_id,
                        randomNumber: call.randomness,
                    },
                )]
            }
            Contract::RandomSvg(_) if selector == RandomSVG::finishMintCall::SELECTOR => {
                let call = RandomSVG::finishMintCall::abi_decode(input, true)
                    .map_err(|e| e.to_string())?;
                let Some(Contract::RandomSvg(nft)) = self.contracts.get_mut(&to) else {
                    unreachable!()
                };
                if nft.token_uris.contains_key(&call.tokenId) {
                    return Err("tokenURI is already all set!".to_string());
                }
                let random_number = *nft
                    .random_numbers
                    .get(&call.tokenId)
                    .ok_or("need to wait for Chainlink VRF")?;
                let uri = random_svg_uri(random_number);
                nft.token_uris.insert(call.tokenId, uri.clone());

                vec![log(
                    to,
                    &RandomSVG::CreatedRandomSVG {
                        tokenId: call.tokenId,
                        tokenURI: uri,
                    },
                )]
            }
            _ => return Err("unsupported call".to_string()),
        };

        Ok(Execution {
            contract_address: None,
            logs,
        })
    }

    fn transfer(
        &mut self,
        link_token: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<LogEntry, String> {
        let Some(Contract::LinkToken(token)) = self.contracts.get_mut(&link_token) else {
            return Err(format!("no LINK token at {link_token}"));
        };
        let balance = token.balances.get(&from).copied().unwrap_or_default();
        if balance < value {
            return Err("insufficient LINK balance".to_string());
        }
        token.balances.insert(from, balance - value);
        *token.balances.entry(to).or_default() += value;

        Ok(log(link_token, &LinkToken::Transfer { from, to, value }))
    }

    fn token_uri(&self, nft: Address, token_id: U256) -> Option<String> {
        match self.contracts.get(&nft)? {
            Contract::SvgNft(nft) => nft.token_uris.get(&token_id).cloned(),
            Contract::RandomSvg(nft) => nft.token_uris.get(&token_id).cloned(),
            _ => None,
        }
    }
}

impl ChainClient for InMemoryChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    fn default_sender(&self) -> Address {
        self.sender
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        let tx_hash = keccak256(state.nonce.to_be_bytes());
        state.block_number += 1;

        let receipt = match state.execute(self.sender, &tx) {
            Ok(execution) => TxReceipt {
                transaction_hash: tx_hash,
                block_number: state.block_number,
                gas_used: 21_000,
                status: true,
                contract_address: execution.contract_address,
                logs: execution.logs,
            },
            Err(_) => TxReceipt {
                transaction_hash: tx_hash,
                block_number: state.block_number,
                gas_used: 21_000,
                status: false,
                contract_address: None,
                logs: vec![],
            },
        };

        state.nonce += 1;
        state.receipts.insert(tx_hash, receipt);
        state.sent.push(tx);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256, confirmations: u64) -> Result<TxReceipt> {
        let mut state = self.state.lock().unwrap();
        state.confirmations.push(confirmations);
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown transaction {tx_hash}"))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let call = RandomSVG::tokenURICall::abi_decode(&input, true)?;
        let state = self.state.lock().unwrap();
        let uri = state
            .token_uri(to, call.tokenId)
            .ok_or_else(|| anyhow::anyhow!("execution reverted: nonexistent token"))?;
        Ok(RandomSVG::tokenURICall::abi_encode_returns(&(uri,)).into())
    }
}
