//! Interfaces of the deployed contracts.

use alloy_core::sol;
use serde::{Deserialize, Serialize};

/// The contracts this tool knows how to deploy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum ContractKind {
    /// ERC-677 LINK token stand-in.
    LinkToken,
    /// VRF coordinator stand-in that lets the deployer answer randomness requests.
    VRFCoordinatorMock,
    /// NFT storing a caller-supplied SVG.
    SVGNFT,
    /// NFT generating its SVG from a VRF random number.
    RandomSVG,
}

impl ContractKind {
    /// Whether the contract only exists on the local network.
    pub fn is_mock(&self) -> bool {
        matches!(self, Self::LinkToken | Self::VRFCoordinatorMock)
    }
}

sol! {
    interface LinkToken {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function transfer(address to, uint256 value) external returns (bool success);
        function balanceOf(address owner) external view returns (uint256 balance);
    }

    interface VRFCoordinatorMock {
        event RandomnessRequest(address indexed sender, bytes32 indexed keyHash, uint256 indexed seed);

        function callBackWithRandomness(bytes32 requestId, uint256 randomness, address consumerContract) external;
    }

    interface SVGNFT {
        event CreatedSVGNFT(uint256 indexed tokenId, string tokenURI);

        function create(string svg) external;
        function tokenURI(uint256 tokenId) external view returns (string uri);
    }

    interface RandomSVG {
        event requestedRandomSVG(bytes32 indexed requestId, uint256 indexed tokenId);
        event CreatedUnfinishedRandomSVG(uint256 indexed tokenId, uint256 randomNumber);
        event CreatedRandomSVG(uint256 indexed tokenId, string tokenURI);

        function create() external returns (bytes32 requestId);
        function finishMint(uint256 tokenId) external;
        function tokenURI(uint256 tokenId) external view returns (string uri);
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy_core::sol_types::{SolCall, SolEvent};

    use super::*;

    #[test]
    fn test_kind_names_match_artifacts() {
        assert_eq!(ContractKind::VRFCoordinatorMock.to_string(), "VRFCoordinatorMock");
        assert_eq!(ContractKind::from_str("RandomSVG").unwrap(), ContractKind::RandomSVG);
        assert!(ContractKind::LinkToken.is_mock());
        assert!(!ContractKind::SVGNFT.is_mock());
    }

    #[test]
    fn test_selectors() {
        assert_eq!(RandomSVG::createCall::SIGNATURE, "create()");
        assert_eq!(
            VRFCoordinatorMock::callBackWithRandomnessCall::SIGNATURE,
            "callBackWithRandomness(bytes32,uint256,address)"
        );
        assert_eq!(LinkToken::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            RandomSVG::requestedRandomSVG::SIGNATURE,
            "requestedRandomSVG(bytes32,uint256)"
        );
    }
}
