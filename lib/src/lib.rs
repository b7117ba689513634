use alloy_primitives::{Address as SolAddress, FixedBytes, U256};
use alloy_sol_types::{sol, SolValue};

pub mod circuit;
pub mod error;
pub mod path;
pub mod rlp_encoding;
pub mod slot;
pub mod types;

#[cfg(feature = "std")]
pub mod builder;

pub use error::OwnershipError;
pub use path::*;
pub use rlp_encoding::*;
pub use slot::*;
pub use types::*;

#[cfg(feature = "std")]
pub use builder::*;

/// Longest node the RLP scans cover. Larger nodes are a structural error.
pub const MAX_NODE_LEN: usize = 1024;

/// Pointer element lengths that are hashed rather than packed by default.
pub const DEFAULT_HASHED_LENS: [usize; 2] = [33, 64];

sol! {
    /// The public values encoded as a struct for Solidity verification.
    struct OwnershipPublicValues {
        bytes32 stateRoot;
        uint256 tokenId;
        address owner;
    }
}

impl PublicValues {
    /// ABI encoding of the public statement, for on-chain consumers.
    pub fn abi_encode(&self) -> Vec<u8> {
        OwnershipPublicValues {
            stateRoot: FixedBytes(self.state_root),
            tokenId: U256::from_be_bytes(self.token_id),
            owner: SolAddress::from(self.owner),
        }
        .abi_encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_values_abi_layout() {
        let public = PublicValues { state_root: [0xab; 32], token_id: [0; 32], owner: [0x11; 20] };
        let encoded = public.abi_encode();
        assert_eq!(encoded.len(), 96);
        assert_eq!(&encoded[..32], &[0xab; 32]);
        assert_eq!(&encoded[64 + 12..], &[0x11; 20]);
    }
}
