use serde::{Deserialize, Serialize};

use crate::error::OwnershipError;

/// 32-byte hash type
pub type H256 = [u8; 32];

/// 20-byte Ethereum address
pub type Address = [u8; 20];

/// Number of nibbles in a keccak-derived trie key.
pub const PATH_NIBBLES: usize = 64;

/// Size of a storage slot word.
pub const SLOT_WORD_LEN: usize = 32;

/// Size of an owner address.
pub const OWNER_LEN: usize = 20;

/// Public statement of the ownership proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicValues {
    /// State root of the block the proof is made against.
    pub state_root: H256,
    /// Token identifier, big-endian.
    pub token_id: H256,
    /// Address claimed to own the token.
    pub owner: Address,
}

/// Full assignment for one proof instance: public statement plus the raw
/// account and storage proofs fetched from a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipAssignment {
    pub public: PublicValues,
    /// RLP-encoded account trie nodes, root to leaf.
    pub account_proof: Vec<Vec<u8>>,
    /// One nibble per byte, nibbles of keccak(contract).
    pub account_path: Vec<u8>,
    /// RLP-encoded storage trie nodes, root to leaf.
    pub storage_proof: Vec<Vec<u8>>,
    /// One nibble per byte, nibbles of the storage slot key.
    pub storage_path: Vec<u8>,
    /// Raw 32-byte slot word holding the owner, right-aligned.
    pub owner_bytes: Vec<u8>,
}

/// Slice-length shape a circuit is compiled against.
///
/// Keys generated for one blueprint only accept assignments of exactly the
/// same shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub account_nodes: Vec<usize>,
    pub storage_nodes: Vec<usize>,
    pub path_len: usize,
    pub owner_bytes_len: usize,
}

impl Blueprint {
    /// Shape of a concrete assignment.
    pub fn of(assignment: &OwnershipAssignment) -> Self {
        Self {
            account_nodes: assignment.account_proof.iter().map(Vec::len).collect(),
            storage_nodes: assignment.storage_proof.iter().map(Vec::len).collect(),
            path_len: assignment.account_path.len(),
            owner_bytes_len: assignment.owner_bytes.len(),
        }
    }

    /// Structural checks that do not depend on any assignment.
    pub fn validate(&self) -> Result<(), OwnershipError> {
        if self.account_nodes.is_empty() || self.storage_nodes.is_empty() {
            return Err(OwnershipError::EmptyProof);
        }
        if let Some(&len) = self
            .account_nodes
            .iter()
            .chain(self.storage_nodes.iter())
            .find(|&&len| len == 0 || len > crate::MAX_NODE_LEN)
        {
            return Err(OwnershipError::NodeTooLong { len, max: crate::MAX_NODE_LEN });
        }
        if self.path_len != PATH_NIBBLES {
            return Err(OwnershipError::shape("path length", PATH_NIBBLES, self.path_len));
        }
        if self.owner_bytes_len < SLOT_WORD_LEN {
            return Err(OwnershipError::SlotLeafTooShort(self.owner_bytes_len));
        }
        Ok(())
    }

    /// Checks that `assignment` has exactly this shape.
    pub fn check(&self, assignment: &OwnershipAssignment) -> Result<(), OwnershipError> {
        self.validate()?;
        check_nodes("account proof", &self.account_nodes, &assignment.account_proof)?;
        check_nodes("storage proof", &self.storage_nodes, &assignment.storage_proof)?;
        if assignment.account_path.len() != self.path_len {
            return Err(OwnershipError::shape(
                "account path",
                self.path_len,
                assignment.account_path.len(),
            ));
        }
        if assignment.storage_path.len() != self.path_len {
            return Err(OwnershipError::shape(
                "storage path",
                self.path_len,
                assignment.storage_path.len(),
            ));
        }
        if assignment.owner_bytes.len() != self.owner_bytes_len {
            return Err(OwnershipError::shape(
                "owner bytes",
                self.owner_bytes_len,
                assignment.owner_bytes.len(),
            ));
        }
        Ok(())
    }
}

fn check_nodes(what: &str, expected: &[usize], nodes: &[Vec<u8>]) -> Result<(), OwnershipError> {
    if expected.len() != nodes.len() {
        return Err(OwnershipError::shape(format!("{what} node count"), expected.len(), nodes.len()));
    }
    for (i, (len, node)) in expected.iter().zip(nodes).enumerate() {
        if *len != node.len() {
            return Err(OwnershipError::shape(format!("{what} node {i}"), *len, node.len()));
        }
    }
    Ok(())
}

/// Compile-time parameters baked into the proving and verifying keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Contract whose account leaf is proven.
    pub contract: Address,
    /// Storage slot of the `mapping(uint256 => address)` holding owners.
    pub slot_index: u64,
    /// Pointer element lengths decoded by hashing instead of packing.
    pub hashed_pointer_lens: Vec<usize>,
}

impl CircuitConfig {
    pub fn new(contract: Address, slot_index: u64) -> Self {
        Self {
            contract,
            slot_index,
            hashed_pointer_lens: crate::DEFAULT_HASHED_LENS.to_vec(),
        }
    }
}
