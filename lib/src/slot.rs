//! Trie keys of the proven account and storage slot.

use crate::path::to_nibbles;
use crate::rlp_encoding::keccak256;
use crate::types::{Address, H256};

/// `keccak256(pad32(token_id) ‖ pad32(slot_index))`, the storage key of
/// `mapping(uint256 => address)` at `slot_index`.
pub fn slot_key(token_id: &H256, slot_index: u64) -> H256 {
    keccak256(&slot_preimage(token_id, slot_index))
}

/// The 64-byte preimage hashed by [`slot_key`].
pub fn slot_preimage(token_id: &H256, slot_index: u64) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(token_id);
    buf[56..].copy_from_slice(&slot_index.to_be_bytes());
    buf
}

/// Account trie path: one nibble per byte of `keccak256(contract)`.
pub fn account_path(contract: &Address) -> Vec<u8> {
    to_nibbles(&keccak256(contract))
}

/// Storage trie path: one nibble per byte of [`slot_key`].
pub fn storage_path(token_id: &H256, slot_index: u64) -> Vec<u8> {
    to_nibbles(&slot_key(token_id, slot_index))
}

/// Left-pads a `u64` token id to a big-endian word.
pub fn token_id_word(token_id: u64) -> H256 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&token_id.to_be_bytes());
    word
}
