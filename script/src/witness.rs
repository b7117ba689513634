use alloy::primitives::{Address, Bytes, B256, U256};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ownership_lib::{account_path, storage_path, OwnershipAssignment, PublicValues, OWNER_LEN, SLOT_WORD_LEN};

/// Everything an `eth_getProof` call plus the block header yield for one
/// token, as written by the `fetch` binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub block_number: u64,
    pub state_root: B256,
    pub contract: Address,
    pub token_id: U256,
    pub slot_index: u64,
    pub account_proof: Vec<Bytes>,
    /// Storage root reported by the node, informational only.
    pub storage_hash: B256,
    pub storage_proof: Vec<Bytes>,
    pub slot_value: U256,
}

impl ProofBundle {
    /// Owner address held in the slot word.
    pub fn owner(&self) -> Address {
        Address::from_word(B256::from(self.slot_value))
    }
}

/// Turns a fetched bundle into a circuit assignment claiming that `claimed`
/// owns the token, or the slot's current holder when no claim is given.
///
/// The circuit is the only judge of the proof nodes and of the claim. The one
/// native check here is that the slot word looks like an address at all.
pub fn build_assignment(bundle: &ProofBundle, claimed: Option<Address>) -> Result<OwnershipAssignment> {
    let word = bundle.slot_value.to_be_bytes::<SLOT_WORD_LEN>();
    if word[..SLOT_WORD_LEN - OWNER_LEN].iter().any(|&b| b != 0) {
        bail!("slot value {:#x} does not hold an address", bundle.slot_value);
    }
    let owner = claimed.unwrap_or_else(|| bundle.owner());
    if owner != bundle.owner() {
        warn!(claimed = %owner, holder = %bundle.owner(), "claimed owner is not the slot holder");
    }
    let token_id = bundle.token_id.to_be_bytes::<32>();
    let contract = bundle.contract.into_array();

    let storage_proof: Vec<Vec<u8>> = bundle.storage_proof.iter().map(|b| b.to_vec()).collect();
    if let Some(leaf) = storage_proof.last() {
        let stored = stored_value(&word);
        if !leaf.ends_with(&stored) {
            warn!(value = %hex::encode(&stored), "storage leaf does not end with the reported slot value");
        }
    }

    Ok(OwnershipAssignment {
        public: PublicValues { state_root: bundle.state_root.0, token_id, owner: owner.into_array() },
        account_proof: bundle.account_proof.iter().map(|b| b.to_vec()).collect(),
        account_path: account_path(&contract),
        storage_proof,
        storage_path: storage_path(&token_id, bundle.slot_index),
        owner_bytes: word.to_vec(),
    })
}

/// Bytes a storage leaf ends with for `word`: the RLP string of the word with
/// leading zeros stripped.
pub fn stored_value(word: &[u8; SLOT_WORD_LEN]) -> Vec<u8> {
    let trimmed: Vec<u8> = word.iter().copied().skip_while(|&b| b == 0).collect();
    rlp::encode(&trimmed).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ownership_lib::{
        encode_account, encode_uint, keccak256, slot_key, token_id_word, Blueprint, CircuitConfig, OwnershipError,
        TrieBuilder,
    };
    use ownership_program::backend::check_satisfied;
    use ownership_program::OwnershipCircuit;

    const CONTRACT: [u8; 20] = [0xbc; 20];

    /// Token 42 next to one other token, in a contract next to one other
    /// account.
    fn bundle(slot_value: U256) -> ProofBundle {
        let token = token_id_word(42);
        let word = slot_value.to_be_bytes::<32>();
        let mut storage = TrieBuilder::new();
        storage.insert(&slot_key(&token, 0), &encode_uint(&word));
        storage.insert(&slot_key(&token_id_word(7), 0), &encode_uint(&[0x33; 20]));
        let mut state = TrieBuilder::new();
        state.insert(&keccak256(&CONTRACT), &encode_account(0, &[], &storage.root(), &keccak256(b"")));
        state.insert(&keccak256(&[0x01; 20]), &encode_account(3, &[], &keccak256(b""), &keccak256(b"")));

        ProofBundle {
            block_number: 19_000_000,
            state_root: B256::from(state.root()),
            contract: Address::from(CONTRACT),
            token_id: U256::from(42u64),
            slot_index: 0,
            account_proof: proof_bytes(state.get_proof(&keccak256(&CONTRACT)).unwrap()),
            storage_hash: B256::from(storage.root()),
            storage_proof: proof_bytes(storage.get_proof(&slot_key(&token, 0)).unwrap()),
            slot_value,
        }
    }

    fn proof_bytes(nodes: Vec<Vec<u8>>) -> Vec<Bytes> {
        nodes.into_iter().map(Bytes::from).collect()
    }

    fn check(assignment: &OwnershipAssignment) -> Result<(), OwnershipError> {
        let config = CircuitConfig { hashed_pointer_lens: Vec::new(), ..CircuitConfig::new(CONTRACT, 0) };
        check_satisfied(&OwnershipCircuit::new(Blueprint::of(assignment), config, assignment.clone()))
    }

    #[test]
    fn test_build_assignment_from_bundle() {
        let owner = Address::from([0x7a; 20]);
        let b = bundle(U256::from_be_slice(owner.as_slice()));
        let assignment = build_assignment(&b, None).unwrap();
        assert_eq!(assignment.public.owner, [0x7a; 20]);
        assert_eq!(assignment.public.token_id, token_id_word(42));
        assert_eq!(assignment.account_path, account_path(&CONTRACT));
        assert_eq!(assignment.storage_path, storage_path(&token_id_word(42), 0));
        assert_eq!(&assignment.owner_bytes[12..], owner.as_slice());
        assert_eq!(assignment.storage_proof.len(), b.storage_proof.len());
        assert!(assignment.storage_proof.len() >= 2);
    }

    #[test]
    fn test_slot_value_must_be_an_address() {
        let b = bundle(U256::MAX);
        assert!(build_assignment(&b, None).is_err());
    }

    #[test]
    fn test_claimed_owner_must_hold_the_slot() {
        let holder = Address::from([0x7a; 20]);
        let b = bundle(U256::from_be_slice(holder.as_slice()));

        let own = build_assignment(&b, Some(holder)).unwrap();
        assert_eq!(own.public.owner, [0x7a; 20]);
        check(&own).unwrap();

        let foreign = build_assignment(&b, Some(Address::from([0x33; 20]))).unwrap();
        assert_eq!(foreign.public.owner, [0x33; 20]);
        assert_eq!(&foreign.owner_bytes[12..], holder.as_slice());
        assert!(matches!(check(&foreign), Err(OwnershipError::Unsatisfiable)));
    }

    #[test]
    fn test_stored_value_matches_leaf_encoding() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0x7a; 20]);
        assert_eq!(stored_value(&word), encode_uint(&word));
        word = [0u8; 32];
        word[31] = 0x05;
        assert_eq!(stored_value(&word), vec![0x05]);
    }

    #[test]
    fn test_bundle_json_round_trip() {
        let b = bundle(U256::from(7u64));
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"stateRoot\""));
        assert_eq!(serde_json::from_str::<ProofBundle>(&json).unwrap(), b);
    }
}
