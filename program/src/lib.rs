//! NFT ownership circuit over BN254.
//!
//! Proves that `owner` holds `token_id` in the `mapping(uint256 => address)`
//! at the configured slot of the configured contract, against a public
//! Ethereum state root:
//!
//! 1. the account proof leads from the state root to the contract's account
//!    leaf along `keccak(contract)`;
//! 2. the storage root is read out of that leaf;
//! 3. the storage proof leads from the storage root to the slot's leaf along
//!    `keccak(pad32(token_id) ‖ pad32(slot))`;
//! 4. the leaf stores the private slot word, whose low 20 bytes are `owner`.

pub mod backend;

use ark_bn254::Fr;
use ark_ff::{PrimeField, ToConstraintField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use tracing::{debug, info_span};

use ownership_lib::circuit::{
    bind_slot_value, extract_storage_root, storage_key_nibbles, storage_leaf_must_equal_owner,
    verify_branch, BranchInput, ByteVar, PointerRule,
};
use ownership_lib::{account_path, Blueprint, CircuitConfig, OwnershipAssignment, OwnershipError, PublicValues};

/// The ownership circuit for one blueprint and configuration.
///
/// Without an assignment it only describes the constraint system's shape,
/// which is all key generation needs.
#[derive(Clone, Debug)]
pub struct OwnershipCircuit {
    pub blueprint: Blueprint,
    pub config: CircuitConfig,
    pub assignment: Option<OwnershipAssignment>,
}

impl OwnershipCircuit {
    pub fn blank(blueprint: Blueprint, config: CircuitConfig) -> Self {
        Self { blueprint, config, assignment: None }
    }

    pub fn new(blueprint: Blueprint, config: CircuitConfig, assignment: OwnershipAssignment) -> Self {
        Self { blueprint, config, assignment: Some(assignment) }
    }

    /// Emits every constraint into `cs`. Structural problems come back as
    /// typed errors; a bad witness only shows up as an unsatisfied system.
    pub fn synthesize(&self, cs: ConstraintSystemRef<Fr>) -> Result<(), OwnershipError> {
        let _span = info_span!("ownership_circuit").entered();
        self.blueprint.validate()?;
        if let Some(assignment) = &self.assignment {
            self.blueprint.check(assignment)?;
        }
        let assignment = self.assignment.as_ref();
        let public = assignment.map(|a| &a.public);

        // Public inputs, in verifier order.
        let state_root = FpVar::new_input(ns!(cs, "state_root"), || {
            public
                .map(|p| Fr::from_be_bytes_mod_order(&p.state_root))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let token_id = FpVar::new_input(ns!(cs, "token_id"), || {
            public
                .map(|p| Fr::from_be_bytes_mod_order(&p.token_id))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let owner_input = public.map_or([0u8; 20], |p| p.owner);
        let owner = UInt8::new_input_vec(ns!(cs, "owner"), &owner_input)?
            .iter()
            .map(ByteVar::from_uint8)
            .collect::<Result<Vec<_>, _>>()?;

        // Private witness.
        let account_nodes = alloc_nodes(&cs, &self.blueprint.account_nodes, assignment.map(|a| &a.account_proof))?;
        let storage_nodes = alloc_nodes(&cs, &self.blueprint.storage_nodes, assignment.map(|a| &a.storage_proof))?;
        let account_path = alloc_path(&cs, self.blueprint.path_len, assignment.map(|a| &a.account_path))?;
        let storage_path = alloc_path(&cs, self.blueprint.path_len, assignment.map(|a| &a.storage_path))?;
        let slot_word = ByteVar::new_witness_vec(
            ns!(cs, "owner_bytes"),
            &optional_bytes(assignment.map(|a| &a.owner_bytes), self.blueprint.owner_bytes_len),
        )?;

        // Both trie keys are derived, never trusted.
        for (nibble, expected) in account_path.iter().zip(account_path_constant(&self.config)) {
            nibble.enforce_equal(&FpVar::constant(expected))?;
        }
        let storage_key = storage_key_nibbles(&token_id, self.config.slot_index)?;
        storage_key.enforce_equal(&storage_path)?;

        let rule = PointerRule::new(&self.config.hashed_pointer_lens);
        verify_branch(&BranchInput {
            nodes: &account_nodes,
            path: &account_path,
            leaf_val: None,
            root: &state_root,
            full_key: true,
            rule: &rule,
        })?;
        let account_leaf = account_nodes.last().ok_or(OwnershipError::EmptyProof)?;
        let storage_root = extract_storage_root(account_leaf)?;

        verify_branch(&BranchInput {
            nodes: &storage_nodes,
            path: &storage_path,
            leaf_val: None,
            root: &storage_root,
            full_key: true,
            rule: &rule,
        })?;
        let storage_leaf = storage_nodes.last().ok_or(OwnershipError::EmptyProof)?;
        bind_slot_value(storage_leaf, &slot_word)?;
        storage_leaf_must_equal_owner(&slot_word, &owner)?;

        debug!(
            constraints = cs.num_constraints(),
            witnesses = cs.num_witness_variables(),
            "ownership circuit synthesized"
        );
        Ok(())
    }
}

impl ConstraintSynthesizer<Fr> for OwnershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        self.synthesize(cs).map_err(SynthesisError::from)
    }
}

/// Public inputs as the verifier sees them: state root, token id, then the
/// owner bytes packed the way `UInt8::new_input_vec` packs them.
pub fn public_inputs(public: &PublicValues) -> Vec<Fr> {
    let mut inputs = vec![
        Fr::from_be_bytes_mod_order(&public.state_root),
        Fr::from_be_bytes_mod_order(&public.token_id),
    ];
    inputs.extend(ToConstraintField::<Fr>::to_field_elements(&public.owner[..]).unwrap_or_default());
    inputs
}

fn account_path_constant(config: &CircuitConfig) -> Vec<Fr> {
    account_path(&config.contract).into_iter().map(Fr::from).collect()
}

fn optional_bytes(raw: Option<&Vec<u8>>, len: usize) -> Vec<Option<u8>> {
    match raw {
        Some(raw) => raw.iter().copied().map(Some).collect(),
        None => vec![None; len],
    }
}

fn alloc_nodes(
    cs: &ConstraintSystemRef<Fr>,
    lens: &[usize],
    raw: Option<&Vec<Vec<u8>>>,
) -> Result<Vec<Vec<ByteVar<Fr>>>, SynthesisError> {
    lens.iter()
        .enumerate()
        .map(|(i, &len)| {
            let node = raw.and_then(|nodes| nodes.get(i));
            ByteVar::new_witness_vec(ns!(cs, "node"), &optional_bytes(node, len))
        })
        .collect()
}

/// Nibble witnesses, each range-checked to four bits.
fn alloc_path(
    cs: &ConstraintSystemRef<Fr>,
    len: usize,
    raw: Option<&Vec<u8>>,
) -> Result<Vec<FpVar<Fr>>, SynthesisError> {
    let bytes = ByteVar::new_witness_vec(ns!(cs, "path"), &optional_bytes(raw, len))?;
    bytes
        .into_iter()
        .map(|b| {
            for bit in &b.bits[4..] {
                bit.enforce_equal(&Boolean::FALSE)?;
            }
            Ok(b.value)
        })
        .collect()
}
