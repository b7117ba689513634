//! Groth16 over BN254 for the ownership circuit: key generation, proving,
//! verification and key/proof files.

use std::io::{Read, Write};

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSystem;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{CryptoRng, RngCore};
use sha3::{Digest, Keccak256};
use tracing::{info, instrument, trace};

use crate::{public_inputs, OwnershipCircuit};
use ownership_lib::{Blueprint, CircuitConfig, OwnershipAssignment, OwnershipError, PublicValues};

/// Proving and verifying key for one blueprint and configuration.
pub struct Keys {
    pub pk: ProvingKey<Bn254>,
    pub vk: VerifyingKey<Bn254>,
}

#[instrument(skip_all)]
pub fn setup<R: RngCore + CryptoRng>(
    blueprint: &Blueprint,
    config: &CircuitConfig,
    rng: &mut R,
) -> Result<Keys, OwnershipError> {
    blueprint.validate()?;
    let circuit = OwnershipCircuit::blank(blueprint.clone(), config.clone());
    let (pk, vk) = Groth16::<Bn254>::setup(circuit, rng)?;
    info!(public_inputs = vk.gamma_abc_g1.len() - 1, "generated ownership keys");
    Ok(Keys { pk, vk })
}

/// Proves `assignment` under keys made for `blueprint`.
///
/// The witness is checked against the constraints first, so a bad witness is
/// reported as [`OwnershipError::Unsatisfiable`] instead of yielding a proof
/// that does not verify.
#[instrument(skip_all)]
pub fn prove<R: RngCore + CryptoRng>(
    pk: &ProvingKey<Bn254>,
    blueprint: &Blueprint,
    config: &CircuitConfig,
    assignment: &OwnershipAssignment,
    rng: &mut R,
) -> Result<Proof<Bn254>, OwnershipError> {
    let circuit = OwnershipCircuit::new(blueprint.clone(), config.clone(), assignment.clone());
    check_satisfied(&circuit)?;
    let proof = Groth16::<Bn254>::prove(pk, circuit, rng)?;
    info!("generated ownership proof");
    Ok(proof)
}

pub fn verify(
    vk: &VerifyingKey<Bn254>,
    public: &PublicValues,
    proof: &Proof<Bn254>,
) -> Result<bool, OwnershipError> {
    Ok(Groth16::<Bn254>::verify(vk, &public_inputs(public), proof)?)
}

/// Synthesizes `circuit` natively and reports whether its witness satisfies
/// every constraint. Which constraint failed is only traced, never returned.
pub fn check_satisfied(circuit: &OwnershipCircuit) -> Result<(), OwnershipError> {
    match first_unsatisfied(circuit)? {
        None => Ok(()),
        Some(index) => {
            trace!(constraint = %index, "unsatisfied constraint");
            Err(OwnershipError::Unsatisfiable)
        }
    }
}

/// Index of the first failing constraint, if any, as `which_is_unsatisfied`
/// reports it. Names only appear with a `ConstraintLayer` subscriber installed.
pub fn first_unsatisfied(circuit: &OwnershipCircuit) -> Result<Option<String>, OwnershipError> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.synthesize(cs.clone())?;
    Ok(cs.which_is_unsatisfied()?)
}

/// Keccak-256 of the compressed verifying key.
pub fn vk_digest(vk: &VerifyingKey<Bn254>) -> Result<[u8; 32], SerializationError> {
    let mut bytes = Vec::new();
    vk.serialize_compressed(&mut bytes)?;
    Ok(Keccak256::digest(&bytes).into())
}

pub fn write_keys<W: Write>(keys: &Keys, mut writer: W) -> Result<(), SerializationError> {
    keys.pk.serialize_compressed(&mut writer)?;
    keys.vk.serialize_compressed(&mut writer)
}

pub fn read_keys<R: Read>(mut reader: R) -> Result<Keys, SerializationError> {
    let pk = ProvingKey::deserialize_compressed(&mut reader)?;
    let vk = VerifyingKey::deserialize_compressed(&mut reader)?;
    Ok(Keys { pk, vk })
}

pub fn write_vk<W: Write>(vk: &VerifyingKey<Bn254>, writer: W) -> Result<(), SerializationError> {
    vk.serialize_compressed(writer)
}

pub fn read_vk<R: Read>(reader: R) -> Result<VerifyingKey<Bn254>, SerializationError> {
    VerifyingKey::deserialize_compressed(reader)
}

pub fn write_proof<W: Write>(proof: &Proof<Bn254>, writer: W) -> Result<(), SerializationError> {
    proof.serialize_compressed(writer)
}

pub fn read_proof<R: Read>(reader: R) -> Result<Proof<Bn254>, SerializationError> {
    Proof::deserialize_compressed(reader)
}
