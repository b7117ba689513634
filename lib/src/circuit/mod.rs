//! R1CS gadgets verifying Merkle Patricia proofs over RLP-encoded nodes.
//!
//! Nothing in here branches on witness data. Every data-dependent choice is a
//! selector over alternatives that are all computed, every "byte at position
//! `p`" is an equality-select over all fixed positions, and every loop runs to
//! a bound fixed by the blueprint.

pub mod keccak;
pub mod node;
pub mod pointer;
pub mod rlp;
pub mod storage;
pub mod verify;

pub use node::{detect_node_type, NodeInfo};
pub use pointer::{decode_pointer, hash_ptr, hash_ptr_native, PointerRule};
pub use rlp::{decode_rlp_header, rlp_list_walk, scan_list, ListScan, ListStart, RlpElement, RlpHeader};
pub use storage::{bind_slot_value, extract_storage_root, storage_key_nibbles, storage_leaf_must_equal_owner};
pub use verify::{verify_branch, BranchInput, VerifiedBranch};

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{Namespace, SynthesisError};

/// A byte inside the circuit, carried both as little-endian bits and as its
/// field value. The value is a linear combination of the bits.
#[derive(Clone, Debug)]
pub struct ByteVar<F: PrimeField> {
    pub bits: Vec<Boolean<F>>,
    pub value: FpVar<F>,
}

impl<F: PrimeField> ByteVar<F> {
    pub fn constant(byte: u8) -> Self {
        let bits = (0..8).map(|i| Boolean::constant((byte >> i) & 1 == 1)).collect();
        Self { bits, value: FpVar::constant(F::from(byte)) }
    }

    pub fn constant_vec(bytes: &[u8]) -> Vec<Self> {
        bytes.iter().copied().map(Self::constant).collect()
    }

    pub fn from_bits_le(bits: Vec<Boolean<F>>) -> Result<Self, SynthesisError> {
        let value = Boolean::le_bits_to_fp_var(&bits)?;
        Ok(Self { bits, value })
    }

    pub fn from_uint8(byte: &UInt8<F>) -> Result<Self, SynthesisError> {
        Self::from_bits_le(byte.to_bits_le()?)
    }

    /// Allocates one range-checked witness byte per entry. `None` entries are
    /// left unassigned, as during key generation.
    pub fn new_witness_vec(
        cs: impl Into<Namespace<F>>,
        bytes: &[Option<u8>],
    ) -> Result<Vec<Self>, SynthesisError> {
        UInt8::new_witness_vec(cs, bytes)?.iter().map(Self::from_uint8).collect()
    }

    /// Recovers the bits of a field value that must fit in one byte.
    pub fn from_fp(value: &FpVar<F>) -> Result<Self, SynthesisError> {
        if let FpVar::Constant(c) = value {
            return Ok(Self::constant(low_byte(c)));
        }
        let byte = UInt8::new_witness(value.cs(), || value.value().map(|v| low_byte(&v)))?;
        let out = Self::from_uint8(&byte)?;
        out.value.enforce_equal(value)?;
        Ok(out)
    }

    pub fn high_nibble(&self) -> Result<FpVar<F>, SynthesisError> {
        Boolean::le_bits_to_fp_var(&self.bits[4..])
    }

    pub fn low_nibble(&self) -> Result<FpVar<F>, SynthesisError> {
        Boolean::le_bits_to_fp_var(&self.bits[..4])
    }

    pub fn value_u8(&self) -> Result<u8, SynthesisError> {
        self.value.value().map(|v| low_byte(&v))
    }
}

fn low_byte<F: PrimeField>(f: &F) -> u8 {
    f.into_bigint().as_ref()[0] as u8
}

pub fn fp<F: PrimeField>(v: u64) -> FpVar<F> {
    FpVar::constant(F::from(v))
}

/// `[x == 0, x == 1, …, x == n - 1]`; all false when `x >= n`.
pub fn one_hot<F: PrimeField>(x: &FpVar<F>, n: usize) -> Result<Vec<Boolean<F>>, SynthesisError> {
    (0..n).map(|j| x.is_eq(&fp(j as u64))).collect()
}

/// Number of set flags, as a field element.
pub fn count_set<F: PrimeField>(flags: &[Boolean<F>]) -> FpVar<F> {
    flags.iter().fold(FpVar::zero(), |acc, b| acc + FpVar::from(b.clone()))
}

/// Requires exactly one of `flags` to be set.
pub fn enforce_exactly_one<F: PrimeField>(flags: &[Boolean<F>]) -> Result<(), SynthesisError> {
    count_set(flags).enforce_equal(&FpVar::one())
}

/// `Σ sel[j] · values[j]`. Zero when nothing is selected.
pub fn select_by<F: PrimeField>(sel: &[Boolean<F>], values: &[FpVar<F>]) -> FpVar<F> {
    sel.iter()
        .zip(values)
        .fold(FpVar::zero(), |acc, (s, v)| acc + FpVar::from(s.clone()) * v)
}

/// Byte value at a fixed index, zero past the end.
pub fn byte_at<F: PrimeField>(bytes: &[ByteVar<F>], i: usize) -> FpVar<F> {
    bytes.get(i).map_or_else(FpVar::zero, |b| b.value.clone())
}

/// `width` bytes starting at the position selected by the one-hot `pos`.
/// Reads past the end of `bytes` yield zero.
pub fn read_window<F: PrimeField>(
    bytes: &[ByteVar<F>],
    pos: &[Boolean<F>],
    width: usize,
) -> Vec<FpVar<F>> {
    (0..width)
        .map(|k| {
            let column: Vec<FpVar<F>> = (0..pos.len()).map(|j| byte_at(bytes, j + k)).collect();
            select_by(pos, &column)
        })
        .collect()
}

/// Big-endian packing into one field element, reduced mod p.
pub fn pack_be<F: PrimeField>(bytes: &[FpVar<F>]) -> FpVar<F> {
    let base = F::from(256u64);
    bytes.iter().fold(FpVar::zero(), |acc, b| acc * base + b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_from_fp_recovers_bits() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let v = FpVar::new_witness(cs.clone(), || Ok(Fr::from(0xa5u64))).unwrap();
        let byte = ByteVar::from_fp(&v).unwrap();
        assert_eq!(byte.value_u8().unwrap(), 0xa5);
        assert_eq!(byte.high_nibble().unwrap().value().unwrap(), Fr::from(0xau64));
        assert_eq!(byte.low_nibble().unwrap().value().unwrap(), Fr::from(0x5u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_read_window_zero_pads() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let bytes = ByteVar::new_witness_vec(cs.clone(), &[Some(1), Some(2), Some(3)]).unwrap();
        let pos = FpVar::new_witness(cs.clone(), || Ok(Fr::from(2u64))).unwrap();
        let window = read_window(&bytes, &one_hot(&pos, 3).unwrap(), 3);
        let values: Vec<Fr> = window.iter().map(|w| w.value().unwrap()).collect();
        assert_eq!(values, vec![Fr::from(3u64), Fr::from(0u64), Fr::from(0u64)]);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_pack_be() {
        let bytes: Vec<FpVar<Fr>> = [0x01u64, 0x02, 0x03].iter().map(|&b| fp(b)).collect();
        assert_eq!(pack_be(&bytes).value().unwrap(), Fr::from(0x010203u64));
    }

    #[test]
    fn test_exactly_one_rejects_out_of_range() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let x = FpVar::new_witness(cs.clone(), || Ok(Fr::from(7u64))).unwrap();
        enforce_exactly_one(&one_hot(&x, 4).unwrap()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
