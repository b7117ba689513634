//! Ethereum's pointer rule and the decoding of pointers stored in a parent.
//!
//! A node encoding shorter than 32 bytes stands for itself; anything longer
//! is referred to by its Keccak-256 digest. Both forms are compared as one
//! big-endian packed field element.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use super::keccak::keccak256;
use super::rlp::decode_rlp_header;
use super::{count_set, enforce_exactly_one, one_hot, pack_be, read_window, select_by, ByteVar};
use crate::rlp_encoding::keccak256 as keccak256_native;

/// Payload lengths of a pointer element that are hashed before comparison.
///
/// Payloads of 32 bytes or less are always packed as they are: a 32-byte
/// payload is already the child's digest. Every hashed length costs one
/// Keccak instance per trie level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointerRule {
    hashed_lens: Vec<usize>,
}

impl PointerRule {
    pub fn new(hashed_lens: &[usize]) -> Self {
        let mut hashed_lens: Vec<usize> = hashed_lens.iter().copied().filter(|&l| l > 32).collect();
        hashed_lens.sort_unstable();
        hashed_lens.dedup();
        Self { hashed_lens }
    }

    /// Accepts only packed pointers, the form every canonical trie uses.
    pub fn packing_only() -> Self {
        Self { hashed_lens: Vec::new() }
    }

    pub fn hashed_lens(&self) -> &[usize] {
        &self.hashed_lens
    }

    fn max_payload(&self) -> usize {
        self.hashed_lens.last().copied().unwrap_or(32).max(32)
    }
}

impl Default for PointerRule {
    fn default() -> Self {
        Self::new(&crate::DEFAULT_HASHED_LENS)
    }
}

/// `hashPtr`: packs `raw` when shorter than 32 bytes, else its Keccak-256.
pub fn hash_ptr<F: PrimeField>(raw: &[ByteVar<F>]) -> Result<FpVar<F>, SynthesisError> {
    let bytes = if raw.len() < 32 { raw.to_vec() } else { keccak256(raw)? };
    let values: Vec<FpVar<F>> = bytes.iter().map(|b| b.value.clone()).collect();
    Ok(pack_be(&values))
}

/// Native counterpart of [`hash_ptr`].
pub fn hash_ptr_native<F: PrimeField>(raw: &[u8]) -> F {
    if raw.len() < 32 {
        F::from_be_bytes_mod_order(raw)
    } else {
        F::from_be_bytes_mod_order(&keccak256_native(raw))
    }
}

/// Value of the pointer element whose header sits at `header_pos`.
///
/// A string payload of at most 32 bytes is packed big-endian; payloads whose
/// length is in the rule's hashed set are packed after Keccak-256. A short
/// list is an embedded child node and packs as a whole, header included.
/// Any other element leaves the circuit unsatisfiable.
pub fn pointer_value<F: PrimeField>(
    node: &[ByteVar<F>],
    header_pos: &FpVar<F>,
    rule: &PointerRule,
) -> Result<FpVar<F>, SynthesisError> {
    let max = rule.max_payload();
    let sel = one_hot(header_pos, node.len())?;
    enforce_exactly_one(&sel)?;
    let window = read_window(node, &sel, max + 2);

    let prefix = ByteVar::from_fp(&window[0])?;
    let header = decode_rlp_header(&prefix, &window[1..9])?;
    let offset = one_hot(&header.offset, 3)?;
    enforce_exactly_one(&offset)?;
    header.is_list.and(&offset[1].not())?.enforce_equal(&Boolean::FALSE)?;
    let payload: Vec<FpVar<F>> =
        (0..max).map(|k| select_by(&offset, &window[k..k + 3])).collect();
    let len_is = one_hot(&header.length, max + 1)?;

    // Running big-endian packings; entry `l` covers the first `l` bytes.
    let prefixes = |bytes: &[FpVar<F>]| -> Vec<FpVar<F>> {
        let mut acc = FpVar::zero();
        let mut out = vec![acc.clone()];
        for b in bytes {
            acc = acc * F::from(256u64) + b;
            out.push(acc.clone());
        }
        out
    };

    let packed = prefixes(&payload[..32]);
    let mut string_value = select_by(&len_is[..=32], &packed);
    let mut string_ok = count_set(&len_is[..=32]);
    for &l in rule.hashed_lens() {
        let bytes = payload[..l].iter().map(ByteVar::from_fp).collect::<Result<Vec<_>, _>>()?;
        let digest: Vec<FpVar<F>> = keccak256(&bytes)?.into_iter().map(|b| b.value).collect();
        let hit = FpVar::from(len_is[l].clone());
        string_value += &hit * pack_be(&digest);
        string_ok += hit;
    }

    // An embedded node is a short list: one header byte plus its payload.
    let whole = prefixes(&window[..31]);
    let list_value = select_by(&len_is[..31], &whole[1..]);
    let list_ok = count_set(&len_is[..31]);

    header.is_list.select(&list_ok, &string_ok)?.enforce_equal(&FpVar::one())?;
    header.is_list.select(&list_value, &string_value)
}

/// `decodePointer`: requires the element at `header_pos` to point at a node
/// whose [`hash_ptr`] is `expected`.
pub fn decode_pointer<F: PrimeField>(
    node: &[ByteVar<F>],
    header_pos: &FpVar<F>,
    expected: &FpVar<F>,
    rule: &PointerRule,
) -> Result<(), SynthesisError> {
    pointer_value(node, header_pos, rule)?.enforce_equal(expected)
}
