//! Chaining the account trie into the storage trie, and reading the owner
//! out of the storage slot.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use super::keccak::keccak256;
use super::rlp::{decode_rlp_header, scan_list, ListStart};
use super::{enforce_exactly_one, fp, one_hot, pack_be, read_window, select_by, ByteVar};
use crate::error::OwnershipError;
use crate::slot::slot_preimage;
use crate::types::{OWNER_LEN, SLOT_WORD_LEN};

/// Items of an account body: nonce, balance, storage root, code hash.
const ACCOUNT_FIELDS: u64 = 4;
const STORAGE_ROOT_FIELD: usize = 2;

/// Reads `storageRoot` out of an account leaf and packs it like a pointer.
///
/// The leaf's second item is a string wrapping the RLP account body; the body
/// must fill that string exactly and hold four fields, the third being 32
/// bytes long.
pub fn extract_storage_root<F: PrimeField>(leaf: &[ByteVar<F>]) -> Result<FpVar<F>, SynthesisError> {
    let outer = scan_list(leaf, ListStart::Top, &[1])?;
    let body = &outer.elements[0];
    let account = scan_list(leaf, ListStart::At(body.start.clone()), &[STORAGE_ROOT_FIELD])?;
    (&account.payload_start + &account.payload_len).enforce_equal(&(&body.start + &body.length))?;
    account.count.enforce_equal(&fp(ACCOUNT_FIELDS))?;

    let root = &account.elements[0];
    root.length.enforce_equal(&fp(32))?;
    let sel = one_hot(&root.start, leaf.len())?;
    enforce_exactly_one(&sel)?;
    Ok(pack_be(&read_window(leaf, &sel, 32)))
}

/// Requires `slot[12 + i] == owner[i]` for every owner byte.
pub fn storage_leaf_must_equal_owner<F: PrimeField>(
    slot: &[ByteVar<F>],
    owner: &[ByteVar<F>],
) -> Result<(), OwnershipError> {
    if owner.len() != OWNER_LEN {
        return Err(OwnershipError::OwnerLength(owner.len()));
    }
    if slot.len() < SLOT_WORD_LEN {
        return Err(OwnershipError::SlotLeafTooShort(slot.len()));
    }
    let pad = SLOT_WORD_LEN - OWNER_LEN;
    for (byte, expected) in slot[pad..].iter().zip(owner) {
        byte.value.enforce_equal(&expected.value)?;
    }
    Ok(())
}

/// Binds the 32-byte `slot` word to the value stored in a storage leaf.
///
/// Storage leaves hold `rlp(word)` with leading zero bytes stripped, wrapped
/// once more as the leaf's second item. The stripped bytes must equal the low
/// end of `slot` and every byte above them must be zero.
pub fn bind_slot_value<F: PrimeField>(
    leaf: &[ByteVar<F>],
    slot: &[ByteVar<F>],
) -> Result<(), OwnershipError> {
    if slot.len() != SLOT_WORD_LEN {
        return Err(OwnershipError::shape("slot word", SLOT_WORD_LEN, slot.len()));
    }
    let outer = scan_list(leaf, ListStart::Top, &[1])?;
    let value = &outer.elements[0];
    let sel = one_hot(&value.start, leaf.len())?;
    enforce_exactly_one(&sel)?;
    let window = read_window(leaf, &sel, SLOT_WORD_LEN + 1);

    let prefix = ByteVar::from_fp(&window[0])?;
    let inner = decode_rlp_header(&prefix, &window[1..9])?;
    inner.is_list.enforce_equal(&Boolean::FALSE)?;
    (&inner.offset + &inner.length).enforce_equal(&value.length)?;
    enforce_exactly_one(&one_hot(&inner.offset, 2)?)?;
    let shifted = inner.offset.is_eq(&FpVar::one())?;
    let word: Vec<FpVar<F>> = (0..SLOT_WORD_LEN)
        .map(|i| shifted.select(&window[i + 1], &window[i]))
        .collect::<Result<_, _>>()?;

    let len_is = one_hot(&inner.length, SLOT_WORD_LEN + 1)?;
    enforce_exactly_one(&len_is)?;
    for (k, byte) in slot.iter().enumerate() {
        // With `m` stored bytes, slot byte `k` is word byte `k + m - 32`.
        let aligned: Vec<FpVar<F>> = (0..=SLOT_WORD_LEN)
            .map(|m| match (k + m).checked_sub(SLOT_WORD_LEN) {
                Some(i) => word[i].clone(),
                None => FpVar::zero(),
            })
            .collect();
        byte.value.enforce_equal(&select_by(&len_is, &aligned))?;
    }
    Ok(())
}

/// Nibbles of `keccak256(pad32(token_id) ‖ pad32(slot_index))`, computed in
/// the circuit from the token id field element.
pub fn storage_key_nibbles<F: PrimeField>(
    token_id: &FpVar<F>,
    slot_index: u64,
) -> Result<Vec<FpVar<F>>, SynthesisError> {
    let mut bits = token_id.to_bits_le()?;
    bits.resize(8 * SLOT_WORD_LEN, Boolean::FALSE);
    let mut preimage = bits
        .chunks(8)
        .rev()
        .map(|c| ByteVar::from_bits_le(c.to_vec()))
        .collect::<Result<Vec<_>, _>>()?;
    preimage.extend(ByteVar::constant_vec(&slot_preimage(&[0; 32], slot_index)[SLOT_WORD_LEN..]));

    let mut nibbles = Vec::with_capacity(2 * SLOT_WORD_LEN);
    for byte in keccak256(&preimage)? {
        nibbles.push(byte.high_nibble()?);
        nibbles.push(byte.low_nibble()?);
    }
    Ok(nibbles)
}
