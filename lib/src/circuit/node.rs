//! Node classification and compact (hex-prefix) key decoding.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use super::rlp::{decode_rlp_header, scan_list, ListScan, ListStart};
use super::{count_set, enforce_exactly_one, fp, one_hot, read_window, ByteVar};
use crate::types::PATH_NIBBLES;

/// Items of a branch node: 16 children and a value.
pub const BRANCH_ITEMS: usize = 17;

/// Longest compact key: a flag byte plus 32 key bytes.
const MAX_KEY_BYTES: usize = 33;

/// Structure of one trie node, derived from a full scan of its item list.
#[derive(Clone, Debug)]
pub struct NodeInfo<F: PrimeField> {
    /// Scan of the node's top-level list latching items `0..17`.
    pub scan: ListScan<F>,
    pub is_branch: Boolean<F>,
    /// Two items, whatever the key flag says.
    pub is_pair: Boolean<F>,
    pub is_extension: Boolean<F>,
    pub is_leaf: Boolean<F>,
    /// Nibbles of the compact key in item 0. Empty unless keys were decoded;
    /// entries at or past `key_len` are unconstrained.
    pub key: Vec<FpVar<F>>,
    /// `key_mask[k]` is one when `k < key_len`, zero otherwise.
    pub key_mask: Vec<FpVar<F>>,
    pub key_len: FpVar<F>,
}

impl<F: PrimeField> NodeInfo<F> {
    /// Classifies `node` by item count: 17 items make a branch, 2 items an
    /// extension or a leaf depending on the compact key flag.
    ///
    /// An empty key reads as flag 0, an even extension with no nibbles. With
    /// `decode_key` the key nibbles are decoded as well.
    pub fn classify(node: &[ByteVar<F>], decode_key: bool) -> Result<Self, SynthesisError> {
        let targets: Vec<usize> = (0..BRANCH_ITEMS).collect();
        let scan = scan_list(node, ListStart::Top, &targets)?;
        let is_branch = scan.count.is_eq(&fp(BRANCH_ITEMS as u64))?;
        let is_pair = scan.count.is_eq(&fp(2))?;

        let width = if decode_key { MAX_KEY_BYTES + 1 } else { 2 };
        let sel = one_hot(&scan.elements[0].header_pos, node.len())?;
        enforce_exactly_one(&sel)?;
        let window = read_window(node, &sel, width);
        let prefix = ByteVar::from_fp(&window[0])?;
        let header = decode_rlp_header(&prefix, &window[1..])?;
        is_pair.and(&header.is_list)?.enforce_equal(&Boolean::FALSE)?;

        // Key bytes follow a one-byte header, or start at the header for a
        // single-byte key.
        let shifted = header.offset.is_eq(&FpVar::one())?;
        let key_bytes: Vec<FpVar<F>> = (0..width - 1)
            .map(|i| shifted.select(&window[i + 1], &window[i]))
            .collect::<Result<_, _>>()?;

        let empty = header.length.is_eq(&FpVar::zero())?;
        let flag = ByteVar::from_fp(&key_bytes[0])?;
        let odd = flag.bits[4].and(&empty.not())?;
        let leaf_flag = flag.bits[5].and(&empty.not())?;
        let bad_flag = flag.bits[6].or(&flag.bits[7])?;
        is_pair.and(&empty.not())?.and(&bad_flag)?.enforce_equal(&Boolean::FALSE)?;

        let is_extension = is_pair.and(&leaf_flag.not())?;
        let is_leaf = is_pair.and(&leaf_flag)?;
        let nonempty_len = &header.length * F::from(2u64) - F::from(2u64) + FpVar::from(odd.clone());
        let key_len = is_pair.and(&empty.not())?.select(&nonempty_len, &FpVar::zero())?;

        let (key, key_mask) = if decode_key {
            decode_nibbles(&flag, &key_bytes[1..], &odd, &key_len)?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self { scan, is_branch, is_pair, is_extension, is_leaf, key, key_mask, key_len })
    }
}

/// `(is_branch, is_extension)` of `node`, without decoding its key.
pub fn detect_node_type<F: PrimeField>(
    node: &[ByteVar<F>],
) -> Result<(Boolean<F>, Boolean<F>), SynthesisError> {
    let info = NodeInfo::classify(node, false)?;
    Ok((info.is_branch, info.is_extension))
}

/// Expands the key bytes after the flag byte into nibbles, taking the first
/// nibble from the flag byte when the key is odd.
fn decode_nibbles<F: PrimeField>(
    flag: &ByteVar<F>,
    rest: &[FpVar<F>],
    odd: &Boolean<F>,
    key_len: &FpVar<F>,
) -> Result<(Vec<FpVar<F>>, Vec<FpVar<F>>), SynthesisError> {
    let mut hi = Vec::with_capacity(rest.len());
    let mut lo = Vec::with_capacity(rest.len());
    for b in rest {
        let byte = ByteVar::from_fp(b)?;
        hi.push(byte.high_nibble()?);
        lo.push(byte.low_nibble()?);
    }
    let first = flag.low_nibble()?;

    let mut key = Vec::with_capacity(PATH_NIBBLES);
    for k in 0..PATH_NIBBLES {
        let odd_nibble = match k {
            0 => first.clone(),
            k if k % 2 == 1 => hi[(k + 1) / 2 - 1].clone(),
            k => lo[k / 2 - 1].clone(),
        };
        let even_nibble = if k % 2 == 0 { hi[k / 2].clone() } else { lo[k / 2].clone() };
        key.push(odd.select(&odd_nibble, &even_nibble)?);
    }

    let len_is = one_hot(key_len, PATH_NIBBLES + 1)?;
    enforce_exactly_one(&len_is)?;
    let key_mask = (0..PATH_NIBBLES).map(|k| count_set(&len_is[k + 1..])).collect();
    Ok((key, key_mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::encode_path;
    use crate::rlp_encoding::{encode_bytes, encode_list};
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    fn classify(bytes: &[u8], decode_key: bool) -> (NodeInfo<Fr>, bool) {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let values: Vec<Option<u8>> = bytes.iter().copied().map(Some).collect();
        let node = ByteVar::new_witness_vec(cs.clone(), &values).unwrap();
        let info = NodeInfo::classify(&node, decode_key).unwrap();
        (info, cs.is_satisfied().unwrap())
    }

    fn flags(info: &NodeInfo<Fr>) -> (bool, bool, bool) {
        (
            info.is_branch.value().unwrap(),
            info.is_extension.value().unwrap(),
            info.is_leaf.value().unwrap(),
        )
    }

    fn nibbles(info: &NodeInfo<Fr>) -> Vec<u8> {
        let len = info.key_len.value().unwrap().into_bigint().as_ref()[0] as usize;
        info.key[..len]
            .iter()
            .map(|n| n.value().unwrap().into_bigint().as_ref()[0] as u8)
            .collect()
    }

    #[test]
    fn test_classify_long_branch() {
        let mut items = vec![encode_bytes(&[0xab; 32]); 3];
        items.resize(BRANCH_ITEMS, encode_bytes(&[]));
        let node = encode_list(&items);
        assert_eq!(node[0], 0xf8);
        let (info, ok) = classify(&node, false);
        assert!(ok);
        assert_eq!(flags(&info), (true, false, false));
    }

    #[test]
    fn test_classify_synthetic_extension() {
        let (info, ok) = classify(&[0xc3, 0x80, 0x81, 0xaa], true);
        assert!(ok);
        assert_eq!(flags(&info), (false, true, false));
        assert!(nibbles(&info).is_empty());
    }

    #[test]
    fn test_decode_odd_extension_key() {
        let key = encode_path(&[0x1, 0x2, 0x3], false);
        let node = encode_list(&[encode_bytes(&key), encode_bytes(&[0xcd; 32])]);
        let (info, ok) = classify(&node, true);
        assert!(ok);
        assert_eq!(flags(&info), (false, true, false));
        assert_eq!(nibbles(&info), vec![0x1, 0x2, 0x3]);
    }

    #[test]
    fn test_decode_even_leaf_key() {
        let path: Vec<u8> = (0..64).map(|i| (i * 5 % 16) as u8).collect();
        let key = encode_path(&path[2..], true);
        let node = encode_list(&[encode_bytes(&key), encode_bytes(&[0x94; 21])]);
        let (info, ok) = classify(&node, true);
        assert!(ok);
        assert_eq!(flags(&info), (false, false, true));
        assert_eq!(nibbles(&info), path[2..].to_vec());
    }

    #[test]
    fn test_decode_single_byte_leaf_key() {
        // A leaf with one remaining nibble stores its key as the byte 0x37.
        let node = encode_list(&[encode_bytes(&[0x37]), encode_bytes(b"v")]);
        let (info, ok) = classify(&node, true);
        assert!(ok);
        assert_eq!(flags(&info), (false, false, true));
        assert_eq!(nibbles(&info), vec![0x7]);
    }

    #[test]
    fn test_detect_node_type_of_leaf() {
        let node = encode_list(&[encode_bytes(&[0x20, 0xab]), encode_bytes(b"v")]);
        let cs = ConstraintSystem::<Fr>::new_ref();
        let values: Vec<Option<u8>> = node.iter().copied().map(Some).collect();
        let bytes = ByteVar::new_witness_vec(cs.clone(), &values).unwrap();
        let (is_branch, is_extension) = detect_node_type(&bytes).unwrap();
        assert!(!is_branch.value().unwrap());
        assert!(!is_extension.value().unwrap());
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_reject_invalid_key_flag() {
        let node = encode_list(&[encode_bytes(&[0x40, 0x12]), encode_bytes(b"v")]);
        let (_, ok) = classify(&node, false);
        assert!(!ok);
    }
}
