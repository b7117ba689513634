use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use tracing::debug;

use super::node::NodeInfo;
use super::pointer::{decode_pointer, hash_ptr, PointerRule};
use super::{count_set, enforce_exactly_one, fp, one_hot, select_by, ByteVar};
use crate::error::OwnershipError;

/// One Merkle Patricia proof to check against a root.
pub struct BranchInput<'a, F: PrimeField> {
    /// Nodes from the root down to the leaf.
    pub nodes: &'a [Vec<ByteVar<F>>],
    /// Key nibbles, each already range-checked to `0..16`.
    pub path: &'a [FpVar<F>],
    /// Expected trailing bytes of the last node, if any.
    pub leaf_val: Option<&'a [ByteVar<F>]>,
    /// Packed root pointer, see [`hash_ptr`].
    pub root: &'a FpVar<F>,
    /// Check extension keys and the leaf key against `path` and require the
    /// whole path to be consumed.
    pub full_key: bool,
    pub rule: &'a PointerRule,
}

pub struct VerifiedBranch<F: PrimeField> {
    /// [`hash_ptr`] of the last node.
    pub leaf_hash: FpVar<F>,
    /// Classification of the last node.
    pub leaf: NodeInfo<F>,
}

/// Walks a proof from the root, one level per node.
///
/// A branch parent consumes one path nibble and must point at the child from
/// that slot; an extension parent points at the child from its second item.
/// Both are plain constraints, so any mismatch makes the witness
/// unsatisfiable rather than failing here.
pub fn verify_branch<F: PrimeField>(
    input: &BranchInput<'_, F>,
) -> Result<VerifiedBranch<F>, OwnershipError> {
    let BranchInput { nodes, path, leaf_val, root, full_key, rule } = *input;
    let last = nodes.len().checked_sub(1).ok_or(OwnershipError::EmptyProof)?;
    debug!(levels = nodes.len(), path = path.len(), full_key, "verifying branch");

    let hashes = nodes.iter().map(|n| hash_ptr(n)).collect::<Result<Vec<_>, _>>()?;
    hashes[0].enforce_equal(root)?;

    let mut consumed = FpVar::zero();
    let mut infos = Vec::with_capacity(nodes.len());
    for (level, parent) in nodes.iter().enumerate() {
        let info = NodeInfo::classify(parent, full_key)?;
        if level == last {
            infos.push(info);
            break;
        }
        info.is_branch.xor(&info.is_extension)?.enforce_equal(&Boolean::TRUE)?;

        let at = one_hot(&consumed, path.len() + 1)?;
        enforce_exactly_one(&at)?;
        let nibble = select_by(&at[..path.len()], path);
        let slot = one_hot(&nibble, 16)?;
        // A branch needs a nibble left to consume.
        let usable = count_set(&at[..path.len()]) * count_set(&slot);
        FpVar::from(info.is_branch.clone())
            .mul_equals(&(FpVar::one() - usable), &FpVar::zero())?;

        let slots: Vec<FpVar<F>> =
            info.scan.elements[..16].iter().map(|e| e.header_pos.clone()).collect();
        let pointer_pos =
            info.is_branch.select(&select_by(&slot, &slots), &info.scan.elements[1].header_pos)?;
        decode_pointer(parent, &pointer_pos, &hashes[level + 1], rule)?;

        let mut step = FpVar::from(info.is_branch.clone());
        if full_key {
            let ext = FpVar::from(info.is_extension.clone());
            let gates: Vec<FpVar<F>> = info.key_mask.iter().map(|m| &ext * m).collect();
            enforce_key_matches(&info.key, &gates, path, &at)?;
            step += &ext * &info.key_len;
        }
        consumed += step;
        infos.push(info);
    }

    let leaf_node = &nodes[last];
    let leaf = infos.pop().ok_or(OwnershipError::EmptyProof)?;
    if full_key {
        leaf.is_leaf.enforce_equal(&Boolean::TRUE)?;
        let at = one_hot(&consumed, path.len() + 1)?;
        enforce_exactly_one(&at)?;
        enforce_key_matches(&leaf.key, &leaf.key_mask, path, &at)?;
        (&consumed + &leaf.key_len).enforce_equal(&fp(path.len() as u64))?;
    }

    if let Some(val) = leaf_val.filter(|v| !v.is_empty()) {
        let (m, n) = (val.len(), leaf_node.len());
        if m > n {
            return Err(OwnershipError::LeafValueTooLong { value: m, node: n });
        }
        for (byte, expected) in leaf_node[n - m..].iter().zip(val) {
            byte.value.enforce_equal(&expected.value)?;
        }
        let declared = leaf.is_pair.select(&leaf.scan.elements[1].length, &leaf.scan.payload_len)?;
        declared.enforce_equal(&fp(m as u64))?;
    }

    Ok(VerifiedBranch { leaf_hash: hashes[last].clone(), leaf })
}

/// Requires `key[k] == path[consumed + k]` wherever `gates[k]` is one.
/// `at` is the one-hot of `consumed` over `0..=path.len()`.
fn enforce_key_matches<F: PrimeField>(
    key: &[FpVar<F>],
    gates: &[FpVar<F>],
    path: &[FpVar<F>],
    at: &[Boolean<F>],
) -> Result<(), OwnershipError> {
    for (k, (nibble, gate)) in key.iter().zip(gates).enumerate() {
        let shifted: Vec<FpVar<F>> = (0..at.len())
            .map(|j| path.get(j + k).cloned().unwrap_or_else(FpVar::zero))
            .collect();
        let want = select_by(at, &shifted);
        gate.mul_equals(&(nibble - want), &FpVar::zero())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TrieBuilder;
    use crate::circuit::hash_ptr_native;
    use crate::path::to_nibbles;
    use ark_bn254::Fr;
    use ark_relations::r1cs::{ConstraintSystem, ConstraintSystemRef};

    fn bytes(cs: &ConstraintSystemRef<Fr>, raw: &[u8]) -> Vec<ByteVar<Fr>> {
        let values: Vec<Option<u8>> = raw.iter().copied().map(Some).collect();
        ByteVar::new_witness_vec(cs.clone(), &values).unwrap()
    }

    fn nibbles(cs: &ConstraintSystemRef<Fr>, path: &[u8]) -> Vec<FpVar<Fr>> {
        path.iter()
            .map(|&n| FpVar::new_witness(cs.clone(), || Ok(Fr::from(n))).unwrap())
            .collect()
    }

    struct Case<'a> {
        nodes: &'a [Vec<u8>],
        path: &'a [u8],
        leaf_val: Option<&'a [u8]>,
        root: Fr,
        full_key: bool,
    }

    fn run(case: Case<'_>) -> Result<bool, OwnershipError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let nodes: Vec<_> = case.nodes.iter().map(|n| bytes(&cs, n)).collect();
        let path = nibbles(&cs, case.path);
        let leaf_val = case.leaf_val.map(|v| bytes(&cs, v));
        let root = FpVar::new_input(cs.clone(), || Ok(case.root)).unwrap();
        let rule = PointerRule::packing_only();
        let verified = verify_branch(&BranchInput {
            nodes: &nodes,
            path: &path,
            leaf_val: leaf_val.as_deref(),
            root: &root,
            full_key: case.full_key,
            rule: &rule,
        })?;
        assert_eq!(verified.leaf_hash.value().unwrap(), hash_ptr_native::<Fr>(case.nodes.last().unwrap()));
        Ok(cs.is_satisfied().unwrap())
    }

    fn synthetic() -> Vec<Vec<u8>> {
        let mut branch = vec![0xd5];
        branch.extend([0x80; 15]);
        branch.extend([0x84, 0xc3, 0x80, 0x81, 0xaa]);
        branch.push(0x80);
        vec![branch, vec![0xc3, 0x80, 0x81, 0xaa]]
    }

    fn synthetic_case<'a>(nodes: &'a [Vec<u8>], path: &'a [u8], leaf_val: Option<&'a [u8]>) -> Case<'a> {
        Case { nodes, path, leaf_val, root: hash_ptr_native(&nodes[0]), full_key: false }
    }

    #[test]
    fn test_synthetic_branch_follows_slot_15() {
        let nodes = synthetic();
        assert!(run(synthetic_case(&nodes, &[15], None)).unwrap());
    }

    #[test]
    fn test_synthetic_branch_rejects_wrong_nibble() {
        let nodes = synthetic();
        assert!(!run(synthetic_case(&nodes, &[0], None)).unwrap());
    }

    #[test]
    fn test_synthetic_branch_rejects_exhausted_path() {
        let nodes = synthetic();
        assert!(!run(synthetic_case(&nodes, &[], None)).unwrap());
    }

    #[test]
    fn test_wrong_root_fails() {
        let nodes = synthetic();
        let mut case = synthetic_case(&nodes, &[15], None);
        case.root += Fr::from(1u64);
        assert!(!run(case).unwrap());
    }

    #[test]
    fn test_leaf_value_must_match() {
        let nodes = synthetic();
        assert!(run(synthetic_case(&nodes, &[15], Some(&[0xaa]))).unwrap());
        assert!(!run(synthetic_case(&nodes, &[15], Some(&[0xab]))).unwrap());

        let mut tampered = nodes.clone();
        tampered[1][3] = 0xab;
        tampered[0][20] = 0xab;
        assert!(!run(synthetic_case(&tampered, &[15], Some(&[0xaa]))).unwrap());
    }

    #[test]
    fn test_leaf_value_length_must_match_declared() {
        let nodes = synthetic();
        // Two trailing bytes are not the declared one-byte value.
        assert!(!run(synthetic_case(&nodes, &[15], Some(&[0x81, 0xaa]))).unwrap());
    }

    #[test]
    fn test_oversized_leaf_value_is_structural() {
        let nodes = synthetic();
        let val = [0u8; 8];
        assert!(matches!(
            run(synthetic_case(&nodes, &[15], Some(&val))),
            Err(OwnershipError::LeafValueTooLong { value: 8, node: 4 })
        ));
    }

    #[test]
    fn test_empty_proof_is_structural() {
        assert!(matches!(
            run(Case { nodes: &[], path: &[], leaf_val: None, root: Fr::from(0u64), full_key: false }),
            Err(OwnershipError::EmptyProof)
        ));
    }

    fn extension_trie() -> (TrieBuilder, [u8; 32]) {
        let mut trie = TrieBuilder::new();
        let mut a = [0x5a; 32];
        let mut b = [0x5a; 32];
        a[2] = 0x01;
        b[2] = 0xe2;
        trie.insert(&a, &[0x11; 20]);
        trie.insert(&b, &[0x22; 20]);
        (trie, a)
    }

    #[test]
    fn test_full_key_through_extension() {
        let (trie, key) = extension_trie();
        let proof = trie.get_proof(&key).unwrap();
        assert_eq!(proof.len(), 3);
        let path = to_nibbles(&key);
        let root = Fr::from_be_bytes_mod_order(&trie.root());
        let case = Case { nodes: &proof, path: &path, leaf_val: Some(&[0x11; 20]), root, full_key: true };
        assert!(run(case).unwrap());
    }

    #[test]
    fn test_full_key_rejects_foreign_path() {
        let (trie, key) = extension_trie();
        let proof = trie.get_proof(&key).unwrap();
        let mut path = to_nibbles(&key);
        // Same branch slot, different nibble inside the extension key.
        path[1] ^= 0x1;
        let root = Fr::from_be_bytes_mod_order(&trie.root());
        let case = Case { nodes: &proof, path: &path, leaf_val: None, root, full_key: true };
        assert!(!run(case).unwrap());
    }

    #[test]
    fn test_full_key_rejects_changed_leaf_key_nibble() {
        let (trie, key) = extension_trie();
        let proof = trie.get_proof(&key).unwrap();
        let mut path = to_nibbles(&key);
        path[63] ^= 0x1;
        let root = Fr::from_be_bytes_mod_order(&trie.root());
        let case = Case { nodes: &proof, path: &path, leaf_val: None, root, full_key: true };
        assert!(!run(case).unwrap());
    }
}
