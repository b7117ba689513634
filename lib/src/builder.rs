use crate::path::{encode_path, to_nibbles};
use crate::rlp_encoding::{encode_bytes, encode_list, keccak256};
use crate::types::H256;

#[derive(Clone, Debug, Default)]
enum TrieNode {
    #[default]
    Empty,
    Leaf(Vec<u8>, Vec<u8>),                       // (path, value)
    Extension(Vec<u8>, Box<TrieNode>),            // (path, child)
    Branch(Box<[TrieNode; 16]>, Option<Vec<u8>>), // (children, value)
}

/// An in-memory Merkle Patricia Trie used to produce proof fixtures.
///
/// Children follow Ethereum's pointer rule: encodings shorter than 32 bytes
/// are embedded in their parent, longer ones are referenced by Keccak-256.
#[derive(Clone, Debug, Default)]
pub struct TrieBuilder {
    root: TrieNode,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key-value pair; `value` is stored as the raw leaf payload.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) {
        let root = std::mem::take(&mut self.root);
        self.root = insert_at(root, &to_nibbles(key), value.to_vec());
    }

    /// Ethereum root hash: Keccak-256 of the root node encoding.
    pub fn root(&self) -> H256 {
        keccak256(&encode_node(&self.root))
    }

    /// RLP encodings of every node from the root to the node holding `key`.
    pub fn get_proof(&self, key: &[u8]) -> Option<Vec<Vec<u8>>> {
        let nibbles = to_nibbles(key);
        let mut remaining = &nibbles[..];
        let mut node = &self.root;
        let mut proof = Vec::new();

        loop {
            proof.push(encode_node(node));
            match node {
                TrieNode::Empty => return None,
                TrieNode::Leaf(path, _) => {
                    return (path.as_slice() == remaining).then_some(proof);
                }
                TrieNode::Extension(path, child) => {
                    remaining = remaining.strip_prefix(path.as_slice())?;
                    node = child;
                }
                TrieNode::Branch(children, value) => {
                    let Some((&idx, rest)) = remaining.split_first() else {
                        return value.as_ref().map(|_| proof);
                    };
                    remaining = rest;
                    node = &children[idx as usize];
                }
            }
        }
    }

    /// Get a value by key
    #[cfg(test)]
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let nibbles = to_nibbles(key);
        let mut remaining = &nibbles[..];
        let mut node = &self.root;

        loop {
            match node {
                TrieNode::Empty => return None,
                TrieNode::Leaf(path, value) => {
                    return (path.as_slice() == remaining).then(|| value.clone());
                }
                TrieNode::Extension(path, child) => {
                    remaining = remaining.strip_prefix(path.as_slice())?;
                    node = child;
                }
                TrieNode::Branch(children, value) => {
                    let Some((&idx, rest)) = remaining.split_first() else {
                        return value.clone();
                    };
                    remaining = rest;
                    node = &children[idx as usize];
                }
            }
        }
    }
}

fn insert_at(node: TrieNode, path: &[u8], value: Vec<u8>) -> TrieNode {
    match node {
        TrieNode::Empty => TrieNode::Leaf(path.to_vec(), value),
        TrieNode::Leaf(leaf_path, leaf_value) => {
            let common = common_prefix_len(&leaf_path, path);
            if common == leaf_path.len() && common == path.len() {
                return TrieNode::Leaf(leaf_path, value);
            }
            let mut children: Box<[TrieNode; 16]> = Box::default();
            let mut branch_value = None;
            place(&mut children, &mut branch_value, &leaf_path[common..], leaf_value);
            place(&mut children, &mut branch_value, &path[common..], value);
            wrap_extension(&path[..common], TrieNode::Branch(children, branch_value))
        }
        TrieNode::Extension(ext_path, child) => {
            let common = common_prefix_len(&ext_path, path);
            if common == ext_path.len() {
                let child = insert_at(*child, &path[common..], value);
                return TrieNode::Extension(ext_path, Box::new(child));
            }
            // Split the extension at the first diverging nibble.
            let mut children: Box<[TrieNode; 16]> = Box::default();
            let mut branch_value = None;
            children[ext_path[common] as usize] = wrap_extension(&ext_path[common + 1..], *child);
            place(&mut children, &mut branch_value, &path[common..], value);
            wrap_extension(&path[..common], TrieNode::Branch(children, branch_value))
        }
        TrieNode::Branch(mut children, branch_value) => match path.split_first() {
            None => TrieNode::Branch(children, Some(value)),
            Some((&idx, rest)) => {
                let child = std::mem::take(&mut children[idx as usize]);
                children[idx as usize] = insert_at(child, rest, value);
                TrieNode::Branch(children, branch_value)
            }
        },
    }
}

/// Places `value` under a fresh branch, at `path` relative to it.
fn place(children: &mut [TrieNode; 16], branch_value: &mut Option<Vec<u8>>, path: &[u8], value: Vec<u8>) {
    match path.split_first() {
        None => *branch_value = Some(value),
        Some((&idx, rest)) => children[idx as usize] = TrieNode::Leaf(rest.to_vec(), value),
    }
}

fn wrap_extension(path: &[u8], child: TrieNode) -> TrieNode {
    if path.is_empty() {
        child
    } else {
        TrieNode::Extension(path.to_vec(), Box::new(child))
    }
}

fn encode_node(node: &TrieNode) -> Vec<u8> {
    match node {
        TrieNode::Empty => encode_bytes(&[]),
        TrieNode::Leaf(path, value) => {
            encode_list(&[encode_bytes(&encode_path(path, true)), encode_bytes(value)])
        }
        TrieNode::Extension(path, child) => {
            encode_list(&[encode_bytes(&encode_path(path, false)), reference(child)])
        }
        TrieNode::Branch(children, value) => {
            let mut items: Vec<Vec<u8>> = children.iter().map(reference).collect();
            items.push(encode_bytes(value.as_deref().unwrap_or_default()));
            encode_list(&items)
        }
    }
}

/// The item a parent stores for `child`.
fn reference(child: &TrieNode) -> Vec<u8> {
    if let TrieNode::Empty = child {
        return encode_bytes(&[]);
    }
    let encoded = encode_node(child);
    if encoded.len() < 32 {
        encoded
    } else {
        encode_bytes(&keccak256(&encoded))
    }
}

/// Helper function to find common prefix length
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rlp_encoding::{decode_bytes, decode_list};

    #[test]
    fn test_builder_insert_and_get() {
        let mut builder = TrieBuilder::new();
        builder.insert(b"test_key", b"test_value");
        assert_eq!(builder.get(b"test_key").unwrap(), b"test_value");
        assert!(builder.get(b"nonexistent").is_none());
    }

    #[test]
    fn test_builder_empty_root() {
        // keccak256(rlp("")), the canonical empty trie root.
        assert_eq!(
            hex::encode(TrieBuilder::new().root()),
            "56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
        );
    }

    #[test]
    fn test_builder_multiple_inserts() {
        let mut builder = TrieBuilder::new();
        builder.insert(b"do", b"verb");
        builder.insert(b"dog", b"puppy");
        builder.insert(b"doge", b"coin");
        builder.insert(b"horse", b"stallion");

        assert_eq!(builder.get(b"do").unwrap(), b"verb");
        assert_eq!(builder.get(b"dog").unwrap(), b"puppy");
        assert_eq!(builder.get(b"doge").unwrap(), b"coin");
        assert_eq!(builder.get(b"horse").unwrap(), b"stallion");
        // Well-known root of the "do/dog/doge/horse" trie.
        assert_eq!(
            hex::encode(builder.root()),
            "5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"
        );
    }

    #[test]
    fn test_builder_overwrite_value() {
        let mut builder = TrieBuilder::new();
        builder.insert(b"key", b"value1");
        builder.insert(b"key", b"value2");
        assert_eq!(builder.get(b"key").unwrap(), b"value2");
    }

    #[test]
    fn test_builder_shared_prefix_makes_extension() {
        let mut builder = TrieBuilder::new();
        let mut a = [0x12u8; 32];
        let mut b = [0x12u8; 32];
        a[1] = 0x00;
        b[1] = 0xf0;
        builder.insert(&a, &[0x01; 20]);
        builder.insert(&b, &[0x02; 20]);

        let proof = builder.get_proof(&a).unwrap();
        assert_eq!(proof.len(), 3);
        let root_items = decode_list(&proof[0]).unwrap();
        assert_eq!(root_items.len(), 2);
        // Extension over nibbles [1, 2] (even, extension flag 0).
        assert_eq!(decode_bytes(&root_items[0]).unwrap(), vec![0x00, 0x12]);
        assert_eq!(decode_list(&proof[1]).unwrap().len(), 17);
        assert_eq!(decode_list(&proof[2]).unwrap().len(), 2);
    }

    #[test]
    fn test_builder_proof_links_by_hash() {
        let mut builder = TrieBuilder::new();
        builder.insert(&[0x10; 32], &[0xaa; 20]);
        builder.insert(&[0xf0; 32], &[0xbb; 20]);

        let proof = builder.get_proof(&[0xf0; 32]).unwrap();
        assert_eq!(keccak256(&proof[0]), builder.root());
        let branch = decode_list(&proof[0]).unwrap();
        assert_eq!(decode_bytes(&branch[15]).unwrap(), keccak256(&proof[1]).to_vec());
    }
}
