/// Encode path with compact (hex-prefix) encoding
/// First nibble contains: odd_flag (bit 0) and leaf_flag (bit 1)
pub fn encode_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd_len = nibbles.len() % 2 == 1;

    // 0x0: extension, even length
    // 0x1: extension, odd length
    // 0x2: leaf, even length
    // 0x3: leaf, odd length
    let prefix = (u8::from(is_leaf) << 1) | u8::from(odd_len);

    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd_len {
        encoded.push((prefix << 4) | nibbles[0]);
        &nibbles[1..]
    } else {
        encoded.push(prefix << 4);
        nibbles
    };
    encoded.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    encoded
}

/// Decode compact-encoded path
/// Returns (nibbles, is_leaf)
#[cfg(test)]
pub(crate) fn decode_path(encoded: &[u8]) -> (Vec<u8>, bool) {
    let Some(&first) = encoded.first() else {
        return (Vec::new(), false);
    };
    let prefix = first >> 4;
    let is_leaf = (prefix & 0x2) != 0;
    let odd_len = (prefix & 0x1) != 0;

    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if odd_len {
        nibbles.push(first & 0x0f);
    }
    nibbles.extend(to_nibbles(&encoded[1..]));
    (nibbles, is_leaf)
}

/// Convert bytes to nibbles (hex digits)
pub fn to_nibbles(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|&byte| [byte >> 4, byte & 0x0f]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_path_leaf_odd() {
        let nibbles = vec![1, 2, 3, 4, 5];
        let encoded = encode_path(&nibbles, true);
        assert_eq!(encoded, vec![0x31, 0x23, 0x45]);
        assert_eq!(decode_path(&encoded), (nibbles, true));
    }

    #[test]
    fn test_encode_decode_path_leaf_even() {
        let nibbles = vec![1, 2, 3, 4];
        let encoded = encode_path(&nibbles, true);
        assert_eq!(encoded, vec![0x20, 0x12, 0x34]);
        assert_eq!(decode_path(&encoded), (nibbles, true));
    }

    #[test]
    fn test_encode_decode_path_extension_odd() {
        let nibbles = vec![1, 2, 3];
        let encoded = encode_path(&nibbles, false);
        assert_eq!(encoded, vec![0x11, 0x23]);
        assert_eq!(decode_path(&encoded), (nibbles, false));
    }

    #[test]
    fn test_to_nibbles() {
        assert_eq!(to_nibbles(&[0x12, 0x34, 0xab]), vec![1, 2, 3, 4, 10, 11]);
    }
}
