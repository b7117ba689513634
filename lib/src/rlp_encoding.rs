use sha3::{Digest, Keccak256};
use crate::types::H256;

/// Compute Keccak256 hash
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a byte string using RLP
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        // Single byte less than 128: encode as itself
        data.to_vec()
    } else if data.len() < 56 {
        let mut encoded = vec![0x80 + data.len() as u8];
        encoded.extend_from_slice(data);
        encoded
    } else {
        let len_bytes = length_to_bytes(data.len());
        let mut encoded = vec![0xb7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(data);
        encoded
    }
}

/// Encode a list of already-encoded items using RLP
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();

    if payload.len() < 56 {
        let mut encoded = vec![0xc0 + payload.len() as u8];
        encoded.extend_from_slice(&payload);
        encoded
    } else {
        let len_bytes = length_to_bytes(payload.len());
        let mut encoded = vec![0xf7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(&payload);
        encoded
    }
}

/// Encode an unsigned big-endian integer, stripping leading zeros.
pub fn encode_uint(be: &[u8]) -> Vec<u8> {
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len());
    encode_bytes(&be[first..])
}

/// Ethereum account body `[nonce, balance, storageRoot, codeHash]`.
pub fn encode_account(nonce: u64, balance: &[u8], storage_root: &H256, code_hash: &H256) -> Vec<u8> {
    encode_list(&[
        encode_uint(&nonce.to_be_bytes()),
        encode_uint(balance),
        encode_bytes(storage_root),
        encode_bytes(code_hash),
    ])
}

/// Convert length to big-endian bytes
fn length_to_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Split an RLP list into its encoded items.
#[cfg(test)]
pub(crate) fn decode_list(data: &[u8]) -> Result<Vec<Vec<u8>>, &'static str> {
    let (offset, len, is_list) = decode_header(data)?;
    if !is_list {
        return Err("Not a list");
    }
    if data.len() < offset + len {
        return Err("Invalid RLP: payload too short");
    }

    let mut items = Vec::new();
    let mut pos = offset;
    let end = offset + len;
    while pos < end {
        let (item_off, item_len, _) = decode_header(&data[pos..])?;
        let item_end = pos + item_off + item_len;
        if item_end > end {
            return Err("Invalid RLP: item exceeds payload");
        }
        items.push(data[pos..item_end].to_vec());
        pos = item_end;
    }
    Ok(items)
}

/// Decode a single RLP-encoded byte string
#[cfg(test)]
pub(crate) fn decode_bytes(data: &[u8]) -> Result<Vec<u8>, &'static str> {
    let (offset, len, is_list) = decode_header(data)?;
    if is_list {
        return Err("Not a byte string (it's a list)");
    }
    data.get(offset..offset + len)
        .map(<[u8]>::to_vec)
        .ok_or("Invalid RLP: insufficient data")
}

/// Returns `(payload offset, payload length, is_list)` for the item at the
/// start of `data`.
#[cfg(test)]
fn decode_header(data: &[u8]) -> Result<(usize, usize, bool), &'static str> {
    let prefix = *data.first().ok_or("Empty input")?;
    let long = |base: u8| -> Result<(usize, usize), &'static str> {
        let len_of_len = (prefix - base) as usize;
        let len_bytes = data.get(1..1 + len_of_len).ok_or("Invalid RLP: insufficient length bytes")?;
        Ok((1 + len_of_len, bytes_to_length(len_bytes)))
    };
    match prefix {
        0x00..=0x7f => Ok((0, 1, false)),
        0x80..=0xb7 => Ok((1, (prefix - 0x80) as usize, false)),
        0xb8..=0xbf => long(0xb7).map(|(o, l)| (o, l, false)),
        0xc0..=0xf7 => Ok((1, (prefix - 0xc0) as usize, true)),
        _ => long(0xf7).map(|(o, l)| (o, l, true)),
    }
}

/// Convert big-endian bytes to length
#[cfg(test)]
fn bytes_to_length(bytes: &[u8]) -> usize {
    bytes.iter().fold(0, |len, &byte| (len << 8) | byte as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_byte() {
        assert_eq!(encode_bytes(&[0x42]), vec![0x42]);
    }

    #[test]
    fn test_encode_short_string() {
        assert_eq!(encode_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_bytes(b""), vec![0x80]);
    }

    #[test]
    fn test_encode_long_string_header() {
        let data = vec![0x11; 0x0123];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..3], &[0xb9, 0x01, 0x23]);
    }

    #[test]
    fn test_encode_uint_strips_zeros() {
        assert_eq!(encode_uint(&[0, 0, 0]), vec![0x80]);
        assert_eq!(encode_uint(&[0, 0x05]), vec![0x05]);
        assert_eq!(encode_uint(&[0, 0x81]), vec![0x81, 0x81]);
    }

    #[test]
    fn test_account_body_is_list_of_four() {
        let body = encode_account(1, &[0x10], &[0xaa; 32], &[0xbb; 32]);
        let items = decode_list(&body).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(decode_bytes(&items[2]).unwrap(), vec![0xaa; 32]);
    }

    #[test]
    fn test_decode_list_items() {
        let encoded = encode_list(&[encode_bytes(b"cat"), encode_bytes(b"dog")]);
        assert_eq!(encoded[0], 0xc8);
        let items = decode_list(&encoded).unwrap();
        assert_eq!(decode_bytes(&items[1]).unwrap(), b"dog");
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
