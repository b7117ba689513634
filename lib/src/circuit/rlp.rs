//! RLP header decoding and list scanning over fixed-length node bytes.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use super::{byte_at, enforce_exactly_one, fp, one_hot, read_window, ByteVar};

/// Decoded RLP item header.
#[derive(Clone, Debug)]
pub struct RlpHeader<F: PrimeField> {
    /// Bytes between the header position and the payload.
    pub offset: FpVar<F>,
    /// Payload length.
    pub length: FpVar<F>,
    pub is_list: Boolean<F>,
}

/// Decodes the header whose first byte is `prefix`. `len_bytes` are the bytes
/// following it; missing entries read as zero.
///
/// All five encodings (single byte, short/long string, short/long list) are
/// evaluated and the result is picked by selectors on the prefix bits. A long
/// header's length is accumulated over eight fixed iterations, masked once
/// the `prefix & 7` length bytes are consumed.
pub fn decode_rlp_header<F: PrimeField>(
    prefix: &ByteVar<F>,
    len_bytes: &[FpVar<F>],
) -> Result<RlpHeader<F>, SynthesisError> {
    let b = &prefix.bits;
    let single = b[7].not();
    let is_list = b[7].and(&b[6])?;
    let long = Boolean::kary_and(&[b[7].clone(), b[5].clone(), b[4].clone(), b[3].clone()])?;
    let short_len = Boolean::le_bits_to_fp_var(&b[..6])?;
    let low3 = Boolean::le_bits_to_fp_var(&b[..3])?;

    let mut long_len = FpVar::zero();
    let mut inside = Boolean::TRUE;
    for i in 0..8 {
        let byte = len_bytes.get(i).cloned().unwrap_or_else(FpVar::zero);
        let shifted = &long_len * F::from(256u64) + byte;
        long_len = inside.select(&shifted, &long_len)?;
        // Byte `i` was the last one when `low3 == i`.
        let last: Vec<Boolean<F>> = (0..3)
            .map(|k| if (i >> k) & 1 == 1 { b[k].clone() } else { b[k].not() })
            .collect();
        inside = inside.and(&Boolean::kary_and(&last)?.not())?;
    }

    let multi_offset = long.select(&(low3 + F::from(2u64)), &FpVar::one())?;
    let multi_len = long.select(&long_len, &short_len)?;
    Ok(RlpHeader {
        offset: single.select(&FpVar::zero(), &multi_offset)?,
        length: single.select(&FpVar::one(), &multi_len)?,
        is_list,
    })
}

/// Header of the item starting at the fixed position `pos`.
pub fn header_at<F: PrimeField>(
    node: &[ByteVar<F>],
    pos: usize,
) -> Result<RlpHeader<F>, SynthesisError> {
    let prefix = node.get(pos).cloned().unwrap_or_else(|| ByteVar::constant(0));
    let len_bytes: Vec<FpVar<F>> = (1..=8).map(|k| byte_at(node, pos + k)).collect();
    decode_rlp_header(&prefix, &len_bytes)
}

/// One element of a scanned list.
///
/// `start` is the payload position, or the header position for an empty
/// element. All fields are zero when the element does not exist.
#[derive(Clone, Debug)]
pub struct RlpElement<F: PrimeField> {
    pub header_pos: FpVar<F>,
    pub start: FpVar<F>,
    pub length: FpVar<F>,
}

impl<F: PrimeField> RlpElement<F> {
    fn zero() -> Self {
        Self { header_pos: FpVar::zero(), start: FpVar::zero(), length: FpVar::zero() }
    }
}

/// Where the scanned list header sits.
#[derive(Clone, Debug)]
pub enum ListStart<F: PrimeField> {
    /// The node itself is the list and spans all of its bytes.
    Top,
    /// A list nested at a witness-dependent position inside the node.
    At(FpVar<F>),
}

#[derive(Clone, Debug)]
pub struct ListScan<F: PrimeField> {
    pub payload_start: FpVar<F>,
    pub payload_len: FpVar<F>,
    /// Number of items in the list.
    pub count: FpVar<F>,
    /// One entry per requested target index, in request order.
    pub elements: Vec<RlpElement<F>>,
}

/// Scans the list at `start` once and latches every element in `targets`.
///
/// Every byte position of the node is visited. A position is an element
/// start when it equals the running cursor and lies before the list end; the
/// cursor then jumps over that element and the item counter advances. The
/// cursor must land exactly on the list end, so items may not overrun it.
pub fn scan_list<F: PrimeField>(
    node: &[ByteVar<F>],
    start: ListStart<F>,
    targets: &[usize],
) -> Result<ListScan<F>, SynthesisError> {
    let n = node.len();
    let top = matches!(start, ListStart::Top);
    let (list_pos, header) = match start {
        ListStart::Top => (FpVar::zero(), header_at(node, 0)?),
        ListStart::At(pos) => {
            let sel = one_hot(&pos, n)?;
            enforce_exactly_one(&sel)?;
            let window = read_window(node, &sel, 9);
            let prefix = ByteVar::from_fp(&window[0])?;
            (pos, decode_rlp_header(&prefix, &window[1..])?)
        }
    };
    header.is_list.enforce_equal(&Boolean::TRUE)?;

    let payload_start = &list_pos + &header.offset;
    let end = &payload_start + &header.length;
    if top {
        end.enforce_equal(&fp(n as u64))?;
    }

    let mut cur = payload_start.clone();
    let mut count = FpVar::zero();
    let mut before_end = Boolean::TRUE;
    let mut elements = vec![RlpElement::zero(); targets.len()];
    for j in 0..n {
        let pos = fp::<F>(j as u64);
        before_end = before_end.and(&end.is_eq(&pos)?.not())?;
        let here = cur.is_eq(&pos)?.and(&before_end)?;

        let h = header_at(node, j)?;
        let elem_start = h.length.is_eq(&FpVar::zero())?.select(&pos, &(&pos + &h.offset))?;
        for (&t, elem) in targets.iter().zip(elements.iter_mut()) {
            let hit = FpVar::from(here.and(&count.is_eq(&fp(t as u64))?)?);
            elem.header_pos += &hit * F::from(j as u64);
            elem.start += &hit * &elem_start;
            elem.length += &hit * &h.length;
        }

        let next = pos + &h.offset + &h.length;
        count += FpVar::from(here.clone());
        cur = here.select(&next, &cur)?;
    }
    cur.enforce_equal(&end)?;

    Ok(ListScan { payload_start, payload_len: header.length, count, elements })
}

/// `(start, length)` of element `index` of the node's top-level list, zero
/// when the list is shorter.
pub fn rlp_list_walk<F: PrimeField>(
    node: &[ByteVar<F>],
    index: usize,
) -> Result<(FpVar<F>, FpVar<F>), SynthesisError> {
    let mut scan = scan_list(node, ListStart::Top, &[index])?;
    let elem = scan.elements.remove(0);
    Ok((elem.start, elem.length))
}
