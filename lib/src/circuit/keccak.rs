//! Keccak-256 over circuit bytes, as a bit-level Keccak-f[1600] permutation.
//!
//! The input length is fixed per call site, so padding is a constant.

use ark_ff::PrimeField;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use super::ByteVar;

/// Sponge rate of Keccak-256 in bytes.
const RATE: usize = 136;

const ROUND_CONSTANTS: [u64; 24] = [
    0x0000_0000_0000_0001,
    0x0000_0000_0000_8082,
    0x8000_0000_0000_808a,
    0x8000_0000_8000_8000,
    0x0000_0000_0000_808b,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8009,
    0x0000_0000_0000_008a,
    0x0000_0000_0000_0088,
    0x0000_0000_8000_8009,
    0x0000_0000_8000_000a,
    0x0000_0000_8000_808b,
    0x8000_0000_0000_008b,
    0x8000_0000_0000_8089,
    0x8000_0000_0000_8003,
    0x8000_0000_0000_8002,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_800a,
    0x8000_0000_8000_000a,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8080,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8008,
];

/// Rotation offsets, indexed by `x + 5 * y`.
const RHO: [usize; 25] = [
    0, 1, 62, 28, 27, 36, 44, 6, 55, 20, 3, 10, 43, 25, 39, 41, 45, 15, 21, 8, 18, 2, 61, 56, 14,
];

type Lane<F> = Vec<Boolean<F>>;

/// Legacy (pre-NIST padding) Keccak-256 digest of `input`.
pub fn keccak256<F: PrimeField>(input: &[ByteVar<F>]) -> Result<Vec<ByteVar<F>>, SynthesisError> {
    let pad_len = RATE - input.len() % RATE;
    let mut padded = input.to_vec();
    padded.extend((0..pad_len).map(|k| {
        let first = if k == 0 { 0x01 } else { 0 };
        let last = if k == pad_len - 1 { 0x80 } else { 0 };
        ByteVar::constant(first | last)
    }));

    let mut state: Vec<Lane<F>> = vec![vec![Boolean::FALSE; 64]; 25];
    for block in padded.chunks(RATE) {
        for (i, byte) in block.iter().enumerate() {
            let lane = &mut state[i / 8];
            for (b, bit) in byte.bits.iter().enumerate() {
                let z = (i % 8) * 8 + b;
                lane[z] = lane[z].xor(bit)?;
            }
        }
        keccak_f(&mut state)?;
    }

    (0..32)
        .map(|i| ByteVar::from_bits_le(state[i / 8][(i % 8) * 8..(i % 8) * 8 + 8].to_vec()))
        .collect()
}

fn keccak_f<F: PrimeField>(a: &mut [Lane<F>]) -> Result<(), SynthesisError> {
    for rc in ROUND_CONSTANTS {
        // theta
        let mut c = Vec::with_capacity(5);
        for x in 0..5 {
            let mut col = a[x].clone();
            for y in 1..5 {
                col = xor_lanes(&col, &a[x + 5 * y])?;
            }
            c.push(col);
        }
        for x in 0..5 {
            let d = xor_lanes(&c[(x + 4) % 5], &rotl(&c[(x + 1) % 5], 1))?;
            for y in 0..5 {
                a[x + 5 * y] = xor_lanes(&a[x + 5 * y], &d)?;
            }
        }

        // rho and pi
        let mut b: Vec<Lane<F>> = vec![Vec::new(); 25];
        for x in 0..5 {
            for y in 0..5 {
                b[y + 5 * ((2 * x + 3 * y) % 5)] = rotl(&a[x + 5 * y], RHO[x + 5 * y]);
            }
        }

        // chi
        for y in 0..5 {
            for x in 0..5 {
                let (p, q, r) = (&b[x + 5 * y], &b[(x + 1) % 5 + 5 * y], &b[(x + 2) % 5 + 5 * y]);
                a[x + 5 * y] = (0..64)
                    .map(|z| p[z].xor(&q[z].not().and(&r[z])?))
                    .collect::<Result<_, _>>()?;
            }
        }

        // iota
        for z in 0..64 {
            if (rc >> z) & 1 == 1 {
                a[0][z] = a[0][z].not();
            }
        }
    }
    Ok(())
}

fn xor_lanes<F: PrimeField>(x: &[Boolean<F>], y: &[Boolean<F>]) -> Result<Lane<F>, SynthesisError> {
    x.iter().zip(y).map(|(p, q)| p.xor(q)).collect()
}

fn rotl<F: PrimeField>(lane: &[Boolean<F>], r: usize) -> Lane<F> {
    (0..64).map(|z| lane[(z + 64 - r) % 64].clone()).collect()
}
