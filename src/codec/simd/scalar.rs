//! Scalar reference implementation of the 2-bit/4-bit packing kernels.
//!
//! This is the tier every other tier is checked against (spec.md §8's "SIMD
//! equivalence" property): every `pack_*`/`unpack_*` variant in the sibling
//! tier modules must reproduce these outputs byte-for-byte. Decoding uses a
//! 256-byte lookup table, mirroring `dna.rs`'s scalar path in the teacher.

use std::sync::OnceLock;

/// `table[byte]` gives the four DNA2 codes (each `0..=3`) packed into that
/// byte, high pair first. Built once on first use.
fn dna2_unpack_table() -> &'static [[u8; 4]; 256] {
    static TABLE: OnceLock<[[u8; 4]; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0u8; 4]; 256];
        let mut byte = 0usize;
        while byte < 256 {
            let b = byte as u8;
            table[byte] = [
                (b >> 6) & 0b11,
                (b >> 4) & 0b11,
                (b >> 2) & 0b11,
                b & 0b11,
            ];
            byte += 1;
        }
        table
    })
}

/// `table[byte]` gives the two DNA4 codes (each `0..=15`) packed into that
/// byte, high nibble first.
fn dna4_unpack_table() -> &'static [[u8; 2]; 256] {
    static TABLE: OnceLock<[[u8; 2]; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0u8; 2]; 256];
        let mut byte = 0usize;
        while byte < 256 {
            let b = byte as u8;
            table[byte] = [(b >> 4) & 0b1111, b & 0b1111];
            byte += 1;
        }
        table
    })
}

/// Pack `codes` (each `0..=3`) into big-endian-within-byte 2-bit fields,
/// base `i` occupying bits `[6-2*(i%4), 7-2*(i%4)]` of byte `i/4`.
pub fn pack_2bit(codes: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; codes.len().div_ceil(4)];
    for (i, &code) in codes.iter().enumerate() {
        let shift = 6 - 2 * (i % 4);
        out[i / 4] |= code << shift;
    }
    out
}

/// Inverse of [`pack_2bit`]: unpack `count` 2-bit codes from `payload`.
pub fn unpack_2bit(payload: &[u8], count: usize) -> Vec<u8> {
    let table = dna2_unpack_table();
    let mut out = Vec::with_capacity(count);
    let mut remaining = count;
    for &byte in payload {
        if remaining == 0 {
            break;
        }
        let quad = table[byte as usize];
        let take = remaining.min(4);
        out.extend_from_slice(&quad[..take]);
        remaining -= take;
    }
    out
}

/// Pack `codes` (each `0..=15`) into big-endian-within-byte 4-bit fields,
/// base `i` occupying the high nibble of byte `i/2` when `i` is even, the
/// low nibble otherwise.
pub fn pack_4bit(codes: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; codes.len().div_ceil(2)];
    for (i, &code) in codes.iter().enumerate() {
        let shift = if i % 2 == 0 { 4 } else { 0 };
        out[i / 2] |= code << shift;
    }
    out
}

/// Inverse of [`pack_4bit`]: unpack `count` 4-bit codes from `payload`.
pub fn unpack_4bit(payload: &[u8], count: usize) -> Vec<u8> {
    let table = dna4_unpack_table();
    let mut out = Vec::with_capacity(count);
    let mut remaining = count;
    for &byte in payload {
        if remaining == 0 {
            break;
        }
        let pair = table[byte as usize];
        let take = remaining.min(2);
        out.extend_from_slice(&pair[..take]);
        remaining -= take;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_2bit_matches_spec_t1() {
        // "ACGTACGT" -> A=00 C=01 G=10 T=11 repeated twice.
        let codes = [0u8, 1, 2, 3, 0, 1, 2, 3];
        assert_eq!(pack_2bit(&codes), vec![0x1B, 0x1B]);
    }

    #[test]
    fn unpack_2bit_roundtrips() {
        let codes = [0u8, 1, 2, 3, 0, 1, 2, 3];
        let packed = pack_2bit(&codes);
        assert_eq!(unpack_2bit(&packed, codes.len()), codes);
    }

    #[test]
    fn pack_4bit_roundtrips_odd_length() {
        let codes = [1u8, 2, 4, 8, 15];
        let packed = pack_4bit(&codes);
        assert_eq!(unpack_4bit(&packed, codes.len()), codes);
    }
}
