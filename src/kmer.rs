//! K-mer Extractor (C2): emit the ordered uintkey multiset for a packed
//! sequence, including DNA4 degenerate-base expansion.

use hashbrown::HashMap;
use tracing::{debug, instrument};

use crate::codec::{self, PackedDna2, PackedDna4, PackedSequence};
use crate::error::{EngineError, EngineResult};

/// A single window whose degenerate expansion exceeds the cap is dropped
/// rather than erroring out (spec.md §3/§4.2): implementation-defined, kept
/// at the low end of the spec's "≤ 10" allowance.
pub const DEGENERATE_EXPANSION_CAP: usize = 10;

/// The smallest of `{16, 32, 64}` bits that a uintkey of `2k+b` significant
/// bits fits into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintWidth {
    /// 16-bit uintkeys (`2k+b <= 16`).
    U16,
    /// 32-bit uintkeys (`2k+b <= 32`).
    U32,
    /// 64-bit uintkeys (`2k+b <= 64`).
    U64,
}

impl UintWidth {
    /// Select the narrowest width that fits `total_bits` significant bits.
    pub fn select(total_bits: u32) -> EngineResult<Self> {
        match total_bits {
            0..=16 => Ok(Self::U16),
            17..=32 => Ok(Self::U32),
            33..=64 => Ok(Self::U64),
            _ => Err(EngineError::ConfigurationError {
                reason: format!("uintkey width {total_bits} exceeds the 64-bit ceiling"),
            }),
        }
    }
}

/// A uintkey multiset at a fixed element width (spec.md §9's "Union-typed
/// uintkey width" resolution: an enum of fixed-width variants rather than a
/// transmuting union).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UintKeyArray {
    /// 16-bit keys.
    U16(Vec<u16>),
    /// 32-bit keys.
    U32(Vec<u32>),
    /// 64-bit keys.
    U64(Vec<u64>),
}

impl UintKeyArray {
    fn empty(width: UintWidth) -> Self {
        match width {
            UintWidth::U16 => Self::U16(Vec::new()),
            UintWidth::U32 => Self::U32(Vec::new()),
            UintWidth::U64 => Self::U64(Vec::new()),
        }
    }

    fn push_u64(&mut self, value: u64) {
        match self {
            Self::U16(v) => v.push(value as u16),
            Self::U32(v) => v.push(value as u32),
            Self::U64(v) => v.push(value),
        }
    }

    /// Which fixed-width variant this array is.
    #[must_use]
    pub fn width(&self) -> UintWidth {
        match self {
            Self::U16(_) => UintWidth::U16,
            Self::U32(_) => UintWidth::U32,
            Self::U64(_) => UintWidth::U64,
        }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
        }
    }

    /// Whether the array has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the keys widened to `u64`, preserving emission order.
    pub fn iter_u64(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        match self {
            Self::U16(v) => Box::new(v.iter().map(|&x| u64::from(x))),
            Self::U32(v) => Box::new(v.iter().map(|&x| u64::from(x))),
            Self::U64(v) => Box::new(v.iter().copied()),
        }
    }
}

fn uintkey_cap(occur_bitlen: u8) -> u64 {
    if occur_bitlen == 0 {
        0
    } else {
        (1u64 << occur_bitlen) - 1
    }
}

fn kmer_mask(kmer_size: u8) -> u64 {
    let bits = 2u32 * u32::from(kmer_size);
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Emit the ordered uintkey multiset for a DNA2-packed sequence.
///
/// Maintains a rolling 64-bit accumulator of the current window's `2k` low
/// bits and a same-sequence occurrence table keyed by that value, per
/// spec.md §4.2.
#[instrument(skip(seq))]
pub fn extract_from_dna2(seq: &PackedDna2, kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray> {
    let total_bits = 2u32 * u32::from(kmer_size) + u32::from(occur_bitlen);
    let width = UintWidth::select(total_bits)?;

    let bases = {
        let dispatch = codec::simd::dispatch_for(crate::simd_tier::SimdTier::None);
        (dispatch.unpack_2bit)(seq.payload(), seq.nucleotide_len() as usize)
    };
    let len = bases.len();
    let k = kmer_size as usize;
    if len < k {
        return Ok(UintKeyArray::empty(width));
    }

    let mask = kmer_mask(kmer_size);
    let cap = uintkey_cap(occur_bitlen);
    let mut acc: u64 = 0;
    for &code in &bases[..k - 1] {
        acc = (acc << 2) | u64::from(code);
    }

    let mut counts: HashMap<u64, u32> = HashMap::new();
    let mut keys = UintKeyArray::empty(width);
    for &code in &bases[k - 1..] {
        acc = ((acc << 2) | u64::from(code)) & mask;
        let counter = counts.entry(acc).or_insert(0);
        let packed = (acc << occur_bitlen) | cap.min(u64::from(*counter));
        keys.push_u64(packed);
        *counter = counter.saturating_add(1);
    }
    Ok(keys)
}

/// Build the ordered list of candidate 2-bit base codes for each position
/// of a DNA4 sequence (1 candidate for a pure base, up to 4 for a fully
/// degenerate `N`), in ascending `A<C<G<T` order.
fn dna4_candidate_codes(dna4_codes: &[u8]) -> Vec<Vec<u8>> {
    dna4_codes
        .iter()
        .map(|&code| {
            let (_, bases) = codec::dna4_components(code);
            bases
                .iter()
                .enumerate()
                .filter_map(|(base_index, present)| present.then_some(base_index as u8))
                .collect()
        })
        .collect()
}

fn cartesian_product(positions: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut combos = vec![Vec::new()];
    for options in positions {
        let mut next = Vec::with_capacity(combos.len() * options.len());
        for combo in &combos {
            for &code in options {
                let mut extended = combo.clone();
                extended.push(code);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Emit the ordered uintkey multiset for a DNA4-packed sequence, expanding
/// degenerate windows into the Cartesian product of their per-position
/// bases (spec.md §3/§4.2). Windows whose expansion exceeds
/// [`DEGENERATE_EXPANSION_CAP`] are silently dropped (logged at DEBUG).
#[instrument(skip(seq))]
pub fn extract_from_dna4(seq: &PackedDna4, kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray> {
    let total_bits = 2u32 * u32::from(kmer_size) + u32::from(occur_bitlen);
    let width = UintWidth::select(total_bits)?;

    let dna4_codes = seq.base_codes();
    let len = dna4_codes.len();
    let k = kmer_size as usize;
    if len < k {
        return Ok(UintKeyArray::empty(width));
    }

    let mask = kmer_mask(kmer_size);
    let cap = uintkey_cap(occur_bitlen);
    let mut counts: HashMap<u64, u32> = HashMap::new();
    let mut keys = UintKeyArray::empty(width);

    for start in 0..=(len - k) {
        let positions = dna4_candidate_codes(&dna4_codes[start..start + k]);
        let expansion_size: usize = positions.iter().map(Vec::len).product();
        if expansion_size > DEGENERATE_EXPANSION_CAP {
            debug!(position = start, size = expansion_size, cap = DEGENERATE_EXPANSION_CAP, "dropping over-expanded degenerate window");
            continue;
        }
        for combo in cartesian_product(&positions) {
            let mut acc: u64 = 0;
            for &code in &combo {
                acc = (acc << 2) | u64::from(code);
            }
            acc &= mask;
            let counter = counts.entry(acc).or_insert(0);
            let packed = (acc << occur_bitlen) | cap.min(u64::from(*counter));
            keys.push_u64(packed);
            *counter = counter.saturating_add(1);
        }
    }
    Ok(keys)
}

/// Encode `ascii` as DNA4 and extract its uintkey multiset.
pub fn extract_from_text(ascii: &[u8], kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray> {
    let packed = codec::encode_dna4(ascii)?;
    extract_from_dna4(&packed, kmer_size, occur_bitlen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t3_extraction() {
        let seq = PackedDna2::encode(b"AAAC").unwrap();
        let keys = extract_from_dna2(&seq, 3, 2).unwrap();
        assert_eq!(keys, UintKeyArray::U16(vec![0, 4]));
    }

    #[test]
    fn t4_occurrence_counter() {
        let seq = PackedDna2::encode(b"ATATAT").unwrap();
        let keys = extract_from_dna2(&seq, 2, 2).unwrap();
        assert_eq!(keys, UintKeyArray::U16(vec![12, 48, 13, 49, 14]));
    }

    #[test]
    fn t5_degenerate_expansion() {
        let seq = PackedDna4::encode(b"AN").unwrap();
        let keys = extract_from_dna4(&seq, 2, 1).unwrap();
        assert_eq!(keys, UintKeyArray::U16(vec![0, 2, 4, 6]));
    }

    #[test]
    fn extraction_length_matches_spec_formula() {
        let seq = PackedDna2::encode(b"ACGTACGTACGT").unwrap();
        let keys = extract_from_dna2(&seq, 4, 4).unwrap();
        assert_eq!(keys.len(), 12usize.saturating_sub(4) + 1);
    }

    #[test]
    fn shorter_than_k_yields_empty() {
        let seq = PackedDna2::encode(b"AC").unwrap();
        let keys = extract_from_dna2(&seq, 8, 2).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn oversized_expansion_window_is_dropped_not_errored() {
        // k=3 all-N window expands to 4^3=64 > cap; should simply be
        // dropped rather than propagating an error.
        let seq = PackedDna4::encode(b"NNN").unwrap();
        let keys = extract_from_dna4(&seq, 3, 2).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn rejects_oversized_uintkey_width() {
        let seq = PackedDna2::encode(b"ACGTACGT").unwrap();
        assert!(extract_from_dna2(&seq, 32, 16).is_err());
    }
}
