//! Codec (C1): bijective ASCII↔packed conversion for DNA2 and DNA4, plus
//! lexicographic byte comparison and the wire/btree/hash support functions
//! spec.md §6 exposes at the crate boundary.
//!
//! Grounded on the teacher's `dna.rs` + `dna/simd/*` split: a scalar
//! reference implementation lives in [`codec::simd::scalar`], SIMD-tiered
//! alternatives live in the sibling arch-gated modules, and
//! [`codec::simd::dispatch_for`] resolves which one a given call uses.

pub mod simd;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use tracing::{debug, instrument};

use crate::error::{EngineError, EngineResult};
use crate::simd_tier::SimdTier;

/// Shared behavior of [`PackedDna2`] and [`PackedDna4`] (spec.md §9's
/// "Inheritance across DNA2/DNA4 types" resolution: a shared trait instead
/// of a base class).
pub trait PackedSequence: Sized + Clone + std::fmt::Debug {
    /// Bits used to represent one base (`2` for DNA2, `4` for DNA4).
    const BITS_PER_BASE: u32;

    /// Total bit-length of the packed payload.
    fn bit_len(&self) -> u32;

    /// The packed payload bytes.
    fn payload(&self) -> &[u8];

    /// Number of bases represented.
    fn nucleotide_len(&self) -> u32 {
        self.bit_len() / Self::BITS_PER_BASE
    }

    /// Build a value from an already-packed payload. Callers must ensure
    /// `payload.len() == bit_len.div_ceil(8)` and that trailing pad bits
    /// are zero; this is an internal/deserialization constructor, not a
    /// validating one.
    fn from_parts(bit_len: u32, payload: Vec<u8>) -> Self;

    /// Parse an ASCII sequence using the host CPU's auto-detected SIMD tier.
    fn encode(ascii: &[u8]) -> EngineResult<Self>;

    /// Render back to an uppercase ASCII string.
    fn decode(&self) -> String;
}

fn wire_encode(bit_len: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&bit_len.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn wire_decode(bytes: &[u8]) -> EngineResult<(u32, Vec<u8>)> {
    if bytes.len() < 4 {
        return Err(EngineError::DimensionMismatch {
            reason: format!("wire payload too short: {} bytes, need at least 4", bytes.len()),
        });
    }
    let bit_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let expected_payload_len = (bit_len as usize).div_ceil(8);
    let payload = &bytes[4..];
    if payload.len() != expected_payload_len {
        return Err(EngineError::DimensionMismatch {
            reason: format!(
                "wire payload length {} does not match bit-length {bit_len} (expected {expected_payload_len})",
                payload.len()
            ),
        });
    }
    Ok((bit_len, payload.to_vec()))
}

/// Byte-wise unsigned comparison of two payloads known to share a
/// bit-length. Comparing payloads of differing bit-length is a programmer
/// error (spec.md §4.1): it panics in debug builds and is unspecified
/// (but memory-safe) in release.
#[must_use]
pub fn compare_payload(a_payload: &[u8], a_bitlen: u32, b_payload: &[u8], b_bitlen: u32) -> Ordering {
    debug_assert_eq!(
        a_bitlen, b_bitlen,
        "compare() requires equal bit-lengths; use the btree total order for mixed lengths"
    );
    a_payload.cmp(b_payload)
}

/// 32-bit seeded hash over raw payload bytes (spec.md §6 hash-support).
#[must_use]
pub fn hash32_seeded(payload: &[u8], seed: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(payload);
    hasher.finalize()
}

/// 64-bit seeded hash over raw payload bytes (spec.md §6 hash-support).
/// FNV-1a with the seed folded into the offset basis; no pack example
/// ships a seeded-64-bit-hash crate, so this is hand-rolled (see
/// `DESIGN.md`).
#[must_use]
pub fn hash64_seeded(payload: &[u8], seed: u64) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET_BASIS ^ seed;
    for &byte in payload {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Decompose a 4-bit DNA4 code into its base count and `[A, C, G, T]`
/// membership, replacing spec.md §4.2's 16-entry table with a direct bit
/// test over the same bitmask the codec already stores.
#[must_use]
pub fn dna4_components(code: u8) -> (u32, [bool; 4]) {
    let bases = [code & 0b0001 != 0, code & 0b0010 != 0, code & 0b0100 != 0, code & 0b1000 != 0];
    let count = bases.iter().filter(|present| **present).count() as u32;
    (count, bases)
}

fn effective_pack_tier(tier: SimdTier, len: usize) -> SimdTier {
    if len < simd::SCALAR_FALLBACK_THRESHOLD {
        SimdTier::None
    } else {
        tier
    }
}

fn validate_dna2(ascii: &[u8]) -> EngineResult<Vec<u8>> {
    let mut codes = Vec::with_capacity(ascii.len());
    for (position, &byte) in ascii.iter().enumerate() {
        let code = match byte.to_ascii_uppercase() {
            b'A' => 0u8,
            b'C' => 1,
            b'G' => 2,
            b'T' | b'U' => 3,
            _ => return Err(EngineError::InvalidEncoding { byte, position }),
        };
        codes.push(code);
    }
    Ok(codes)
}

const DNA2_DECODE: [u8; 4] = [b'A', b'C', b'G', b'T'];

fn dna4_encode_table() -> &'static [Option<u8>; 256] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[Option<u8>; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [None; 256];
        let entries: [(u8, u8); 20] = [
            (b'A', 0b0001),
            (b'C', 0b0010),
            (b'G', 0b0100),
            (b'T', 0b1000),
            (b'U', 0b1000),
            (b'M', 0b0011),
            (b'R', 0b0101),
            (b'W', 0b1001),
            (b'S', 0b0110),
            (b'Y', 0b1010),
            (b'K', 0b1100),
            (b'V', 0b0111),
            (b'H', 0b1011),
            (b'D', 0b1101),
            (b'B', 0b1110),
            (b'N', 0b1111),
            (b'a', 0b0001),
            (b'c', 0b0010),
            (b'g', 0b0100),
            (b't', 0b1000),
        ];
        for (byte, code) in entries {
            table[byte as usize] = Some(code);
        }
        for byte in [b'm', b'r', b'w', b's', b'y', b'k', b'v', b'h', b'd', b'b', b'n', b'u'] {
            table[byte as usize] = table[byte.to_ascii_uppercase() as usize];
        }
        table
    })
}

// 4-bit DNA4 code -> uppercase IUPAC character. `0000` (index 0) is the
// forbidden all-zero code; decoded defensively as `?`.
const DNA4_DECODE: [u8; 16] = [
    b'?', b'A', b'C', b'M', b'G', b'R', b'S', b'V', b'T', b'W', b'Y', b'H', b'K', b'D', b'B', b'N',
];

fn validate_dna4(ascii: &[u8]) -> EngineResult<Vec<u8>> {
    let table = dna4_encode_table();
    let mut codes = Vec::with_capacity(ascii.len());
    for (position, &byte) in ascii.iter().enumerate() {
        match table[byte as usize] {
            Some(code) => codes.push(code),
            None => return Err(EngineError::InvalidEncoding { byte, position }),
        }
    }
    Ok(codes)
}

/// A bit-packed DNA2 sequence: two bits per base, A/C/G/T only (U aliases
/// T on encode). Immutable once built.
#[derive(Debug, Clone, Eq)]
pub struct PackedDna2 {
    bit_len: u32,
    payload: Vec<u8>,
}

impl PartialEq for PackedDna2 {
    fn eq(&self, other: &Self) -> bool {
        self.bit_len == other.bit_len && self.payload == other.payload
    }
}

impl Hash for PackedDna2 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Bit-length is deliberately excluded: equal values always share
        // equal bit-length (see `PartialEq`), and the `Hash`/`Eq` contract
        // only requires equal values to hash equally, not the converse.
        self.payload.hash(state);
    }
}

impl PartialOrd for PackedDna2 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackedDna2 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bit_len.cmp(&other.bit_len).then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PackedSequence for PackedDna2 {
    const BITS_PER_BASE: u32 = 2;

    fn bit_len(&self) -> u32 {
        self.bit_len
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn from_parts(bit_len: u32, payload: Vec<u8>) -> Self {
        Self { bit_len, payload }
    }

    fn encode(ascii: &[u8]) -> EngineResult<Self> {
        encode_dna2_with_tier(ascii, crate::simd_tier::detect())
    }

    fn decode(&self) -> String {
        decode_dna2_with_tier(self, crate::simd_tier::detect())
    }
}

impl PackedDna2 {
    /// `{bit-length: int32-be, payload}` — the stable, framing-free form
    /// used for external hashing (spec.md §6).
    #[must_use]
    pub fn to_bytea(&self) -> Vec<u8> {
        wire_encode(self.bit_len, &self.payload)
    }

    /// The host wire-protocol `send` representation. Bit-identical to
    /// [`Self::to_bytea`] today; kept as a distinct method because the two
    /// are conceptually different contracts (spec.md §9 open question).
    #[must_use]
    pub fn send(&self) -> Vec<u8> {
        wire_encode(self.bit_len, &self.payload)
    }

    /// Inverse of [`Self::send`].
    pub fn recv(bytes: &[u8]) -> EngineResult<Self> {
        let (bit_len, payload) = wire_decode(bytes)?;
        if !bit_len.is_multiple_of(2) {
            return Err(EngineError::DimensionMismatch {
                reason: format!("DNA2 bit-length {bit_len} is not a multiple of 2"),
            });
        }
        Ok(Self { bit_len, payload })
    }
}

/// A bit-packed DNA4 sequence: four bits per base, an IUPAC union-of-bases
/// bitmask. Immutable once built.
#[derive(Debug, Clone, Eq)]
pub struct PackedDna4 {
    bit_len: u32,
    payload: Vec<u8>,
}

impl PartialEq for PackedDna4 {
    fn eq(&self, other: &Self) -> bool {
        self.bit_len == other.bit_len && self.payload == other.payload
    }
}

impl Hash for PackedDna4 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

impl PartialOrd for PackedDna4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackedDna4 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bit_len.cmp(&other.bit_len).then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PackedSequence for PackedDna4 {
    const BITS_PER_BASE: u32 = 4;

    fn bit_len(&self) -> u32 {
        self.bit_len
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn from_parts(bit_len: u32, payload: Vec<u8>) -> Self {
        Self { bit_len, payload }
    }

    fn encode(ascii: &[u8]) -> EngineResult<Self> {
        encode_dna4_with_tier(ascii, crate::simd_tier::detect())
    }

    fn decode(&self) -> String {
        decode_dna4_with_tier(self, crate::simd_tier::detect())
    }
}

impl PackedDna4 {
    /// See [`PackedDna2::to_bytea`].
    #[must_use]
    pub fn to_bytea(&self) -> Vec<u8> {
        wire_encode(self.bit_len, &self.payload)
    }

    /// See [`PackedDna2::send`].
    #[must_use]
    pub fn send(&self) -> Vec<u8> {
        wire_encode(self.bit_len, &self.payload)
    }

    /// Inverse of [`Self::send`].
    pub fn recv(bytes: &[u8]) -> EngineResult<Self> {
        let (bit_len, payload) = wire_decode(bytes)?;
        if !bit_len.is_multiple_of(4) {
            return Err(EngineError::DimensionMismatch {
                reason: format!("DNA4 bit-length {bit_len} is not a multiple of 4"),
            });
        }
        Ok(Self { bit_len, payload })
    }

    /// Per-base `(count, [A,C,G,T])` membership for every base in the
    /// sequence, used by the k-mer extractor's degenerate expansion.
    pub(crate) fn base_codes(&self) -> Vec<u8> {
        let d = simd::dispatch_for(SimdTier::None);
        (d.unpack_4bit)(&self.payload, self.nucleotide_len() as usize)
    }
}

/// Encode an ASCII DNA2 string, dispatching the packing step at `tier`
/// (clamped down to scalar for inputs shorter than
/// [`simd::SCALAR_FALLBACK_THRESHOLD`]).
#[instrument(skip(ascii), fields(len = ascii.len()))]
pub fn encode_dna2_with_tier(ascii: &[u8], tier: SimdTier) -> EngineResult<PackedDna2> {
    let codes = validate_dna2(ascii)?;
    let effective = effective_pack_tier(tier, codes.len());
    debug!(?effective, "encode_dna2 dispatch");
    let dispatch = simd::dispatch_for(effective);
    let payload = (dispatch.pack_2bit)(&codes);
    Ok(PackedDna2 { bit_len: codes.len() as u32 * 2, payload })
}

/// See [`encode_dna2_with_tier`]; uses the host's auto-detected tier.
pub fn encode_dna2(ascii: &[u8]) -> EngineResult<PackedDna2> {
    encode_dna2_with_tier(ascii, crate::simd_tier::detect())
}

/// Decode a DNA2 payload to its uppercase ASCII form (`T`, never `U`).
#[instrument(skip(seq))]
pub fn decode_dna2_with_tier(seq: &PackedDna2, tier: SimdTier) -> String {
    let count = seq.nucleotide_len() as usize;
    let effective = effective_pack_tier(tier, count);
    let dispatch = simd::dispatch_for(effective);
    let codes = (dispatch.unpack_2bit)(&seq.payload, count);
    codes.into_iter().map(|c| DNA2_DECODE[c as usize] as char).collect()
}

/// See [`decode_dna2_with_tier`]; uses the host's auto-detected tier.
pub fn decode_dna2(seq: &PackedDna2) -> String {
    decode_dna2_with_tier(seq, crate::simd_tier::detect())
}

/// Encode an ASCII DNA4 string (IUPAC alphabet), dispatching the packing
/// step at `tier`.
#[instrument(skip(ascii), fields(len = ascii.len()))]
pub fn encode_dna4_with_tier(ascii: &[u8], tier: SimdTier) -> EngineResult<PackedDna4> {
    let codes = validate_dna4(ascii)?;
    let effective = effective_pack_tier(tier, codes.len());
    debug!(?effective, "encode_dna4 dispatch");
    let dispatch = simd::dispatch_for(effective);
    let payload = (dispatch.pack_4bit)(&codes);
    Ok(PackedDna4 { bit_len: codes.len() as u32 * 4, payload })
}

/// See [`encode_dna4_with_tier`]; uses the host's auto-detected tier.
pub fn encode_dna4(ascii: &[u8]) -> EngineResult<PackedDna4> {
    encode_dna4_with_tier(ascii, crate::simd_tier::detect())
}

/// Decode a DNA4 payload to its uppercase IUPAC ASCII form. Emits `?` for
/// the forbidden `0000` code (defensive; should never occur for values
/// this codec produced itself).
#[instrument(skip(seq))]
pub fn decode_dna4_with_tier(seq: &PackedDna4, tier: SimdTier) -> String {
    let count = seq.nucleotide_len() as usize;
    let effective = effective_pack_tier(tier, count);
    let dispatch = simd::dispatch_for(effective);
    let codes = (dispatch.unpack_4bit)(&seq.payload, count);
    codes.into_iter().map(|c| DNA4_DECODE[c as usize] as char).collect()
}

/// See [`decode_dna4_with_tier`]; uses the host's auto-detected tier.
pub fn decode_dna4(seq: &PackedDna4) -> String {
    decode_dna4_with_tier(seq, crate::simd_tier::detect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t1_round_trip_dna2() {
        let packed = encode_dna2(b"ACGTACGT").unwrap();
        assert_eq!(packed.bit_len(), 16);
        assert_eq!(packed.payload(), &[0x1B, 0x1B]);
        assert_eq!(packed.nucleotide_len(), 8);
        assert_eq!(decode_dna2(&packed), "ACGTACGT");
    }

    #[test]
    fn t2_u_normalization_dna4() {
        let packed = encode_dna4(b"AUGCN").unwrap();
        assert_eq!(decode_dna4(&packed), "ATGCN");
    }

    #[test]
    fn encode_dna2_rejects_invalid_byte() {
        let err = encode_dna2(b"ACGX").unwrap_err();
        assert_eq!(err, EngineError::InvalidEncoding { byte: b'X', position: 3 });
    }

    #[test]
    fn dna4_code_zero_is_never_produced_and_decodes_defensively() {
        assert_eq!(DNA4_DECODE[0], b'?');
        for byte in b"ACGTUMRWSYKVHDBNacgtumrwsykvhdbn" {
            let code = dna4_encode_table()[*byte as usize].unwrap();
            assert_ne!(code, 0);
        }
    }

    #[test]
    fn compare_payload_orders_bytewise() {
        let a = encode_dna2(b"AAAA").unwrap();
        let b = encode_dna2(b"AAAC").unwrap();
        assert_eq!(compare_payload(a.payload(), a.bit_len(), b.payload(), b.bit_len()), Ordering::Less);
    }

    #[test]
    fn ord_sorts_by_bitlen_then_payload() {
        let short = encode_dna2(b"AA").unwrap();
        let long = encode_dna2(b"AAAA").unwrap();
        assert_eq!(short.cmp(&long), Ordering::Less);
    }

    #[test]
    fn hash_ignores_bit_len_but_eq_requires_it() {
        use std::collections::hash_map::DefaultHasher;
        let a = PackedDna2::from_parts(8, vec![0x00]);
        let b = PackedDna2::from_parts(16, vec![0x00]);
        assert_ne!(a, b);
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn wire_roundtrip() {
        let packed = encode_dna2(b"ACGTACGT").unwrap();
        let bytes = packed.send();
        let back = PackedDna2::recv(&bytes).unwrap();
        assert_eq!(packed, back);
        assert_eq!(packed.to_bytea(), packed.send());
    }

    #[test]
    fn hash32_seeded_is_deterministic() {
        let a = hash32_seeded(b"ACGT", 42);
        let b = hash32_seeded(b"ACGT", 42);
        let c = hash32_seeded(b"ACGT", 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hash64_seeded_is_deterministic() {
        let a = hash64_seeded(b"ACGT", 42);
        let b = hash64_seeded(b"ACGT", 42);
        let c = hash64_seeded(b"ACGT", 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dna4_components_counts_degenerate_bases() {
        let (count, bases) = dna4_components(0b1111);
        assert_eq!(count, 4);
        assert_eq!(bases, [true, true, true, true]);
        let (count_n, bases_a) = dna4_components(0b0001);
        assert_eq!(count_n, 1);
        assert_eq!(bases_a, [true, false, false, false]);
    }
}
