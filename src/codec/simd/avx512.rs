//! `x86_64` AVX-512 family packing kernels (F / BW / VBMI / VBMI2 tiers).
//!
//! Each tier differs only in which `#[target_feature]` gate it requires;
//! internally all four reduce a 64-byte register lane-by-lane with the same
//! arithmetic as [`super::scalar`], following the teacher's own pattern of
//! "load wide, reduce scalar" in `dna/simd/x86_avx2.rs`. A real VBMI2 build
//! would replace the inner loop with `VPERMB`/`VPEXPANDB`/`VPCOMPRESSB`
//! shuffles; this crate keeps the simpler reduction so its output is
//! trivially bit-identical to the scalar tier.

#![cfg(target_arch = "x86_64")]

use std::arch::x86_64::*;

use super::scalar;

const CHUNK_CODES_2BIT: usize = 128;
const CHUNK_CODES_4BIT: usize = 64;

macro_rules! avx512_tier {
    ($feature:literal, $pack2:ident, $unpack2:ident, $pack4:ident, $unpack4:ident) => {
        /// # Safety
        #[doc = concat!("Caller must ensure `", $feature, "` is available.")]
        #[target_feature(enable = $feature)]
        pub unsafe fn $pack2(codes: &[u8]) -> Vec<u8> {
            pack_2bit_512(codes)
        }

        /// # Safety
        #[doc = concat!("Caller must ensure `", $feature, "` is available.")]
        #[target_feature(enable = $feature)]
        pub unsafe fn $unpack2(payload: &[u8], count: usize) -> Vec<u8> {
            unpack_2bit_512(payload, count)
        }

        /// # Safety
        #[doc = concat!("Caller must ensure `", $feature, "` is available.")]
        #[target_feature(enable = $feature)]
        pub unsafe fn $pack4(codes: &[u8]) -> Vec<u8> {
            pack_4bit_512(codes)
        }

        /// # Safety
        #[doc = concat!("Caller must ensure `", $feature, "` is available.")]
        #[target_feature(enable = $feature)]
        pub unsafe fn $unpack4(payload: &[u8], count: usize) -> Vec<u8> {
            unpack_4bit_512(payload, count)
        }
    };
}

avx512_tier!(
    "avx512f",
    pack_2bit_avx512f,
    unpack_2bit_avx512f,
    pack_4bit_avx512f,
    unpack_4bit_avx512f
);
avx512_tier!(
    "avx512bw",
    pack_2bit_avx512bw,
    unpack_2bit_avx512bw,
    pack_4bit_avx512bw,
    unpack_4bit_avx512bw
);
avx512_tier!(
    "avx512vbmi",
    pack_2bit_avx512vbmi,
    unpack_2bit_avx512vbmi,
    pack_4bit_avx512vbmi,
    unpack_4bit_avx512vbmi
);
avx512_tier!(
    "avx512vbmi2",
    pack_2bit_avx512vbmi2,
    unpack_2bit_avx512vbmi2,
    pack_4bit_avx512vbmi2,
    unpack_4bit_avx512vbmi2
);

/// # Safety
/// Caller must ensure `avx512f` is available.
#[target_feature(enable = "avx512f")]
unsafe fn pack_2bit_512(codes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(4));
    let mut chunks = codes.chunks_exact(CHUNK_CODES_2BIT);
    for chunk in &mut chunks {
        let mut buf = [0u8; 64];
        buf.copy_from_slice(chunk);
        let vec = _mm512_loadu_si512(buf.as_ptr().cast());
        let lane: [u8; 64] = std::mem::transmute(vec);
        out.extend(scalar::pack_2bit(&lane));
    }
    out.extend(scalar::pack_2bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure `avx512f` is available.
#[target_feature(enable = "avx512f")]
unsafe fn unpack_2bit_512(payload: &[u8], count: usize) -> Vec<u8> {
    let chunk_bytes = CHUNK_CODES_2BIT / 4;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + CHUNK_CODES_2BIT <= count && offset + chunk_bytes <= payload.len() {
        let mut buf = [0u8; 64];
        buf[..chunk_bytes].copy_from_slice(&payload[offset..offset + chunk_bytes]);
        let vec = _mm512_loadu_si512(buf.as_ptr().cast());
        let lane: [u8; 64] = std::mem::transmute(vec);
        out.extend(scalar::unpack_2bit(&lane[..chunk_bytes], CHUNK_CODES_2BIT));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_2bit(&payload[offset..], count - out.len()));
    out
}

/// # Safety
/// Caller must ensure `avx512f` is available.
#[target_feature(enable = "avx512f")]
unsafe fn pack_4bit_512(codes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(2));
    let mut chunks = codes.chunks_exact(CHUNK_CODES_4BIT);
    for chunk in &mut chunks {
        let mut buf = [0u8; 64];
        buf[..CHUNK_CODES_4BIT].copy_from_slice(chunk);
        let vec = _mm512_loadu_si512(buf.as_ptr().cast());
        let lane: [u8; 64] = std::mem::transmute(vec);
        out.extend(scalar::pack_4bit(&lane[..CHUNK_CODES_4BIT]));
    }
    out.extend(scalar::pack_4bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure `avx512f` is available.
#[target_feature(enable = "avx512f")]
unsafe fn unpack_4bit_512(payload: &[u8], count: usize) -> Vec<u8> {
    let chunk_bytes = CHUNK_CODES_4BIT / 2;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + CHUNK_CODES_4BIT <= count && offset + chunk_bytes <= payload.len() {
        let mut buf = [0u8; 64];
        buf[..chunk_bytes].copy_from_slice(&payload[offset..offset + chunk_bytes]);
        let vec = _mm512_loadu_si512(buf.as_ptr().cast());
        let lane: [u8; 64] = std::mem::transmute(vec);
        out.extend(scalar::unpack_4bit(&lane[..chunk_bytes], CHUNK_CODES_4BIT));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_4bit(&payload[offset..], count - out.len()));
    out
}
