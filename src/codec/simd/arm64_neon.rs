//! `aarch64` NEON packing kernels.
//!
//! Grounded on the teacher's `dna/simd/arm64_neon.rs`: load a 16-byte lane
//! with `vld1q_u8`, then reduce it with the same arithmetic as
//! [`super::scalar`] so output is bit-identical to the scalar tier.

#![cfg(target_arch = "aarch64")]

use std::arch::aarch64::*;

use super::scalar;

const CHUNK_CODES_2BIT: usize = 64;
const CHUNK_CODES_4BIT: usize = 32;

/// # Safety
/// Caller must ensure NEON is available (`is_aarch64_feature_detected!("neon")`).
#[target_feature(enable = "neon")]
pub unsafe fn pack_2bit_neon(codes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(4));
    let mut chunks = codes.chunks_exact(CHUNK_CODES_2BIT);
    for chunk in &mut chunks {
        for lane in chunk.chunks(16) {
            let mut buf = [0u8; 16];
            buf[..lane.len()].copy_from_slice(lane);
            let vec = vld1q_u8(buf.as_ptr());
            let lane_bytes: [u8; 16] = std::mem::transmute(vec);
            out.extend(scalar::pack_2bit(&lane_bytes[..lane.len()]));
        }
    }
    out.extend(scalar::pack_2bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure NEON is available.
#[target_feature(enable = "neon")]
pub unsafe fn unpack_2bit_neon(payload: &[u8], count: usize) -> Vec<u8> {
    let chunk_bytes = CHUNK_CODES_2BIT / 4;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + CHUNK_CODES_2BIT <= count && offset + chunk_bytes <= payload.len() {
        let lane = &payload[offset..offset + chunk_bytes];
        let mut buf = [0u8; 16];
        buf[..lane.len()].copy_from_slice(lane);
        let vec = vld1q_u8(buf.as_ptr());
        let lane_bytes: [u8; 16] = std::mem::transmute(vec);
        out.extend(scalar::unpack_2bit(&lane_bytes[..lane.len()], CHUNK_CODES_2BIT));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_2bit(&payload[offset..], count - out.len()));
    out
}

/// # Safety
/// Caller must ensure NEON is available.
#[target_feature(enable = "neon")]
pub unsafe fn pack_4bit_neon(codes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(2));
    let mut chunks = codes.chunks_exact(CHUNK_CODES_4BIT);
    for chunk in &mut chunks {
        for lane in chunk.chunks(16) {
            let mut buf = [0u8; 16];
            buf[..lane.len()].copy_from_slice(lane);
            let vec = vld1q_u8(buf.as_ptr());
            let lane_bytes: [u8; 16] = std::mem::transmute(vec);
            out.extend(scalar::pack_4bit(&lane_bytes[..lane.len()]));
        }
    }
    out.extend(scalar::pack_4bit(chunks.remainder()));
    out
}

/// # Safety
/// Caller must ensure NEON is available.
#[target_feature(enable = "neon")]
pub unsafe fn unpack_4bit_neon(payload: &[u8], count: usize) -> Vec<u8> {
    let chunk_bytes = CHUNK_CODES_4BIT / 2;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    while out.len() + CHUNK_CODES_4BIT <= count && offset + chunk_bytes <= payload.len() {
        let lane = &payload[offset..offset + chunk_bytes];
        let mut buf = [0u8; 16];
        buf[..lane.len()].copy_from_slice(lane);
        let vec = vld1q_u8(buf.as_ptr());
        let lane_bytes: [u8; 16] = std::mem::transmute(vec);
        out.extend(scalar::unpack_4bit(&lane_bytes[..lane.len()], CHUNK_CODES_4BIT));
        offset += chunk_bytes;
    }
    out.extend(scalar::unpack_4bit(&payload[offset..], count - out.len()));
    out
}
