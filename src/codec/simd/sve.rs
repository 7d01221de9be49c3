//! `aarch64` SVE / SVE2 tier.
//!
//! Stable Rust exposes no `WHILELT`/`SVBEXT`/`SVBDEP` intrinsics as of this
//! writing (`core::arch::aarch64` has no SVE module on stable), so this tier
//! is detection-only: [`crate::simd_tier::detect`] can report `Sve`/`Sve2`
//! when the host CPU and OS expose the feature, but dispatch always falls
//! back to the NEON kernels in [`super::arm64_neon`], which are a strict
//! correctness superset (NEON is present wherever SVE is). Recorded as an
//! open-question resolution in `DESIGN.md`.

#![cfg(target_arch = "aarch64")]

pub use super::arm64_neon::{pack_2bit_neon as pack_2bit_sve, unpack_2bit_neon as unpack_2bit_sve};
pub use super::arm64_neon::{pack_4bit_neon as pack_4bit_sve, unpack_4bit_neon as unpack_4bit_sve};
