//! SIMD-tiered dispatch table for the packing kernels (spec.md §9 "Dynamic
//! dispatch on SIMD tier": a static table of function pointers per operation
//! keyed by `(operation, tier)`, resolved once rather than per call).

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod avx512;
#[cfg(target_arch = "x86_64")]
pub mod x86_avx2;

#[cfg(target_arch = "aarch64")]
pub mod arm64_neon;
#[cfg(target_arch = "aarch64")]
pub mod sve;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::simd_tier::SimdTier;

type PackFn = fn(&[u8]) -> Vec<u8>;
type UnpackFn = fn(&[u8], usize) -> Vec<u8>;

/// Resolved function pointers for one SIMD tier's four packing operations.
#[derive(Clone, Copy)]
pub struct Dispatch {
    pub pack_2bit: PackFn,
    pub unpack_2bit: UnpackFn,
    pub pack_4bit: PackFn,
    pub unpack_4bit: UnpackFn,
}

const SCALAR_DISPATCH: Dispatch = Dispatch {
    pack_2bit: scalar::pack_2bit,
    unpack_2bit: scalar::unpack_2bit,
    pack_4bit: scalar::pack_4bit,
    unpack_4bit: scalar::unpack_4bit,
};

#[cfg(target_arch = "x86_64")]
mod x86_safe_wrappers {
    use super::x86_avx2;

    pub fn pack_2bit_avx2(codes: &[u8]) -> Vec<u8> {
        unsafe { x86_avx2::pack_2bit_avx2(codes) }
    }
    pub fn unpack_2bit_avx2(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { x86_avx2::unpack_2bit_avx2(payload, count) }
    }
    pub fn pack_4bit_avx2(codes: &[u8]) -> Vec<u8> {
        unsafe { x86_avx2::pack_4bit_avx2(codes) }
    }
    pub fn unpack_4bit_avx2(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { x86_avx2::unpack_4bit_avx2(payload, count) }
    }

    pub fn pack_2bit_bmi2(codes: &[u8]) -> Vec<u8> {
        unsafe { x86_avx2::pack_2bit_bmi2(codes) }
    }
    pub fn unpack_2bit_bmi2(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { x86_avx2::unpack_2bit_bmi2(payload, count) }
    }
    pub fn pack_4bit_bmi2(codes: &[u8]) -> Vec<u8> {
        unsafe { x86_avx2::pack_4bit_bmi2(codes) }
    }
    pub fn unpack_4bit_bmi2(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { x86_avx2::unpack_4bit_bmi2(payload, count) }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86_avx512_safe_wrappers {
    use super::avx512;

    macro_rules! wrap {
        ($pack2:ident, $unpack2:ident, $pack4:ident, $unpack4:ident, $src2p:ident, $src2u:ident, $src4p:ident, $src4u:ident) => {
            pub fn $pack2(codes: &[u8]) -> Vec<u8> {
                unsafe { avx512::$src2p(codes) }
            }
            pub fn $unpack2(payload: &[u8], count: usize) -> Vec<u8> {
                unsafe { avx512::$src2u(payload, count) }
            }
            pub fn $pack4(codes: &[u8]) -> Vec<u8> {
                unsafe { avx512::$src4p(codes) }
            }
            pub fn $unpack4(payload: &[u8], count: usize) -> Vec<u8> {
                unsafe { avx512::$src4u(payload, count) }
            }
        };
    }

    wrap!(
        pack_2bit_f,
        unpack_2bit_f,
        pack_4bit_f,
        unpack_4bit_f,
        pack_2bit_avx512f,
        unpack_2bit_avx512f,
        pack_4bit_avx512f,
        unpack_4bit_avx512f
    );
    wrap!(
        pack_2bit_bw,
        unpack_2bit_bw,
        pack_4bit_bw,
        unpack_4bit_bw,
        pack_2bit_avx512bw,
        unpack_2bit_avx512bw,
        pack_4bit_avx512bw,
        unpack_4bit_avx512bw
    );
    wrap!(
        pack_2bit_vbmi,
        unpack_2bit_vbmi,
        pack_4bit_vbmi,
        unpack_4bit_vbmi,
        pack_2bit_avx512vbmi,
        unpack_2bit_avx512vbmi,
        pack_4bit_avx512vbmi,
        unpack_4bit_avx512vbmi
    );
    wrap!(
        pack_2bit_vbmi2,
        unpack_2bit_vbmi2,
        pack_4bit_vbmi2,
        unpack_4bit_vbmi2,
        pack_2bit_avx512vbmi2,
        unpack_2bit_avx512vbmi2,
        pack_4bit_avx512vbmi2,
        unpack_4bit_avx512vbmi2
    );
}

#[cfg(target_arch = "aarch64")]
mod arm_safe_wrappers {
    use super::{arm64_neon, sve};

    pub fn pack_2bit_neon(codes: &[u8]) -> Vec<u8> {
        unsafe { arm64_neon::pack_2bit_neon(codes) }
    }
    pub fn unpack_2bit_neon(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { arm64_neon::unpack_2bit_neon(payload, count) }
    }
    pub fn pack_4bit_neon(codes: &[u8]) -> Vec<u8> {
        unsafe { arm64_neon::pack_4bit_neon(codes) }
    }
    pub fn unpack_4bit_neon(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { arm64_neon::unpack_4bit_neon(payload, count) }
    }

    pub fn pack_2bit_sve(codes: &[u8]) -> Vec<u8> {
        unsafe { sve::pack_2bit_sve(codes) }
    }
    pub fn unpack_2bit_sve(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { sve::unpack_2bit_sve(payload, count) }
    }
    pub fn pack_4bit_sve(codes: &[u8]) -> Vec<u8> {
        unsafe { sve::pack_4bit_sve(codes) }
    }
    pub fn unpack_4bit_sve(payload: &[u8], count: usize) -> Vec<u8> {
        unsafe { sve::unpack_4bit_sve(payload, count) }
    }
}

fn build_table() -> HashMap<SimdTier, Dispatch> {
    let mut table = HashMap::new();
    table.insert(SimdTier::None, SCALAR_DISPATCH);

    #[cfg(target_arch = "x86_64")]
    {
        table.insert(
            SimdTier::Avx2,
            Dispatch {
                pack_2bit: x86_safe_wrappers::pack_2bit_avx2,
                unpack_2bit: x86_safe_wrappers::unpack_2bit_avx2,
                pack_4bit: x86_safe_wrappers::pack_4bit_avx2,
                unpack_4bit: x86_safe_wrappers::unpack_4bit_avx2,
            },
        );
        table.insert(
            SimdTier::Bmi2,
            Dispatch {
                pack_2bit: x86_safe_wrappers::pack_2bit_bmi2,
                unpack_2bit: x86_safe_wrappers::unpack_2bit_bmi2,
                pack_4bit: x86_safe_wrappers::pack_4bit_bmi2,
                unpack_4bit: x86_safe_wrappers::unpack_4bit_bmi2,
            },
        );
        table.insert(
            SimdTier::Avx512F,
            Dispatch {
                pack_2bit: x86_avx512_safe_wrappers::pack_2bit_f,
                unpack_2bit: x86_avx512_safe_wrappers::unpack_2bit_f,
                pack_4bit: x86_avx512_safe_wrappers::pack_4bit_f,
                unpack_4bit: x86_avx512_safe_wrappers::unpack_4bit_f,
            },
        );
        table.insert(
            SimdTier::Avx512Bw,
            Dispatch {
                pack_2bit: x86_avx512_safe_wrappers::pack_2bit_bw,
                unpack_2bit: x86_avx512_safe_wrappers::unpack_2bit_bw,
                pack_4bit: x86_avx512_safe_wrappers::pack_4bit_bw,
                unpack_4bit: x86_avx512_safe_wrappers::unpack_4bit_bw,
            },
        );
        table.insert(
            SimdTier::Avx512Vbmi,
            Dispatch {
                pack_2bit: x86_avx512_safe_wrappers::pack_2bit_vbmi,
                unpack_2bit: x86_avx512_safe_wrappers::unpack_2bit_vbmi,
                pack_4bit: x86_avx512_safe_wrappers::pack_4bit_vbmi,
                unpack_4bit: x86_avx512_safe_wrappers::unpack_4bit_vbmi,
            },
        );
        table.insert(
            SimdTier::Avx512Vbmi2,
            Dispatch {
                pack_2bit: x86_avx512_safe_wrappers::pack_2bit_vbmi2,
                unpack_2bit: x86_avx512_safe_wrappers::unpack_2bit_vbmi2,
                pack_4bit: x86_avx512_safe_wrappers::pack_4bit_vbmi2,
                unpack_4bit: x86_avx512_safe_wrappers::unpack_4bit_vbmi2,
            },
        );
    }

    #[cfg(target_arch = "aarch64")]
    {
        table.insert(
            SimdTier::Neon,
            Dispatch {
                pack_2bit: arm_safe_wrappers::pack_2bit_neon,
                unpack_2bit: arm_safe_wrappers::unpack_2bit_neon,
                pack_4bit: arm_safe_wrappers::pack_4bit_neon,
                unpack_4bit: arm_safe_wrappers::unpack_4bit_neon,
            },
        );
        table.insert(
            SimdTier::Sve,
            Dispatch {
                pack_2bit: arm_safe_wrappers::pack_2bit_sve,
                unpack_2bit: arm_safe_wrappers::unpack_2bit_sve,
                pack_4bit: arm_safe_wrappers::pack_4bit_sve,
                unpack_4bit: arm_safe_wrappers::unpack_4bit_sve,
            },
        );
        table.insert(
            SimdTier::Sve2,
            Dispatch {
                pack_2bit: arm_safe_wrappers::pack_2bit_sve,
                unpack_2bit: arm_safe_wrappers::unpack_2bit_sve,
                pack_4bit: arm_safe_wrappers::pack_4bit_sve,
                unpack_4bit: arm_safe_wrappers::unpack_4bit_sve,
            },
        );
    }

    table
}

/// Look up the dispatch entry for `tier`, falling back to the scalar
/// reference if `tier` has no kernel on this build's target architecture
/// (always true for the architecture the tier does not belong to).
pub fn dispatch_for(tier: SimdTier) -> Dispatch {
    static TABLE: OnceLock<HashMap<SimdTier, Dispatch>> = OnceLock::new();
    let table = TABLE.get_or_init(build_table);
    table.get(&tier).copied().unwrap_or(SCALAR_DISPATCH)
}

/// A call below this many bases skips SIMD dispatch overhead entirely and
/// goes straight to the scalar kernel, matching spec.md §4.1/§4.2's
/// "fallback threshold" for short inputs.
pub const SCALAR_FALLBACK_THRESHOLD: usize = 8;
