//! CPU feature detection and SIMD dispatch (C7, runtime half).
//!
//! Grounded on `neuroquantum-core`'s `dna/simd/mod.rs::SimdCapabilities`,
//! generalized to the full tier ladder spec.md §4.7 calls for. Detection
//! happens once (`OnceLock`) rather than per call, and `force_simd_capability`
//! clamps the detected tier down — never up, per spec.md's `ConfigurationError`
//! rule for a forced tier the host cannot actually support.

use std::sync::OnceLock;

/// A totally ordered SIMD capability tier.
///
/// `x86_64` tiers and `aarch64` tiers share one enum so a single
/// `force_simd_capability` integer can clamp either ladder; the numeric
/// values are each architecture's position in its own chain
/// (`NONE < AVX2 < BMI2 < AVX512F < AVX512BW < AVX512VBMI < AVX512VBMI2`,
/// `NONE < NEON < SVE < SVE2`), never compared across architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum SimdTier {
    /// No SIMD support; scalar fallback only.
    None = 0,
    /// `x86_64` AVX2.
    Avx2 = 1,
    /// `x86_64` AVX2 + BMI2 (PEXT/PDEP).
    Bmi2 = 2,
    /// `x86_64` AVX-512 Foundation.
    Avx512F = 3,
    /// `x86_64` AVX-512 Byte/Word.
    Avx512Bw = 4,
    /// `x86_64` AVX-512 VBMI.
    Avx512Vbmi = 5,
    /// `x86_64` AVX-512 VBMI2 (VPERMB/VPEXPANDB/VPCOMPRESSB).
    Avx512Vbmi2 = 6,
    /// `aarch64` NEON.
    Neon = 10,
    /// `aarch64` SVE.
    Sve = 11,
    /// `aarch64` SVE2.
    Sve2 = 12,
}

impl SimdTier {
    /// Convert a `force_simd_capability` config value (`-1` = auto) into an
    /// explicit clamp tier, if any.
    #[must_use]
    pub fn from_force_value(value: i32) -> Option<Self> {
        match value {
            -1 => None,
            0 => Some(Self::None),
            1 => Some(Self::Avx2),
            2 => Some(Self::Bmi2),
            3 => Some(Self::Avx512F),
            4 => Some(Self::Avx512Bw),
            5 => Some(Self::Avx512Vbmi),
            6 => Some(Self::Avx512Vbmi2),
            10 => Some(Self::Neon),
            11 => Some(Self::Sve),
            12 => Some(Self::Sve2),
            _ => None,
        }
    }
}

/// Detected and effective SIMD capability of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapabilities {
    /// The highest tier the host CPU actually supports.
    pub detected: SimdTier,
    /// The tier dispatch is actually allowed to use, after applying any
    /// `force_simd_capability` clamp. Never exceeds `detected`.
    pub effective: SimdTier,
}

fn detect_x86_64() -> SimdTier {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512vbmi2") {
            return SimdTier::Avx512Vbmi2;
        }
        if is_x86_feature_detected!("avx512vbmi") {
            return SimdTier::Avx512Vbmi;
        }
        if is_x86_feature_detected!("avx512bw") {
            return SimdTier::Avx512Bw;
        }
        if is_x86_feature_detected!("avx512f") {
            return SimdTier::Avx512F;
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("bmi2") {
            return SimdTier::Bmi2;
        }
        if is_x86_feature_detected!("avx2") {
            return SimdTier::Avx2;
        }
    }
    SimdTier::None
}

fn detect_aarch64() -> SimdTier {
    #[cfg(target_arch = "aarch64")]
    {
        // SVE/SVE2 detection relies on the Linux HWCAP bits; the feature
        // strings are accepted by the detection macro but have no effect
        // (always false) on non-Linux aarch64 targets as of this writing.
        #[cfg(target_os = "linux")]
        {
            if std::arch::is_aarch64_feature_detected!("sve2") {
                return SimdTier::Sve2;
            }
            if std::arch::is_aarch64_feature_detected!("sve") {
                return SimdTier::Sve;
            }
        }
        if std::arch::is_aarch64_feature_detected!("neon") {
            return SimdTier::Neon;
        }
    }
    SimdTier::None
}

/// Detect the highest SIMD tier the host CPU supports, once per process.
#[must_use]
pub fn detect() -> SimdTier {
    static DETECTED: OnceLock<SimdTier> = OnceLock::new();
    *DETECTED.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            detect_x86_64()
        }
        #[cfg(target_arch = "aarch64")]
        {
            detect_aarch64()
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            SimdTier::None
        }
    })
}

/// Resolve the effective dispatch tier given a `force_simd_capability`
/// config value. Returns [`crate::error::EngineError::ConfigurationError`]
/// if the forced tier exceeds what the host actually supports.
pub fn resolve_effective(force_simd_capability: i32) -> crate::error::EngineResult<SimdCapabilities> {
    let detected = detect();
    let effective = match SimdTier::from_force_value(force_simd_capability) {
        None => detected,
        Some(forced) => {
            if forced > detected {
                return Err(crate::error::EngineError::ConfigurationError {
                    reason: format!(
                        "force_simd_capability {force_simd_capability:?} requests {forced:?} but host only supports {detected:?}"
                    ),
                });
            }
            forced
        }
    };
    Ok(SimdCapabilities { detected, effective })
}
