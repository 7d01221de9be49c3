//! Configuration surface and runtime (C7, config half).
//!
//! Grounded on `neuroquantum-core`'s [`CoreConfig`]-style plain struct with a
//! [`Default`] impl, held behind an atomically-swappable snapshot instead of
//! a single global mutable. Writers validate (the "check hook"), build a new
//! immutable [`EngineConfig`] snapshot, swap it in under a short write lock,
//! and fire the invalidation matrix of `SPEC_FULL.md` §4.5 (the "assign
//! hook"). Readers clone the `Arc` under a read lock and never block a
//! writer for longer than the swap itself.

use std::sync::{Arc, RwLock};

use crate::error::{EngineError, EngineResult};

/// Default bound on the three in-process caches (C5).
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 50_000;

/// Typed configuration surface for the engine (spec.md §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// k-mer size used by the extractor and matcher. Valid range `4..=32`.
    pub kmer_size: u8,
    /// Width, in bits, of the occurrence counter packed into each uintkey.
    /// Valid range `0..=16`; `2*kmer_size + occur_bitlen` must be `<= 64`.
    pub occur_bitlen: u8,
    /// Absolute minimum shared-key count for the `=%` predicate.
    pub min_score: u32,
    /// Relative minimum shared-key fraction (of `|keys(query)|`) for `=%`.
    pub min_shared_rate: f64,
    /// Row-fraction cutoff above which a k-mer is "high-frequency".
    pub max_appearance_rate: f64,
    /// Absolute row-count cutoff above which a k-mer is "high-frequency".
    /// `0` means unlimited (the rate alone determines the threshold).
    pub max_appearance_nrow: u64,
    /// Whether index-build filters out high-frequency k-mers.
    pub preclude_highfreq_kmer: bool,
    /// Clamp SIMD dispatch to at most this tier. `-1` means "auto": use the
    /// highest tier the host CPU actually supports.
    pub force_simd_capability: i32,
    /// Max entries in the query-kmer cache.
    pub query_kmer_cache_max_entries: usize,
    /// Max entries in the actual-minimum-score cache.
    pub actual_min_score_cache_max_entries: usize,
    /// Max entries in the high-frequency-kmer cache.
    pub highfreq_cache_max_entries: usize,
    /// Row batch size used while scanning a relation during analysis.
    pub analysis_batch_size: usize,
    /// Batch size used while loading a persisted high-freq set into cache.
    pub cache_load_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kmer_size: 16,
            occur_bitlen: 4,
            min_score: 0,
            min_shared_rate: 0.0,
            max_appearance_rate: 0.5,
            max_appearance_nrow: 0,
            preclude_highfreq_kmer: false,
            force_simd_capability: -1,
            query_kmer_cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            actual_min_score_cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            highfreq_cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            analysis_batch_size: 1_000,
            cache_load_batch_size: 1_000,
        }
    }
}

impl EngineConfig {
    /// Validate the invariants spec.md §4.7 and §3 place on this config.
    /// This is the "check hook": it must succeed before a value is ever
    /// swapped in.
    pub fn validate(&self) -> EngineResult<()> {
        if !(4..=32).contains(&self.kmer_size) {
            return Err(EngineError::ConfigurationError {
                reason: format!("kmer_size {} outside 4..=32", self.kmer_size),
            });
        }
        if self.occur_bitlen > 16 {
            return Err(EngineError::ConfigurationError {
                reason: format!("occur_bitlen {} outside 0..=16", self.occur_bitlen),
            });
        }
        let total_bits = 2u32 * u32::from(self.kmer_size) + u32::from(self.occur_bitlen);
        if total_bits > 64 {
            return Err(EngineError::ConfigurationError {
                reason: format!(
                    "2*kmer_size + occur_bitlen = {total_bits} exceeds 64 bits"
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_shared_rate) {
            return Err(EngineError::ConfigurationError {
                reason: format!("min_shared_rate {} outside 0..=1", self.min_shared_rate),
            });
        }
        if !(0.0..=1.0).contains(&self.max_appearance_rate) {
            return Err(EngineError::ConfigurationError {
                reason: format!(
                    "max_appearance_rate {} outside 0..=1",
                    self.max_appearance_rate
                ),
            });
        }
        if self.force_simd_capability < -1 {
            return Err(EngineError::ConfigurationError {
                reason: format!(
                    "force_simd_capability {} is neither -1 (auto) nor a valid tier",
                    self.force_simd_capability
                ),
            });
        }
        Ok(())
    }

    /// Number of significant bits a uintkey carries under this config.
    #[must_use]
    pub fn uintkey_bits(&self) -> u32 {
        2u32 * u32::from(self.kmer_size) + u32::from(self.occur_bitlen)
    }
}

/// Which part of the cache-invalidation matrix (spec.md §4.5) a config
/// change touches. Each variant is a "hook name" in the assign-hook sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// `kmer_size` changed: clears all three caches.
    KmerSize,
    /// `occur_bitlen` changed: clears the high-freq cache.
    OccurBitlen,
    /// `max_appearance_rate` / `max_appearance_nrow` changed: clears the
    /// actual-min-score and high-freq caches.
    MaxAppearance,
    /// `min_score` / `min_shared_rate` changed: clears the actual-min-score
    /// cache.
    MinScore,
}

type InvalidationHook = Box<dyn Fn(ConfigChange) + Send + Sync>;

/// Process-wide configuration manager.
///
/// Holds an atomically-swappable [`EngineConfig`] snapshot plus a registry
/// of invalidation closures fired on each accepted change. This is the
/// realization of spec.md §9's "process-wide immutable configuration
/// snapshot plus an atomically-swappable pointer".
pub struct ConfigManager {
    snapshot: RwLock<Arc<EngineConfig>>,
    hooks: RwLock<Vec<InvalidationHook>>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("snapshot", &self.current())
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    /// Build a manager seeded with `config`, failing if `config` itself
    /// violates an invariant.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(config)),
            hooks: RwLock::new(Vec::new()),
        })
    }

    /// Register an invalidator closure. Typically a cache layer registers
    /// one closure that matches on [`ConfigChange`] and clears itself.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(ConfigChange) + Send + Sync + 'static,
    {
        self.hooks.write().unwrap_or_else(|e| e.into_inner()).push(Box::new(hook));
    }

    /// The current configuration snapshot. Cheap: an `Arc` clone under a
    /// read lock.
    #[must_use]
    pub fn current(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Apply `mutate` to a copy of the current snapshot, validate it, swap
    /// it in, and fire every registered hook whose `kind` matches.
    pub fn apply<F>(&self, kind: ConfigChange, mutate: F) -> EngineResult<()>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut next = (*self.current()).clone();
        mutate(&mut next);
        next.validate()?;
        let next = Arc::new(next);
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = next;
        for hook in self.hooks.read().unwrap_or_else(|e| e.into_inner()).iter() {
            hook(kind);
        }
        Ok(())
    }

    /// Set `kmer_size`. Clears all three caches (spec.md §4.5).
    pub fn set_kmer_size(&self, kmer_size: u8) -> EngineResult<()> {
        self.apply(ConfigChange::KmerSize, |c| c.kmer_size = kmer_size)
    }

    /// Set `occur_bitlen`. Clears the high-freq cache.
    pub fn set_occur_bitlen(&self, occur_bitlen: u8) -> EngineResult<()> {
        self.apply(ConfigChange::OccurBitlen, |c| c.occur_bitlen = occur_bitlen)
    }

    /// Set `max_appearance_rate`. Clears actual-min-score + high-freq.
    pub fn set_max_appearance_rate(&self, rate: f64) -> EngineResult<()> {
        self.apply(ConfigChange::MaxAppearance, |c| c.max_appearance_rate = rate)
    }

    /// Set `max_appearance_nrow`. Clears actual-min-score + high-freq.
    pub fn set_max_appearance_nrow(&self, nrow: u64) -> EngineResult<()> {
        self.apply(ConfigChange::MaxAppearance, |c| c.max_appearance_nrow = nrow)
    }

    /// Set `min_score`. Clears actual-min-score.
    pub fn set_min_score(&self, min_score: u32) -> EngineResult<()> {
        self.apply(ConfigChange::MinScore, |c| c.min_score = min_score)
    }

    /// Set `min_shared_rate`. Clears actual-min-score.
    pub fn set_min_shared_rate(&self, rate: f64) -> EngineResult<()> {
        self.apply(ConfigChange::MinScore, |c| c.min_shared_rate = rate)
    }
}
