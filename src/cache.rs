//! Cache Layer (C5): three bounded in-process caches — query→keys,
//! query→actual-minimum-score, `(relation,column,k)`→highfreq-set — wired
//! into the C7 config-invalidation matrix.
//!
//! Grounded on the teacher's `dna.rs::DNACompressor` (`Arc<RwLock<LruCache<..>>>`
//! for its pattern cache) for the single-process caches, and `dashmap`
//! (already a teacher dependency) for the cross-worker shared high-freq
//! variant standing in for a dshash-style table.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use lru::LruCache;
use tracing::warn;

use crate::config::{ConfigChange, ConfigManager, EngineConfig};
use crate::error::EngineResult;
use crate::kmer::{self, UintKeyArray};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKmerKey {
    query_text: Vec<u8>,
    kmer_size: u8,
    occur_bitlen: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ActualMinScoreKey {
    query_text: Vec<u8>,
    kmer_size: u8,
    occur_bitlen: u8,
    min_score: u32,
    min_shared_rate_bits: u64,
}

/// Key for the high-frequency-kmer cache: a `(relation, column, k)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighFreqKey {
    /// Host relation identifier.
    pub relation_id: u32,
    /// Sequence column name.
    pub column_name: String,
    /// k-mer size the set was computed for.
    pub kmer_size: u8,
}

/// `max(min_score, ceil(min_shared_rate * query_len))` — the "actual
/// minimum score" threshold the `=%` predicate compares against.
#[must_use]
pub fn actual_min_score(min_score: u32, min_shared_rate: f64, query_len: usize) -> u32 {
    let relative = (min_shared_rate * query_len as f64).ceil();
    min_score.max(relative as u32)
}

struct CacheLayerInner {
    query_kmer: RwLock<LruCache<QueryKmerKey, Arc<UintKeyArray>>>,
    actual_min_score: RwLock<LruCache<ActualMinScoreKey, u32>>,
    highfreq_local: RwLock<LruCache<HighFreqKey, Arc<HashSet<u64>>>>,
    highfreq_shared: DashMap<HighFreqKey, Arc<HashSet<u64>>>,
    use_shared_highfreq: AtomicBool,
}

fn bounded(max_entries: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::new(1).unwrap_or(NonZeroUsize::MIN))
}

/// The three bounded caches of spec.md §4.5, held behind a cheap-to-clone
/// handle so a [`ConfigManager`] invalidation hook can share ownership with
/// whatever registered it.
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<CacheLayerInner>,
}

impl CacheLayer {
    /// Build caches sized from `config`'s `*_cache_max_entries` fields.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            inner: Arc::new(CacheLayerInner {
                query_kmer: RwLock::new(LruCache::new(bounded(config.query_kmer_cache_max_entries))),
                actual_min_score: RwLock::new(LruCache::new(bounded(config.actual_min_score_cache_max_entries))),
                highfreq_local: RwLock::new(LruCache::new(bounded(config.highfreq_cache_max_entries))),
                highfreq_shared: DashMap::new(),
                use_shared_highfreq: AtomicBool::new(false),
            }),
        }
    }

    /// Force the shared (`dashmap`) high-freq cache variant on or off.
    /// Spec.md §4.5: chosen "when a GUC forces it or when the current
    /// process is a parallel worker" — both map to this single flag here.
    pub fn set_use_shared_highfreq(&self, use_shared: bool) {
        self.inner.use_shared_highfreq.store(use_shared, AtomicOrdering::Relaxed);
    }

    /// Register this cache layer's invalidation hook with `manager`, per
    /// spec.md §4.5's matrix. Call once per `(CacheLayer, ConfigManager)`
    /// pair.
    pub fn attach(&self, manager: &ConfigManager) {
        let cache = self.clone();
        manager.register_hook(move |change| match change {
            ConfigChange::KmerSize => cache.clear_all(),
            ConfigChange::OccurBitlen => cache.clear_highfreq(),
            ConfigChange::MaxAppearance => {
                cache.clear_actual_min_score();
                cache.clear_highfreq();
            }
            ConfigChange::MinScore => cache.clear_actual_min_score(),
        });
    }

    /// Query-kmer cache: populate on miss via [`kmer::extract_from_text`].
    pub fn query_keys(&self, query_text: &[u8], kmer_size: u8, occur_bitlen: u8) -> EngineResult<Arc<UintKeyArray>> {
        let key = QueryKmerKey { query_text: query_text.to_vec(), kmer_size, occur_bitlen };
        if let Some(hit) = self.inner.query_kmer.write().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(Arc::clone(hit));
        }
        let keys = Arc::new(kmer::extract_from_text(query_text, kmer_size, occur_bitlen)?);
        self.inner
            .query_kmer
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, Arc::clone(&keys));
        Ok(keys)
    }

    /// Actual-minimum-score cache: populate on miss via
    /// [`actual_min_score`].
    pub fn actual_min_score_for(
        &self,
        query_text: &[u8],
        kmer_size: u8,
        occur_bitlen: u8,
        min_score: u32,
        min_shared_rate: f64,
        query_len: usize,
    ) -> u32 {
        let key = ActualMinScoreKey {
            query_text: query_text.to_vec(),
            kmer_size,
            occur_bitlen,
            min_score,
            min_shared_rate_bits: min_shared_rate.to_bits(),
        };
        if let Some(&hit) = self.inner.actual_min_score.write().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return hit;
        }
        let value = actual_min_score(min_score, min_shared_rate, query_len);
        self.inner.actual_min_score.write().unwrap_or_else(|e| e.into_inner()).put(key, value);
        value
    }

    /// Look up the persisted high-frequency set for `(relation, column,
    /// k)`, checking whichever variant (local/shared) is active.
    #[must_use]
    pub fn highfreq_get(&self, key: &HighFreqKey) -> Option<Arc<HashSet<u64>>> {
        if self.inner.use_shared_highfreq.load(AtomicOrdering::Relaxed) {
            self.inner.highfreq_shared.get(key).map(|entry| Arc::clone(entry.value()))
        } else {
            self.inner.highfreq_local.write().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
        }
    }

    /// Load a high-frequency set into whichever cache variant is active
    /// (the administrative "load the high-freq cache" call).
    pub fn highfreq_put(&self, key: HighFreqKey, set: HashSet<u64>) {
        let set = Arc::new(set);
        if self.inner.use_shared_highfreq.load(AtomicOrdering::Relaxed) {
            self.inner.highfreq_shared.insert(key, set);
        } else {
            self.inner.highfreq_local.write().unwrap_or_else(|e| e.into_inner()).put(key, set);
        }
    }

    fn clear_all(&self) {
        self.inner.query_kmer.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.clear_actual_min_score();
        self.clear_highfreq();
    }

    fn clear_actual_min_score(&self) {
        self.inner.actual_min_score.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn clear_highfreq(&self) {
        let mut local = self.inner.highfreq_local.write().unwrap_or_else(|e| e.into_inner());
        let was_populated = local.len() > 0 || !self.inner.highfreq_shared.is_empty();
        local.clear();
        drop(local);
        self.inner.highfreq_shared.clear();
        if was_populated {
            warn!("high-frequency k-mer cache cleared while populated; an explicit reload is required");
        }
    }
}
