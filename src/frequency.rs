//! Frequency Analyzer (C4): parallel scan of a relation's sequence column,
//! aggregating per-k-mer row-counts and persisting the high-frequency set.
//!
//! Grounded on the teacher's `dna/encoder.rs::encode_parallel_simd`:
//! `rayon`-based chunked fan-out collected into a single fallible `Vec`,
//! standing in for spec.md §4.4/§5's "fork/join worker processes" (see
//! `DESIGN.md` for the Open Question this resolves).

use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Mutex, RwLock};

use hashbrown::{HashMap, HashSet as FastHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::kmer;

/// A relation's sequence-typed column, abstracted so this crate doesn't
/// depend on a concrete host storage engine (spec.md §6's "durable
/// key/value store... a real deployment plugs in Postgres-backed storage
/// outside this crate's scope", applied the same way to row scanning).
pub trait SequenceSource: Sync {
    /// Total row count, used to size worker partitions and the threshold.
    fn total_rows(&self) -> usize;
    /// The row's raw ASCII sequence text. An `Err` here aborts the whole
    /// analysis (spec.md §4.4 failure semantics).
    fn row_ascii(&self, row_index: usize) -> EngineResult<Vec<u8>>;
}

/// Persisted record for one `(relation, column, k)` high-frequency set
/// (spec.md §3). Serializable so a real deployment can hand it to an
/// opaque key/value collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrequencyRecord {
    /// Identifier of the analyzed relation.
    pub relation_id: u32,
    /// Name of the analyzed sequence column.
    pub column_name: String,
    /// k-mer size used for this analysis.
    pub kmer_size: u8,
    /// Occurrence-counter width used for this analysis.
    pub occur_bitlen: u8,
    /// `max-appearance-rate` in effect when this record was built.
    pub max_appearance_rate: f64,
    /// `max-appearance-nrow` in effect when this record was built.
    pub max_appearance_nrow: u64,
    /// Unix timestamp (seconds) the analysis completed.
    pub analysis_timestamp_unix: u64,
    /// Total rows scanned.
    pub total_rows: u64,
    /// The persisted high-frequency uintkey set.
    pub keys: HashSet<u64>,
}

impl FrequencyRecord {
    /// Serialize to the binary form a durable key/value collaborator stores
    /// (spec.md §3/§6's "abstract key/value collaborator"), mirroring the
    /// teacher's `bincode::serialize`/`deserialize` persistence pattern
    /// (e.g. `storage/pager/free_list.rs`, `storage/wal/mod.rs`).
    pub fn to_bytes(&self) -> EngineResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EngineError::DimensionMismatch {
            reason: format!("failed to serialize frequency record: {e}"),
        })
    }

    /// Inverse of [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        bincode::deserialize(bytes).map_err(|e| EngineError::DimensionMismatch {
            reason: format!("failed to deserialize frequency record: {e}"),
        })
    }
}

/// Abstract durable store for [`FrequencyRecord`]s, keyed by
/// `(relation_id, column_name, kmer_size)`.
pub trait FrequencyStore: Send + Sync {
    /// Load the current record, if any.
    fn load(&self, relation_id: u32, column_name: &str, kmer_size: u8) -> Option<FrequencyRecord>;
    /// Persist (overwrite) a record.
    fn store(&self, record: FrequencyRecord);
    /// Free a record (administrative "unload the high-freq cache" call).
    fn clear(&self, relation_id: u32, column_name: &str, kmer_size: u8);
}

/// In-memory reference [`FrequencyStore`] implementation, standing in for
/// Postgres-backed durable storage in tests and examples. Holds each
/// record as the `bincode`-serialized bytes a real key/value collaborator
/// would actually store, round-tripping through [`FrequencyRecord::to_bytes`]
/// / [`FrequencyRecord::from_bytes`] rather than keeping the typed struct
/// directly.
#[derive(Default)]
pub struct InMemoryFrequencyStore {
    records: RwLock<std::collections::HashMap<(u32, String, u8), Vec<u8>>>,
}

impl FrequencyStore for InMemoryFrequencyStore {
    fn load(&self, relation_id: u32, column_name: &str, kmer_size: u8) -> Option<FrequencyRecord> {
        let bytes = self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(relation_id, column_name.to_string(), kmer_size))
            .cloned()?;
        FrequencyRecord::from_bytes(&bytes).ok()
    }

    fn store(&self, record: FrequencyRecord) {
        let key = (record.relation_id, record.column_name.clone(), record.kmer_size);
        let bytes = record.to_bytes().expect("a FrequencyRecord's fields always serialize");
        self.records.write().unwrap_or_else(|e| e.into_inner()).insert(key, bytes);
    }

    fn clear(&self, relation_id: u32, column_name: &str, kmer_size: u8) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(relation_id, column_name.to_string(), kmer_size));
    }
}

fn worker_count(total_rows: usize, system_cap: usize) -> usize {
    let density_bound = (total_rows / 1000).max(1);
    system_cap.max(1).min(density_bound)
}

fn partition_rows(total_rows: usize, workers: usize) -> Vec<Range<usize>> {
    if total_rows == 0 {
        return vec![0..0];
    }
    let workers = workers.max(1);
    let base = total_rows / workers;
    let remainder = total_rows % workers;
    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0usize;
    for i in 0..workers {
        let len = base + usize::from(i < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn scan_partition(
    source: &dyn SequenceSource,
    range: Range<usize>,
    config: &EngineConfig,
    worker_id: usize,
) -> EngineResult<HashMap<u64, u64>> {
    let batch_size = config.analysis_batch_size.max(1);
    let mut counts: HashMap<u64, u64> = HashMap::new();
    let mut since_last_batch = 0usize;

    for row_index in range {
        let ascii = source
            .row_ascii(row_index)
            .map_err(|e| EngineError::WorkerFailure { worker_id, reason: e.to_string() })?;
        let keys = kmer::extract_from_text(&ascii, config.kmer_size, config.occur_bitlen)
            .map_err(|e| EngineError::WorkerFailure { worker_id, reason: e.to_string() })?;

        let mut seen_in_row: FastHashSet<u64> = FastHashSet::new();
        for key in keys.iter_u64() {
            if seen_in_row.insert(key) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        since_last_batch += 1;
        if since_last_batch >= batch_size {
            debug!(worker_id, row_index, "frequency analysis batch boundary");
            since_last_batch = 0;
        }
    }
    Ok(counts)
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Coordinates the parallel per-k-mer row-count scan and the resulting
/// high-frequency threshold filter.
#[derive(Default)]
pub struct FrequencyAnalyzer {
    // Serializes concurrent re-analysis of the same relation, per spec.md
    // §4.4 ("holding a shared lock on the relation"). A single lock is a
    // simplification noted in `DESIGN.md`: a real deployment would key this
    // per-relation rather than crate-wide.
    analysis_lock: Mutex<()>,
}

impl FrequencyAnalyzer {
    /// Build a fresh analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `source`, aggregate per-k-mer row-counts across worker
    /// partitions, filter to the high-frequency set, and persist it to
    /// `store`. A partition failure aborts the whole job: no partial
    /// record is ever stored (spec.md §4.4).
    #[instrument(skip(self, source, store, config), fields(relation_id, column_name))]
    pub fn analyze(
        &self,
        source: &dyn SequenceSource,
        store: &dyn FrequencyStore,
        relation_id: u32,
        column_name: &str,
        config: &EngineConfig,
    ) -> EngineResult<FrequencyRecord> {
        let _guard = self.analysis_lock.lock().unwrap_or_else(|e| e.into_inner());

        let total_rows = source.total_rows();
        info!(total_rows, "frequency analysis starting");

        let workers = worker_count(total_rows, rayon::current_num_threads());
        let partitions = partition_rows(total_rows, workers);

        let worker_maps: Vec<HashMap<u64, u64>> = partitions
            .par_iter()
            .enumerate()
            .map(|(worker_id, range)| scan_partition(source, range.clone(), config, worker_id))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut merged: HashMap<u64, u64> = HashMap::new();
        for worker_map in worker_maps {
            for (key, count) in worker_map {
                *merged.entry(key).or_insert(0) += count;
            }
        }

        let threshold = ((config.max_appearance_rate * total_rows as f64).ceil() as u64)
            .max(config.max_appearance_nrow);
        let keys: HashSet<u64> = merged.into_iter().filter(|(_, count)| *count > threshold).map(|(key, _)| key).collect();

        let record = FrequencyRecord {
            relation_id,
            column_name: column_name.to_string(),
            kmer_size: config.kmer_size,
            occur_bitlen: config.occur_bitlen,
            max_appearance_rate: config.max_appearance_rate,
            max_appearance_nrow: config.max_appearance_nrow,
            analysis_timestamp_unix: now_unix(),
            total_rows: total_rows as u64,
            keys,
        };
        store.store(record.clone());
        info!(persisted_keys = record.keys.len(), threshold, "frequency analysis finished");
        Ok(record)
    }
}
