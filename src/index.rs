//! Index Adapter (C6): the operations an inverted-index access method calls
//! against this engine, plus the `=%` predicate and `match-score` surface.
//!
//! Grounded on the teacher's trait-based dispatch (`PackedSequence` in
//! [`crate::codec`]): rather than a base-class `extract` method shared by
//! DNA2/DNA4, each type implements [`Extractable`] to pick its own C2
//! entry point, and the free functions here stay generic over it.

use crate::cache::{CacheLayer, HighFreqKey};
use crate::codec::{PackedDna2, PackedDna4};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::kmer::{self, UintKeyArray};
use crate::matching;

/// A packed sequence type that knows which C2 entry point extracts its own
/// uintkey multiset.
pub trait Extractable {
    /// Extract this value's ordered uintkey multiset.
    fn extract_keys(&self, kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray>;
}

impl Extractable for PackedDna2 {
    fn extract_keys(&self, kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray> {
        kmer::extract_from_dna2(self, kmer_size, occur_bitlen)
    }
}

impl Extractable for PackedDna4 {
    fn extract_keys(&self, kmer_size: u8, occur_bitlen: u8) -> EngineResult<UintKeyArray> {
        kmer::extract_from_dna4(self, kmer_size, occur_bitlen)
    }
}

/// How a query's key array was produced. Spec.md §4.6: `extract_query`
/// always marks its result as an approximate-match strategy, distinguishing
/// it from a hypothetical future exact-match strategy the index could use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Keys were extracted for `=%` approximate matching; the index only
    /// provides a lower bound and the executor must recheck.
    Approximate,
}

/// `extract_value`: the per-row key array the index stores, optionally
/// filtered against the persisted high-frequency set when
/// `preclude_highfreq_kmer` is enabled (spec.md §4.5/§4.6).
pub fn extract_value<T: Extractable>(
    seq: &T,
    relation_id: u32,
    column_name: &str,
    config: &EngineConfig,
    cache: &CacheLayer,
) -> EngineResult<UintKeyArray> {
    let keys = seq.extract_keys(config.kmer_size, config.occur_bitlen)?;
    if !config.preclude_highfreq_kmer {
        return Ok(keys);
    }
    let highfreq_key = HighFreqKey {
        relation_id,
        column_name: column_name.to_string(),
        kmer_size: config.kmer_size,
    };
    match cache.highfreq_get(&highfreq_key) {
        Some(highfreq) => Ok(filter_highfreq(keys, &highfreq)),
        None => Ok(keys),
    }
}

fn filter_highfreq(keys: UintKeyArray, highfreq: &std::collections::HashSet<u64>) -> UintKeyArray {
    match keys {
        UintKeyArray::U16(v) => UintKeyArray::U16(v.into_iter().filter(|&k| !highfreq.contains(&u64::from(k))).collect()),
        UintKeyArray::U32(v) => UintKeyArray::U32(v.into_iter().filter(|&k| !highfreq.contains(&u64::from(k))).collect()),
        UintKeyArray::U64(v) => UintKeyArray::U64(v.into_iter().filter(|k| !highfreq.contains(k)).collect()),
    }
}

/// `extract_query`: the query-side key array plus its match strategy,
/// served from the query-kmer cache (spec.md §4.6).
pub fn extract_query(
    query_text: &[u8],
    config: &EngineConfig,
    cache: &CacheLayer,
) -> EngineResult<(std::sync::Arc<UintKeyArray>, MatchStrategy)> {
    let keys = cache.query_keys(query_text, config.kmer_size, config.occur_bitlen)?;
    Ok((keys, MatchStrategy::Approximate))
}

/// `consistent`: the index's ternary verdict. `matches` is unused beyond
/// establishing the signature the host's index API expects (spec.md §4.6
/// names it as a parameter even though only the count participates in the
/// comparison); the index always asks for a recheck since it only proves a
/// lower bound.
#[must_use]
pub fn consistent(_matches: &UintKeyArray, n_matches: usize, _n_query: usize, actual_min_score: u32) -> (bool, bool) {
    (n_matches >= actual_min_score as usize, true)
}

/// The `=%` predicate: `count_matching(extract(seq), extract(query)) >=
/// actual_min_score(query)` (spec.md §4.6).
#[must_use]
pub fn is_match(seq_keys: &UintKeyArray, query_keys: &UintKeyArray, actual_min_score: u32) -> bool {
    match_score(seq_keys, query_keys) >= actual_min_score as usize
}

/// `match-score`: the raw shared-key count `=%` is built on.
#[must_use]
pub fn match_score(seq_keys: &UintKeyArray, query_keys: &UintKeyArray) -> usize {
    matching::count_matching(seq_keys, query_keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PackedSequence;

    #[test]
    fn extract_value_passes_through_without_preclude() {
        let config = EngineConfig { kmer_size: 3, occur_bitlen: 2, ..EngineConfig::default() };
        let cache = CacheLayer::new(&config);
        let seq = PackedDna2::encode(b"AAAC").unwrap();
        let keys = extract_value(&seq, 1, "seq", &config, &cache).unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn extract_value_filters_highfreq_keys_when_precluded() {
        let mut config = EngineConfig { kmer_size: 3, occur_bitlen: 2, ..EngineConfig::default() };
        config.preclude_highfreq_kmer = true;
        let cache = CacheLayer::new(&config);
        let seq = PackedDna2::encode(b"AAAC").unwrap();
        let raw = extract_value(&seq, 1, "seq", &EngineConfig { preclude_highfreq_kmer: false, ..config.clone() }, &cache).unwrap();
        let first_key = raw.iter_u64().next().unwrap();

        cache.highfreq_put(
            HighFreqKey { relation_id: 1, column_name: "seq".into(), kmer_size: 3 },
            [first_key].into_iter().collect(),
        );

        let filtered = extract_value(&seq, 1, "seq", &config, &cache).unwrap();
        assert_eq!(filtered.len(), raw.len() - 1);
    }

    #[test]
    fn extract_query_marks_approximate_strategy() {
        let config = EngineConfig::default();
        let cache = CacheLayer::new(&config);
        let (_keys, strategy) = extract_query(b"ACGTACGTACGTACGTA", &config, &cache).unwrap();
        assert_eq!(strategy, MatchStrategy::Approximate);
    }

    #[test]
    fn consistent_reflects_threshold_and_always_requests_recheck() {
        let dummy = UintKeyArray::U64(vec![]);
        assert_eq!(consistent(&dummy, 5, 10, 5), (true, true));
        assert_eq!(consistent(&dummy, 4, 10, 5), (false, true));
    }

    #[test]
    fn is_match_and_match_score_agree() {
        let seq = UintKeyArray::U64(vec![1, 2, 3]);
        let query = UintKeyArray::U64(vec![1, 2, 9]);
        assert_eq!(match_score(&seq, &query), 2);
        assert!(is_match(&seq, &query, 2));
        assert!(!is_match(&seq, &query, 3));
    }
}
