//! Crate-level scenarios exercising the codec, extractor, matcher, cache
//! and index adapter together, mirroring the worked examples this engine
//! was designed against.

use std::sync::Arc;

use kmersearch_engine::cache::{CacheLayer, HighFreqKey};
use kmersearch_engine::codec::{self, PackedDna2, PackedDna4, PackedSequence};
use kmersearch_engine::config::EngineConfig;
use kmersearch_engine::frequency::{FrequencyAnalyzer, InMemoryFrequencyStore, SequenceSource};
use kmersearch_engine::index;
use kmersearch_engine::kmer;
use kmersearch_engine::matching;
use kmersearch_engine::EngineResult;

struct FixedRows(Vec<Vec<u8>>);

impl SequenceSource for FixedRows {
    fn total_rows(&self) -> usize {
        self.0.len()
    }
    fn row_ascii(&self, row_index: usize) -> EngineResult<Vec<u8>> {
        Ok(self.0[row_index].clone())
    }
}

#[test]
fn round_trip_dna2_then_extract_then_match() {
    let packed = PackedDna2::encode(b"ACGTACGTACGT").unwrap();
    assert_eq!(packed.decode(), "ACGTACGTACGT");

    let keys = kmer::extract_from_dna2(&packed, 4, 4).unwrap();
    assert_eq!(keys.len(), 9);

    let query = kmer::extract_from_text(b"ACGT", 4, 4).unwrap();
    let score = matching::count_matching(&keys, &query);
    assert!(score >= 1, "the literal query window should appear in the sequence");
}

#[test]
fn degenerate_dna4_window_expands_and_matches_both_resolutions() {
    let packed = PackedDna4::encode(b"AN").unwrap();
    let keys = kmer::extract_from_dna4(&packed, 2, 1).unwrap();

    let as_ac = kmer::extract_from_text(b"AC", 2, 1).unwrap();
    let as_ag = kmer::extract_from_text(b"AG", 2, 1).unwrap();

    assert!(matching::count_matching(&keys, &as_ac) >= 1);
    assert!(matching::count_matching(&keys, &as_ag) >= 1);
}

#[test]
fn analyze_then_preclude_highfreq_changes_extract_value() {
    let mut rows = Vec::new();
    rows.extend(std::iter::repeat(b"AAAA".to_vec()).take(60));
    rows.extend(std::iter::repeat(b"CCCC".to_vec()).take(40));

    let mut config = EngineConfig { kmer_size: 4, occur_bitlen: 2, ..EngineConfig::default() };
    config.max_appearance_rate = 0.5;

    let analyzer = FrequencyAnalyzer::new();
    let store = InMemoryFrequencyStore::default();
    let record = analyzer.analyze(&FixedRows(rows), &store, 7, "seq", &config).unwrap();
    assert_eq!(record.keys.len(), 1);

    let cache = CacheLayer::new(&config);
    cache.highfreq_put(
        HighFreqKey { relation_id: 7, column_name: "seq".into(), kmer_size: 4 },
        record.keys.clone(),
    );

    let row = PackedDna2::encode(b"AAAA").unwrap();
    let unfiltered = index::extract_value(&row, 7, "seq", &EngineConfig { preclude_highfreq_kmer: false, ..config.clone() }, &cache).unwrap();
    let mut precluded_config = config.clone();
    precluded_config.preclude_highfreq_kmer = true;
    let filtered = index::extract_value(&row, 7, "seq", &precluded_config, &cache).unwrap();

    assert!(filtered.len() < unfiltered.len());
}

#[test]
fn extract_query_consistent_and_is_match_agree() {
    let config = EngineConfig { kmer_size: 4, occur_bitlen: 2, min_score: 2, ..EngineConfig::default() };
    let cache = CacheLayer::new(&config);

    let (query_keys, _strategy) = index::extract_query(b"ACGTACGT", &config, &cache).unwrap();
    let seq = PackedDna2::encode(b"ACGTACGTACGT").unwrap();
    let seq_keys = index::extract_value(&seq, 1, "seq", &config, &cache).unwrap();

    let n_matches = index::match_score(&seq_keys, &query_keys);
    let actual_min_score = cache.actual_min_score_for(b"ACGTACGT", 4, 2, config.min_score, config.min_shared_rate, query_keys.len());
    let (is_match, recheck) = index::consistent(&seq_keys, n_matches, query_keys.len(), actual_min_score);

    assert!(recheck, "the index only proves a lower bound and must always request a recheck");
    assert_eq!(is_match, index::is_match(&seq_keys, &query_keys, actual_min_score));
}

#[test]
fn wire_round_trip_preserves_bit_length_and_payload() {
    let packed = PackedDna4::encode(b"ACGTN").unwrap();
    let wire = packed.send();
    let recovered = PackedDna4::recv(&wire).unwrap();
    assert_eq!(packed, recovered);
}

#[test]
fn kmer_size_change_through_config_manager_clears_cached_query_keys() {
    let config = EngineConfig::default();
    let manager = kmersearch_engine::ConfigManager::new(config.clone()).unwrap();
    let cache = CacheLayer::new(&config);
    cache.attach(&manager);

    let text = b"ACGTACGTACGTACGTACGT";
    let first: Arc<kmersearch_engine::UintKeyArray> = cache.query_keys(text, config.kmer_size, config.occur_bitlen).unwrap();
    manager.set_kmer_size(config.kmer_size + 1).unwrap();
    let second = cache.query_keys(text, config.kmer_size, config.occur_bitlen).unwrap();

    assert_eq!(*first, *second, "re-extracting the same (text, k, b) is deterministic");
    assert!(!Arc::ptr_eq(&first, &second), "a kmer_size change must evict the query-kmer cache, forcing a fresh extraction");
}

#[test]
fn hash_is_deterministic_across_calls() {
    let packed = PackedDna2::encode(b"ACGTACGT").unwrap();
    let a = codec::hash32_seeded(packed.payload(), 42);
    let b = codec::hash32_seeded(packed.payload(), 42);
    assert_eq!(a, b);
}
