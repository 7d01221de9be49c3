//! Exercises the `FrequencyRecord` bincode wire format against a real
//! `FrequencyStore` backed by files on disk, the way the teacher's own
//! integration tests stand up a `TempDir` rather than mocking storage.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use kmersearch_engine::config::EngineConfig;
use kmersearch_engine::frequency::{FrequencyAnalyzer, FrequencyRecord, FrequencyStore, SequenceSource};

struct FixedRows(Vec<Vec<u8>>);

impl SequenceSource for FixedRows {
    fn total_rows(&self) -> usize {
        self.0.len()
    }
    fn row_ascii(&self, row_index: usize) -> kmersearch_engine::EngineResult<Vec<u8>> {
        Ok(self.0[row_index].clone())
    }
}

/// A [`FrequencyStore`] that persists each record as a `bincode`-encoded
/// file under a temp directory, one file per `(relation_id, column_name,
/// kmer_size)` key.
struct FileFrequencyStore {
    dir: TempDir,
}

impl FileFrequencyStore {
    fn new() -> Self {
        Self { dir: TempDir::new().expect("create temp dir") }
    }

    fn path_for(&self, relation_id: u32, column_name: &str, kmer_size: u8) -> PathBuf {
        self.dir.path().join(format!("{relation_id}_{column_name}_{kmer_size}.bin"))
    }
}

impl FrequencyStore for FileFrequencyStore {
    fn load(&self, relation_id: u32, column_name: &str, kmer_size: u8) -> Option<FrequencyRecord> {
        let bytes = fs::read(self.path_for(relation_id, column_name, kmer_size)).ok()?;
        FrequencyRecord::from_bytes(&bytes).ok()
    }

    fn store(&self, record: FrequencyRecord) {
        let path = self.path_for(record.relation_id, &record.column_name, record.kmer_size);
        let bytes = record.to_bytes().expect("a FrequencyRecord's fields always serialize");
        fs::write(path, bytes).expect("writing to a fresh temp dir cannot fail");
    }

    fn clear(&self, relation_id: u32, column_name: &str, kmer_size: u8) {
        let _ = fs::remove_file(self.path_for(relation_id, column_name, kmer_size));
    }
}

#[test]
fn frequency_record_persists_through_bincode_backed_file_store() {
    let mut rows = Vec::new();
    rows.extend(std::iter::repeat(b"AAAA".to_vec()).take(60));
    rows.extend(std::iter::repeat(b"CCCC".to_vec()).take(40));

    let mut config = EngineConfig { kmer_size: 4, occur_bitlen: 2, ..EngineConfig::default() };
    config.max_appearance_rate = 0.5;

    let analyzer = FrequencyAnalyzer::new();
    let store = FileFrequencyStore::new();
    let written = analyzer.analyze(&FixedRows(rows), &store, 7, "seq", &config).unwrap();

    let reloaded = store.load(7, "seq", 4).expect("record was persisted to a file");
    assert_eq!(reloaded, written);

    store.clear(7, "seq", 4);
    assert!(store.load(7, "seq", 4).is_none());
}

#[test]
fn frequency_record_wire_round_trip_preserves_all_fields() {
    let mut keys = std::collections::HashSet::new();
    keys.insert(11u64);
    keys.insert(22u64);
    let record = FrequencyRecord {
        relation_id: 3,
        column_name: "dna_col".to_string(),
        kmer_size: 6,
        occur_bitlen: 2,
        max_appearance_rate: 0.25,
        max_appearance_nrow: 10,
        analysis_timestamp_unix: 1_800_000_000,
        total_rows: 40,
        keys,
    };

    let bytes = record.to_bytes().unwrap();
    let recovered = FrequencyRecord::from_bytes(&bytes).unwrap();
    assert_eq!(record, recovered);
}

#[test]
fn frequency_record_from_bytes_rejects_garbage() {
    assert!(FrequencyRecord::from_bytes(&[0xff, 0x00, 0x01]).is_err());
}
