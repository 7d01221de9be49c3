//! Match Kernel (C3): count shared keys between two uintkey multisets.

use hashbrown::HashMap;

use crate::kmer::UintKeyArray;

/// Below this product of array lengths, a nested linear scan beats building
/// a hash set (spec.md §4.3): O(n·m) but cache-friendly for tiny inputs.
pub const SMALL_INPUT_THRESHOLD: usize = 100;

/// Count the cardinality of the intersection of `seq_keys` and
/// `query_keys` "up to per-element matching": each query key is consumed
/// at most once, and at most one matching sequence key is consumed per
/// match (spec.md §4.3 — semantically a hash-multiset consumption, not set
/// intersection).
///
/// # Panics
///
/// Panics if `seq_keys` and `query_keys` have different uintkey widths;
/// callers must guarantee both arrays were extracted under the same
/// `(kmer_size, occur_bitlen)` configuration (spec.md §4.3, a programmer
/// error otherwise).
#[must_use]
pub fn count_matching(seq_keys: &UintKeyArray, query_keys: &UintKeyArray) -> usize {
    assert_eq!(
        seq_keys.width(),
        query_keys.width(),
        "count_matching: mixed uintkey widths are a programmer error"
    );

    if seq_keys.len() * query_keys.len() < SMALL_INPUT_THRESHOLD {
        count_matching_nested_scan(seq_keys, query_keys)
    } else {
        count_matching_hash_probe(seq_keys, query_keys)
    }
}

fn count_matching_nested_scan(seq_keys: &UintKeyArray, query_keys: &UintKeyArray) -> usize {
    let query: Vec<u64> = query_keys.iter_u64().collect();
    let mut consumed = vec![false; query.len()];
    let mut matches = 0usize;
    for seq_key in seq_keys.iter_u64() {
        for (slot, used) in query.iter().zip(consumed.iter_mut()) {
            if !*used && *slot == seq_key {
                *used = true;
                matches += 1;
                break;
            }
        }
    }
    matches
}

fn count_matching_hash_probe(seq_keys: &UintKeyArray, query_keys: &UintKeyArray) -> usize {
    let mut remaining: HashMap<u64, usize> = HashMap::new();
    for key in query_keys.iter_u64() {
        *remaining.entry(key).or_insert(0) += 1;
    }
    let mut matches = 0usize;
    for key in seq_keys.iter_u64() {
        if let Some(count) = remaining.get_mut(&key) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::UintKeyArray;

    fn keys(values: &[u64]) -> UintKeyArray {
        UintKeyArray::U64(values.to_vec())
    }

    #[test]
    fn t6_matching_simple() {
        let seq = keys(&[5, 5, 7, 9]);
        let query = keys(&[5, 7]);
        assert_eq!(count_matching(&seq, &query), 2);
    }

    #[test]
    fn t6_matching_repeated_query() {
        let seq = keys(&[5, 5, 7, 9]);
        let query = keys(&[5, 5, 5]);
        assert_eq!(count_matching(&seq, &query), 2);
    }

    #[test]
    fn both_code_paths_agree() {
        let seq = keys(&[1, 2, 3, 3, 4, 5, 5, 5]);
        let query = keys(&[3, 3, 5, 5, 9]);
        assert_eq!(count_matching_nested_scan(&seq, &query), count_matching_hash_probe(&seq, &query));
    }

    #[test]
    fn bound_is_min_of_both_lengths() {
        let seq = keys(&[1, 1, 1, 1]);
        let query = keys(&[1, 1]);
        let matched = count_matching(&seq, &query);
        assert!(matched <= seq.len().min(query.len()));
    }

    #[test]
    #[should_panic(expected = "mixed uintkey widths")]
    fn mixed_widths_panics() {
        let seq = UintKeyArray::U16(vec![1, 2]);
        let query = UintKeyArray::U32(vec![1, 2]);
        count_matching(&seq, &query);
    }
}
