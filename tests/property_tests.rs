//! Property-based tests for the quantified invariants of the codec,
//! extractor and match kernel.

use kmersearch_engine::codec::{self, PackedDna2, PackedSequence};
use kmersearch_engine::kmer;
use kmersearch_engine::matching;
use proptest::prelude::*;

fn dna2_ascii() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![b'A', b'C', b'G', b'T']), 0..200)
}

proptest! {
    #[test]
    fn encode_decode_dna2_round_trips(ascii in dna2_ascii()) {
        let packed = PackedDna2::encode(&ascii).unwrap();
        prop_assert_eq!(packed.decode().into_bytes(), ascii);
    }

    #[test]
    fn compare_payload_is_antisymmetric(a in dna2_ascii(), b in dna2_ascii()) {
        let packed_a = PackedDna2::encode(&a).unwrap();
        let packed_b = PackedDna2::encode(&b).unwrap();
        let forward = codec::compare_payload(packed_a.payload(), packed_a.bit_len(), packed_b.payload(), packed_b.bit_len());
        let backward = codec::compare_payload(packed_b.payload(), packed_b.bit_len(), packed_a.payload(), packed_a.bit_len());
        prop_assert_eq!(forward, backward.reverse());
    }

    #[test]
    fn count_matching_never_exceeds_either_length(
        seq in dna2_ascii(),
        query in prop::collection::vec(prop::sample::select(vec![b'A', b'C', b'G', b'T']), 4..40),
    ) {
        prop_assume!(seq.len() >= 8);
        let seq_keys = kmer::extract_from_text(&seq, 4, 2).unwrap();
        let query_keys = kmer::extract_from_text(&query, 4, 2).unwrap();
        let matched = matching::count_matching(&seq_keys, &query_keys);
        prop_assert!(matched <= seq_keys.len().min(query_keys.len()));
    }

    #[test]
    fn count_matching_is_symmetric(
        a in prop::collection::vec(prop::sample::select(vec![b'A', b'C', b'G', b'T']), 8..60),
        b in prop::collection::vec(prop::sample::select(vec![b'A', b'C', b'G', b'T']), 8..60),
    ) {
        let keys_a = kmer::extract_from_text(&a, 4, 2).unwrap();
        let keys_b = kmer::extract_from_text(&b, 4, 2).unwrap();
        prop_assert_eq!(
            matching::count_matching(&keys_a, &keys_b),
            matching::count_matching(&keys_b, &keys_a)
        );
    }

    #[test]
    fn extraction_length_matches_window_count(ascii in dna2_ascii()) {
        prop_assume!(ascii.len() >= 4);
        let keys = kmer::extract_from_text(&ascii, 4, 2).unwrap();
        prop_assert_eq!(keys.len(), ascii.len() - 4 + 1);
    }

    #[test]
    fn wire_round_trip_preserves_value(ascii in dna2_ascii()) {
        let packed = PackedDna2::encode(&ascii).unwrap();
        let wire = packed.send();
        let recovered = PackedDna2::recv(&wire).unwrap();
        prop_assert_eq!(packed, recovered);
    }
}
