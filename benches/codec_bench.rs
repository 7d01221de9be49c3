use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kmersearch_engine::codec::{self, PackedSequence};

fn random_ascii_dna2(len: usize) -> Vec<u8> {
    const ALPHABET: &[u8; 4] = b"ACGT";
    (0..len).map(|i| ALPHABET[(i * 2654435761) % 4]).collect()
}

fn bench_encode_dna2(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_dna2");
    for size in [64, 1024, 16384, 262_144].iter() {
        let ascii = random_ascii_dna2(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(codec::encode_dna2(black_box(&ascii)).unwrap()));
        });
    }
    group.finish();
}

fn bench_decode_dna2(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_dna2");
    for size in [64, 1024, 16384, 262_144].iter() {
        let ascii = random_ascii_dna2(*size);
        let packed = codec::encode_dna2(&ascii).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(packed.decode()));
        });
    }
    group.finish();
}

fn bench_simd_tier_comparison(c: &mut Criterion) {
    use kmersearch_engine::SimdTier;

    let mut group = c.benchmark_group("encode_dna2_by_tier");
    let ascii = random_ascii_dna2(262_144);
    for tier in [SimdTier::None, kmersearch_engine::simd_tier::detect()] {
        group.bench_with_input(BenchmarkId::new("tier", format!("{tier:?}")), &tier, |b, &tier| {
            b.iter(|| black_box(codec::encode_dna2_with_tier(black_box(&ascii), tier).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode_dna2, bench_decode_dna2, bench_simd_tier_comparison);
criterion_main!(benches);
