//! Grapheme segmentation and width-measurement throughput on representative
//! text mixes, mirroring the teacher's "sweep a few realistic inputs and
//! report per-iteration cost" shape from `rust/src/bench_layout.rs`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use zireael::unicode::{cluster_width, iter_graphemes, measure, wrap_lines, WidthPolicy};

const ASCII: &str = "The quick brown fox jumps over the lazy dog. ";
const CJK: &str = "人人生而自由,在尊严和权利上一律平等。";
const EMOJI: &str = "👨‍👩‍👧‍👦 🏳️‍🌈 1️⃣ 👍🏽 ";
const MIXED: &str = "Hello 世界 👋 café naïve résumé 日本語テスト ";

fn repeated(s: &str, times: usize) -> String {
    s.repeat(times)
}

fn bench_iter_graphemes(c: &mut Criterion) {
    let mut group = c.benchmark_group("grapheme_iter");
    for (name, text) in [("ascii", ASCII), ("cjk", CJK), ("emoji", EMOJI), ("mixed", MIXED)] {
        let input = repeated(text, 200);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let count = iter_graphemes(black_box(input)).count();
                black_box(count);
            });
        });
    }
    group.finish();
}

fn bench_cluster_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("grapheme_cluster_width");
    for (name, text) in [("ascii", ASCII), ("cjk", CJK), ("emoji", EMOJI), ("mixed", MIXED)] {
        let input = repeated(text, 200);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let total: u32 = iter_graphemes(black_box(input))
                    .map(|g| cluster_width(&g, WidthPolicy::EmojiWide) as u32)
                    .sum();
                black_box(total);
            });
        });
    }
    group.finish();
}

fn bench_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("unicode_measure");
    for (name, text) in [("ascii", ASCII), ("cjk", CJK), ("mixed", MIXED)] {
        let input = repeated(text, 500);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let m = measure(black_box(input), 4, WidthPolicy::EmojiWide);
                black_box(m);
            });
        });
    }
    group.finish();
}

fn bench_wrap_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("unicode_wrap_lines");
    for (name, text) in [("ascii", ASCII), ("cjk", CJK), ("mixed", MIXED)] {
        let input = repeated(text, 500);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let breaks = wrap_lines(black_box(input), 80, WidthPolicy::EmojiWide);
                black_box(breaks);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_iter_graphemes, bench_cluster_width, bench_measure, bench_wrap_lines);
criterion_main!(benches);
