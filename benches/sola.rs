use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dub_sync::audio::{fit_duration, stitch, AudioBuffer, Placement};
use dub_sync::cache::{FittedSegment, GenerationCache};
use dub_sync::chunk::fingerprint;

fn tone(seconds: f64, sample_rate: u32) -> AudioBuffer {
    let frames = (seconds * sample_rate as f64) as usize;
    let samples = (0..frames)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    AudioBuffer::mono(samples, sample_rate)
}

fn bench_fit(c: &mut Criterion) {
    let input = tone(5.0, 24000);
    let mut group = c.benchmark_group("fit_duration");

    for target in [2.5, 4.0, 6.0, 10.0] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| fit_duration(black_box(&input), target))
        });
    }
    group.finish();
}

fn bench_stitch(c: &mut Criterion) {
    let mut cache = GenerationCache::new();
    let mut placements = Vec::new();

    for n in 0..60 {
        let start = n as f64 * 3.0;
        let id = fingerprint("bench", "A", &n.to_string(), start, start + 3.0);
        cache.insert_if_absent(FittedSegment {
            chunk_id: id.clone(),
            buffer: tone(3.0, 24000),
            word_timings: Vec::new(),
            stretch_ratio: 1.0,
        });
        placements.push(Placement::new(id, start));
    }

    c.bench_function("stitch_3min", |b| b.iter(|| stitch(black_box(&placements), &cache)));
}

criterion_group!(benches, bench_fit, bench_stitch);
criterion_main!(benches);
