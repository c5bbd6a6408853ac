use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use whombat_viewer::chunks::{calculate_chunks, visible_range, CHUNK_BUFFER, CHUNK_DURATION};
use whombat_viewer::interval::Interval;

/// Recording lengths from a short clip to a full night of monitoring.
const DURATIONS: [(&str, f64); 3] = [("1min", 60.0), ("1h", 3_600.0), ("12h", 43_200.0)];

fn benchmark_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_chunks");

    for (name, duration) in DURATIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), &duration, |b, &duration| {
            b.iter(|| {
                let chunks = calculate_chunks(
                    black_box(duration),
                    black_box(0.05),
                    black_box(0.5),
                    CHUNK_DURATION,
                    CHUNK_BUFFER,
                );
                black_box(chunks.len());
            });
        });
    }

    group.finish();
}

fn benchmark_visible_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_range");

    for (name, duration) in DURATIONS {
        let chunks = calculate_chunks(duration, 0.05, 0.5, CHUNK_DURATION, CHUNK_BUFFER);
        // A 20 s window in the middle of the recording.
        let center = duration / 2.0;
        let window = Interval::new(center - 10.0, center + 10.0);

        group.bench_with_input(BenchmarkId::from_parameter(name), &chunks, |b, chunks| {
            b.iter(|| black_box(visible_range(black_box(chunks), black_box(&window), 1)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_partition, benchmark_visible_range);
criterion_main!(benches);
