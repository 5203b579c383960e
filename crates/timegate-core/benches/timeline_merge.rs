use criterion::{black_box, criterion_group, criterion_main, Criterion};
use timegate_core::{build_timeline, merge, Segment, Timeline};

fn alternating(n: usize, offset: f64, step: f64) -> Timeline {
    let segments = (0..n)
        .map(|i| {
            let t = offset + i as f64 * step;
            if i % 2 == 0 {
                Segment::noop(t)
            } else {
                Segment::cont(t)
            }
        })
        .collect();
    Timeline::from_segments(segments).unwrap()
}

fn bench_merge(c: &mut Criterion) {
    let cur = alternating(256, 0.0, 1.0);
    let sub = alternating(256, 0.37, 1.1);

    c.bench_function("merge_256x256", |b| {
        b.iter(|| merge(black_box(&cur), black_box(&sub)).unwrap())
    });

    c.bench_function("build_timeline_8_tracks", |b| {
        b.iter(|| {
            let chain = (0..8).map(|i| alternating(64, i as f64 * 0.21, 1.3));
            build_timeline(black_box(chain)).unwrap()
        })
    });
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
