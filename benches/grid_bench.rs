use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use layout_core::{Bounds, EntityDefinition, InputSnapshot, Layout, LayoutConfig, QueryFilter, Vec2};

fn populated_layout(count: usize) -> Layout {
    let mut layout = Layout::new(LayoutConfig::with_world(64.0, 4096.0, 4096.0)).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let solid = EntityDefinition::new(Vec2::new(24.0, 24.0)).solid();
    let pass = EntityDefinition::new(Vec2::new(24.0, 24.0));

    for i in 0..count {
        let position = Vec2::new(rng.gen_range(0.0..4072.0), rng.gen_range(0.0..4072.0));
        let def = if i % 4 == 0 { &pass } else { &solid };
        layout.spawn(def, position);
    }
    layout.step(1.0 / 60.0, InputSnapshot::idle()).unwrap();
    layout
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query");
    for count in [1_000usize, 10_000] {
        let layout = populated_layout(count);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let probes: Vec<Bounds> = (0..256)
            .map(|_| Bounds::new(rng.gen_range(0.0..3968.0), rng.gen_range(0.0..3968.0), 128.0, 128.0))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &probes, |b, probes| {
            let filter = QueryFilter::new();
            b.iter(|| {
                let mut hits = 0;
                for probe in probes {
                    hits += layout.query_bounds(black_box(probe), &filter).len();
                }
                hits
            })
        });
    }
    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let mut layout = populated_layout(5_000);
    c.bench_function("layout_step_5000", |b| {
        b.iter(|| layout.step(black_box(1.0 / 60.0), InputSnapshot::idle()).unwrap())
    });
}

criterion_group!(benches, bench_query, bench_step);
criterion_main!(benches);
