use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use particles::{Cube, ParticleStore, SpatialGrid, Vec3};

fn bench_rebuild(c: &mut Criterion) {
    let cube = Cube::new(Vec3::ZERO, 10.0).unwrap();
    let mut rng = fastrand::Rng::with_seed(1);
    let mut store = ParticleStore::new();
    store.create(1000, 0.05, 1.0, &cube, &mut rng).unwrap();

    let mut group = c.benchmark_group("grid_rebuild");
    for axis_count in [1, 2, 4, 8, 16, 32] {
        let mut grid = SpatialGrid::new(&cube, 1).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(axis_count), &axis_count, |b, &a| {
            b.iter(|| grid.rebuild(&store, &cube, a).unwrap());
        });
    }
    group.finish();
}

fn bench_update_membership(c: &mut Criterion) {
    let cube = Cube::new(Vec3::ZERO, 10.0).unwrap();
    let mut rng = fastrand::Rng::with_seed(2);
    let mut store = ParticleStore::new();
    store.create(1000, 0.05, 1.0, &cube, &mut rng).unwrap();
    let mut grid = SpatialGrid::build(&store, &cube, 10).unwrap();

    c.bench_function("grid_update_membership", |b| {
        b.iter(|| grid.update_membership(&store));
    });
}

criterion_group!(benches, bench_rebuild, bench_update_membership);
criterion_main!(benches);
