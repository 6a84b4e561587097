use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

use cardio_fl::aggregators::fedavg_parameters;
use cardio_fl::ModelParameters;

fn bench_fedavg(c: &mut Criterion) {
    let mut group = c.benchmark_group("fedavg");

    for &n_clients in &[3, 10, 50] {
        for &width in &[64usize, 512, 2048] {
            // Two-layer parameter lists sized like the shared model.
            let updates: Vec<ModelParameters> = (0..n_clients)
                .map(|i| {
                    vec![
                        Array2::from_shape_fn((width, width), |(r, j)| {
                            ((i * width + r + j) as f32).sin()
                        }),
                        Array2::from_shape_fn((1, width), |(_, j)| {
                            ((i + j) as f32).cos()
                        }),
                    ]
                })
                .collect();
            let refs: Vec<&ModelParameters> = updates.iter().collect();
            let weights: Vec<f32> = (0..n_clients).map(|i| 100.0 + i as f32).collect();

            let id = format!("{}c_{}w", n_clients, width);
            group.bench_with_input(
                BenchmarkId::new("parameters", &id),
                &(refs, weights),
                |b, (refs, weights)| b.iter(|| fedavg_parameters(refs, weights).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_fedavg);
criterion_main!(benches);
