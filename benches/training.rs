use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use heartflow::preprocessing::{prepare_for_modeling, PrepareOptions};
use heartflow::training::RandomForest;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>());
    let y = x
        .rows()
        .into_iter()
        .map(|row| if row.sum() + rng.gen::<f64>() * 0.5 > n_features as f64 / 2.0 { 1.0 } else { 0.0 })
        .collect();

    (x, y)
}

fn create_records(n_rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    df!(
        "id" => (0..n_rows as i64).collect::<Vec<_>>(),
        "Age" => (0..n_rows).map(|_| rng.gen_range(28..78i64)).collect::<Vec<_>>(),
        "Sex" => (0..n_rows).map(|_| if rng.gen_bool(0.8) { "M" } else { "F" }).collect::<Vec<_>>(),
        "ChestPainType" => (0..n_rows).map(|_| ["ATA", "NAP", "ASY", "TA"][rng.gen_range(0..4)]).collect::<Vec<_>>(),
        "Cholesterol" => (0..n_rows).map(|_| rng.gen_range(120..400i64)).collect::<Vec<_>>(),
        "MaxHR" => (0..n_rows).map(|_| rng.gen_range(60..202i64)).collect::<Vec<_>>(),
        "HeartDisease" => (0..n_rows).map(|_| rng.gen_range(0..2i64)).collect::<Vec<_>>()
    )
    .unwrap()
}

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_classification_data(*n_rows, 12);

        for n_jobs in [1, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("fit_jobs_{}", n_jobs), n_rows),
                &(&x, &y),
                |b, (x, y)| {
                    b.iter(|| {
                        RandomForest::builder(100)
                            .with_max_depth(5)
                            .with_n_jobs(n_jobs)
                            .fit(black_box(x), black_box(y))
                            .unwrap()
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x, y) = create_classification_data(2000, 12);
    let model = RandomForest::builder(100).with_max_depth(5).fit(&x, &y).unwrap();

    group.bench_function("predict_proba", |b| {
        b.iter(|| model.predict_positive_proba(black_box(&x)).unwrap())
    });

    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let df = create_records(918);
    let options = PrepareOptions::default();

    c.bench_function("prepare_for_modeling", |b| {
        b.iter(|| prepare_for_modeling(black_box(&df), &options).unwrap())
    });
}

criterion_group!(benches, bench_forest_fit, bench_prediction, bench_prepare);
criterion_main!(benches);
