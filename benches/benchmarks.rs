
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tsanalytics::{AnalyticsConfig, AnalyticsCore, FunctionRequest};

fn make_core(parallel: bool) -> AnalyticsCore {
    let mut cfg = AnalyticsConfig::default();
    cfg.parallel = parallel;
    cfg.parallel_chunk_size = 32;
    AnalyticsCore::with_config(cfg).expect("core init")
}

fn bench_reference_aggregations(c: &mut Criterion) {
    let groups = datasets::generate_groups(datasets::DEFAULT_SEED, 256, 1_000);
    let core = make_core(false);

    let mut group = c.benchmark_group("aggregation");
    for name in ["max", "range", "avg", "dev"] {
        let functions = core.resolve_all(&[FunctionRequest::new(name)]).unwrap();
        group.bench_function(format!("{}_256x1000", name), |b| {
            b.iter(|| {
                let ctx = core.evaluate(black_box(&functions), black_box(&groups));
                black_box(ctx.len())
            })
        });
    }
    group.finish();
}

fn bench_mixed_query(c: &mut Criterion) {
    let groups = datasets::generate_groups(datasets::DEFAULT_SEED, 1_024, 500);
    let requests = [
        FunctionRequest::new("max"),
        FunctionRequest::new("min"),
        FunctionRequest::new("range"),
        FunctionRequest::with_args("p", ["0.99"]),
        FunctionRequest::with_args("movavg", ["30", "SECONDS"]),
        FunctionRequest::new("derivative"),
        FunctionRequest::new("trend"),
        FunctionRequest::new("outlier"),
    ];

    let mut group = c.benchmark_group("mixed_query");
    for (name, parallel) in [("sequential", false), ("parallel", true)] {
        let core = make_core(parallel);
        let functions = core.resolve_all(&requests).unwrap();
        group.bench_function(format!("{}_8fn_1024x500", name), |b| {
            b.iter(|| {
                let ctx = core.evaluate(black_box(&functions), black_box(&groups));
                black_box(ctx.len())
            })
        });
    }
    group.finish();
}

fn bench_registry_resolve(c: &mut Criterion) {
    let core = make_core(false);
    let no_args: &[&str] = &[];
    c.bench_function("resolve_known_and_unknown", |b| {
        b.iter(|| {
            let _ = core.resolve(black_box("range"), black_box(no_args)).unwrap();
            let _ = core.resolve(black_box("doesnotexist"), black_box(no_args)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_reference_aggregations,
    bench_mixed_query,
    bench_registry_resolve
);
criterion_main!(benches);
