//! Benchmarks for registration, resolution and wrapped calls

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keywire::{CallArgs, DependencyKey, DependencyMap, Injector, Key, Signature};
use std::hint::black_box;
use std::sync::Arc;

#[derive(Clone)]
struct SmallService {
    value: i32,
}

#[derive(Clone)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("instance_named", |b| {
        b.iter(|| {
            let deps = DependencyMap::new();
            deps.instance("svc", SmallService { value: 42 });
            black_box(deps)
        })
    });

    group.bench_function("singleton_named", |b| {
        b.iter(|| {
            let deps = DependencyMap::new();
            deps.singleton("svc", |_| SmallService { value: 42 });
            black_box(deps)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let deps = DependencyMap::new();
    deps.instance("small", SmallService { value: 42 });
    deps.singleton("medium", |_| MediumService {
        name: "bench".into(),
        values: vec![1, 2, 3],
    });
    deps.factory("fresh", |_| SmallService { value: 7 });

    let small = DependencyKey::named("small");
    let medium = DependencyKey::named("medium");
    let fresh = DependencyKey::named("fresh");

    // Warm the singleton so the bench measures the cached path.
    deps.resolve(&medium).unwrap();

    group.bench_function("instance", |b| {
        b.iter(|| black_box(deps.resolve(black_box(&small)).unwrap()))
    });

    group.bench_function("singleton_warm", |b| {
        b.iter(|| black_box(deps.resolve(black_box(&medium)).unwrap()))
    });

    group.bench_function("factory", |b| {
        b.iter(|| black_box(deps.resolve(black_box(&fresh)).unwrap()))
    });

    group.finish();
}

fn bench_wrapped_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrapped_call");
    group.throughput(Throughput::Elements(1));

    let deps = DependencyMap::new();
    deps.instance("svc", SmallService { value: 42 });

    let inject = Injector::bind(deps);
    let op = inject.wrap(
        Signature::new().required("n").inject("svc", Key::new("svc")),
        |args| {
            let n = *args.get::<i32>("n").unwrap();
            args.get::<SmallService>("svc").unwrap().value + n
        },
    );

    group.bench_function("injected", |b| {
        b.iter(|| black_box(op.call(CallArgs::new().pos(1i32)).unwrap()))
    });

    group.bench_function("overridden", |b| {
        b.iter(|| {
            black_box(
                op.call(
                    CallArgs::new()
                        .pos(1i32)
                        .kw("svc", SmallService { value: 7 }),
                )
                .unwrap(),
            )
        })
    });

    group.finish();
}

fn bench_concurrent_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    let deps = Arc::new(DependencyMap::new());
    deps.singleton("shared", |_| MediumService {
        name: "shared".into(),
        values: vec![0; 16],
    });
    let key = DependencyKey::named("shared");
    deps.resolve(&key).unwrap();

    group.bench_function("resolve_4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let deps = Arc::clone(&deps);
                    let key = key.clone();
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            black_box(deps.resolve(&key).unwrap());
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_wrapped_call,
    bench_concurrent_resolution
);
criterion_main!(benches);
