use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use holdover::{ClassDef, Runtime, Value};

/// Linear chain C0 <- C1 <- ... with the value stored at the root.
fn chain_runtime(depth: usize) -> Runtime {
    let mut rt = Runtime::new();
    rt.register(ClassDef::new("C0").class_data("data_file", Some(Value::from("/etc/data"))))
        .unwrap();
    for i in 1..depth {
        rt.register(ClassDef::new(format!("C{i}")).parent(format!("C{}", i - 1)))
            .unwrap();
    }
    rt
}

fn diamond_runtime() -> Runtime {
    let mut rt = Runtime::new();
    rt.register(ClassDef::new("A").class_data("color", Some(Value::from("red"))))
        .unwrap();
    rt.register(ClassDef::new("B").parent("A")).unwrap();
    rt.register(ClassDef::new("C").parent("A")).unwrap();
    rt.register(ClassDef::new("D").parent("B").parent("C"))
        .unwrap();
    rt
}

fn bench_accessor_read(c: &mut Criterion) {
    let mut rt = chain_runtime(1);

    c.bench_function("accessor_read_own", |b| {
        b.iter(|| rt.call(black_box("C0"), "data_file", &[]).unwrap());
    });
}

fn bench_accessor_write(c: &mut Criterion) {
    let mut rt = chain_runtime(1);

    c.bench_function("accessor_write", |b| {
        b.iter(|| {
            rt.call(black_box("C0"), "data_file", &[Value::Int(42)])
                .unwrap()
        });
    });
}

fn bench_inherited_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("inherited_read");

    for depth in [2usize, 8, 32] {
        let mut rt = chain_runtime(depth);
        let leaf = format!("C{}", depth - 1);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| rt.call(black_box(&leaf), "data_file", &[]).unwrap());
        });
    }

    group.finish();
}

fn bench_typed_resolve(c: &mut Criterion) {
    let rt = chain_runtime(8);

    c.bench_function("typed_resolve_depth_8", |b| {
        b.iter(|| rt.resolve(black_box("C7"), "data_file").unwrap());
    });
}

fn bench_lazy_recreation(c: &mut Criterion) {
    // A runtime whose class was reloaded: the value survives in the store
    // but the method table is empty, so the first call pays for recreation.
    let mut base = Runtime::new();
    base.register(ClassDef::new("Stuff").class_data("data_file", Some(Value::from("/etc/data"))))
        .unwrap();
    base.register(ClassDef::new("Stuff")).unwrap();

    c.bench_function("lazy_recreation_first_call", |b| {
        b.iter_batched(
            || base.clone(),
            |mut rt| rt.call("Stuff", "data_file", &[]).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_linearize(c: &mut Criterion) {
    let rt = diamond_runtime();

    c.bench_function("linearize_diamond", |b| {
        b.iter(|| rt.linearize(black_box("D")).unwrap());
    });
}

criterion_group!(
    benches,
    bench_accessor_read,
    bench_accessor_write,
    bench_inherited_read,
    bench_typed_resolve,
    bench_lazy_recreation,
    bench_linearize
);

criterion_main!(benches);
