use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shinobi_di::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut builder = KernelBuilder::new();
    builder.add_callback::<u64, _>(scopes::singleton(), |_| Ok(42u64));
    let kernel = builder.build();

    // Prime the cache
    let _ = kernel.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = kernel.get::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_transient_creation(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut builder = KernelBuilder::new();
    builder.add_callback::<Service, _>(scopes::transient(), |_| Ok(Service { data: [0; 64] }));
    let kernel = builder.build();

    c.bench_function("transient_creation", |b| {
        b.iter(|| {
            let v = kernel.get::<Service>().unwrap();
            black_box(v.data.len());
        })
    });
}

fn bench_thread_scope_hit(c: &mut Criterion) {
    struct PerThread(u32);

    let mut builder = KernelBuilder::new();
    builder.add_callback::<PerThread, _>(scopes::thread(), |_| Ok(PerThread(7)));
    let kernel = builder.build();

    let _ = kernel.get::<PerThread>().unwrap();

    c.bench_function("thread_scope_hit", |b| {
        b.iter(|| {
            let v = kernel.get::<PerThread>().unwrap();
            black_box(v.0);
        })
    });
}

fn bench_plan_driven_resolution(c: &mut Criterion) {
    struct Engine;
    struct Car {
        engine: Arc<Engine>,
    }

    let mut builder = KernelBuilder::new();
    builder.add_callback::<Engine, _>(scopes::singleton(), |_| Ok(Engine));
    builder.register_plan(plan_for::<Car>().constructor(
        "new",
        vec![Target::of::<Engine>("engine", TargetKind::ConstructorArgument)],
        |_ctx, values| Ok(Car { engine: value_of::<Engine>(&values[0])? }),
    ));
    builder.add_plan_binding::<Car>(scopes::transient());
    let kernel = builder.build();

    // Prime the plan memo and the engine singleton
    let _ = kernel.get::<Car>().unwrap();

    c.bench_function("plan_driven_transient", |b| {
        b.iter(|| {
            let car = kernel.get::<Car>().unwrap();
            black_box(Arc::as_ptr(&car.engine));
        })
    });
}

fn bench_parameter_override(c: &mut Criterion) {
    struct Widget(u64);
    struct Holder {
        widget: Arc<Widget>,
    }

    let mut builder = KernelBuilder::new();
    builder.register_plan(plan_for::<Holder>().constructor(
        "new",
        vec![Target::of::<Widget>("widget", TargetKind::ConstructorArgument)],
        |_ctx, values| Ok(Holder { widget: value_of::<Widget>(&values[0])? }),
    ));
    builder.add_plan_binding::<Holder>(scopes::transient());
    let kernel = builder.build();

    let widget = Arc::new(Widget(9));

    c.bench_function("parameter_override", |b| {
        b.iter(|| {
            let holder = kernel
                .get_with::<Holder>(vec![Parameter::constructor_arg("widget", widget.clone())])
                .unwrap();
            black_box(holder.widget.0);
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_transient_creation,
    bench_thread_scope_hit,
    bench_plan_driven_resolution,
    bench_parameter_override,
);
criterion_main!(benches);
