//! Lowering throughput benchmarks.
//!
//! Each group builds a synthetic declaration model once and lowers it per
//! iteration:
//! - Ladders: functions with many defaulted parameters
//! - Mixins: classes satisfying deep interface hierarchies
//! - Nesting: member and local classes capturing outer state
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use declower::prelude::*;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

fn int() -> TypeRef {
    TypeRef::basic("Integer")
}

/// `count` toplevel functions, each with `arity` parameters of which all
/// but the first are defaulted.
fn ladder_model(count: usize, arity: usize) -> DeclarationModel {
    let mut b = ModelBuilder::new().package("bench.ladders");
    for i in 0..count {
        let id = b.next_id();
        let mut f = b.function(&format!("f{i}")).shared().returns(int());
        f = f.param(Parameter::new("p0", int()));
        for p in 1..arity {
            f = f.param(
                Parameter::new(format!("p{p}"), int()).with_default(SourceExpr::param(id, p - 1)),
            );
        }
        f.returning(SourceExpr::param(id, 0)).build();
    }
    b.finish()
}

/// A chain of `depth` interfaces, each with one concrete member, and
/// `classes` classes satisfying the last one.
fn mixin_model(depth: usize, classes: usize) -> DeclarationModel {
    let mut b = ModelBuilder::new().package("bench.mixins");
    let mut parent: Option<DeclId> = None;
    for d in 0..depth {
        let mut iface = b.interface(&format!("I{d}")).shared();
        if let Some(parent) = parent {
            iface = iface.satisfies(TypeRef::named(parent));
        }
        let iface = iface.build();
        b.function(&format!("m{d}"))
            .member_of(iface)
            .shared()
            .default_()
            .param(Parameter::new("x", int()).with_default(SourceExpr::int(d as i64)))
            .returns(int())
            .returning(SourceExpr::int(0))
            .build();
        parent = Some(iface);
    }
    if let Some(leaf) = parent {
        for c in 0..classes {
            b.class(&format!("C{c}"))
                .shared()
                .satisfies(TypeRef::named(leaf))
                .build();
        }
    }
    b.finish()
}

/// Generic classes with a member class and a local class capturing a
/// parameter of the enclosing method.
fn nesting_model(count: usize) -> DeclarationModel {
    let mut b = ModelBuilder::new().package("bench.nesting");
    for i in 0..count {
        let outer = b
            .class(&format!("Outer{i}"))
            .shared()
            .type_param("T")
            .param(Parameter::new("seed", int()))
            .build();
        b.class("Member")
            .member_of(outer)
            .shared()
            .param(Parameter::new("n", int()).with_default(SourceExpr::int(1)))
            .build();
        let run = b
            .function("run")
            .member_of(outer)
            .shared()
            .param(Parameter::new("limit", int()))
            .build();
        b.class("Local")
            .local_to(run)
            .captures(LocalRef::Param(declower::model::ParamRef::new(run, 0)))
            .build();
    }
    b.finish()
}

fn ladder_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("lowering/ladders");
    for arity in [2, 8, 32] {
        let model = ladder_model(100, arity);
        group.throughput(Throughput::Elements(model.toplevel().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(arity), &model, |b, model| {
            b.iter(|| {
                let output = declower::lower_unit(black_box(model), LoweringOptions::default());
                end_profiling_frame();
                black_box(output.stats.overloads)
            });
        });
    }
    group.finish();
}

fn mixin_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("lowering/mixins");
    for depth in [1, 4, 16] {
        let model = mixin_model(depth, 50);
        group.throughput(Throughput::Elements(model.toplevel().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &model, |b, model| {
            b.iter(|| {
                let output = declower::lower_unit(black_box(model), LoweringOptions::default());
                end_profiling_frame();
                black_box(output.stats.companion_delegates)
            });
        });
    }
    group.finish();
}

fn nesting_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let model = nesting_model(200);
    let mut group = c.benchmark_group("lowering/nesting");
    group.throughput(Throughput::Elements(model.toplevel().len() as u64));
    group.bench_function("reified", |b| {
        b.iter(|| {
            let output = declower::lower_unit(black_box(&model), LoweringOptions::default());
            end_profiling_frame();
            black_box(output.declarations.len())
        });
    });
    group.bench_function("erased", |b| {
        let options = LoweringOptions::default().with_reified_generics(false);
        b.iter(|| {
            let output = declower::lower_unit(black_box(&model), options);
            end_profiling_frame();
            black_box(output.declarations.len())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    ladder_benchmarks,
    mixin_benchmarks,
    nesting_benchmarks
);
criterion_main!(benches);
