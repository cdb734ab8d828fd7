//! Benchmarks for method body translation.
//!
//! Measures the cost of translating freshly created descriptors:
//! - A straight-line body with field and string operands
//! - A branch-heavy loop with a switch
//! - A generic method instantiated over several types
//! - Bulk translation of a whole domain

extern crate ilbody;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use ilbody::{compiler::compile, prelude::*};
use std::{hint::black_box, sync::Arc};

const WIDGET: Token = Token(0x0200_0001);
const ID: Token = Token(0x0400_0001);
const COUNT: Token = Token(0x0400_0002);

fn widget(domain: &Domain) -> TypeRc {
    TypeBuilder::new(domain, WIDGET)
        .class("Demo", "Widget")
        .field(ID, "id")
        .static_field(COUNT, "Count")
        .build()
        .unwrap()
}

fn straight_line(token: Token) -> MethodDef {
    let mut body = BodyBuilder::new();
    for _ in 0..32 {
        body.ldarg_this().unwrap();
        body.emit_with(
            OpCode::Ldfld,
            RawOperand::Field(FieldRef::new(RawType::Named(WIDGET), ID)),
        )
        .unwrap();
        body.emit_with(
            OpCode::Stsfld,
            RawOperand::Field(FieldRef::new(RawType::Named(WIDGET), COUNT)),
        )
        .unwrap();
        body.ldstr("widget").unwrap();
        body.emit(OpCode::Pop).unwrap();
    }
    body.ret().unwrap();

    MethodDef::new(token, "Touch").with_body(body.finalize().unwrap())
}

fn branchy(token: Token) -> MethodDef {
    let mut body = BodyBuilder::new();
    body.declare_locals(1);
    body.ldc_i4(0).unwrap();
    body.stloc(0).unwrap();
    body.define_label("head").unwrap();
    body.ldloc(0).unwrap();
    body.emit_switch(&["a", "b", "c", "a"]).unwrap();
    body.emit_branch(OpCode::Br, "next").unwrap();
    for label in ["a", "b", "c"] {
        body.define_label(label).unwrap();
        body.ldc_i4(7).unwrap();
        body.emit(OpCode::Pop).unwrap();
        body.emit_branch(OpCode::Br, "next").unwrap();
    }
    body.define_label("next").unwrap();
    body.ldloc(0).unwrap();
    body.ldc_i4(1).unwrap();
    body.emit(OpCode::Add).unwrap();
    body.emit(OpCode::Dup).unwrap();
    body.stloc(0).unwrap();
    body.ldc_i4(1000).unwrap();
    body.emit_branch(OpCode::Blt, "head").unwrap();
    body.ret().unwrap();

    MethodDef::new(token, "Spin")
        .static_method()
        .with_body(body.finalize().unwrap())
}

fn generic(token: Token) -> MethodDef {
    let t = || RawType::GenericParameter("T".into());
    let mut body = BodyBuilder::new();
    for _ in 0..16 {
        body.ldarg(0).unwrap();
        body.emit_with(OpCode::Box, RawOperand::Type(t())).unwrap();
        body.emit_with(OpCode::Isinst, RawOperand::Type(RawType::SzArray(Box::new(t()))))
            .unwrap();
        body.emit(OpCode::Pop).unwrap();
    }
    body.ret().unwrap();

    MethodDef::new(token, "Wrap")
        .static_method()
        .generic_param("T")
        .param("value", t())
        .with_body(body.finalize().unwrap())
}

/// Translate one body from scratch, outside any descriptor cache
fn bench_translate_single(c: &mut Criterion) {
    let domain = Domain::with_config(DomainConfig::minimal());
    widget(&domain);
    domain
        .define_method(WIDGET, straight_line(Token(0x0600_0001)))
        .unwrap();
    domain
        .define_method(WIDGET, branchy(Token(0x0600_0002)))
        .unwrap();

    let mut group = c.benchmark_group("translate");
    for (name, token) in [("straight_line", 0x0600_0001), ("branchy", 0x0600_0002)] {
        let method = domain.method(WIDGET, Token(token)).unwrap();
        let size = method.raw_body().map_or(0, |body| body.len());
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(compile(black_box(&method), &domain).unwrap()));
        });
    }
    group.finish();
}

/// Instantiate a generic method over several types and translate each instance
fn bench_generic_instances(c: &mut Criterion) {
    let domain = Domain::new();
    widget(&domain);
    domain
        .define_method(WIDGET, generic(Token(0x0600_0003)))
        .unwrap();
    let definition = domain.method(WIDGET, Token(0x0600_0003)).unwrap();
    let args: Vec<TypeRc> = [
        PrimitiveKind::I4,
        PrimitiveKind::I8,
        PrimitiveKind::String,
        PrimitiveKind::Object,
    ]
    .into_iter()
    .filter_map(|kind| domain.primitive(kind))
    .collect();

    c.bench_function("generic_instances", |b| {
        b.iter(|| {
            for arg in &args {
                let instance = Arc::new(
                    definition
                        .make_generic(&domain, std::slice::from_ref(arg))
                        .unwrap(),
                );
                black_box(instance.compiled_body(&domain).unwrap());
            }
        });
    });
}

/// Bulk translation of every method in a fresh domain
fn bench_compile_all(c: &mut Criterion) {
    for (name, config) in [
        ("compile_all_sequential", DomainConfig::minimal()),
        ("compile_all_parallel", DomainConfig::lazy()),
    ] {
        c.bench_function(name, |b| {
            b.iter_with_setup(
                || {
                    let domain = Domain::with_config(config);
                    widget(&domain);
                    for row in 1..=64u32 {
                        let token = Token(0x0600_0000 | row);
                        let def = if row % 2 == 0 {
                            straight_line(token)
                        } else {
                            branchy(token)
                        };
                        domain.define_method(WIDGET, def).unwrap();
                    }
                    domain
                },
                |domain| black_box(domain.compile_all().unwrap()),
            );
        });
    }
}

criterion_group!(
    benches,
    bench_translate_single,
    bench_generic_instances,
    bench_compile_all
);
criterion_main!(benches);
