//! # Manager Benchmark
//!
//! Measures the per-tick hot paths:
//! 1. Creating entities and attaching components (including growth)
//! 2. Signature-matched iteration with component fetch
//! 3. Raw column reads for render upload

#![allow(missing_docs)]
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::{signature, Component, Manager, ManagerConfig, Schema, Tag};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Velocity {}

struct Frozen;
impl Tag for Frozen {}

signature! {
    struct Moving {
        components: [Position, Velocity],
    }
}

fn schema() -> Schema {
    Schema::builder()
        .component::<Position>()
        .component::<Velocity>()
        .tag::<Frozen>()
        .signature::<Moving>()
        .build()
        .expect("valid schema")
}

/// Half the entities move, the other half only have a position.
fn populated(count: usize) -> Manager {
    let mut manager = Manager::with_config(
        schema(),
        ManagerConfig {
            initial_capacity: count,
        },
    );
    for i in 0..count {
        let entity = manager.create_index();
        manager.add_component(entity, Position::default());
        if i % 2 == 0 {
            manager.add_component(entity, Velocity { x: 1.0, y: 0.5, z: 0.0 });
        }
    }
    manager.refresh();
    manager
}

// =============================================================================
// CREATION
// =============================================================================

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for preallocated in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("create_with_position", preallocated),
            &preallocated,
            |b, &preallocated| {
                b.iter(|| {
                    let initial_capacity = if preallocated { ENTITY_COUNT } else { 100 };
                    let mut manager =
                        Manager::with_config(schema(), ManagerConfig { initial_capacity });
                    for _ in 0..ENTITY_COUNT {
                        let entity = manager.create_index();
                        manager.add_component(entity, Position::default());
                    }
                    manager.refresh();
                    black_box(manager.entity_count())
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// ITERATION
// =============================================================================

fn bench_iterate_matching(c: &mut Criterion) {
    let mut manager = populated(ENTITY_COUNT);

    c.bench_function("iterate_moving_100k", |b| {
        b.iter(|| {
            manager.for_entities_matching::<Moving>(|manager, entity| {
                let (position, velocity) = manager.signature_components_mut::<Moving>(entity);
                position.x += velocity.x * 0.016;
                position.y += velocity.y * 0.016;
                position.z += velocity.z * 0.016;
            });
            black_box(manager.entity_count())
        });
    });
}

fn bench_column_bytes(c: &mut Criterion) {
    let manager = populated(ENTITY_COUNT);

    c.bench_function("column_bytes_position_100k", |b| {
        b.iter(|| {
            let bytes = manager.column_bytes::<Position>();
            black_box(bytes.iter().fold(0u8, |acc, byte| acc ^ byte))
        });
    });
}

criterion_group!(benches, bench_create, bench_iterate_matching, bench_column_bytes);
criterion_main!(benches);
