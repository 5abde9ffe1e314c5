//! # Iteration Mutation Tests
//!
//! Systems create and kill entities while iterating. The pass itself must
//! see a stable entity set; the next refresh publishes the changes.
//!
//! Run with: cargo test -p strata_core --test iteration_mutation

use strata_core::{signature, Component, Handle, Manager, ManagerConfig, Schema, Tag};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Lifetime(u32);
impl Component for Lifetime {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Parent(Option<Handle>);
impl Component for Parent {}

struct Spawner;
impl Tag for Spawner {}

signature! {
    struct Aging {
        components: [Lifetime],
    }
}

signature! {
    struct Spawners {
        components: [],
        tags: [Spawner],
    }
}

fn manager(initial_capacity: usize) -> Manager {
    let schema = Schema::builder()
        .component::<Lifetime>()
        .component::<Parent>()
        .tag::<Spawner>()
        .signature::<Aging>()
        .signature::<Spawners>()
        .build()
        .expect("valid schema");
    Manager::with_config(schema, ManagerConfig { initial_capacity })
}

#[test]
fn test_children_spawned_during_iteration_wait_for_refresh() {
    let mut manager = manager(100);
    let parents: Vec<Handle> = (0..3)
        .map(|_| {
            let handle = manager.create_handle();
            manager.add_tag::<Spawner>(handle);
            handle
        })
        .collect();
    manager.refresh();

    let mut visits = 0;
    manager.for_entities_matching::<Spawners>(|manager, entity| {
        visits += 1;
        let parent = manager.handle(entity);
        let child = manager.create_index();
        manager.add_component(child, Parent(Some(parent)));
        manager.add_component(child, Lifetime(2));
    });

    assert_eq!(visits, 3);
    assert_eq!(manager.entity_count(), 3);
    assert_eq!(manager.pending_count(), 3);

    manager.refresh();
    assert_eq!(manager.entity_count(), 6);

    let mut children = 0;
    manager.for_entities_matching::<Aging>(|manager, entity| {
        let parent = manager
            .component::<Parent>(entity)
            .0
            .expect("child records its parent");
        assert!(parents.contains(&parent));
        children += 1;
    });
    assert_eq!(children, 3);
}

#[test]
fn test_spawning_past_capacity_during_iteration() {
    let mut manager = manager(4);
    for _ in 0..4 {
        let entity = manager.create_index();
        manager.add_tag::<Spawner>(entity);
    }
    manager.refresh();
    assert_eq!(manager.capacity(), 4);

    manager.for_entities(|manager, _| {
        for _ in 0..5 {
            let child = manager.create_index();
            manager.add_component(child, Lifetime(1));
        }
    });

    assert!(manager.capacity() >= 24);
    manager.refresh();
    assert_eq!(manager.entity_count(), 24);
}

#[test]
fn test_kills_during_iteration_take_effect_on_refresh() {
    let mut manager = manager(100);
    for lifetime in 0..10 {
        let entity = manager.create_index();
        manager.add_component(entity, Lifetime(lifetime));
    }
    manager.refresh();

    for tick in 0..10 {
        let mut visited = 0;
        manager.for_entities_matching::<Aging>(|manager, entity| {
            visited += 1;
            let (lifetime,) = manager.signature_components_mut::<Aging>(entity);
            if lifetime.0 == 0 {
                manager.kill(entity);
            } else {
                lifetime.0 -= 1;
            }
        });
        assert_eq!(visited, 10 - tick);
        manager.refresh();
        assert_eq!(manager.entity_count(), 9 - tick);
    }
}

#[test]
fn test_spawned_handle_survives_compaction() {
    let mut manager = manager(100);
    for _ in 0..5 {
        manager.create_index();
    }
    manager.refresh();

    let mut spawned = None;
    manager.for_entities(|manager, entity| {
        if entity.index() == 0 {
            let handle = manager.create_handle();
            manager.add_component(handle, Lifetime(42));
            spawned = Some(handle);
        }
        if entity.index() % 2 == 0 {
            manager.kill(entity);
        }
    });
    manager.refresh();

    let spawned = spawned.expect("spawned once");
    assert!(manager.is_handle_valid(spawned));
    assert_eq!(manager.component::<Lifetime>(spawned).0, 42);
    assert_eq!(manager.entity_count(), 3);
}
