mod common;

use std::sync::Arc;

use vmioc::prelude::*;

use common::{
    Clock, Connection, ConnectionSettings, FixedClock, MainViewModel, MemoryRepository, Ping,
    RemoteRepository, Repository, Splitter,
};

#[test]
fn resolve_succeeds_by_registering_concrete_type_on_demand() {
    let container = common::container();

    let view_model = container.resolve::<MainViewModel>().unwrap();
    assert_eq!(view_model.built_with, "with_repositories");
    assert_eq!(view_model.clock.now(), 1_700_000_000);

    let registration = container
        .registration(&key::of::<MainViewModel>())
        .unwrap();
    assert_eq!(registration.lifecycle(), Lifecycle::Transient);
    assert!(registration.is_compiled());
}

#[test]
fn resolve_succeeds_with_only_implementation_of_interface() {
    let container = common::container();

    let clock = container.resolve::<dyn Clock>().unwrap();
    assert_eq!(clock.now(), 1_700_000_000);
    assert!(!container.contains(&key::of::<dyn Clock>()));
}

#[test]
fn resolve_fails_when_interface_has_several_implementations() {
    let container = common::container();

    let result = container.resolve::<dyn Repository>();
    let Err(ResolveError::AmbiguousImplementations { candidates, .. }) = result else {
        panic!("expected an ambiguity error");
    };
    assert_eq!(candidates, ["MemoryRepository", "RemoteRepository"]);
}

#[test]
fn resolve_named_fails_when_name_is_unregistered() {
    let container = common::container();
    container.register_as::<dyn Clock, FixedClock>().unwrap();

    let result = container.resolve_named::<dyn Clock>("utc");
    assert!(matches!(result, Err(ResolveError::NotRegistered { .. })));
}

#[test]
fn resolve_fails_when_unregistered_types_are_not_resolved() {
    let container = common::container_with(ContainerOptions::new().try_resolve_unregistered(false));

    let result = container.resolve::<FixedClock>();
    assert!(matches!(result, Err(ResolveError::NotRegistered { .. })));
    assert!(container.is_empty());
}

#[test]
fn resolve_fails_when_type_is_unknown() {
    let container = common::container();

    let result = container.resolve::<ConnectionSettings>();
    assert!(matches!(result, Err(ResolveError::NotRegistered { .. })));
}

#[test]
fn resolve_fails_when_constructor_fails() {
    let container = common::container();
    container
        .register_instance(ConnectionSettings { reachable: false })
        .unwrap();

    let result = container.resolve::<Connection>();
    let Err(ResolveError::Activation { source, .. }) = result else {
        panic!("expected an activation error");
    };
    assert_eq!(source.to_string(), "connection refused");
}

#[test]
fn resolve_succeeds_when_fallible_constructor_succeeds() {
    let container = common::container();
    container
        .register_instance(ConnectionSettings { reachable: true })
        .unwrap();

    assert!(container.resolve::<Connection>().is_ok());
}

#[test]
fn resolve_fails_when_dependencies_form_a_cycle() {
    let container = common::container();

    let result = container.resolve::<Ping>();
    let Err(ResolveError::CyclicDependency { key, path, .. }) = result else {
        panic!("expected a cycle");
    };
    assert_eq!(key, key::of::<Ping>());
    assert!(path.contains(&key::of::<common::Pong>()));
}

#[test]
fn resolve_all_succeeds_without_registrations() {
    let container = common::container();

    let names: Vec<_> = container
        .resolve_all::<dyn Repository>()
        .unwrap()
        .iter()
        .map(|repository| repository.name())
        .collect();
    assert_eq!(names, ["memory", "remote"]);
    assert!(container.is_empty());
}

#[test]
fn resolve_all_fails_when_registrations_are_partial() {
    let container = common::container();
    container
        .register_as_named::<dyn Repository, MemoryRepository>("memory")
        .unwrap();

    let result = container.resolve_all::<dyn Repository>();
    let Err(ResolveError::Registration { source, .. }) = result else {
        panic!("expected a registration error");
    };
    let RegisterError::PartialSequence { missing, .. } = source else {
        panic!("expected a partial sequence");
    };
    assert_eq!(missing, ["RemoteRepository"]);
}

#[test]
fn resolve_all_succeeds_with_registrations_covering_every_implementation() {
    let container = common::container();
    container
        .register_as_named::<dyn Repository, RemoteRepository>("b")
        .unwrap();
    container
        .register_as_named::<dyn Repository, MemoryRepository>("a")
        .unwrap();

    let names: Vec<_> = container
        .resolve_all::<dyn Repository>()
        .unwrap()
        .iter()
        .map(|repository| repository.name())
        .collect();
    assert_eq!(names, ["memory", "remote"]);
}

#[test]
fn resolve_type_succeeds_with_runtime_service_type() {
    let container = common::container();

    let instance = container
        .resolve_type(ServiceType::of::<dyn Clock>(), None)
        .unwrap();
    assert!(!instance.is_sequence());
    let clock = instance.downcast::<dyn Clock>().ok().unwrap();
    assert_eq!(clock.now(), 1_700_000_000);
}

#[test]
fn resolve_fails_when_asked_for_other_type_than_registered() {
    let container = common::container();
    container.register_as::<dyn Clock, FixedClock>().unwrap();

    let instance = container.resolve_key(&key::of::<dyn Clock>()).unwrap();
    assert!(instance.downcast::<FixedClock>().is_err());
}

#[test]
fn compile_succeeds_and_builds_every_plan() {
    let container = common::container();
    container.register::<MainViewModel>().unwrap();
    container.register_as::<dyn Clock, FixedClock>().unwrap();

    container.compile().unwrap();
    for key in container.keys() {
        assert!(container.registration(&key).unwrap().is_compiled());
    }
}

#[test]
fn resolve_succeeds_from_many_threads_with_transients() {
    let container = common::container();
    container.register::<MainViewModel>().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.resolve::<MainViewModel>().map(|vm| vm.repositories.len()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 2);
    }
    let first = container.resolve::<MainViewModel>().unwrap();
    let second = container.resolve::<MainViewModel>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn resolve_fails_when_several_constructors_are_marked() {
    let container = common::container();
    container.register::<Splitter>().unwrap();

    let result = container.resolve::<Splitter>();
    assert!(matches!(result, Err(ResolveError::Constructor { .. })));
}
