mod common;

use std::sync::Arc;

use serial_test::serial;
use vmioc::global;
use vmioc::prelude::*;

use common::{Clock, ConnectionSettings, FixedClock};

#[test]
#[serial]
fn default_container_is_created_once() {
    global::reset().unwrap();

    let first = global::container();
    let second = global::container();
    assert!(first.ptr_eq(&second));
}

#[test]
#[serial]
fn free_functions_act_on_default_container() {
    global::reset().unwrap();
    global::register_instance(ConnectionSettings { reachable: true }).unwrap();

    assert!(global::contains(&key::of::<ConnectionSettings>()));
    let settings = global::resolve::<ConnectionSettings>().unwrap();
    assert!(settings.reachable);

    global::unregister::<ConnectionSettings>().unwrap();
    assert!(global::resolve::<ConnectionSettings>().is_err());
}

#[test]
#[serial]
fn reset_succeeds_and_disposes_previous_default() {
    global::reset().unwrap();
    let previous = global::container();
    global::register_instance(ConnectionSettings { reachable: true }).unwrap();

    global::reset().unwrap();

    assert!(previous.is_disposed());
    assert!(!global::container().ptr_eq(&previous));
    assert!(!global::contains(&key::of::<ConnectionSettings>()));
}

#[test]
#[serial]
fn set_container_succeeds_and_returns_previous() {
    global::reset().unwrap();
    let custom = Container::builder().types(common::catalog()).build().unwrap();

    let previous = global::set_container(custom.clone());
    assert!(previous.is_none());
    assert!(global::container().ptr_eq(&custom));

    let clock: Arc<dyn Clock> = global::resolve::<dyn Clock>().unwrap();
    assert_eq!(clock.now(), 1_700_000_000);
    global::reset().unwrap();
}

#[test]
#[serial]
fn initialize_succeeds_with_options() {
    global::initialize(ContainerOptions::new().try_resolve_unregistered(false)).unwrap();

    assert!(!global::container().options().resolves_unregistered());
    global::register_as::<dyn Clock, FixedClock>().unwrap();
    assert!(global::resolve::<dyn Clock>().is_ok());
    global::reset().unwrap();
}

#[test]
#[serial]
fn default_container_children_are_reachable_by_name() {
    global::reset().unwrap();

    let child = global::new_child_container(Some("default-child")).unwrap();

    let found = global::get_container("default-child").unwrap();
    assert!(found.ptr_eq(&child));
    assert!(child
        .parent()
        .is_some_and(|parent| parent.ptr_eq(&global::container())));
    global::reset().unwrap();
    assert!(global::get_container("default-child").is_err());
}
