mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use vmioc::prelude::*;

use common::{Journal, Session, Socket};

fn container_with_journal(options: ContainerOptions) -> (Container, Arc<Journal>) {
    let container = common::container_with(options);
    container.register_instance(Journal::default()).unwrap();
    let journal = container.resolve::<Journal>().unwrap();
    (container, journal)
}

#[test]
fn singleton_is_built_once_across_threads() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap().single_instance();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.resolve::<Session>().unwrap()
            })
        })
        .collect();
    let sessions: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(journal.created(), 1);
    assert!(sessions
        .windows(2)
        .all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn transient_is_built_per_resolution() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap();

    let first = container.resolve::<Session>().unwrap();
    let second = container.resolve::<Session>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(journal.created(), 2);
}

#[test]
fn unregister_succeeds_and_disposes_singleton() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap().single_instance();
    container.resolve::<Session>().unwrap();

    container.unregister::<Session>().unwrap();

    assert_eq!(journal.disposed(), 1);
    assert!(!container.contains(&key::of::<Session>()));
}

#[test]
fn unregister_succeeds_without_disposing_unbuilt_singleton() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap().single_instance();

    container.unregister::<Session>().unwrap();

    assert_eq!(journal.created(), 0);
    assert_eq!(journal.disposed(), 0);
}

#[test]
fn unregister_fails_and_keeps_entry_when_disposal_fails() {
    let container = common::container();
    container.register::<Socket>().unwrap().single_instance();
    let socket = container.resolve::<Socket>().unwrap();

    let err = container.unregister::<Socket>().unwrap_err();

    let UnregisterError::Dispose { key, source, .. } = err else {
        panic!("expected a disposal error");
    };
    assert_eq!(key, key::of::<Socket>());
    assert_eq!(source.to_string(), "socket already closed");
    assert!(container.contains(&key::of::<Socket>()));
    let again = container.resolve::<Socket>().unwrap();
    assert!(Arc::ptr_eq(&socket, &again));
}

#[test]
fn unregister_fails_and_removes_entry_when_policy_says_so() {
    let container = common::container_with(
        ContainerOptions::new().disposal_failure(DisposalFailure::Remove),
    );
    container.register::<Socket>().unwrap().single_instance();
    container.resolve::<Socket>().unwrap();

    let err = container.unregister::<Socket>().unwrap_err();

    assert!(matches!(err, UnregisterError::Dispose { .. }));
    assert!(!container.contains(&key::of::<Socket>()));
}

#[test]
fn unregister_all_succeeds_and_disposes_every_singleton() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap().single_instance();
    container.register_named::<Session>("secondary").unwrap().single_instance();
    container.resolve::<Session>().unwrap();
    container.resolve_named::<Session>("secondary").unwrap();

    container.unregister_all().unwrap();

    assert_eq!(journal.disposed(), 2);
    assert!(container.is_empty());
}

#[test]
fn dispose_succeeds_and_rejects_later_use() {
    let (container, journal) = container_with_journal(ContainerOptions::default());
    container.register::<Session>().unwrap().single_instance();
    container.resolve::<Session>().unwrap();

    container.dispose().unwrap();

    assert_eq!(journal.disposed(), 1);
    assert!(container.is_disposed());
    assert!(matches!(
        container.resolve::<Session>(),
        Err(ResolveError::Disposed { .. })
    ));
    assert!(matches!(
        container.register::<Session>(),
        Err(RegisterError::Disposed { .. })
    ));
    container.dispose().unwrap();
    assert_eq!(journal.disposed(), 1);
}

#[test]
fn dispose_fails_when_an_instance_fails_to_dispose() {
    let container = common::container();
    container.register::<Socket>().unwrap().single_instance();
    container.resolve::<Socket>().unwrap();

    let err = container.dispose().unwrap_err();

    assert!(matches!(err, UnregisterError::Dispose { .. }));
    assert!(container.is_disposed());
    assert!(container.is_empty());
}
