//! The process-wide default container and free functions that act on it.
//!
//! The default container is created on first use over
//! [`TypeCatalog::global`]. Tests can swap it with [`set_container`] or
//! throw it away with [`reset`]; code that can be handed a [`Container`]
//! should prefer that.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::container::directory::DirectoryError;
use crate::container::options::ContainerOptions;
use crate::container::registry::{
    RegisterError, RegisterOptions, RegisterRequest, UnregisterError,
};
use crate::container::resolver::{ResolveError, Resolver, TypedResolver};
use crate::container::{Container, Instance};
use crate::key::{Key, ServiceType};
use crate::lifecycle::{Dispose, Lifecycle};
use crate::types::{ConstructError, Injectable, TypeCatalog, Upcast};

static DEFAULT: LazyLock<RwLock<Option<Container>>> = LazyLock::new(|| RwLock::new(None));

/// The default container, created on first access.
pub fn container() -> Container {
    if let Some(container) = DEFAULT.read().as_ref() {
        return container.clone();
    }

    DEFAULT
        .write()
        .get_or_insert_with(|| {
            debug!("created the default container");
            Container::new()
        })
        .clone()
}

/// Replaces the default container and returns the previous one, which is
/// left as it is.
pub fn set_container(container: Container) -> Option<Container> {
    DEFAULT.write().replace(container)
}

/// Replaces the default container with a fresh one using `options`, and
/// disposes the previous one.
pub fn initialize(options: ContainerOptions) -> Result<(), UnregisterError> {
    let previous = set_container(Container::with_options(options));
    dispose_previous(previous)
}

/// Disposes the default container. The next access creates a new one.
pub fn reset() -> Result<(), UnregisterError> {
    let previous = DEFAULT.write().take();
    dispose_previous(previous)
}

fn dispose_previous(previous: Option<Container>) -> Result<(), UnregisterError> {
    match previous {
        Some(previous) => {
            debug!("disposing the previous default container");
            previous.dispose()
        }
        None => Ok(()),
    }
}

/// The process-wide type catalog.
pub fn catalog() -> Arc<TypeCatalog> {
    TypeCatalog::global()
}

pub fn get_container(name: &str) -> Result<Container, DirectoryError> {
    Container::get_container(name)
}

pub fn new_child_container(name: Option<&str>) -> Result<Container, DirectoryError> {
    container().new_child_container(name)
}

pub fn register<C: Injectable>() -> Result<RegisterOptions, RegisterError> {
    container().register::<C>()
}

pub fn register_named<C: Injectable>(name: &str) -> Result<RegisterOptions, RegisterError> {
    container().register_named::<C>(name)
}

pub fn register_as<R, C>() -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Injectable + Upcast<R>,
{
    container().register_as::<R, C>()
}

pub fn register_as_named<R, C>(name: &str) -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Injectable + Upcast<R>,
{
    container().register_as_named::<R, C>(name)
}

pub fn register_with_constructor<C, I>(hints: I) -> Result<RegisterOptions, RegisterError>
where
    C: Injectable,
    I: IntoIterator<Item = ServiceType>,
{
    container().register_with_constructor::<C, I>(hints)
}

pub fn register_type(request: RegisterRequest) -> Result<RegisterOptions, RegisterError> {
    container().register_type(request)
}

pub fn register_instance<C>(instance: C) -> Result<RegisterOptions, RegisterError>
where
    C: Send + Sync + 'static,
{
    container().register_instance(instance)
}

pub fn register_instance_as<R, C>(
    instance: C,
    name: Option<&str>,
) -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Upcast<R>,
{
    container().register_instance_as::<R, C>(instance, name)
}

pub fn register_disposable_instance_as<R, C>(
    instance: C,
    name: Option<&str>,
) -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Upcast<R> + Dispose,
{
    container().register_disposable_instance_as::<R, C>(instance, name)
}

pub fn register_explicit<R, C, F>(factory: F) -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Upcast<R>,
    F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
{
    container().register_explicit::<R, C, F>(factory)
}

pub fn register_explicit_named<R, C, F>(
    name: &str,
    factory: F,
) -> Result<RegisterOptions, RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
    C: Upcast<R>,
    F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
{
    container().register_explicit_named::<R, C, F>(name, factory)
}

pub fn register_types_of<R>(lifecycle: Lifecycle) -> Result<(), RegisterError>
where
    R: ?Sized + Send + Sync + 'static,
{
    container().register_types_of::<R>(lifecycle)
}

pub fn unregister<T: ?Sized + 'static>() -> Result<(), UnregisterError> {
    container().unregister::<T>()
}

pub fn unregister_named<T: ?Sized + 'static>(name: &str) -> Result<(), UnregisterError> {
    container().unregister_named::<T>(name)
}

pub fn unregister_key(key: &Key) -> Result<(), UnregisterError> {
    container().unregister_key(key)
}

pub fn unregister_all() -> Result<(), UnregisterError> {
    container().unregister_all()
}

pub fn compile() -> Result<(), ResolveError> {
    container().compile()
}

pub fn contains(key: &Key) -> bool {
    container().contains(key)
}

pub fn resolve<R>() -> Result<Arc<R>, ResolveError>
where
    R: ?Sized + Send + Sync + 'static,
{
    container().resolve::<R>()
}

pub fn resolve_named<R>(name: &str) -> Result<Arc<R>, ResolveError>
where
    R: ?Sized + Send + Sync + 'static,
{
    container().resolve_named::<R>(name)
}

pub fn resolve_all<R>() -> Result<Vec<Arc<R>>, ResolveError>
where
    R: ?Sized + Send + Sync + 'static,
{
    container().resolve_all::<R>()
}

pub fn resolve_type(service: ServiceType, name: Option<&str>) -> Result<Instance, ResolveError> {
    container().resolve_type(service, name)
}

pub fn resolve_key(key: &Key) -> Result<Instance, ResolveError> {
    container().resolve_key(key)
}
