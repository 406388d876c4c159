pub mod constructor;

mod context;
mod fallback;
mod plan;
mod proxy;

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::container::registry::RegisterError;
use crate::container::Instance;
use crate::key::{self, Key, ServiceType, TypeHandle};

pub use constructor::SelectError;
pub use context::{CallContext, InjectionTrace};
pub(crate) use fallback::Fallback;
pub(crate) use plan::{Activated, ActivationPlan};
pub(crate) use proxy::ContextForwardingResolverProxy;

/// The resolution contract containers offer to their consumers, including
/// the factories registered in them.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    fn resolve_key(&self, key: &Key) -> Result<Instance, ResolveError>;

    fn resolve_dependency<'a>(
        &self,
        key: &Key,
        context: &'a CallContext<'a>,
    ) -> Result<Instance, ResolveError>;
}

pub trait TypedResolver: Resolver {
    fn resolve<R>(&self) -> Result<Arc<R>, ResolveError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        downcast_single(key::of::<R>(), self.resolve_key(&key::of::<R>()))
    }

    fn resolve_named<R>(&self, name: &str) -> Result<Arc<R>, ResolveError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let key = key::named::<R>(name);
        let instance = self.resolve_key(&key);
        downcast_single(key, instance)
    }

    /// Every implementation of `R`, as registered with
    /// `register_types_of` or discovered in the type catalog.
    fn resolve_all<R>(&self) -> Result<Vec<Arc<R>>, ResolveError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let key = key::sequence_of::<R>();
        match self.resolve_key(&key)?.downcast_sequence::<R>() {
            Ok(objects) => Ok(objects),
            Err(_) => TypeMismatchSnafu {
                key,
                expected: std::any::type_name::<Vec<Arc<R>>>(),
            }
            .fail(),
        }
    }

    fn resolve_type(
        &self,
        service: ServiceType,
        name: Option<&str>,
    ) -> Result<Instance, ResolveError> {
        self.resolve_key(&Key::new(service, name))
    }

    fn upcast_dyn(&self) -> &dyn Resolver;
}

impl<T> TypedResolver for T
where
    T: Resolver,
{
    fn upcast_dyn(&self) -> &dyn Resolver {
        self
    }
}

impl TypedResolver for dyn Resolver + '_ {
    fn upcast_dyn(&self) -> &dyn Resolver {
        self
    }
}

fn downcast_single<R>(
    key: Key,
    instance: Result<Instance, ResolveError>,
) -> Result<Arc<R>, ResolveError>
where
    R: ?Sized + Send + Sync + 'static,
{
    match instance?.downcast::<R>() {
        Ok(object) => Ok(object),
        Err(_) => TypeMismatchSnafu {
            key,
            expected: std::any::type_name::<Arc<R>>(),
        }
        .fail(),
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum ResolveError {
    #[snafu(display("nothing is registered under {key}"))]
    #[non_exhaustive]
    NotRegistered { key: Key },
    #[snafu(display("no concrete type implements {ty}"))]
    #[non_exhaustive]
    NoImplementations { ty: TypeHandle },
    #[snafu(display(
        "{ty} has {} implementations ({}), pick one by registering it",
        candidates.len(),
        candidates.join(", ")
    ))]
    #[non_exhaustive]
    AmbiguousImplementations {
        ty: TypeHandle,
        candidates: Vec<&'static str>,
    },
    #[snafu(display("the generic definition {name}<_> must be bound before resolving"))]
    #[non_exhaustive]
    UnboundGeneric { name: &'static str },
    #[snafu(display("{ty} cannot be registered on the fly: it has no public or internal constructor"))]
    #[non_exhaustive]
    Ineligible { ty: TypeHandle },
    #[snafu(display("could not select a constructor for {key}"))]
    #[non_exhaustive]
    Constructor { key: Key, source: SelectError },
    #[snafu(display("the registrations for {key} are inconsistent"))]
    #[non_exhaustive]
    Registration { key: Key, source: RegisterError },
    #[snafu(display("could not construct the object for {key}"))]
    #[non_exhaustive]
    Activation {
        key: Key,
        source: Arc<dyn Error + Send + Sync>,
    },
    #[snafu(display("{key} depends on itself: {}", PathDisplayer::new(path)))]
    #[non_exhaustive]
    CyclicDependency { key: Key, path: Vec<Key> },
    #[snafu(display("the object registered under {key} is not a {expected}"))]
    #[non_exhaustive]
    TypeMismatch { key: Key, expected: &'static str },
    #[snafu(display("the construction of {key} was abandoned by its thread"))]
    #[non_exhaustive]
    Abandoned { key: Key },
    #[snafu(display("the container has been disposed"))]
    #[non_exhaustive]
    Disposed,
}

struct PathDisplayer<'a> {
    path: &'a [Key],
}

impl<'a> PathDisplayer<'a> {
    fn new(path: &'a [Key]) -> Self {
        Self { path }
    }
}

impl Display for PathDisplayer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, key) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
