mod meta;
mod request;
mod store;

use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::container::resolver::{ResolveError, SelectError};
use crate::key::{Key, ServiceType, TypeHandle};
use crate::lifecycle::Lifecycle;

pub(crate) use meta::{
    Activator, Cached, ConstructingObjectContext, FactoryFn, InstanceSlot, MetaObject,
    WaitResponse,
};
pub use request::RegisterRequest;
pub(crate) use store::RegistrationStore;

/// A handle on a registration that has just been made, used to adjust its
/// lifecycle.
///
/// Registrations are transient unless told otherwise. Pre-supplied instances
/// are always singletons and ignore both calls.
#[derive(Clone)]
pub struct RegisterOptions {
    meta: Arc<MetaObject>,
}

impl RegisterOptions {
    pub(crate) fn new(meta: Arc<MetaObject>) -> Self {
        Self { meta }
    }

    /// One instance per container, built on first resolution.
    pub fn single_instance(self) -> Self {
        self.meta.set_lifecycle(Lifecycle::Singleton);
        self
    }

    /// A fresh instance per resolution.
    pub fn multi_instance(self) -> Self {
        self.meta.set_lifecycle(Lifecycle::Transient);
        self
    }

    pub fn key(&self) -> &Key {
        self.meta.key()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.meta.lifecycle()
    }

    /// The type built for this registration: the concrete type, or
    /// `Vec<T>` for a sequence.
    pub fn concrete(&self) -> ServiceType {
        self.meta.concrete()
    }

    pub fn is_compiled(&self) -> bool {
        self.meta.is_compiled()
    }

    pub fn has_instance(&self) -> bool {
        self.meta.has_instance()
    }
}

impl Debug for RegisterOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RegisterOptions")
            .field("key", self.key())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum RegisterError {
    #[snafu(display("the key {key} is already registered in the container"))]
    #[non_exhaustive]
    KeyDuplicated { key: Key },
    #[snafu(display("{ty} is not a concrete type known to the type catalog"))]
    #[non_exhaustive]
    NotConcrete { ty: TypeHandle },
    #[snafu(display("{concrete} cannot be resolved as {service}"))]
    #[non_exhaustive]
    NotAssignable {
        concrete: TypeHandle,
        service: ServiceType,
    },
    #[snafu(display("{ty} is neither an interface nor an abstract type"))]
    #[non_exhaustive]
    NotAbstract { ty: TypeHandle },
    #[snafu(display("no concrete type implements {ty}"))]
    #[non_exhaustive]
    NoImplementations { ty: TypeHandle },
    #[snafu(display("{ty} cannot be constructed"))]
    #[non_exhaustive]
    NoConstructor { ty: TypeHandle, source: SelectError },
    #[snafu(display(
        "only some implementations of {key} are registered (registered: {}; missing: {})",
        registered.join(", "),
        missing.join(", ")
    ))]
    #[non_exhaustive]
    PartialSequence {
        key: Key,
        registered: Vec<&'static str>,
        missing: Vec<&'static str>,
    },
    #[snafu(display("the container has been disposed"))]
    #[non_exhaustive]
    Disposed,
    #[snafu(display("aggregated registration errors:\n{}", AggregatedDisplayer::new(errors)))]
    Aggregated { errors: Vec<RegisterError> },
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum UnregisterError {
    #[snafu(context(false), display("{source}"))]
    #[non_exhaustive]
    Resolve { source: ResolveError },
    #[snafu(display("the instance registered under {key} failed to dispose"))]
    #[non_exhaustive]
    Dispose {
        key: Key,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(
        context(name(UnregisterAggregatedSnafu)),
        display("aggregated unregistration errors:\n{}", AggregatedDisplayer::new(errors))
    )]
    Aggregated { errors: Vec<UnregisterError> },
}

struct AggregatedDisplayer<'a, E> {
    errors: &'a [E],
}

impl<'a, E> AggregatedDisplayer<'a, E> {
    fn new(errors: &'a [E]) -> Self {
        Self { errors }
    }
}

impl<E: Display> Display for AggregatedDisplayer<'_, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "{:4}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::key;
    use crate::types::{cast_via, erase, ConstructorInfo, TypeInfo, Visibility};

    use super::*;

    struct Toolbar;

    fn options() -> RegisterOptions {
        let info = TypeInfo::builder::<Toolbar>()
            .constructor(ConstructorInfo::new("new", Visibility::Public, |_| {
                Ok(erase(Toolbar))
            }))
            .build();
        RegisterOptions::new(Arc::new(MetaObject::constructor(
            key::of::<Toolbar>(),
            Arc::new(info),
            cast_via::<Toolbar, Toolbar>,
            None,
            Lifecycle::Transient,
        )))
    }

    #[test]
    fn single_instance_succeeds() {
        let options = options();
        assert_eq!(options.lifecycle(), Lifecycle::Transient);

        let options = options.single_instance();
        assert_eq!(options.lifecycle(), Lifecycle::Singleton);
        assert_eq!(options.multi_instance().lifecycle(), Lifecycle::Transient);
    }

    #[test]
    fn aggregated_display_succeeds() {
        let err = RegisterError::Aggregated {
            errors: vec![
                RegisterError::KeyDuplicated {
                    key: key::of::<u8>(),
                },
                RegisterError::Disposed,
            ],
        };

        assert_eq!(
            err.to_string(),
            "aggregated registration errors:\n   1: the key u8 is already registered in the container\n   2: the container has been disposed\n"
        );
    }
}
