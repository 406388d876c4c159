use std::any::TypeId;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;
use tracing::debug;

use crate::container::core::ContainerCore;
use crate::container::directory::{ContainerDirectory, DirectoryError};
use crate::container::options::ContainerOptions;
use crate::container::registry::{
    FactoryFn, MetaObject, NoConstructorSnafu, NoImplementationsSnafu, NotAbstractSnafu,
    NotAssignableSnafu, NotConcreteSnafu, RegisterError, RegisterOptions, RegisterRequest,
    UnregisterError,
};
use crate::container::resolver::constructor;
use crate::container::resolver::{CallContext, ResolveError, Resolver};
use crate::container::Instance;
use crate::key::{self, Key, ServiceType, TypeHandle};
use crate::lifecycle::{Dispose, Lifecycle};
use crate::types::{
    cast_via, dispose_via, erase, CastFn, ConstructError, DisposeFn, Injectable, TypeCatalog, TypeInfo,
    TypeIntrospector, TypeKind, Upcast,
};

/// A dependency-injection container.
///
/// Handles are cheap to clone and all refer to the same container. A
/// container owns the children created from it; children only keep a weak
/// reference to their parent.
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// A root container over the process-wide [`TypeCatalog`] with default
    /// options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// An unnamed root container over the process-wide [`TypeCatalog`].
    pub fn with_options(options: ContainerOptions) -> Self {
        Self::from_core(Arc::new(ContainerCore::new_root(
            TypeCatalog::global(),
            options,
        )))
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_core(core: Arc<ContainerCore>) -> Self {
        Self { core }
    }

    /// Looks up a live container by name.
    pub fn get_container(name: &str) -> Result<Self, DirectoryError> {
        ContainerDirectory::global().lookup(name).map(Self::from_core)
    }

    pub fn new_child_container(&self, name: Option<&str>) -> Result<Self, DirectoryError> {
        self.core.new_child(name).map(Self::from_core)
    }

    pub fn parent(&self) -> Option<Self> {
        self.core.parent().map(Self::from_core)
    }

    pub fn children(&self) -> Vec<Self> {
        self.core
            .children()
            .into_iter()
            .map(Self::from_core)
            .collect()
    }

    pub fn name(&self) -> Option<Arc<str>> {
        self.core.name()
    }

    /// Renames the container, or removes its name with `None`.
    pub fn set_name(&self, name: Option<&str>) -> Result<(), DirectoryError> {
        self.core.set_name(name)
    }

    pub fn options(&self) -> ContainerOptions {
        self.core.options()
    }

    pub fn types(&self) -> Arc<dyn TypeIntrospector> {
        Arc::clone(self.core.types())
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Disposes the children and every cached instance, then leaves the
    /// parent and the directory. Safe to call more than once.
    pub fn dispose(&self) -> Result<(), UnregisterError> {
        self.core.dispose()
    }

    pub fn len(&self) -> usize {
        self.core.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.core.store().contains_key(key)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.core.store().keys()
    }

    pub fn registration(&self, key: &Key) -> Option<RegisterOptions> {
        self.core.store().get(key).map(RegisterOptions::new)
    }

    /// Builds the activation plan of every registration now instead of on
    /// first resolution.
    pub fn compile(&self) -> Result<(), ResolveError> {
        self.core.compile()
    }

    pub fn register<C: Injectable>(&self) -> Result<RegisterOptions, RegisterError> {
        self.register_typed::<C, C>(None, None)
    }

    pub fn register_named<C>(&self, name: &str) -> Result<RegisterOptions, RegisterError>
    where
        C: Injectable,
    {
        self.register_typed::<C, C>(Some(name), None)
    }

    /// Registers `C`, resolvable as `R`.
    pub fn register_as<R, C>(&self) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Injectable + Upcast<R>,
    {
        self.register_typed::<R, C>(None, None)
    }

    pub fn register_as_named<R, C>(&self, name: &str) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Injectable + Upcast<R>,
    {
        self.register_typed::<R, C>(Some(name), None)
    }

    /// Registers `C` built with the constructor whose parameter types are
    /// exactly `hints`, in order.
    pub fn register_with_constructor<C, I>(
        &self,
        hints: I,
    ) -> Result<RegisterOptions, RegisterError>
    where
        C: Injectable,
        I: IntoIterator<Item = ServiceType>,
    {
        let hints: Vec<_> = hints.into_iter().collect();
        self.register_typed::<C, C>(None, Some(hints).filter(|hints| !hints.is_empty()))
    }

    fn register_typed<R, C>(
        &self,
        name: Option<&str>,
        hints: Option<Vec<ServiceType>>,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Injectable + Upcast<R>,
    {
        let key = Key::new(ServiceType::of::<R>(), name);
        self.register_constructor(key, Arc::new(C::type_info()), cast_via::<C, R>, hints)
    }

    /// Registers a type described by runtime handles. The concrete type is
    /// looked up in the container's types.
    pub fn register_type(
        &self,
        request: RegisterRequest,
    ) -> Result<RegisterOptions, RegisterError> {
        let concrete = request.concrete();
        let types = self.core.types();
        let info = match types.kind_of(concrete.id()) {
            Some(TypeKind::Concrete) => types.describe(concrete.id()),
            _ => None,
        }
        .context(NotConcreteSnafu { ty: concrete })?;

        let service = ServiceType::Single(request.resolved());
        let cast = info
            .cast_to(request.resolved().id())
            .context(NotAssignableSnafu { concrete, service })?;
        let hints = request.constructor_hints().map(<[_]>::to_vec);
        self.register_constructor(Key::new(service, request.name()), info, cast, hints)
    }

    fn register_constructor(
        &self,
        key: Key,
        info: Arc<TypeInfo>,
        cast: CastFn,
        hints: Option<Vec<ServiceType>>,
    ) -> Result<RegisterOptions, RegisterError> {
        constructor::check_registrable(&info, hints.as_deref())
            .context(NoConstructorSnafu { ty: info.handle() })?;
        self.core.register(MetaObject::constructor(
            key,
            info,
            cast,
            hints,
            Lifecycle::Transient,
        ))
    }

    /// Registers an existing object as a singleton under its own type.
    pub fn register_instance<C>(&self, instance: C) -> Result<RegisterOptions, RegisterError>
    where
        C: Send + Sync + 'static,
    {
        self.register_instance_as::<C, C>(instance, None)
    }

    /// Registers an existing object as a singleton, resolvable as `R`.
    ///
    /// The object is disposed with its container if its type is described
    /// as disposable in the container's types.
    pub fn register_instance_as<R, C>(
        &self,
        instance: C,
        name: Option<&str>,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R>,
    {
        self.register_object::<R, C>(instance, name, self.disposer_of::<C>())
    }

    /// Registers an existing object as a singleton, resolvable as `R`, that
    /// is always disposed with its container.
    pub fn register_disposable_instance_as<R, C>(
        &self,
        instance: C,
        name: Option<&str>,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R> + Dispose,
    {
        self.register_object::<R, C>(instance, name, Some(dispose_via::<C>))
    }

    fn register_object<R, C>(
        &self,
        instance: C,
        name: Option<&str>,
        disposer: Option<DisposeFn>,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R>,
    {
        let object = Arc::new(instance);
        let shared = <C as Upcast<R>>::upcast(Arc::clone(&object));
        self.core.register(MetaObject::instance(
            Key::new(ServiceType::of::<R>(), name),
            TypeHandle::of::<C>(),
            Instance::single(shared),
            object,
            disposer,
        ))
    }

    /// Registers a factory, resolvable as `R`. The factory receives a
    /// resolver for the dependencies it needs.
    pub fn register_explicit<R, C, F>(&self, factory: F) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R>,
        F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
    {
        self.register_factory::<R, C, F>(None, factory, self.disposer_of::<C>())
    }

    pub fn register_explicit_named<R, C, F>(
        &self,
        name: &str,
        factory: F,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R>,
        F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
    {
        self.register_factory::<R, C, F>(Some(name), factory, self.disposer_of::<C>())
    }

    /// Registers a factory whose singleton is always disposed with its
    /// container.
    pub fn register_disposable_explicit<R, C, F>(
        &self,
        factory: F,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R> + Dispose,
        F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
    {
        self.register_factory::<R, C, F>(None, factory, Some(dispose_via::<C>))
    }

    fn register_factory<R, C, F>(
        &self,
        name: Option<&str>,
        factory: F,
        disposer: Option<DisposeFn>,
    ) -> Result<RegisterOptions, RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
        C: Upcast<R>,
        F: Fn(&dyn Resolver) -> Result<C, ConstructError> + Send + Sync + 'static,
    {
        let factory: Arc<FactoryFn> =
            Arc::new(move |resolver: &dyn Resolver| factory(resolver).map(erase));
        self.core.register(MetaObject::factory(
            Key::new(ServiceType::of::<R>(), name),
            TypeHandle::of::<C>(),
            factory,
            cast_via::<C, R>,
            disposer,
        ))
    }

    fn disposer_of<C: 'static>(&self) -> Option<DisposeFn> {
        self.core
            .types()
            .describe(TypeId::of::<C>())
            .and_then(|info| info.disposer())
    }

    /// Registers every known implementation of the interface or abstract
    /// type `R` under its simple type name, plus `Vec<R>` resolving all of
    /// them. Either every key is registered or none is.
    pub fn register_types_of<R>(&self, lifecycle: Lifecycle) -> Result<(), RegisterError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let ty = TypeHandle::of::<R>();
        let types = self.core.types();
        ensure!(
            matches!(
                types.kind_of(ty.id()),
                Some(TypeKind::Interface | TypeKind::Abstract)
            ),
            NotAbstractSnafu { ty }
        );

        let implementations = types.implementations_of(ty.id());
        ensure!(!implementations.is_empty(), NoImplementationsSnafu { ty });

        let mut metas = Vec::with_capacity(implementations.len() + 1);
        let mut members = Vec::with_capacity(implementations.len());
        for info in implementations {
            let concrete = info.handle();
            let cast = info.cast_to(ty.id()).context(NotAssignableSnafu {
                concrete,
                service: ServiceType::Single(ty),
            })?;
            constructor::check_registrable(&info, None)
                .context(NoConstructorSnafu { ty: concrete })?;

            let key = Key::new(ServiceType::Single(ty), Some(concrete.simple_name()));
            members.push(key.clone());
            metas.push(MetaObject::constructor(key, info, cast, None, lifecycle));
        }
        debug!(ty = %ty, count = members.len(), "registering every implementation");
        metas.push(MetaObject::sequence(
            key::sequence_of::<R>(),
            ty,
            members,
            lifecycle,
        ));

        self.core.register_all(metas)
    }

    pub fn unregister<T: ?Sized + 'static>(&self) -> Result<(), UnregisterError> {
        self.unregister_key(&key::of::<T>())
    }

    pub fn unregister_named<T: ?Sized + 'static>(&self, name: &str) -> Result<(), UnregisterError> {
        self.unregister_key(&key::named::<T>(name))
    }

    /// Disposes the cached instance, if any, then removes the entry.
    ///
    /// What happens to the entry when disposal fails is decided by
    /// [`ContainerOptions::disposal_failure`]; the failure is returned
    /// either way.
    pub fn unregister_key(&self, key: &Key) -> Result<(), UnregisterError> {
        self.core.unregister(key)
    }

    pub fn unregister_all(&self) -> Result<(), UnregisterError> {
        self.core.unregister_all()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Container")
            .field("name", &self.name())
            .field("registrations", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &Key) -> Result<Instance, ResolveError> {
        self.core.resolve_key(key)
    }

    fn resolve_dependency<'a>(
        &self,
        key: &Key,
        context: &'a CallContext<'a>,
    ) -> Result<Instance, ResolveError> {
        self.core.resolve_dependency(key, context)
    }
}

pub struct ContainerBuilder {
    name: Option<String>,
    options: ContainerOptions,
    types: Option<Arc<dyn TypeIntrospector>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            options: ContainerOptions::default(),
            types: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// The type universe to resolve against instead of the process-wide
    /// catalog.
    pub fn types(mut self, types: Arc<dyn TypeIntrospector>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn build(self) -> Result<Container, DirectoryError> {
        let types: Arc<dyn TypeIntrospector> = match self.types {
            Some(types) => types,
            None => TypeCatalog::global(),
        };
        let core = Arc::new(ContainerCore::new_root(types, self.options));
        if let Some(name) = self.name.as_deref() {
            core.set_name(Some(name))?;
        }
        debug!(name = ?self.name, "created container");
        Ok(Container::from_core(core))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
