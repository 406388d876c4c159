use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::container::directory::{ContainerDirectory, DirectoryError};
use crate::container::options::{ContainerOptions, DisposalFailure};
use crate::container::registry::{
    Cached, ConstructingObjectContext, InstanceSlot, MetaObject, RegisterError, RegisterOptions,
    RegistrationStore, UnregisterError, WaitResponse,
};
use crate::container::resolver::{
    Activated, CallContext, ContextForwardingResolverProxy, Fallback, ResolveError, Resolver,
};
use crate::container::{Instance, SharedManaged};
use crate::key::{Key, ServiceType, TypeHandle};
use crate::lifecycle::Lifecycle;
use crate::types::{TypeInfo, TypeIntrospector};

pub(crate) struct ContainerCore {
    name: Mutex<Option<Arc<str>>>,
    parent: Option<Weak<ContainerCore>>,
    children: Mutex<Vec<Arc<ContainerCore>>>,
    store: RegistrationStore,
    types: Arc<dyn TypeIntrospector>,
    options: ContainerOptions,
    disposed: AtomicBool,
}

impl ContainerCore {
    pub fn new_root(types: Arc<dyn TypeIntrospector>, options: ContainerOptions) -> Self {
        Self::new_impl(None, types, options)
    }

    /// Creates a child that inherits the types and options of `self` and is
    /// owned by it.
    pub fn new_child(self: &Arc<Self>, name: Option<&str>) -> Result<Arc<Self>, DirectoryError> {
        let child = Arc::new(Self::new_impl(
            Some(Arc::downgrade(self)),
            Arc::clone(&self.types),
            self.options,
        ));
        if name.is_some() {
            child.set_name(name)?;
        }

        self.children.lock().push(Arc::clone(&child));
        debug!(parent = ?self.name(), child = ?name, "created child container");
        Ok(child)
    }

    fn new_impl(
        parent: Option<Weak<Self>>,
        types: Arc<dyn TypeIntrospector>,
        options: ContainerOptions,
    ) -> Self {
        Self {
            name: Mutex::new(None),
            parent,
            children: Mutex::new(Vec::new()),
            store: RegistrationStore::new(),
            types,
            options,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn types(&self) -> &Arc<dyn TypeIntrospector> {
        &self.types
    }

    pub fn options(&self) -> ContainerOptions {
        self.options
    }

    pub fn store(&self) -> &RegistrationStore {
        &self.store
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn name(&self) -> Option<Arc<str>> {
        self.name.lock().clone()
    }

    /// Renames the container in the directory. On failure the old name stays
    /// in place.
    pub fn set_name(self: &Arc<Self>, name: Option<&str>) -> Result<(), DirectoryError> {
        let directory = ContainerDirectory::global();
        let mut current = self.name.lock();
        let previous = current.clone();

        match name {
            Some(name) => {
                let claimed = directory.claim(name, self, previous.as_deref())?;
                *current = Some(claimed);
            }
            None => {
                if let Some(previous) = current.take() {
                    directory.release(&previous, Arc::as_ptr(self));
                }
            }
        }

        debug!(from = ?previous, to = ?name, "renamed container");
        Ok(())
    }

    /// The parent, unless it is gone or disposed.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|parent| !parent.is_disposed())
    }

    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.lock().clone()
    }

    pub fn register(&self, meta: MetaObject) -> Result<RegisterOptions, RegisterError> {
        if self.is_disposed() {
            return Err(RegisterError::Disposed);
        }

        let meta = self.store.insert(Arc::new(meta))?;
        debug!(key = %meta.key(), concrete = %meta.concrete(), "registered");
        Ok(RegisterOptions::new(meta))
    }

    /// Registers every entry, or none of them.
    pub fn register_all(&self, metas: Vec<MetaObject>) -> Result<(), RegisterError> {
        if self.is_disposed() {
            return Err(RegisterError::Disposed);
        }

        let metas: Vec<_> = metas.into_iter().map(Arc::new).collect();
        let keys: Vec<_> = metas.iter().map(|meta| meta.key().clone()).collect();
        self.store.insert_all(metas)?;
        for key in keys {
            debug!(key = %key, "registered");
        }
        Ok(())
    }

    /// Selects constructors and builds activation plans for every entry
    /// ahead of the first resolution.
    pub fn compile(&self) -> Result<(), ResolveError> {
        self.ensure_alive()?;
        for meta in self.store.values() {
            meta.plan()?;
        }
        Ok(())
    }

    pub fn unregister(&self, key: &Key) -> Result<(), UnregisterError> {
        self.ensure_alive()?;
        let meta = self
            .store
            .get(key)
            .ok_or_else(|| ResolveError::NotRegistered { key: key.clone() })?;
        self.release_entry(&meta)
    }

    /// Disposes and removes every entry of this container. Entries of child
    /// containers are left alone.
    pub fn unregister_all(&self) -> Result<(), UnregisterError> {
        self.ensure_alive()?;
        let errors = self
            .store
            .values()
            .iter()
            .filter_map(|meta| self.release_entry(meta).err())
            .collect();
        aggregate(errors)
    }

    fn release_entry(&self, meta: &Arc<MetaObject>) -> Result<(), UnregisterError> {
        let retain = self.options.on_disposal_failure() == DisposalFailure::Retain;
        match meta.dispose_instance(retain) {
            Ok(()) => {
                self.store.remove_if_same(meta);
                debug!(key = %meta.key(), "unregistered");
                Ok(())
            }
            Err(source) => {
                if !retain {
                    self.store.remove_if_same(meta);
                }
                debug!(key = %meta.key(), removed = !retain, "disposal failed while unregistering");
                Err(UnregisterError::Dispose {
                    key: meta.key().clone(),
                    source,
                })
            }
        }
    }

    /// Disposes the children, then every entry, then leaves the parent and
    /// the directory. Later calls do nothing.
    pub fn dispose(&self) -> Result<(), UnregisterError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut errors = Vec::new();
        let children = mem::take(&mut *self.children.lock());
        for child in children {
            if let Err(err) = child.dispose() {
                errors.push(err);
            }
        }

        for meta in self.store.drain() {
            if let Err(source) = meta.dispose_instance(false) {
                errors.push(UnregisterError::Dispose {
                    key: meta.key().clone(),
                    source,
                });
            }
        }

        self.detach_from_parent();
        let name = self.name.lock().take();
        if let Some(name) = name.as_deref() {
            ContainerDirectory::global().release(name, self);
        }

        debug!(name = ?name, "disposed container");
        aggregate(errors)
    }

    fn detach_from_parent(&self) {
        let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let detached = {
            let mut children = parent.children.lock();
            children
                .iter()
                .position(|child| std::ptr::eq(Arc::as_ptr(child), self))
                .map(|position| children.remove(position))
        };
        drop(detached);
    }

    fn ensure_alive(&self) -> Result<(), ResolveError> {
        if self.is_disposed() {
            Err(ResolveError::Disposed)
        } else {
            Ok(())
        }
    }

    fn get_instance(&self, context: &CallContext<'_>) -> Result<Instance, ResolveError> {
        self.ensure_alive()?;
        let key = context.key();
        if context.trace().previous_exist_key(key) {
            return Err(ResolveError::CyclicDependency {
                key: key.clone(),
                path: context.trace().path(),
            });
        }

        if let Some(meta) = self.store.get(key) {
            trace!(key = %key, "resolving registration");
            return self.activate(&meta, context);
        }
        if key.is_named() {
            return Err(ResolveError::NotRegistered { key: key.clone() });
        }

        let parent = self.parent().filter(|_| self.options.bubbles_to_parent());
        if let Some(parent) = parent.as_ref().filter(|parent| parent.is_registered(key)) {
            trace!(key = %key, "bubbling to the registering ancestor");
            return parent.get_instance(context);
        }
        if !self.options.resolves_unregistered() {
            return self.bubble(parent, context);
        }

        match Fallback::decide(key, self.types.as_ref(), parent.is_some()) {
            Fallback::Sequence { element } => {
                match self.resolve_sequence(key, element, context) {
                    Err(ResolveError::NoImplementations { .. }) if parent.is_some() => {
                        self.bubble(parent, context)
                    }
                    result => result,
                }
            }
            Fallback::AutoRegister { info } => self.auto_register(key, info, context),
            Fallback::SingleImplementation { target, info } => {
                let meta = transient_meta(key.clone(), target, info)?;
                trace!(key = %key, implementation = %meta.concrete(), "resolving the only implementation");
                self.construct(&meta, context).map(|activated| activated.instance)
            }
            Fallback::Bubble => self.bubble(parent, context),
            Fallback::Unresolvable(err) => Err(err),
        }
    }

    /// Whether `key` has an explicit registration here or in an ancestor.
    fn is_registered(&self, key: &Key) -> bool {
        self.store.contains_key(key) || self.parent().is_some_and(|parent| parent.is_registered(key))
    }

    fn bubble(
        &self,
        parent: Option<Arc<Self>>,
        context: &CallContext<'_>,
    ) -> Result<Instance, ResolveError> {
        match parent {
            Some(parent) => {
                trace!(key = %context.key(), "bubbling to the parent container");
                parent.get_instance(context)
            }
            None => Err(ResolveError::NotRegistered {
                key: context.key().clone(),
            }),
        }
    }

    fn auto_register(
        &self,
        key: &Key,
        info: Arc<TypeInfo>,
        context: &CallContext<'_>,
    ) -> Result<Instance, ResolveError> {
        let handle = info.handle();
        let meta = transient_meta(key.clone(), handle, info)?;
        meta.plan()?;

        let meta = self.store.insert_or_existing(Arc::new(meta));
        debug!(key = %key, "auto-registered as transient");
        self.activate(&meta, context)
    }

    /// Builds every implementation of `element`, either through the
    /// registrations that cover all of them or, when there are none, through
    /// throwaway transient registrations.
    fn resolve_sequence(
        &self,
        key: &Key,
        element: TypeHandle,
        context: &CallContext<'_>,
    ) -> Result<Instance, ResolveError> {
        let implementations = self.types.implementations_of(element.id());
        let mut registered = self.store.members_of(element);

        if !registered.is_empty() {
            let missing: Vec<_> = implementations
                .iter()
                .filter(|info| {
                    let concrete = ServiceType::Single(info.handle());
                    !registered.iter().any(|meta| meta.concrete() == concrete)
                })
                .map(|info| info.handle().simple_name())
                .collect();
            if !missing.is_empty() {
                return Err(ResolveError::Registration {
                    key: key.clone(),
                    source: RegisterError::PartialSequence {
                        key: key.clone(),
                        registered: registered
                            .iter()
                            .filter_map(|meta| meta.concrete().handle())
                            .map(|handle| handle.simple_name())
                            .collect(),
                        missing,
                    },
                });
            }

            registered.sort_by_key(|meta| {
                let position = implementations
                    .iter()
                    .position(|info| ServiceType::Single(info.handle()) == meta.concrete());
                (position.unwrap_or(usize::MAX), meta.key().name().map(str::to_owned))
            });
            let mut items = Vec::with_capacity(registered.len());
            for meta in registered {
                push_members(&mut items, self.resolve_dependency(meta.key(), context)?);
            }
            return Ok(Instance::Sequence(items));
        }

        if implementations.is_empty() {
            return Err(ResolveError::NoImplementations { ty: element });
        }

        let mut items = Vec::with_capacity(implementations.len());
        for info in implementations {
            let member = Key::new(ServiceType::Single(info.handle()), None);
            let meta = transient_meta(member, element, info)?;
            let context = context.append(meta.key());
            if context.trace().previous_exist_key(meta.key()) {
                return Err(ResolveError::CyclicDependency {
                    key: meta.key().clone(),
                    path: context.trace().path(),
                });
            }
            push_members(&mut items, self.construct(&meta, &context)?.instance);
        }
        Ok(Instance::Sequence(items))
    }

    fn activate(
        &self,
        meta: &MetaObject,
        context: &CallContext<'_>,
    ) -> Result<Instance, ResolveError> {
        if let Some(instance) = meta.cached_instance() {
            return Ok(instance);
        }

        match meta.lifecycle() {
            Lifecycle::Transient => self.construct(meta, context).map(|activated| activated.instance),
            Lifecycle::Singleton => self.activate_singleton(meta, context),
        }
    }

    /// At most one thread builds a singleton. Others wait for its result;
    /// the building thread re-entering is a cycle.
    fn activate_singleton(
        &self,
        meta: &MetaObject,
        context: &CallContext<'_>,
    ) -> Result<Instance, ResolveError> {
        let key = meta.key();
        let mut slot = meta.slot().lock();
        if let Some(cached) = slot.cached.as_ref() {
            return Ok(cached.instance.clone());
        }
        if slot.retired {
            return Err(ResolveError::NotRegistered { key: key.clone() });
        }

        if let Some(constructing) = slot.constructing.as_mut() {
            if constructing.is_constructed_by_current_thread() {
                return Err(ResolveError::CyclicDependency {
                    key: key.clone(),
                    path: context.trace().path(),
                });
            }

            let (sender, receiver) = oneshot::channel();
            constructing.register_waiter(sender);
            drop(slot);
            return match receiver.recv() {
                Ok(WaitResponse::Constructed(instance)) => Ok(instance),
                Ok(WaitResponse::Error(err)) => Err(err),
                Err(_) => Err(ResolveError::Abandoned { key: key.clone() }),
            };
        }

        slot.constructing = Some(ConstructingObjectContext::new());
        drop(slot);

        let guard = ConstructionGuard::new(meta.slot());
        let result = self.construct(meta, context);
        let instance = guard.finish(result)?;
        debug!(key = %key, "constructed singleton");
        Ok(instance)
    }

    fn construct(
        &self,
        meta: &MetaObject,
        context: &CallContext<'_>,
    ) -> Result<Activated, ResolveError> {
        let plan = meta.plan()?;
        let resolver = ContextForwardingResolverProxy::new(self, context);
        plan.execute(meta.key(), &resolver)
    }
}

impl Resolver for ContainerCore {
    fn resolve_key(&self, key: &Key) -> Result<Instance, ResolveError> {
        let context = CallContext::new(key);
        self.get_instance(&context)
    }

    fn resolve_dependency<'a>(
        &self,
        key: &Key,
        context: &'a CallContext<'a>,
    ) -> Result<Instance, ResolveError> {
        let context = context.append(key);
        self.get_instance(&context)
    }
}

impl Drop for ContainerCore {
    fn drop(&mut self) {
        if *self.disposed.get_mut() {
            return;
        }

        for meta in self.store.drain() {
            if let Err(err) = meta.dispose_instance(false) {
                warn!(key = %meta.key(), error = %err, "failed to dispose instance of dropped container");
            }
        }
        if let Some(name) = self.name.get_mut().take() {
            ContainerDirectory::global().release(&name, self);
        }
    }
}

/// Clears the in-progress marker of a singleton. If the constructor panics
/// the marker is dropped with its waiters, which then see a closed channel.
struct ConstructionGuard<'a> {
    slot: &'a Mutex<InstanceSlot>,
    finished: bool,
}

impl<'a> ConstructionGuard<'a> {
    fn new(slot: &'a Mutex<InstanceSlot>) -> Self {
        Self {
            slot,
            finished: false,
        }
    }

    fn finish(mut self, result: Result<Activated, ResolveError>) -> Result<Instance, ResolveError> {
        self.finished = true;
        let mut slot = self.slot.lock();
        let constructing = slot.constructing.take();

        let (response, result) = match result {
            Ok(Activated { instance, object }) => {
                slot.cached = Some(Cached {
                    instance: instance.clone(),
                    object,
                });
                (WaitResponse::Constructed(instance.clone()), Ok(instance))
            }
            Err(err) => (WaitResponse::Error(err.clone()), Err(err)),
        };
        drop(slot);

        if let Some(constructing) = constructing {
            constructing.notify(response);
        }
        result
    }
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let constructing = self.slot.lock().constructing.take();
            drop(constructing);
        }
    }
}

/// A transient registration of `info` that hands out its objects as
/// `target`.
fn transient_meta(
    key: Key,
    target: TypeHandle,
    info: Arc<TypeInfo>,
) -> Result<MetaObject, ResolveError> {
    let cast = info
        .cast_to(target.id())
        .ok_or(ResolveError::Ineligible { ty: info.handle() })?;
    Ok(MetaObject::constructor(
        key,
        info,
        cast,
        None,
        Lifecycle::Transient,
    ))
}

fn push_members(items: &mut Vec<Box<dyn SharedManaged>>, instance: Instance) {
    match instance {
        Instance::Single(object) => items.push(object),
        Instance::Sequence(nested) => items.extend(nested),
    }
}

fn aggregate(mut errors: Vec<UnregisterError>) -> Result<(), UnregisterError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(UnregisterError::Aggregated { errors }),
    }
}
