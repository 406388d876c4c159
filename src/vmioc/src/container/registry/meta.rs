use std::error::Error;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use oneshot::Sender;
use parking_lot::{Mutex, RwLock};

use crate::container::resolver::{ActivationPlan, ResolveError, Resolver};
use crate::container::Instance;
use crate::key::{Key, ServiceType, TypeHandle};
use crate::lifecycle::Lifecycle;
use crate::types::{CastFn, ConstructError, DisposeFn, ErasedObject, TypeInfo};

pub(crate) type FactoryFn =
    dyn Fn(&dyn Resolver) -> Result<ErasedObject, ConstructError> + Send + Sync;

/// What drives the activation of a registration. Exactly one of these per
/// entry.
pub(crate) enum Activator {
    Constructor {
        info: Arc<TypeInfo>,
        cast: CastFn,
        hints: Option<Vec<ServiceType>>,
    },
    Factory {
        factory: Arc<FactoryFn>,
        cast: CastFn,
    },
    Instance,
    Sequence {
        members: Vec<Key>,
    },
}

/// One registration and everything cached for it.
pub(crate) struct MetaObject {
    key: Key,
    concrete: ServiceType,
    lifecycle: RwLock<Lifecycle>,
    activator: Activator,
    disposer: Option<DisposeFn>,
    plan: RwLock<Option<Arc<ActivationPlan>>>,
    slot: Mutex<InstanceSlot>,
}

impl MetaObject {
    pub fn constructor(
        key: Key,
        info: Arc<TypeInfo>,
        cast: CastFn,
        hints: Option<Vec<ServiceType>>,
        lifecycle: Lifecycle,
    ) -> Self {
        let concrete = ServiceType::Single(info.handle());
        let disposer = info.disposer();
        Self::new(
            key,
            concrete,
            lifecycle,
            Activator::Constructor { info, cast, hints },
            disposer,
            None,
        )
    }

    pub fn factory(
        key: Key,
        concrete: TypeHandle,
        factory: Arc<FactoryFn>,
        cast: CastFn,
        disposer: Option<DisposeFn>,
    ) -> Self {
        Self::new(
            key,
            ServiceType::Single(concrete),
            Lifecycle::Transient,
            Activator::Factory { factory, cast },
            disposer,
            None,
        )
    }

    pub fn instance(
        key: Key,
        concrete: TypeHandle,
        instance: Instance,
        object: ErasedObject,
        disposer: Option<DisposeFn>,
    ) -> Self {
        let cached = Cached {
            instance,
            object: Some(object),
        };
        Self::new(
            key,
            ServiceType::Single(concrete),
            Lifecycle::Singleton,
            Activator::Instance,
            disposer,
            Some(cached),
        )
    }

    pub fn sequence(
        key: Key,
        element: TypeHandle,
        members: Vec<Key>,
        lifecycle: Lifecycle,
    ) -> Self {
        Self::new(
            key,
            ServiceType::Sequence(element),
            lifecycle,
            Activator::Sequence { members },
            None,
            None,
        )
    }

    fn new(
        key: Key,
        concrete: ServiceType,
        lifecycle: Lifecycle,
        activator: Activator,
        disposer: Option<DisposeFn>,
        cached: Option<Cached>,
    ) -> Self {
        Self {
            key,
            concrete,
            lifecycle: RwLock::new(lifecycle),
            activator,
            disposer,
            plan: RwLock::new(None),
            slot: Mutex::new(InstanceSlot {
                cached,
                constructing: None,
                retired: false,
            }),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn concrete(&self) -> ServiceType {
        self.concrete
    }

    pub fn activator(&self) -> &Activator {
        &self.activator
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read()
    }

    /// Pre-supplied instances stay singletons whatever is asked.
    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        if !matches!(self.activator, Activator::Instance) {
            *self.lifecycle.write() = lifecycle;
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.plan.read().is_some()
    }

    pub fn has_instance(&self) -> bool {
        self.slot.lock().cached.is_some()
    }

    pub fn cached_instance(&self) -> Option<Instance> {
        self.slot
            .lock()
            .cached
            .as_ref()
            .map(|cached| cached.instance.clone())
    }

    /// The activation plan, compiled on first use.
    pub fn plan(&self) -> Result<Arc<ActivationPlan>, ResolveError> {
        if let Some(plan) = self.plan.read().as_ref() {
            return Ok(Arc::clone(plan));
        }

        let compiled = Arc::new(ActivationPlan::compile(self)?);
        let mut plan = self.plan.write();
        Ok(Arc::clone(plan.get_or_insert(compiled)))
    }

    pub fn slot(&self) -> &Mutex<InstanceSlot> {
        &self.slot
    }

    /// Runs the disposal hook on the cached instance, if any, after waiting
    /// out a construction in progress on another thread. The hook runs
    /// without the slot lock held.
    ///
    /// Afterwards the entry is retired and no longer caches singletons.
    /// With `retain_on_failure` a failing instance is put back and the entry
    /// stays live.
    pub fn dispose_instance(
        &self,
        retain_on_failure: bool,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut slot = self.slot.lock();
        while let Some(constructing) = slot
            .constructing
            .as_mut()
            .filter(|constructing| !constructing.is_constructed_by_current_thread())
        {
            let (sender, receiver) = oneshot::channel();
            constructing.register_waiter(sender);
            drop(slot);
            let _ = receiver.recv();
            slot = self.slot.lock();
        }

        slot.retired = true;
        let Some(cached) = slot.cached.take() else {
            return Ok(());
        };
        drop(slot);

        let result = match (&cached.object, self.disposer) {
            (Some(object), Some(dispose)) => dispose(&**object),
            _ => Ok(()),
        };
        if result.is_err() && retain_on_failure {
            let mut slot = self.slot.lock();
            slot.cached = Some(cached);
            slot.retired = false;
        }
        result
    }
}

pub(crate) struct InstanceSlot {
    pub cached: Option<Cached>,
    pub constructing: Option<ConstructingObjectContext>,
    /// Set once the entry has been disposed.
    pub retired: bool,
}

pub(crate) struct Cached {
    pub instance: Instance,
    pub object: Option<ErasedObject>,
}

pub(crate) struct ConstructingObjectContext {
    on_thread: ThreadId,
    waiters: Vec<Sender<WaitResponse>>,
}

impl ConstructingObjectContext {
    pub fn new() -> Self {
        Self {
            on_thread: thread::current().id(),
            waiters: Vec::new(),
        }
    }

    pub fn is_constructed_by_current_thread(&self) -> bool {
        thread::current().id() == self.on_thread
    }

    pub fn register_waiter(&mut self, sender: Sender<WaitResponse>) {
        self.waiters.push(sender);
    }

    pub fn notify(self, response: WaitResponse) {
        for sender in self.waiters {
            let _ = sender.send(response.clone());
        }
    }
}

#[derive(Clone)]
pub(crate) enum WaitResponse {
    Constructed(Instance),
    Error(ResolveError),
}
