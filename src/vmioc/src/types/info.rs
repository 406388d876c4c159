use std::any::{Any, TypeId};
use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::SharedManaged;
use crate::key::TypeHandle;
use crate::lifecycle::Dispose;
use crate::types::constructor::{ConstructorInfo, ErasedObject};
use crate::types::TypeKind;

pub type CastFn = fn(ErasedObject) -> Option<Box<dyn SharedManaged>>;

pub type DisposeFn = fn(&(dyn Any + Send + Sync)) -> Result<(), Box<dyn Error + Send + Sync>>;

/// Conversion of a shared concrete object into a shared `R`, usually a
/// `dyn Trait` the type implements.
pub trait Upcast<R: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<R>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Types that describe themselves to a [`TypeCatalog`](crate::types::TypeCatalog).
///
/// Normally generated by `#[injectable]`.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn type_info() -> TypeInfo;
}

pub fn cast_via<C, R>(object: ErasedObject) -> Option<Box<dyn SharedManaged>>
where
    C: Upcast<R>,
    R: ?Sized + Send + Sync + 'static,
{
    let concrete = object.downcast::<C>().ok()?;
    Some(Box::new(<C as Upcast<R>>::upcast(concrete)))
}

pub fn dispose_via<C: Dispose>(
    object: &(dyn Any + Send + Sync),
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match object.downcast_ref::<C>() {
        Some(object) => object.dispose(),
        None => Ok(()),
    }
}

#[derive(Clone, Copy)]
pub struct Cast {
    target: TypeHandle,
    apply: CastFn,
}

impl Cast {
    pub fn target(&self) -> TypeHandle {
        self.target
    }

    pub fn apply(&self) -> CastFn {
        self.apply
    }
}

impl Debug for Cast {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Cast({})", self.target)
    }
}

/// Everything the container needs to know about a concrete type.
pub struct TypeInfo {
    handle: TypeHandle,
    kind: TypeKind,
    constructors: Vec<ConstructorInfo>,
    casts: Vec<Cast>,
    disposer: Option<DisposeFn>,
}

impl TypeInfo {
    pub fn builder<C: Send + Sync + 'static>() -> TypeInfoBuilder<C> {
        TypeInfoBuilder::new()
    }

    pub fn handle(&self) -> TypeHandle {
        self.handle
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn casts(&self) -> &[Cast] {
        &self.casts
    }

    pub fn disposer(&self) -> Option<DisposeFn> {
        self.disposer
    }

    pub fn cast_to(&self, target: TypeId) -> Option<CastFn> {
        self.casts
            .iter()
            .find(|cast| cast.target.id() == target)
            .map(Cast::apply)
    }

    /// Whether an instance of this type can be handed out as `target`.
    pub fn implements(&self, target: TypeId) -> bool {
        self.cast_to(target).is_some()
    }

    pub fn has_eligible_constructor(&self) -> bool {
        self.constructors.iter().any(ConstructorInfo::is_eligible)
    }
}

impl Debug for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TypeInfo")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("constructors", &self.constructors)
            .field("casts", &self.casts)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}

pub struct TypeInfoBuilder<C> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> TypeInfoBuilder<C> {
    fn new() -> Self {
        let handle = TypeHandle::of::<C>();
        Self {
            info: TypeInfo {
                handle,
                kind: TypeKind::Concrete,
                constructors: Vec::new(),
                casts: vec![Cast {
                    target: handle,
                    apply: cast_via::<C, C>,
                }],
                disposer: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn implements<R>(mut self) -> Self
    where
        C: Upcast<R>,
        R: ?Sized + Send + Sync + 'static,
    {
        let target = TypeHandle::of::<R>();
        if !self.info.casts.iter().any(|cast| cast.target == target) {
            self.info.casts.push(Cast {
                target,
                apply: cast_via::<C, R>,
            });
        }
        self
    }

    pub fn disposable(mut self) -> Self
    where
        C: Dispose,
    {
        self.info.disposer = Some(dispose_via::<C> as DisposeFn);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.info.constructors.push(constructor);
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}
