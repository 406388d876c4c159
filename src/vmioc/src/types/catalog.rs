use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::key::TypeHandle;
use crate::types::info::{Injectable, TypeInfo};
use crate::types::{TypeIntrospector, TypeKind};

static GLOBAL_CATALOG: LazyLock<Arc<TypeCatalog>> =
    LazyLock::new(|| Arc::new(TypeCatalog::collected()));

/// A type submitted by `#[injectable]` for the global catalog.
#[doc(hidden)]
pub struct TypeRegistration {
    type_info: fn() -> TypeInfo,
}

impl TypeRegistration {
    pub const fn new(type_info: fn() -> TypeInfo) -> Self {
        Self { type_info }
    }
}

inventory::collect!(TypeRegistration);

/// An in-memory, insertion-ordered type universe.
///
/// Concrete types are added with their [`TypeInfo`]; interfaces they
/// implement become known along with them. Abstract groups have to be
/// declared with [`TypeCatalog::abstract_type`].
#[derive(Debug)]
pub struct TypeCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    types: Vec<Arc<TypeInfo>>,
    index: HashMap<TypeId, usize>,
    declared: HashMap<TypeId, (TypeHandle, TypeKind)>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner::default()),
        }
    }

    /// A catalog holding every non-generic type annotated with
    /// `#[injectable]` in the program, ordered by type name.
    pub fn collected() -> Self {
        let mut infos: Vec<_> = inventory::iter::<TypeRegistration>
            .into_iter()
            .map(|registration| (registration.type_info)())
            .collect();
        infos.sort_by_key(|info| info.handle().name());

        let catalog = Self::new();
        for info in infos {
            catalog.add_info(info);
        }
        debug!(count = catalog.len(), "collected injectable types");
        catalog
    }

    /// The process-wide catalog used by containers that are not given one.
    ///
    /// It starts out as [`TypeCatalog::collected`]; generic types and types
    /// described by hand still have to be added.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_CATALOG)
    }

    pub fn add<C: Injectable>(&self) -> &Self {
        self.add_info(C::type_info())
    }

    /// Adds a concrete type, replacing an earlier description of it in place.
    pub fn add_info(&self, info: TypeInfo) -> &Self {
        let mut inner = self.inner.write();
        let handle = info.handle();

        for cast in info.casts() {
            let target = cast.target();
            if target != handle {
                inner
                    .declared
                    .entry(target.id())
                    .or_insert((target, TypeKind::Interface));
            }
        }

        let info = Arc::new(info);
        if let Some(&position) = inner.index.get(&handle.id()) {
            inner.types[position] = info;
        } else {
            let position = inner.types.len();
            inner.types.push(info);
            inner.index.insert(handle.id(), position);
        }
        self
    }

    pub fn interface<R: ?Sized + 'static>(&self) -> &Self {
        self.declare(TypeHandle::of::<R>(), TypeKind::Interface)
    }

    pub fn abstract_type<R: ?Sized + 'static>(&self) -> &Self {
        self.declare(TypeHandle::of::<R>(), TypeKind::Abstract)
    }

    fn declare(&self, handle: TypeHandle, kind: TypeKind) -> &Self {
        self.inner.write().declared.insert(handle.id(), (handle, kind));
        self
    }

    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeIntrospector for TypeCatalog {
    fn describe(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        let inner = self.inner.read();
        inner
            .index
            .get(&id)
            .map(|&position| Arc::clone(&inner.types[position]))
    }

    fn kind_of(&self, id: TypeId) -> Option<TypeKind> {
        let inner = self.inner.read();
        if inner.index.contains_key(&id) {
            Some(TypeKind::Concrete)
        } else {
            inner.declared.get(&id).map(|(_, kind)| *kind)
        }
    }

    fn implementations_of(&self, id: TypeId) -> Vec<Arc<TypeInfo>> {
        self.inner
            .read()
            .types
            .iter()
            .filter(|info| info.implements(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{erase, ConstructorInfo, Upcast, Visibility};

    use super::*;

    trait Shape: Send + Sync {}

    trait Widget: Send + Sync {}

    struct Circle;

    struct Square;

    impl Shape for Circle {}

    impl Shape for Square {}

    impl Upcast<dyn Shape> for Circle {
        fn upcast(self: Arc<Self>) -> Arc<dyn Shape> {
            self
        }
    }

    impl Upcast<dyn Shape> for Square {
        fn upcast(self: Arc<Self>) -> Arc<dyn Shape> {
            self
        }
    }

    impl Injectable for Circle {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Self>()
                .implements::<dyn Shape>()
                .constructor(ConstructorInfo::new("new", Visibility::Public, |_| {
                    Ok(erase(Circle))
                }))
                .build()
        }
    }

    impl Injectable for Square {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Self>()
                .implements::<dyn Shape>()
                .build()
        }
    }

    #[test]
    fn implementations_of_succeeds_in_insertion_order() {
        let catalog = TypeCatalog::new();
        catalog.add::<Square>().add::<Circle>();

        let implementations = catalog.implementations_of(TypeId::of::<dyn Shape>());
        let names: Vec<_> = implementations
            .iter()
            .map(|info| info.handle().simple_name())
            .collect();

        assert_eq!(names, ["Square", "Circle"]);
        assert!(catalog
            .implementations_of(TypeId::of::<dyn Widget>())
            .is_empty());
    }

    #[test]
    fn kind_of_succeeds_when_interface_is_implied_or_declared() {
        let catalog = TypeCatalog::new();
        catalog.add::<Circle>().abstract_type::<dyn Widget>();

        assert_eq!(
            catalog.kind_of(TypeId::of::<Circle>()),
            Some(TypeKind::Concrete)
        );
        assert_eq!(
            catalog.kind_of(TypeId::of::<dyn Shape>()),
            Some(TypeKind::Interface)
        );
        assert_eq!(
            catalog.kind_of(TypeId::of::<dyn Widget>()),
            Some(TypeKind::Abstract)
        );
        assert_eq!(catalog.kind_of(TypeId::of::<String>()), None);
    }

    struct Triangle;

    impl Injectable for Triangle {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Self>()
                .implements::<dyn Shape>()
                .constructor(ConstructorInfo::new("new", Visibility::Public, |_| {
                    Ok(erase(Triangle))
                }))
                .build()
        }
    }

    impl Upcast<dyn Shape> for Triangle {
        fn upcast(self: Arc<Self>) -> Arc<dyn Shape> {
            self
        }
    }

    impl Shape for Triangle {}

    inventory::submit! {
        TypeRegistration::new(<Triangle as Injectable>::type_info)
    }

    #[test]
    fn collected_succeeds_with_submitted_types() {
        let catalog = TypeCatalog::collected();

        assert!(catalog.describe(TypeId::of::<Triangle>()).is_some());
        assert!(catalog.describe(TypeId::of::<Circle>()).is_none());
        assert_eq!(
            catalog.kind_of(TypeId::of::<dyn Shape>()),
            Some(TypeKind::Interface)
        );
        assert!(TypeCatalog::global()
            .describe(TypeId::of::<Triangle>())
            .is_some());
    }

    #[test]
    fn add_succeeds_when_type_is_added_twice() {
        let catalog = TypeCatalog::new();
        catalog.add::<Circle>().add::<Square>().add::<Circle>();

        assert_eq!(catalog.len(), 2);
        let circle = catalog.describe(TypeId::of::<Circle>()).unwrap();
        assert_eq!(circle.constructors().len(), 1);
        assert!(catalog.describe(TypeId::of::<String>()).is_none());
    }
}
