//! The type universe a container resolves against.
//!
//! Rust has no runtime reflection, so every type a container may build
//! describes itself once through [`Injectable`] (usually generated by
//! `#[injectable]`) and is collected in a [`TypeCatalog`]. Annotated
//! non-generic types land in [`TypeCatalog::global`] at link time. The
//! container only talks to the [`TypeIntrospector`] capability.

mod catalog;
mod constructor;
mod info;

use std::any::TypeId;
use std::sync::Arc;

pub use catalog::{TypeCatalog, TypeRegistration};
pub use constructor::{
    erase, ArgumentError, Arguments, ConstructError, ConstructorInfo, ErasedObject, ParameterInfo,
    Visibility,
};
pub use info::{
    cast_via, dispose_via, Cast, CastFn, DisposeFn, Injectable, TypeInfo, TypeInfoBuilder, Upcast,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Concrete,
    Interface,
    Abstract,
}

#[cfg_attr(test, mockall::automock)]
pub trait TypeIntrospector: Send + Sync {
    fn describe(&self, id: TypeId) -> Option<Arc<TypeInfo>>;

    fn kind_of(&self, id: TypeId) -> Option<TypeKind>;

    /// Concrete types that can be handed out as `id`, in a stable order.
    fn implementations_of(&self, id: TypeId) -> Vec<Arc<TypeInfo>>;
}
