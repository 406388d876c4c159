#![allow(clippy::new_without_default)]

extern crate self as vmioc;

pub mod container;
pub mod global;
pub mod key;
pub mod lifecycle;
pub mod types;
mod util;

pub use vmioc_derive::injectable;

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}

pub mod prelude {
    pub use crate::container::directory::DirectoryError;
    pub use crate::container::options::{ContainerOptions, DisposalFailure};
    pub use crate::container::registry::{
        RegisterError, RegisterOptions, RegisterRequest, UnregisterError,
    };
    pub use crate::container::resolver::{ResolveError, Resolver, TypedResolver};
    pub use crate::container::{Container, ContainerBuilder};
    pub use crate::injectable;
    pub use crate::key::{self, Key, ServiceType, TypeHandle};
    pub use crate::lifecycle::{Dispose, Lifecycle};
    pub use crate::types::{Injectable, TypeCatalog, Upcast};
}
