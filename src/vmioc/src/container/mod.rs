pub mod directory;
pub mod options;
pub mod registry;
pub mod resolver;

mod core;
mod handle;

use std::sync::Arc;

use crate::util::any::{AsAny, Downcast, DowncastRef};

pub use handle::{Container, ContainerBuilder};

pub trait Managed: AsAny + Send + Sync + 'static {}

impl<T> Managed for T where T: AsAny + Send + Sync + 'static {}

/// A type-erased shared handle (`Arc<R>`) that can be duplicated without
/// knowing `R`.
pub trait SharedManaged: Managed {
    fn dyn_clone(&self) -> Box<dyn SharedManaged>;
}

impl<T> SharedManaged for Arc<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    fn dyn_clone(&self) -> Box<dyn SharedManaged> {
        Box::new(Arc::clone(self))
    }
}

/// What a container hands out: one shared object, or every member of a
/// sequence request.
pub enum Instance {
    Single(Box<dyn SharedManaged>),
    Sequence(Vec<Box<dyn SharedManaged>>),
}

impl Instance {
    pub fn single<R>(object: Arc<R>) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
    {
        Self::Single(Box::new(object))
    }

    pub fn sequence<R>(objects: Vec<Arc<R>>) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
    {
        Self::Sequence(
            objects
                .into_iter()
                .map(|object| Box::new(object) as Box<dyn SharedManaged>)
                .collect(),
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn downcast<R>(self) -> Result<Arc<R>, Self>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        match self {
            Self::Single(boxed) => boxed
                .downcast::<Arc<R>>()
                .map(|object| *object)
                .map_err(Self::Single),
            sequence => Err(sequence),
        }
    }

    pub fn downcast_sequence<R>(self) -> Result<Vec<Arc<R>>, Self>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        match self {
            Self::Sequence(items) if items.iter().all(|item| item.is::<Arc<R>>()) => Ok(items
                .into_iter()
                .filter_map(|item| item.downcast::<Arc<R>>().ok())
                .map(|object| *object)
                .collect()),
            other => Err(other),
        }
    }
}

impl Clone for Instance {
    fn clone(&self) -> Self {
        match self {
            Self::Single(object) => Self::Single(object.dyn_clone()),
            Self::Sequence(items) => {
                Self::Sequence(items.iter().map(|item| item.dyn_clone()).collect())
            }
        }
    }
}
