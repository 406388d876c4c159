use crate::key::{ServiceType, TypeHandle};
use crate::types::Injectable;

/// A registration described by runtime type handles rather than generic
/// parameters.
///
/// The concrete type has to be known to the container's type catalog.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    concrete: TypeHandle,
    resolved: Option<TypeHandle>,
    name: Option<String>,
    hints: Vec<ServiceType>,
}

impl RegisterRequest {
    pub fn new(concrete: TypeHandle) -> Self {
        Self {
            concrete,
            resolved: None,
            name: None,
            hints: Vec::new(),
        }
    }

    pub fn of<C: Injectable>() -> Self {
        Self::new(TypeHandle::of::<C>())
    }

    /// Resolve the registration as `resolved` instead of the concrete type.
    pub fn resolved_as(mut self, resolved: TypeHandle) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Constructor parameter types, in order, that pick the constructor.
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = ServiceType>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    pub fn concrete(&self) -> TypeHandle {
        self.concrete
    }

    pub fn resolved(&self) -> TypeHandle {
        self.resolved.unwrap_or(self.concrete)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `None` when no hints were given.
    pub fn constructor_hints(&self) -> Option<&[ServiceType]> {
        (!self.hints.is_empty()).then_some(self.hints.as_slice())
    }
}
