use std::any::Any;
use std::error::Error;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::vec::IntoIter;

use snafu::prelude::*;

use crate::container::Instance;
use crate::key::{Key, ServiceType};

pub type ErasedObject = Arc<dyn Any + Send + Sync>;

pub type ConstructError = Box<dyn Error + Send + Sync>;

type Invoker = dyn Fn(Arguments) -> Result<ErasedObject, ConstructError> + Send + Sync;

/// Who may call a constructor. Only `Public` and `Internal` constructors are
/// ever considered by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    service: ServiceType,
    named: Option<&'static str>,
}

impl ParameterInfo {
    pub fn single<T: ?Sized + 'static>() -> Self {
        Self {
            service: ServiceType::of::<T>(),
            named: None,
        }
    }

    pub fn sequence<T: ?Sized + 'static>() -> Self {
        Self {
            service: ServiceType::sequence_of::<T>(),
            named: None,
        }
    }

    /// Resolves this parameter under `name` instead of the unnamed key.
    pub fn named(mut self, name: &'static str) -> Self {
        self.named = Some(name);
        self
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn name(&self) -> Option<&'static str> {
        self.named
    }

    pub fn key(&self) -> Key {
        Key::new(self.service, self.named)
    }
}

/// One way of building a concrete type: its formal parameters, visibility,
/// explicit-selection marker and the function that runs it.
#[derive(Clone)]
pub struct ConstructorInfo {
    name: &'static str,
    parameters: Vec<ParameterInfo>,
    visibility: Visibility,
    explicit: bool,
    invoker: Arc<Invoker>,
}

impl ConstructorInfo {
    pub fn new<F>(name: &'static str, visibility: Visibility, invoker: F) -> Self
    where
        F: Fn(Arguments) -> Result<ErasedObject, ConstructError> + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: Vec::new(),
            visibility,
            explicit: false,
            invoker: Arc::new(invoker),
        }
    }

    pub fn parameter(mut self, parameter: ParameterInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Marks this constructor as the one to use regardless of arity.
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn is_eligible(&self) -> bool {
        self.visibility != Visibility::Private
    }

    /// Whether the parameter types equal `hints`, in order.
    pub fn matches(&self, hints: &[ServiceType]) -> bool {
        self.parameters.len() == hints.len()
            && self
                .parameters
                .iter()
                .zip(hints)
                .all(|(parameter, hint)| parameter.service == *hint)
    }

    pub fn invoke(&self, arguments: Arguments) -> Result<ErasedObject, ConstructError> {
        (self.invoker)(arguments)
    }
}

impl Debug for ConstructorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConstructorInfo")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("explicit", &self.explicit)
            .finish_non_exhaustive()
    }
}

pub fn erase<C: Send + Sync + 'static>(object: C) -> ErasedObject {
    Arc::new(object)
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    values: IntoIter<Instance>,
    position: usize,
}

impl Arguments {
    pub fn new(values: Vec<Instance>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    pub fn single<R>(&mut self) -> Result<Arc<R>, ArgumentError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let (position, value) = self.next_value()?;
        value.downcast::<R>().map_err(|_| ArgumentError::Mismatch {
            position,
            expected: std::any::type_name::<Arc<R>>(),
        })
    }

    pub fn sequence<R>(&mut self) -> Result<Vec<Arc<R>>, ArgumentError>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let (position, value) = self.next_value()?;
        value
            .downcast_sequence::<R>()
            .map_err(|_| ArgumentError::Mismatch {
                position,
                expected: std::any::type_name::<Vec<Arc<R>>>(),
            })
    }

    fn next_value(&mut self) -> Result<(usize, Instance), ArgumentError> {
        let position = self.position;
        let value = self
            .values
            .next()
            .context(MissingSnafu { position })?;
        self.position += 1;
        Ok((position, value))
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ArgumentError {
    #[snafu(display("no argument was supplied at position {position}"))]
    #[non_exhaustive]
    Missing { position: usize },
    #[snafu(display("the argument at position {position} is not a {expected}"))]
    #[non_exhaustive]
    Mismatch {
        position: usize,
        expected: &'static str,
    },
}
