use std::sync::Arc;

use snafu::prelude::*;

use crate::container::registry::{Activator, FactoryFn, MetaObject};
use crate::container::resolver::constructor;
use crate::container::resolver::{
    ActivationSnafu, ConstructorSnafu, NotRegisteredSnafu, ResolveError, Resolver,
    TypeMismatchSnafu,
};
use crate::container::Instance;
use crate::key::Key;
use crate::types::{Arguments, CastFn, ConstructorInfo, ErasedObject, ParameterInfo};

/// A reusable recipe for producing the instance of one registration.
pub(crate) enum ActivationPlan {
    Construct {
        constructor: ConstructorInfo,
        arguments: Vec<Key>,
        cast: CastFn,
    },
    Factory {
        factory: Arc<FactoryFn>,
        cast: CastFn,
    },
    Sequence {
        members: Vec<Key>,
    },
    /// The instance was supplied at registration.
    Preset,
}

/// A freshly built instance and, for single objects, the concrete object
/// behind it.
pub(crate) struct Activated {
    pub instance: Instance,
    pub object: Option<ErasedObject>,
}

impl ActivationPlan {
    pub fn compile(meta: &MetaObject) -> Result<Self, ResolveError> {
        match meta.activator() {
            Activator::Constructor { info, cast, hints } => {
                let index = constructor::select(info, hints.as_deref()).context(
                    ConstructorSnafu {
                        key: meta.key().clone(),
                    },
                )?;
                let constructor = info.constructors()[index].clone();
                let arguments = constructor
                    .parameters()
                    .iter()
                    .map(ParameterInfo::key)
                    .collect();
                Ok(Self::Construct {
                    constructor,
                    arguments,
                    cast: *cast,
                })
            }
            Activator::Factory { factory, cast } => Ok(Self::Factory {
                factory: Arc::clone(factory),
                cast: *cast,
            }),
            Activator::Sequence { members } => Ok(Self::Sequence {
                members: members.clone(),
            }),
            Activator::Instance => Ok(Self::Preset),
        }
    }

    /// Every argument is resolved through `resolver`, one after another.
    pub fn execute(&self, key: &Key, resolver: &dyn Resolver) -> Result<Activated, ResolveError> {
        match self {
            Self::Construct {
                constructor,
                arguments,
                cast,
            } => {
                let values = arguments
                    .iter()
                    .map(|argument| resolver.resolve_key(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                let object = constructor
                    .invoke(Arguments::new(values))
                    .map_err(Arc::from)
                    .context(ActivationSnafu { key: key.clone() })?;
                Self::finish(key, object, *cast)
            }
            Self::Factory { factory, cast } => {
                let object = factory(resolver)
                    .map_err(Arc::from)
                    .context(ActivationSnafu { key: key.clone() })?;
                Self::finish(key, object, *cast)
            }
            Self::Sequence { members } => {
                let mut items = Vec::with_capacity(members.len());
                for member in members {
                    match resolver.resolve_key(member)? {
                        Instance::Single(object) => items.push(object),
                        Instance::Sequence(nested) => items.extend(nested),
                    }
                }
                Ok(Activated {
                    instance: Instance::Sequence(items),
                    object: None,
                })
            }
            Self::Preset => NotRegisteredSnafu { key: key.clone() }.fail(),
        }
    }

    fn finish(key: &Key, object: ErasedObject, cast: CastFn) -> Result<Activated, ResolveError> {
        let shared = cast(Arc::clone(&object)).context(TypeMismatchSnafu {
            key: key.clone(),
            expected: key
                .service()
                .handle()
                .map_or("the registered type", |handle| handle.name()),
        })?;
        Ok(Activated {
            instance: Instance::Single(shared),
            object: Some(object),
        })
    }
}
