use std::sync::Arc;

use crate::container::resolver::ResolveError;
use crate::key::{Key, ServiceType, TypeHandle};
use crate::types::{TypeInfo, TypeIntrospector, TypeKind};

/// What to do with an unnamed request that has no registration in the
/// container asked.
#[derive(Debug)]
pub(crate) enum Fallback {
    /// Build every implementation of the element type.
    Sequence { element: TypeHandle },
    /// Register the concrete type as transient, then resolve it.
    AutoRegister { info: Arc<TypeInfo> },
    /// Build the only implementation of an interface without registering it.
    SingleImplementation {
        target: TypeHandle,
        info: Arc<TypeInfo>,
    },
    /// Ask the parent container.
    Bubble,
    Unresolvable(ResolveError),
}

impl Fallback {
    pub fn decide(key: &Key, types: &dyn TypeIntrospector, can_bubble: bool) -> Self {
        let decision = match key.service() {
            ServiceType::Sequence(element) => Self::Sequence { element },
            ServiceType::Definition(name) => {
                Self::Unresolvable(ResolveError::UnboundGeneric { name })
            }
            ServiceType::Single(ty) => Self::decide_single(key, ty, types),
        };

        match decision {
            Self::Unresolvable(_) if can_bubble => Self::Bubble,
            decision => decision,
        }
    }

    fn decide_single(key: &Key, ty: TypeHandle, types: &dyn TypeIntrospector) -> Self {
        match types.kind_of(ty.id()) {
            Some(TypeKind::Concrete) => match types.describe(ty.id()) {
                Some(info) if info.has_eligible_constructor() => Self::AutoRegister { info },
                _ => Self::Unresolvable(ResolveError::Ineligible { ty }),
            },
            Some(TypeKind::Interface | TypeKind::Abstract) => {
                let mut implementations = types.implementations_of(ty.id());
                match implementations.len() {
                    0 => Self::Unresolvable(ResolveError::NoImplementations { ty }),
                    1 => {
                        let info = implementations.remove(0);
                        if info.has_eligible_constructor() {
                            Self::SingleImplementation { target: ty, info }
                        } else {
                            Self::Unresolvable(ResolveError::Ineligible { ty: info.handle() })
                        }
                    }
                    _ => Self::Unresolvable(ResolveError::AmbiguousImplementations {
                        ty,
                        candidates: implementations
                            .iter()
                            .map(|info| info.handle().simple_name())
                            .collect(),
                    }),
                }
            }
            None => Self::Unresolvable(ResolveError::NotRegistered { key: key.clone() }),
        }
    }
}
