//! Picks the constructor a registration is built with.
//!
//! Only public and internal constructors take part. A constructor carrying
//! the explicit marker always wins, and at most one may carry it. Otherwise
//! supplied hints must equal one constructor's parameter types exactly, in
//! order. Without hints the greediest public constructor is used, falling
//! back to the greediest internal one for types without public
//! constructors. Equal arity resolves to declaration order.

use std::fmt::{Display, Formatter, Result as FmtResult};

use snafu::prelude::*;

use crate::key::{ServiceType, TypeHandle};
use crate::types::{ConstructorInfo, TypeInfo, Visibility};

pub fn select(info: &TypeInfo, hints: Option<&[ServiceType]>) -> Result<usize, SelectError> {
    let ty = info.handle();
    let eligible = || {
        info.constructors()
            .iter()
            .enumerate()
            .filter(|(_, ctor)| ctor.is_eligible())
    };

    let marked: Vec<_> = eligible().filter(|(_, ctor)| ctor.is_explicit()).collect();
    match marked.as_slice() {
        [] => {}
        [(index, ctor)] => {
            return match hints {
                Some(hints) if !ctor.matches(hints) => HintMismatchSnafu {
                    ty,
                    constructor: ctor.name(),
                    hints: Hints::from(hints),
                }
                .fail(),
                _ => Ok(*index),
            };
        }
        _ => {
            return AmbiguousMarkerSnafu {
                ty,
                count: marked.len(),
            }
            .fail()
        }
    }

    if let Some(hints) = hints {
        return eligible()
            .find(|(_, ctor)| ctor.matches(hints))
            .map(|(index, _)| index)
            .context(NoMatchSnafu {
                ty,
                hints: Hints::from(hints),
            });
    }

    greediest(eligible().filter(|(_, ctor)| ctor.visibility() == Visibility::Public))
        .or_else(|| {
            greediest(eligible().filter(|(_, ctor)| ctor.visibility() == Visibility::Internal))
        })
        .context(NoEligibleSnafu { ty })
}

/// The checks a registration can make before anything is selected: the type
/// must be constructible at all, and supplied hints must name a real
/// constructor.
pub fn check_registrable(
    info: &TypeInfo,
    hints: Option<&[ServiceType]>,
) -> Result<(), SelectError> {
    let ty = info.handle();
    ensure!(info.has_eligible_constructor(), NoEligibleSnafu { ty });

    if let Some(hints) = hints {
        let found = info
            .constructors()
            .iter()
            .any(|ctor| ctor.is_eligible() && ctor.matches(hints));
        ensure!(
            found,
            NoMatchSnafu {
                ty,
                hints: Hints::from(hints),
            }
        );
    }
    Ok(())
}

fn greediest<'a, I>(ctors: I) -> Option<usize>
where
    I: Iterator<Item = (usize, &'a ConstructorInfo)>,
{
    let mut best: Option<(usize, usize)> = None;
    for (index, ctor) in ctors {
        if best.map_or(true, |(_, arity)| ctor.arity() > arity) {
            best = Some((index, ctor.arity()));
        }
    }
    best.map(|(index, _)| index)
}

/// Constructor parameter types given at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hints(Vec<ServiceType>);

impl From<&[ServiceType]> for Hints {
    fn from(hints: &[ServiceType]) -> Self {
        Self(hints.to_vec())
    }
}

impl Display for Hints {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, hint) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{hint}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum SelectError {
    #[snafu(display("{ty} has {count} constructors marked for explicit selection"))]
    #[non_exhaustive]
    AmbiguousMarker { ty: TypeHandle, count: usize },
    #[snafu(display("the marked constructor {ty}::{constructor} does not take ({hints})"))]
    #[non_exhaustive]
    HintMismatch {
        ty: TypeHandle,
        constructor: &'static str,
        hints: Hints,
    },
    #[snafu(display("{ty} has no public or internal constructor taking ({hints})"))]
    #[non_exhaustive]
    NoMatch { ty: TypeHandle, hints: Hints },
    #[snafu(display("{ty} has no public or internal constructor"))]
    #[non_exhaustive]
    NoEligible { ty: TypeHandle },
}

#[cfg(test)]
mod tests {
    use crate::types::{erase, ParameterInfo};

    use super::*;

    trait Service: Send + Sync {}

    struct Concrete;

    struct Widget;

    fn ctor(
        name: &'static str,
        visibility: Visibility,
        parameters: &[ParameterInfo],
    ) -> ConstructorInfo {
        parameters.iter().cloned().fold(
            ConstructorInfo::new(name, visibility, |_| Ok(erase(Widget))),
            ConstructorInfo::parameter,
        )
    }

    fn widget(ctors: Vec<ConstructorInfo>) -> TypeInfo {
        ctors
            .into_iter()
            .fold(TypeInfo::builder::<Widget>(), |builder, ctor| {
                builder.constructor(ctor)
            })
            .build()
    }

    fn service() -> ParameterInfo {
        ParameterInfo::single::<dyn Service>()
    }

    fn concrete() -> ParameterInfo {
        ParameterInfo::single::<Concrete>()
    }

    #[test]
    fn select_succeeds_when_greediest_public_constructor_exists() {
        let info = widget(vec![
            ctor("empty", Visibility::Public, &[]),
            ctor("with_service", Visibility::Public, &[service()]),
            ctor("with_both", Visibility::Internal, &[service(), concrete()]),
        ]);

        assert_eq!(select(&info, None).unwrap(), 1);
    }

    #[test]
    fn select_succeeds_when_only_internal_constructors_exist() {
        let info = widget(vec![
            ctor("hidden", Visibility::Private, &[service(), concrete(), service()]),
            ctor("empty", Visibility::Internal, &[]),
            ctor("with_service", Visibility::Internal, &[service()]),
        ]);

        assert_eq!(select(&info, None).unwrap(), 2);
    }

    #[test]
    fn select_succeeds_in_declaration_order_when_arity_ties() {
        let info = widget(vec![
            ctor("first", Visibility::Public, &[concrete()]),
            ctor("second", Visibility::Public, &[service()]),
        ]);

        assert_eq!(select(&info, None).unwrap(), 0);
    }

    #[test]
    fn select_succeeds_when_hints_match_internal_constructor() {
        let info = widget(vec![
            ctor("with_service", Visibility::Public, &[service()]),
            ctor("with_both", Visibility::Internal, &[service(), concrete()]),
        ]);
        let hints = [ServiceType::of::<dyn Service>(), ServiceType::of::<Concrete>()];

        assert_eq!(select(&info, Some(&hints)).unwrap(), 1);
        assert!(check_registrable(&info, Some(&hints)).is_ok());
    }

    #[test]
    fn select_fails_when_hints_are_out_of_order() {
        let info = widget(vec![ctor(
            "with_both",
            Visibility::Public,
            &[service(), concrete()],
        )]);
        let hints = [ServiceType::of::<Concrete>(), ServiceType::of::<dyn Service>()];

        assert!(matches!(
            select(&info, Some(&hints)),
            Err(SelectError::NoMatch { .. })
        ));
        assert!(matches!(
            check_registrable(&info, Some(&hints)),
            Err(SelectError::NoMatch { .. })
        ));
    }

    #[test]
    fn select_succeeds_when_one_constructor_is_marked() {
        let info = widget(vec![
            ctor("empty", Visibility::Public, &[]).explicit(),
            ctor("with_service", Visibility::Public, &[service()]),
        ]);

        assert_eq!(select(&info, None).unwrap(), 0);
        assert!(matches!(
            select(&info, Some(&[ServiceType::of::<dyn Service>()])),
            Err(SelectError::HintMismatch { .. })
        ));
    }

    #[test]
    fn select_fails_when_two_constructors_are_marked() {
        let info = widget(vec![
            ctor("empty", Visibility::Public, &[]).explicit(),
            ctor("with_service", Visibility::Public, &[service()]).explicit(),
        ]);

        assert!(matches!(
            select(&info, None),
            Err(SelectError::AmbiguousMarker { count: 2, .. })
        ));
        assert!(check_registrable(&info, None).is_ok());
    }

    #[test]
    fn select_fails_when_every_constructor_is_private() {
        let info = widget(vec![ctor("hidden", Visibility::Private, &[])]);

        assert!(matches!(
            select(&info, None),
            Err(SelectError::NoEligible { .. })
        ));
        assert!(matches!(
            check_registrable(&info, None),
            Err(SelectError::NoEligible { .. })
        ));
    }
}
