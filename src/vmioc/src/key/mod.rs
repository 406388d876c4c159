use std::any::{self, TypeId};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a `'static` type, sized or not, together with its name for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the type name, without `dyn`, auto traits or
    /// generic arguments.
    ///
    /// `dyn app::services::Greeter + Send` becomes `Greeter`, and
    /// `app::Repository<u32>` becomes `Repository`.
    pub fn simple_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let name = name.split(" + ").next().unwrap_or(name);
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name)
    }
}

impl Display for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name)
    }
}

/// The shape of a request made to a container.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    /// One shared instance, surfaced as `Arc<T>`.
    Single(TypeHandle),
    /// Every implementation of `T`, surfaced as `Vec<Arc<T>>`.
    Sequence(TypeHandle),
    /// An unbound generic definition such as `Repository<_>`. Never
    /// resolvable.
    Definition(&'static str),
}

impl ServiceType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Single(TypeHandle::of::<T>())
    }

    pub fn sequence_of<T: ?Sized + 'static>() -> Self {
        Self::Sequence(TypeHandle::of::<T>())
    }

    pub fn definition(name: &'static str) -> Self {
        Self::Definition(name)
    }

    /// The handle of the requested type, or of the element type for a
    /// sequence.
    pub fn handle(&self) -> Option<TypeHandle> {
        match self {
            Self::Single(handle) | Self::Sequence(handle) => Some(*handle),
            Self::Definition(_) => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

impl Debug for ServiceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

impl Display for ServiceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Single(handle) => write!(f, "{handle}"),
            Self::Sequence(handle) => write!(f, "Vec<{handle}>"),
            Self::Definition(name) => write!(f, "{name}<_>"),
        }
    }
}

/// A registration key: the requested type plus an optional name.
///
/// An unnamed key is distinct from every named key of the same type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    service: ServiceType,
    name: Option<Arc<str>>,
}

impl Key {
    pub fn new(service: ServiceType, name: Option<&str>) -> Self {
        Self {
            service,
            name: name.map(Arc::from),
        }
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    pub fn with_name(&self, name: Option<&str>) -> Self {
        Self::new(self.service, name)
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.name {
            Some(name) => write!(f, "{}@{:?}", self.service, name),
            None => write!(f, "{}", self.service),
        }
    }
}

pub fn of<T: ?Sized + 'static>() -> Key {
    Key::new(ServiceType::of::<T>(), None)
}

pub fn named<T: ?Sized + 'static>(name: &str) -> Key {
    Key::new(ServiceType::of::<T>(), Some(name))
}

pub fn sequence_of<T: ?Sized + 'static>() -> Key {
    Key::new(ServiceType::sequence_of::<T>(), None)
}
