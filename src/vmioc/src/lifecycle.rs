use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// How often a registration produces a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// A new instance per resolution.
    #[default]
    Transient,
    /// One instance per registration, cached after the first resolution.
    Singleton,
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Singleton => write!(f, "singleton"),
        }
    }
}

/// Cleanup logic run when a cached instance leaves its container.
///
/// Failures surface to whoever triggered the disposal, with the returned
/// error kept intact as the source.
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}
