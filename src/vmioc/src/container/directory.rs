//! The process-wide directory of named containers.
//!
//! The directory never keeps a container alive: it holds weak references
//! and treats dead or disposed containers as absent.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::RwLock;
use snafu::prelude::*;

use crate::container::core::ContainerCore;

static DIRECTORY: LazyLock<ContainerDirectory> = LazyLock::new(ContainerDirectory::new);

pub(crate) struct ContainerDirectory {
    entries: RwLock<HashMap<Arc<str>, Weak<ContainerCore>>>,
}

impl ContainerDirectory {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static Self {
        &DIRECTORY
    }

    /// Binds `name` to `core` and, in the same step, releases `previous` if
    /// it is still bound to `core`.
    ///
    /// Fails without touching anything when another live container holds
    /// `name`.
    pub fn claim(
        &self,
        name: &str,
        core: &Arc<ContainerCore>,
        previous: Option<&str>,
    ) -> Result<Arc<str>, DirectoryError> {
        // Must outlive the guard: dropping a container re-enters the directory.
        let displaced: Option<Arc<ContainerCore>>;
        let mut entries = self.entries.write();
        let name: Arc<str> = Arc::from(name);

        match entries.entry(Arc::clone(&name)) {
            Entry::Occupied(mut entry) => {
                if entry.get().as_ptr() == Arc::as_ptr(core) {
                    return Ok(name);
                }
                displaced = entry.get().upgrade();
                ensure!(
                    displaced.as_ref().map_or(true, |owner| owner.is_disposed()),
                    NameTakenSnafu {
                        name: name.to_string()
                    }
                );
                entry.insert(Arc::downgrade(core));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::downgrade(core));
            }
        }

        if let Some(previous) = previous.filter(|previous| *previous != &*name) {
            release_locked(&mut entries, previous, Arc::as_ptr(core));
        }
        Ok(name)
    }

    /// Removes `name` if it is bound to the container at `owner`.
    pub fn release(&self, name: &str, owner: *const ContainerCore) {
        release_locked(&mut self.entries.write(), name, owner);
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ContainerCore>, DirectoryError> {
        let core = self.entries.read().get(name).and_then(Weak::upgrade);
        core.filter(|core| !core.is_disposed())
            .context(NotFoundSnafu { name })
    }
}

fn release_locked(
    entries: &mut HashMap<Arc<str>, Weak<ContainerCore>>,
    name: &str,
    owner: *const ContainerCore,
) {
    if entries
        .get(name)
        .is_some_and(|current| current.as_ptr() == owner)
    {
        entries.remove(name);
    }
}

#[derive(Debug, Clone, Snafu)]
#[non_exhaustive]
pub enum DirectoryError {
    #[snafu(display("no container is named {name:?}"))]
    #[non_exhaustive]
    NotFound { name: String },
    #[snafu(display("the container name {name:?} is already taken"))]
    #[non_exhaustive]
    NameTaken { name: String },
}
