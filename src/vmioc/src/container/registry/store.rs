use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::registry::{MetaObject, RegisterError};
use crate::key::{Key, ServiceType, TypeHandle};

/// The registrations of one container, keyed by service type and name.
///
/// Readers never block each other. Every mutation holds the write lock for
/// its whole duration, so a batch either lands completely or not at all.
pub(crate) struct RegistrationStore {
    entries: RwLock<HashMap<Key, Arc<MetaObject>>>,
}

impl RegistrationStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, meta: Arc<MetaObject>) -> Result<Arc<MetaObject>, RegisterError> {
        let mut entries = self.entries.write();
        match entries.entry(meta.key().clone()) {
            Entry::Occupied(entry) => Err(RegisterError::KeyDuplicated {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => Ok(Arc::clone(entry.insert(meta))),
        }
    }

    /// Inserts every entry, or none of them if any key is taken or repeated
    /// within the batch.
    pub fn insert_all(&self, metas: Vec<Arc<MetaObject>>) -> Result<(), RegisterError> {
        let mut entries = self.entries.write();
        let mut seen = HashSet::with_capacity(metas.len());
        let errors: Vec<_> = metas
            .iter()
            .filter(|meta| entries.contains_key(meta.key()) || !seen.insert(meta.key()))
            .map(|meta| RegisterError::KeyDuplicated {
                key: meta.key().clone(),
            })
            .collect();
        if !errors.is_empty() {
            return Err(RegisterError::Aggregated { errors });
        }

        for meta in metas {
            entries.insert(meta.key().clone(), meta);
        }
        Ok(())
    }

    /// Inserts `meta` unless the key is already taken, in which case the
    /// existing entry wins.
    pub fn insert_or_existing(&self, meta: Arc<MetaObject>) -> Arc<MetaObject> {
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(meta.key().clone()).or_insert(meta))
    }

    pub fn get(&self, key: &Key) -> Option<Arc<MetaObject>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Removes the entry under `meta`'s key only if it is still `meta`.
    pub fn remove_if_same(&self, meta: &Arc<MetaObject>) -> bool {
        let mut entries = self.entries.write();
        match entries.get(meta.key()) {
            Some(current) if Arc::ptr_eq(current, meta) => {
                entries.remove(meta.key());
                true
            }
            _ => false,
        }
    }

    pub fn drain(&self) -> Vec<Arc<MetaObject>> {
        self.entries.write().drain().map(|(_, meta)| meta).collect()
    }

    pub fn values(&self) -> Vec<Arc<MetaObject>> {
        self.entries.read().values().cloned().collect()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Entries that resolve a single `element`, named or not.
    pub fn members_of(&self, element: TypeHandle) -> Vec<Arc<MetaObject>> {
        self.entries
            .read()
            .values()
            .filter(|meta| meta.key().service() == ServiceType::Single(element))
            .cloned()
            .collect()
    }
}
