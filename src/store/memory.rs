use crate::models::sensor::RawEntry;
use crate::store::{EntryCursor, SensorStore, StoreError};
use std::io;
use std::sync::RwLock;

/// In-process store, mainly for tests and demos.
///
/// The entry list can be swapped at any time with [`MemoryStore::replace`];
/// every `open` takes a snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<RawEntry>>,
    available: bool,
    fail_at: Option<usize>,
}

impl MemoryStore {
    pub fn new(entries: Vec<RawEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            available: true,
            fail_at: None,
        }
    }

    /// A store whose namespace cannot be opened.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Makes enumeration fail once `position` entries have been handed out.
    pub fn failing_at(mut self, position: usize) -> Self {
        self.fail_at = Some(position);
        self
    }

    pub fn replace(&self, entries: Vec<RawEntry>) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *guard = entries;
    }
}

impl SensorStore for MemoryStore {
    fn namespace(&self) -> String {
        "memory".to_string()
    }

    fn open(&self) -> Result<Box<dyn EntryCursor + '_>, StoreError> {
        if !self.available {
            return Err(StoreError::NamespaceUnavailable {
                namespace: self.namespace(),
                source: io::Error::new(io::ErrorKind::NotFound, "namespace does not exist"),
            });
        }

        let snapshot = self.entries.read().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(Box::new(MemoryCursor {
            entries: snapshot.into_iter(),
            position: 0,
            fail_at: self.fail_at,
        }))
    }
}

struct MemoryCursor {
    entries: std::vec::IntoIter<RawEntry>,
    position: usize,
    fail_at: Option<usize>,
}

impl EntryCursor for MemoryCursor {
    fn next_entry(&mut self) -> Result<Option<RawEntry>, StoreError> {
        if self.fail_at == Some(self.position) {
            return Err(StoreError::Enumeration {
                position: self.position,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            });
        }
        let entry = self.entries.next();
        if entry.is_some() {
            self.position += 1;
        }
        Ok(entry)
    }
}
