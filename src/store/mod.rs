//! Key/value sources that sensor entries are enumerated from.
//!
//! A store is opened once per read. Opening yields a cursor that hands out
//! entries in the backend's natural order until it reports exhaustion with
//! `Ok(None)`. Failures to open the namespace and failures while enumerating
//! are distinct [`StoreError`] kinds so callers can apply different policies.

use crate::config::StoreConfig;
use crate::models::sensor::RawEntry;
use std::io;
use std::sync::Arc;
use thiserror::Error;

pub mod directory;
pub mod memory;
pub mod registry;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use registry::RegistryStore;

/// Registry path (under `HKEY_CURRENT_USER`) where HWiNFO publishes gadget values.
pub const HWINFO_NAMESPACE: &str = r"Software\HWiNFO64\VSB";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Namespace {namespace} unavailable: {source}")]
    NamespaceUnavailable { namespace: String, source: io::Error },

    #[error("Store backend '{0}' is not supported on this platform")]
    Unsupported(String),

    #[error("Enumeration failed after {position} entries: {source}")]
    Enumeration { position: usize, source: io::Error },

    #[error("Unknown store backend: {0}")]
    UnknownBackend(String),
}

pub trait EntryCursor {
    /// Next entry, `Ok(None)` once the namespace is exhausted.
    fn next_entry(&mut self) -> Result<Option<RawEntry>, StoreError>;
}

pub trait SensorStore: Send + Sync {
    /// Human readable location of the namespace, used in log lines.
    fn namespace(&self) -> String;

    fn open(&self) -> Result<Box<dyn EntryCursor + '_>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Registry,
    Directory,
}

impl StoreBackend {
    pub fn parse(name: &str) -> Result<Self, StoreError> {
        match name.trim().to_lowercase().as_str() {
            "registry" => Ok(StoreBackend::Registry),
            "directory" | "dir" => Ok(StoreBackend::Directory),
            other => Err(StoreError::UnknownBackend(other.to_string())),
        }
    }
}

/// Builds the store selected by the `[store]` config section.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn SensorStore>, StoreError> {
    let store: Arc<dyn SensorStore> = match StoreBackend::parse(&config.backend)? {
        StoreBackend::Registry => Arc::new(RegistryStore::new(HWINFO_NAMESPACE)),
        StoreBackend::Directory => Arc::new(DirectoryStore::new(&config.directory)),
    };
    Ok(store)
}
