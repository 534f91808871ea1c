// crates/picaimport-core/src/store/mod.rs - Record store sessions
//
// A RecordStore is the one open session a run talks to. It offers exactly the
// four operations the batch needs and answers each with an explicit Result:
// a StoredRecord (PPN plus canonical record) on success, a StoreError with a
// human-readable message on failure.
//
// BACKENDS:
// - memory: records live in the process, gone at exit (dry runs, tests)
// - sqlite: a local SQLite database file (feature "sqlite")

use thiserror::Error;

use crate::config::{Backend, StoreConfig};
use crate::ppn::{Ppn, PpnError};
use crate::record::PicaRecord;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Errors reported by a record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record {0} not found")]
    NotFound(Ppn),

    #[error("Refusing to store an empty record")]
    EmptyRecord,

    #[error("Record {ppn} in store is corrupt: {reason}")]
    CorruptRecord { ppn: String, reason: String },

    #[error("Store rejected the record: {0}")]
    Rejected(String),

    #[error("Store counter is corrupt: {0}")]
    CorruptCounter(String),

    #[error("Cannot allocate PPN: {0}")]
    Identifier(#[from] PpnError),

    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// The error message folded onto one line
    pub fn one_line(&self) -> String {
        flatten_message(&self.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A record as held by the store after a successful call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub ppn: Ppn,
    pub record: PicaRecord,
}

impl StoredRecord {
    pub fn new(ppn: Ppn, record: PicaRecord) -> Self {
        Self { ppn, record }
    }
}

/// One open session against a record store
pub trait RecordStore {
    /// Store a new record; the store assigns its PPN
    fn create(&mut self, record: &PicaRecord) -> StoreResult<StoredRecord>;

    /// Replace the record stored under `ppn`
    fn update(&mut self, ppn: &Ppn, record: &PicaRecord) -> StoreResult<StoredRecord>;

    /// Fetch the record stored under `ppn`
    fn get(&mut self, ppn: &Ppn) -> StoreResult<StoredRecord>;

    /// Remove the record stored under `ppn`
    fn delete(&mut self, ppn: &Ppn) -> StoreResult<Ppn>;

    /// Short description for banners and diagnostics
    fn describe(&self) -> String;
}

/// Open the store session described by the configuration
pub fn open(config: &StoreConfig) -> StoreResult<Box<dyn RecordStore>> {
    match config.backend {
        Backend::Memory => Ok(Box::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| StoreError::Unavailable("sqlite store needs a path".to_string()))?;
            Ok(Box::new(SqliteStore::open(path)?))
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(StoreError::Unavailable(
            "built without the sqlite feature".to_string(),
        )),
    }
}

/// Fold a possibly multi-line message onto a single line
pub fn flatten_message(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
