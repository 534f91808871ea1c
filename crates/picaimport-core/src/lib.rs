//! # picaimport-core
//!
//! Building blocks for batch import, update, download and deletion of PICA+
//! records:
//!
//! - [`ppn`]: record identifiers and their check characters
//! - [`record`]: PICA+ records in plain format
//! - [`reference`]: the input line lexer and the per-mode resolver
//! - [`mode`]: run mode selection from command-line flags
//! - [`outcome`]: per-line outcomes and the result log line format
//! - [`store`]: the record store session trait and its backends
//! - [`config`]: store configuration files
//!
//! The command-line driver lives in the `picaimport-cli` crate.

pub mod config;
pub mod mode;
pub mod outcome;
pub mod ppn;
pub mod record;
pub mod reference;
pub mod store;

pub use config::{Backend, ConfigError, ConfigManager, PicaStoreConfig, StoreConfig};
pub use mode::{ModeError, ModeFlags, RunMode, RunOptions};
pub use outcome::{Clock, FixedClock, OperationOutcome, StatusTag, SystemClock};
pub use ppn::{Ppn, PpnError};
pub use record::{Field, PicaRecord, RecordError, Subfield};
pub use reference::{Action, LineToken, ParsedReference, ReferenceError, STDIO, lex};
pub use store::{MemoryStore, RecordStore, StoreError, StoreResult, StoredRecord};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
