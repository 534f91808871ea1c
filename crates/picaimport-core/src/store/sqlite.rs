// crates/picaimport-core/src/store/sqlite.rs - Local SQLite record store
//
// SCHEMA:
// ```sql
// records(ppn TEXT PRIMARY KEY, record TEXT, created TEXT, modified TEXT)
// counter(id INTEGER PRIMARY KEY CHECK (id = 1), next_serial INTEGER)
// ```
//
// Records are kept in plain format. New PPNs come from the single counter row,
// skipping any PPN that is already taken (records imported with a fixed PPN).

use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, instrument};

use super::{RecordStore, StoreError, StoreResult, StoredRecord};
use crate::outcome::TIMESTAMP_FORMAT;
use crate::ppn::Ppn;
use crate::record::PicaRecord;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    ppn      TEXT PRIMARY KEY,
    record   TEXT NOT NULL,
    created  TEXT NOT NULL,
    modified TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS counter (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    next_serial INTEGER NOT NULL
);
INSERT OR IGNORE INTO counter (id, next_serial) VALUES (1, 1);
";

/// Record store in a SQLite database file
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Open (and if needed create) the database at `path`
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        debug!("SQLite store ready");

        Ok(Self {
            conn,
            location: path.as_ref().display().to_string(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Number of stored records
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| StoreError::CorruptCounter(format!("record count {}", count)))
    }

    fn load(&self, ppn: &Ppn) -> StoreResult<Option<PicaRecord>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM records WHERE ppn = ?1",
                params![ppn.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        text.map(|text| {
            PicaRecord::parse(&text).map_err(|e| StoreError::CorruptRecord {
                ppn: ppn.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl RecordStore for SqliteStore {
    fn create(&mut self, record: &PicaRecord) -> StoreResult<StoredRecord> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        let tx = self.conn.transaction()?;
        let mut serial: i64 =
            tx.query_row("SELECT next_serial FROM counter WHERE id = 1", [], |row| {
                row.get(0)
            })?;
        if serial < 1 {
            return Err(StoreError::CorruptCounter(format!("next serial {}", serial)));
        }

        let ppn = loop {
            let candidate = Ppn::from_serial(serial.unsigned_abs())?;
            serial += 1;
            let taken: i64 = tx.query_row(
                "SELECT COUNT(*) FROM records WHERE ppn = ?1",
                params![candidate.as_str()],
                |row| row.get(0),
            )?;
            if taken == 0 {
                break candidate;
            }
        };

        let stored = record.clone().with_ppn(&ppn);
        let timestamp = now();
        tx.execute(
            "INSERT INTO records (ppn, record, created, modified) VALUES (?1, ?2, ?3, ?3)",
            params![ppn.as_str(), stored.to_plain(), timestamp],
        )?;
        tx.execute(
            "UPDATE counter SET next_serial = ?1 WHERE id = 1",
            params![serial],
        )?;
        tx.commit()?;

        debug!(ppn = %ppn, "created record");
        Ok(StoredRecord::new(ppn, stored))
    }

    fn update(&mut self, ppn: &Ppn, record: &PicaRecord) -> StoreResult<StoredRecord> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        let stored = record.clone().with_ppn(ppn);
        let changed = self.conn.execute(
            "UPDATE records SET record = ?2, modified = ?3 WHERE ppn = ?1",
            params![ppn.as_str(), stored.to_plain(), now()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(ppn.clone()));
        }

        debug!(ppn = %ppn, "updated record");
        Ok(StoredRecord::new(ppn.clone(), stored))
    }

    fn get(&mut self, ppn: &Ppn) -> StoreResult<StoredRecord> {
        match self.load(ppn)? {
            Some(record) => Ok(StoredRecord::new(ppn.clone(), record)),
            None => Err(StoreError::NotFound(ppn.clone())),
        }
    }

    fn delete(&mut self, ppn: &Ppn) -> StoreResult<Ppn> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE ppn = ?1", params![ppn.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(ppn.clone()));
        }

        debug!(ppn = %ppn, "deleted record");
        Ok(ppn.clone())
    }

    fn describe(&self) -> String {
        format!("sqlite store {}", self.location)
    }
}
