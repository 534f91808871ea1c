// crates/picaimport-core/src/outcome.rs - Per-line outcomes and the result log format
//
// One OperationOutcome is produced for every line that reached the store (or
// failed while loading its record). Its Display form is the result log line:
//
// ```text
// 000073067 title1.pica 2024-01-01T00:00:00          <- success
// - down.pica 2024-01-01T00:00:00 failed             <- store or load failure
// 000073067 down.pica 2024-01-01T00:00:00 failed     <- stored, write-back failed
// 000073067 - 2024-01-01T00:00:00 deleted            <- deleted
// ```
//
// The first two columns are exactly what the line lexer accepts, so a log can
// be fed back as input to retry a batch.

use chrono::{Local, NaiveDateTime};
use std::fmt;

use crate::ppn::Ppn;

/// Timestamp layout of the result log (local time, seconds precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Placeholder written when no PPN was established
pub const NO_PPN: &str = "-";

/// Status tag appended to a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Failed,
    Deleted,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    store_id: Option<Ppn>,
    filename: String,
    timestamp: NaiveDateTime,
    status: Option<StatusTag>,
}

impl OperationOutcome {
    /// The store call succeeded and every post-action went through
    pub fn success(ppn: Ppn, filename: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            store_id: Some(ppn),
            filename: filename.into(),
            timestamp,
            status: None,
        }
    }

    /// The store call succeeded but the local copy could not be written
    pub fn stored_with_local_failure(
        ppn: Ppn,
        filename: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            store_id: Some(ppn),
            filename: filename.into(),
            timestamp,
            status: Some(StatusTag::Failed),
        }
    }

    /// The record was deleted
    pub fn deleted(ppn: Ppn, filename: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            store_id: Some(ppn),
            filename: filename.into(),
            timestamp,
            status: Some(StatusTag::Deleted),
        }
    }

    /// Nothing was stored: the record could not be loaded or the store refused
    pub fn failure(filename: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            store_id: None,
            filename: filename.into(),
            timestamp,
            status: Some(StatusTag::Failed),
        }
    }

    pub fn store_id(&self) -> Option<&Ppn> {
        self.store_id.as_ref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn status(&self) -> Option<StatusTag> {
        self.status
    }

    /// Whether the store operation itself went through
    pub fn is_stored(&self) -> bool {
        self.store_id.is_some()
    }

    /// Whether nothing at all failed
    pub fn is_clean_success(&self) -> bool {
        self.store_id.is_some() && self.status != Some(StatusTag::Failed)
    }

    /// The result log line, without line terminator
    pub fn log_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store_id = self.store_id.as_ref().map_or(NO_PPN, |ppn| ppn.as_str());
        write!(
            f,
            "{} {} {}",
            store_id,
            self.filename,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )?;
        if let Some(status) = self.status {
            write!(f, " {}", status)?;
        }
        Ok(())
    }
}

/// Source of outcome timestamps
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
