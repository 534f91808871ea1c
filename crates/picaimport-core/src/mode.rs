// crates/picaimport-core/src/mode.rs - Run mode selection
//
// The run mode is decided once, from the command-line flags, before the first
// input line is read. Everything downstream receives a validated RunOptions
// value and never looks at raw flags again.
//
// FLAG RULES:
// - -get and -delete select their modes; without either the run imports
// - -get always writes the fetched record back (to a file or stdout)
// - -write and -move cannot be combined: the file is either rewritten or removed
// - -move only applies to imports, -write/-move make no sense with -delete

use std::fmt;
use thiserror::Error;

/// Errors raised for flag combinations that cannot run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModeError {
    #[error("-get and -delete cannot be combined")]
    GetWithDelete,

    #[error("-write and -move cannot be combined (write-back keeps the file, move removes it)")]
    WriteWithMove,

    #[error("-move cannot be used with -get")]
    MoveWithGet,

    #[error("-{0} cannot be used with -delete")]
    FileOptionWithDelete(&'static str),
}

/// Result type for mode selection
pub type ModeResult<T> = Result<T, ModeError>;

/// What the whole batch does
///
/// Updates are not a mode of their own: an import line that carries an
/// identifier (or whose record carries one, with -ppn) becomes an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Import,
    Get,
    Delete,
}

impl RunMode {
    /// Whether the mode destroys records and needs confirmation
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Import => "import",
            Self::Get => "get",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Raw mode-related flags as given on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub get: bool,
    pub delete: bool,
    pub write: bool,
    pub move_source: bool,
    pub derive_ppn: bool,
    pub force: bool,
}

impl ModeFlags {
    /// Validate the flag combination and compute the run options
    pub fn resolve(self) -> ModeResult<RunOptions> {
        if self.get && self.delete {
            return Err(ModeError::GetWithDelete);
        }

        if self.delete {
            if self.write {
                return Err(ModeError::FileOptionWithDelete("write"));
            }
            if self.move_source {
                return Err(ModeError::FileOptionWithDelete("move"));
            }
        }

        if self.get && self.move_source {
            return Err(ModeError::MoveWithGet);
        }

        if self.write && self.move_source {
            return Err(ModeError::WriteWithMove);
        }

        let mode = if self.delete {
            RunMode::Delete
        } else if self.get {
            RunMode::Get
        } else {
            RunMode::Import
        };

        Ok(RunOptions {
            mode,
            write_back: self.write || self.get,
            move_source: self.move_source,
            derive_ppn: self.derive_ppn,
            force: self.force,
        })
    }
}

/// Validated options for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Write the canonical record back after a successful call
    pub write_back: bool,
    /// Remove the source file after a successful create/update
    pub move_source: bool,
    /// Take the PPN from the record content when the line has none
    pub derive_ppn: bool,
    /// Skip the delete confirmation
    pub force: bool,
}

impl RunOptions {
    /// Plain options for a mode, no post-actions
    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            mode,
            write_back: matches!(mode, RunMode::Get),
            move_source: false,
            derive_ppn: false,
            force: false,
        }
    }

    /// Whether the batch must be confirmed before it starts
    pub fn needs_confirmation(&self) -> bool {
        self.mode.is_destructive() && !self.force
    }
}
