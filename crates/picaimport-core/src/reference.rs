// crates/picaimport-core/src/reference.rs - Input line lexer and resolver
//
// Every input line names a record by PPN, by file, or both:
//
// ```text
// title1.pica                  <- file only
// 000073067                    <- PPN only
// 000073067 title1.pica        <- PPN and file
// 000073067=title1.pica        <- same, "=" separator
// 000073067 title1.pica 2024-01-01T12:00:00    <- a result log line
// - title1.pica 2024-01-01T12:00:00 failed      <- a failed result log line
// ```
//
// Reading happens in two steps. `lex` turns the text into a LineToken without
// knowing what the batch does. `ParsedReference::resolve` then decides, for a
// given run mode, which store operation the line asks for.
//
// Result log lines are accepted as input so a log can be fed back to retry a
// batch: the trailing timestamp and status tag are dropped, and the "-"
// written in place of a missing PPN leaves a file-only line.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::mode::{RunMode, RunOptions};
use crate::outcome::StatusTag;
use crate::ppn::{Ppn, is_ppn_shaped};

/// File name standing for standard input or standard output
pub const STDIO: &str = "-";

static WITH_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+X?)(\s*=\s*|\s+)(.*)$").expect("reference pattern is valid")
});

static FAILED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s+(.+)$").expect("failure pattern is valid"));

static LOG_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    let tags = [StatusTag::Failed, StatusTag::Deleted]
        .iter()
        .map(|tag| tag.as_str())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"^(.*?)\s+[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}T[0-9]{{2}}:[0-9]{{2}}:[0-9]{{2}}(?:\s+(?:{}))?$",
        tags
    ))
    .expect("log suffix pattern is valid")
});

/// Errors for lines that cannot be turned into an operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("Blank line")]
    Blank,

    #[error("Malformed line: {0}")]
    Malformed(String),

    #[error("A PPN is required to {mode}: {line}")]
    MissingIdentifier { mode: RunMode, line: String },

    #[error("A file name is required to {mode}: {line}")]
    MissingFilename { mode: RunMode, line: String },
}

/// Result type for line parsing
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Lexical shape of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineToken {
    Blank,
    PureIdentifier(Ppn),
    PureFilename(String),
    IdentifierAndFilename(Ppn, String),
    Malformed(String),
}

/// Classify a raw input line
pub fn lex(line: &str) -> LineToken {
    let line = line.trim_end_matches(['\n', '\r']).trim();
    if line.is_empty() {
        return LineToken::Blank;
    }

    if is_ppn_shaped(line) {
        return match Ppn::parse(line) {
            Ok(ppn) => LineToken::PureIdentifier(ppn),
            Err(e) => LineToken::Malformed(e.to_string()),
        };
    }

    if let Some(captures) = WITH_SEPARATOR.captures(line) {
        let remainder = strip_log_suffix(&captures[3]);
        if remainder.is_empty() || remainder.starts_with('=') {
            return LineToken::Malformed(format!("missing file name after PPN: {}", line));
        }
        return match Ppn::parse(&captures[1]) {
            Ok(ppn) => LineToken::IdentifierAndFilename(ppn, remainder.to_string()),
            Err(e) => LineToken::Malformed(e.to_string()),
        };
    }

    if line.starts_with('=') {
        return LineToken::Malformed(format!("missing PPN before '=': {}", line));
    }

    if let Some(captures) = FAILED_PREFIX.captures(line) {
        return LineToken::PureFilename(strip_log_suffix(&captures[1]).to_string());
    }

    LineToken::PureFilename(strip_log_suffix(line).to_string())
}

/// Drop a trailing "timestamp [status]" written by the result log
fn strip_log_suffix(text: &str) -> &str {
    match LOG_SUFFIX.captures(text) {
        Some(captures) => captures.get(1).map_or(text, |m| m.as_str()),
        None => text,
    }
    .trim()
}

/// PPN and file named by one input line; at least one of them is set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub identifier: Option<Ppn>,
    pub filename: Option<String>,
}

impl ParsedReference {
    /// Lex a line and keep only usable references
    pub fn parse(line: &str) -> ReferenceResult<Self> {
        match lex(line) {
            LineToken::Blank => Err(ReferenceError::Blank),
            LineToken::Malformed(reason) => Err(ReferenceError::Malformed(reason)),
            LineToken::PureIdentifier(ppn) => Ok(Self {
                identifier: Some(ppn),
                filename: None,
            }),
            LineToken::PureFilename(file) => Ok(Self {
                identifier: None,
                filename: Some(file),
            }),
            LineToken::IdentifierAndFilename(ppn, file) => Ok(Self {
                identifier: Some(ppn),
                filename: Some(file),
            }),
        }
    }

    /// Decide which operation the reference asks for in the given run
    ///
    /// | mode   | PPN | file | action                                       |
    /// |--------|-----|------|----------------------------------------------|
    /// | import | -   | yes  | create (or update from content with -ppn)   |
    /// | import | yes | yes  | update                                       |
    /// | get    | yes | opt  | get, file defaults to stdout                 |
    /// | get    | -   | yes  | get with the PPN read from the file (-ppn)   |
    /// | delete | yes | opt  | delete                                       |
    pub fn resolve(self, options: &RunOptions) -> ReferenceResult<Action> {
        let describe = || self.describe();

        match (options.mode, self.identifier.clone(), self.filename.clone()) {
            (RunMode::Import, None, Some(file)) if options.derive_ppn => {
                Ok(Action::CreateOrUpdate { file })
            }
            (RunMode::Import, None, Some(file)) => Ok(Action::Create { file }),
            (RunMode::Import, Some(ppn), Some(file)) => Ok(Action::Update { ppn, file }),
            (RunMode::Import, Some(_), None) => Err(ReferenceError::MissingFilename {
                mode: options.mode,
                line: describe(),
            }),

            (RunMode::Get, Some(ppn), file) => Ok(Action::Get {
                ppn,
                file: file.unwrap_or_else(|| STDIO.to_string()),
            }),
            (RunMode::Get, None, Some(file)) if options.derive_ppn && file != STDIO => {
                Ok(Action::GetFromContent { file })
            }

            (RunMode::Delete, Some(ppn), file) => Ok(Action::Delete { ppn, file }),

            (mode, _, _) => Err(ReferenceError::MissingIdentifier {
                mode,
                line: describe(),
            }),
        }
    }

    fn describe(&self) -> String {
        match (&self.identifier, &self.filename) {
            (Some(ppn), Some(file)) => format!("{} {}", ppn, file),
            (Some(ppn), None) => ppn.to_string(),
            (None, Some(file)) => file.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A store operation requested by one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a new record from the file
    Create { file: String },
    /// Update if the record in the file carries a PPN, create otherwise
    CreateOrUpdate { file: String },
    /// Replace the stored record with the file content
    Update { ppn: Ppn, file: String },
    /// Fetch the record into the file ("-" for stdout)
    Get { ppn: Ppn, file: String },
    /// Fetch the record whose PPN is found in the file, into that file
    GetFromContent { file: String },
    /// Delete the record
    Delete { ppn: Ppn, file: Option<String> },
}

impl Action {
    /// File name the outcome is logged under
    pub fn filename(&self) -> &str {
        match self {
            Self::Create { file }
            | Self::CreateOrUpdate { file }
            | Self::Update { file, .. }
            | Self::Get { file, .. }
            | Self::GetFromContent { file } => file,
            Self::Delete { file, .. } => file.as_deref().unwrap_or(STDIO),
        }
    }
}
