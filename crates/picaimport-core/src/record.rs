// crates/picaimport-core/src/record.rs - PICA+ records in plain format
//
// This module is the record model shared by every store backend and by the
// file handling in the CLI. It knows just enough about PICA+ to load a record
// from disk, tell whether it is empty, find and set its PPN, and write it back.
//
// PLAIN FORMAT:
// ```text
// 003@ $0000073067
// 021A $aA title$hAn author
// 209A/01 $a123$$45     <- "$$" is a literal dollar sign
// ```
//
// Each line is one field: a tag of three digits and an uppercase letter or
// "@", an optional "/occurrence", a single space, then subfields introduced
// by "$" and a one-character code. Blank lines are ignored.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use crate::ppn::Ppn;

/// Tag of the field holding the record's PPN
pub const PPN_TAG: &str = "003@";

/// Subfield code of the PPN inside [`PPN_TAG`]
pub const PPN_CODE: char = '0';

static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{3}[A-Z@])(?:/([0-9]{2,3}))? (\$.*)$").expect("field pattern is valid")
});

/// Errors that can occur while reading a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Empty record")]
    Empty,

    #[error("Invalid field on line {line}: {content}")]
    InvalidField { line: usize, content: String },

    #[error("Invalid subfield on line {line}: {reason}")]
    InvalidSubfield { line: usize, reason: String },
}

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// A single subfield: code and value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

impl Subfield {
    pub fn new<S: Into<String>>(code: char, value: S) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

/// A field: tag, optional occurrence and its subfields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: String,
    pub occurrence: Option<String>,
    pub subfields: Vec<Subfield>,
}

impl Field {
    pub fn new<S: Into<String>>(tag: S, subfields: Vec<Subfield>) -> Self {
        Self {
            tag: tag.into(),
            occurrence: None,
            subfields,
        }
    }

    /// First value of the given subfield code
    pub fn value(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(occurrence) = &self.occurrence {
            write!(f, "/{}", occurrence)?;
        }
        f.write_str(" ")?;
        for subfield in &self.subfields {
            write!(f, "${}{}", subfield.code, subfield.value.replace('$', "$$"))?;
        }
        Ok(())
    }
}

/// A PICA+ record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PicaRecord {
    fields: Vec<Field>,
}

impl PicaRecord {
    /// Create a record from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Parse a record in plain format
    ///
    /// An input without any field parses to an empty record; callers that
    /// need content use [`PicaRecord::parse_non_empty`].
    pub fn parse(input: &str) -> RecordResult<Self> {
        let mut fields = Vec::new();

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let captures = FIELD_LINE
                .captures(line)
                .ok_or_else(|| RecordError::InvalidField {
                    line: line_no,
                    content: line.to_string(),
                })?;

            let subfields = parse_subfields(&captures[3], line_no)?;
            fields.push(Field {
                tag: captures[1].to_string(),
                occurrence: captures.get(2).map(|m| m.as_str().to_string()),
                subfields,
            });
        }

        Ok(Self { fields })
    }

    /// Parse a record and reject it when it has no fields
    pub fn parse_non_empty(input: &str) -> RecordResult<Self> {
        let record = Self::parse(input)?;
        if record.is_empty() {
            return Err(RecordError::Empty);
        }
        Ok(record)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First field with the given tag
    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// The PPN stored in the record, if present and well formed
    pub fn ppn(&self) -> Option<Ppn> {
        self.field(PPN_TAG)
            .and_then(|f| f.value(PPN_CODE))
            .and_then(|value| Ppn::parse(value.trim()).ok())
    }

    /// Set the PPN, replacing an existing `003@` field or inserting one in tag order
    pub fn set_ppn(&mut self, ppn: &Ppn) {
        let field = Field::new(PPN_TAG, vec![Subfield::new(PPN_CODE, ppn.as_str())]);

        if let Some(existing) = self.fields.iter_mut().find(|f| f.tag == PPN_TAG) {
            *existing = field;
            return;
        }

        let position = self
            .fields
            .iter()
            .position(|f| f.tag.as_str() > PPN_TAG)
            .unwrap_or(self.fields.len());
        self.fields.insert(position, field);
    }

    /// Return a copy with the given PPN
    pub fn with_ppn(mut self, ppn: &Ppn) -> Self {
        self.set_ppn(ppn);
        self
    }

    /// Serialize in plain format, one field per line
    pub fn to_plain(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PicaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            writeln!(f, "{}", field)?;
        }
        Ok(())
    }
}

impl FromStr for PicaRecord {
    type Err = RecordError;

    fn from_str(s: &str) -> RecordResult<Self> {
        Self::parse(s)
    }
}

/// Split `$aValue$bValue` into subfields, unescaping `$$`
fn parse_subfields(input: &str, line: usize) -> RecordResult<Vec<Subfield>> {
    let mut subfields: Vec<Subfield> = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            match subfields.last_mut() {
                Some(current) => current.value.push(ch),
                None => {
                    return Err(RecordError::InvalidSubfield {
                        line,
                        reason: "field content must start with '$'".to_string(),
                    });
                }
            }
            continue;
        }

        match chars.next() {
            Some('$') => match subfields.last_mut() {
                Some(current) => current.value.push('$'),
                None => {
                    return Err(RecordError::InvalidSubfield {
                        line,
                        reason: "escaped '$' before the first subfield".to_string(),
                    });
                }
            },
            Some(code) if code.is_ascii_alphanumeric() => {
                subfields.push(Subfield::new(code, String::new()));
            }
            Some(code) => {
                return Err(RecordError::InvalidSubfield {
                    line,
                    reason: format!("invalid subfield code '{}'", code),
                });
            }
            None => {
                return Err(RecordError::InvalidSubfield {
                    line,
                    reason: "missing subfield code after '$'".to_string(),
                });
            }
        }
    }

    Ok(subfields)
}
