// crates/picaimport-core/src/ppn.rs - PICA Production Numbers (record identifiers)
//
// A PPN is the canonical key of a record in a PICA store: a run of digits
// whose last character is a check character (a digit or "X").
//
// CHECK CHARACTER:
// Weights 2, 3, 4, ... are applied to the base digits from right to left.
// The check value is (11 - sum % 11) % 11, with 10 written as "X".
//
//   base 00007306 -> 6*2 + 0*3 + 3*4 + 7*5 = 59, 59 % 11 = 4, 11 - 4 = 7
//   ppn  000073067

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when reading or building a PPN
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PpnError {
    #[error("Empty PPN not allowed")]
    Empty,

    #[error("Invalid PPN format: {0}")]
    InvalidFormat(String),

    #[error("Invalid check character in PPN {ppn}: expected {expected}")]
    CheckDigit { ppn: String, expected: char },

    #[error("PPN serial number too large: {0}")]
    Overflow(u64),
}

/// Result type for PPN operations
pub type PpnResult<T> = Result<T, PpnError>;

/// Number of base digits used when allocating new PPNs
const SERIAL_WIDTH: usize = 8;

/// A lexically valid PICA Production Number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ppn(String);

impl Ppn {
    /// Parse a PPN, checking only its shape (digits, optional trailing "X")
    pub fn parse<S: AsRef<str>>(s: S) -> PpnResult<Self> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(PpnError::Empty);
        }

        if !is_ppn_shaped(s) {
            return Err(PpnError::InvalidFormat(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    /// Parse a PPN and verify its check character
    pub fn parse_checked<S: AsRef<str>>(s: S) -> PpnResult<Self> {
        let ppn = Self::parse(s)?;
        ppn.verify()?;
        Ok(ppn)
    }

    /// Build the PPN for a serial number, appending the check character
    ///
    /// Serials are zero-padded to eight digits, so serial 7306 becomes
    /// "000073067".
    pub fn from_serial(serial: u64) -> PpnResult<Self> {
        let base = format!("{:0width$}", serial, width = SERIAL_WIDTH);
        if base.len() > SERIAL_WIDTH {
            return Err(PpnError::Overflow(serial));
        }

        let check = check_char(&base);
        Ok(Self(format!("{}{}", base, check)))
    }

    /// The PPN as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits before the check character
    pub fn base(&self) -> &str {
        &self.0[..self.0.len() - 1]
    }

    /// The check character as written (last character)
    pub fn check_char(&self) -> char {
        self.0.chars().last().unwrap_or('0')
    }

    /// Check character computed from the base digits
    pub fn expected_check_char(&self) -> char {
        check_char(self.base())
    }

    /// Verify the check character
    pub fn verify(&self) -> PpnResult<()> {
        let expected = self.expected_check_char();
        if self.check_char() == expected {
            Ok(())
        } else {
            Err(PpnError::CheckDigit {
                ppn: self.0.clone(),
                expected,
            })
        }
    }

    /// Whether the check character matches the base digits
    pub fn has_valid_check_char(&self) -> bool {
        self.verify().is_ok()
    }
}

impl fmt::Display for Ppn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ppn {
    type Err = PpnError;

    fn from_str(s: &str) -> PpnResult<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Ppn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lexical PPN shape: at least one digit, optionally ending in "X"
pub(crate) fn is_ppn_shaped(s: &str) -> bool {
    let digits = s.strip_suffix('X').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Compute the check character for a run of base digits
fn check_char(base: &str) -> char {
    let sum: u32 = base
        .bytes()
        .rev()
        .zip(2u32..)
        .map(|(digit, weight)| u32::from(digit - b'0') * weight)
        .sum();

    match (11 - sum % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppn_parsing() {
        assert_eq!(Ppn::parse("000073067").unwrap().as_str(), "000073067");
        assert_eq!(Ppn::parse("12345678X").unwrap().as_str(), "12345678X");
        assert_eq!(Ppn::parse("7").unwrap().as_str(), "7");

        assert_eq!(Ppn::parse(""), Err(PpnError::Empty));
        assert!(Ppn::parse("X").is_err()); // Needs at least one digit
        assert!(Ppn::parse("12X3").is_err());
        assert!(Ppn::parse("12x").is_err());
        assert!(Ppn::parse(" 123").is_err());
        assert!(Ppn::parse("title.pica").is_err());
    }

    #[test]
    fn test_check_char() {
        let ppn = Ppn::parse("000073067").unwrap();
        assert_eq!(ppn.base(), "00007306");
        assert_eq!(ppn.expected_check_char(), '7');
        assert!(ppn.has_valid_check_char());

        // 8*2 + 7*3 + 6*4 + 5*5 + 4*6 + 3*7 + 2*8 + 1*9 = 156, 156 % 11 = 2
        assert!(Ppn::parse_checked("123456789").is_ok());

        let wrong = Ppn::parse_checked("000073068");
        assert_eq!(
            wrong,
            Err(PpnError::CheckDigit {
                ppn: "000073068".to_string(),
                expected: '7'
            })
        );
    }

    #[test]
    fn test_check_char_x() {
        // 6*2 = 12, 12 % 11 = 1, 11 - 1 = 10 -> X
        assert_eq!(Ppn::parse("6X").unwrap().expected_check_char(), 'X');
        assert!(Ppn::parse_checked("6X").is_ok());
    }

    #[test]
    fn test_from_serial() {
        let ppn = Ppn::from_serial(7306).unwrap();
        assert_eq!(ppn.to_string(), "000073067");
        assert!(ppn.has_valid_check_char());

        let first = Ppn::from_serial(1).unwrap();
        assert_eq!(first.base(), "00000001");
        assert!(first.has_valid_check_char());

        assert_eq!(
            Ppn::from_serial(100_000_000),
            Err(PpnError::Overflow(100_000_000))
        );
    }
}
