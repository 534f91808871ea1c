// crates/picaimport-cli/src/services/record_files.rs - Local record files
//
// This service is the only place that touches record files. The dispatcher
// decides WHAT to read, write or remove; this service knows HOW, including
// the "-" convention for standard input and standard output.
//
// Relative names are resolved against the base directory (the working
// directory in normal runs, a temporary directory in tests).

use anyhow::{Context as AnyhowContext, Result, anyhow, bail};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use picaimport_core::{PicaRecord, STDIO};

/// Reads, writes and removes record files
pub struct RecordFiles {
    base_dir: PathBuf,
    stdout: Box<dyn Write>,
    stdin_taken: bool,
}

impl RecordFiles {
    /// Files relative to `base_dir`, "-" written to standard output
    pub fn new(base_dir: PathBuf) -> Self {
        Self::with_stdout(base_dir, Box::new(io::stdout()))
    }

    /// Files relative to `base_dir`, "-" written to the given writer
    pub fn with_stdout(base_dir: PathBuf, stdout: Box<dyn Write>) -> Self {
        Self {
            base_dir,
            stdout,
            stdin_taken: false,
        }
    }

    /// Mark standard input as used for input lines, so no record is read from it
    pub fn reserve_stdin(&mut self) {
        self.stdin_taken = true;
    }

    /// Full path for a record file name
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Load a non-empty record from a file ("-" reads standard input)
    pub fn read_record(&mut self, name: &str) -> Result<PicaRecord> {
        let content = if name == STDIO {
            if self.stdin_taken {
                bail!("standard input is already used for input lines");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read record from standard input")?;
            buffer
        } else {
            let path = self.resolve(name);
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?
        };

        PicaRecord::parse_non_empty(&content).map_err(|e| anyhow!("{}: {}", name, e))
    }

    /// Write a record to a file ("-" writes standard output)
    pub fn write_record(&mut self, name: &str, record: &PicaRecord) -> Result<()> {
        let text = record.to_plain();

        if name == STDIO {
            self.stdout
                .write_all(text.as_bytes())
                .and_then(|_| self.stdout.flush())
                .context("Failed to write record to standard output")?;
            return Ok(());
        }

        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }
        fs::write(&path, text).with_context(|| format!("Failed to write file: {}", path.display()))
    }

    /// Remove a record file; "-" is never removed
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == STDIO {
            return Ok(());
        }

        let path = self.resolve(name);
        fs::remove_file(&path).with_context(|| format!("Failed to remove file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::result_log::testing::SharedBuffer;
    use tempfile::TempDir;

    const RECORD: &str = "003@ $0000073067\n021A $aTitle\n";

    #[test]
    fn test_read_and_write() {
        let temp = TempDir::new().unwrap();
        let mut files = RecordFiles::new(temp.path().to_path_buf());

        fs::write(temp.path().join("in.pica"), RECORD).unwrap();
        let record = files.read_record("in.pica").unwrap();
        assert_eq!(record.to_plain(), RECORD);

        files.write_record("out/copy.pica", &record).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("out/copy.pica")).unwrap(),
            RECORD
        );
    }

    #[test]
    fn test_read_errors() {
        let temp = TempDir::new().unwrap();
        let mut files = RecordFiles::new(temp.path().to_path_buf());

        assert!(files.read_record("missing.pica").is_err());

        fs::write(temp.path().join("empty.pica"), "\n\n").unwrap();
        let err = files.read_record("empty.pica").unwrap_err();
        assert!(err.to_string().contains("Empty record"));

        fs::write(temp.path().join("bad.pica"), "garbage\n").unwrap();
        assert!(files.read_record("bad.pica").is_err());

        files.reserve_stdin();
        assert!(files.read_record("-").is_err());
    }

    #[test]
    fn test_write_to_stdout() {
        let temp = TempDir::new().unwrap();
        let out = SharedBuffer::default();
        let mut files = RecordFiles::with_stdout(temp.path().to_path_buf(), Box::new(out.clone()));

        let record = PicaRecord::parse(RECORD).unwrap();
        files.write_record("-", &record).unwrap();
        assert_eq!(out.contents(), RECORD);
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let mut files = RecordFiles::new(temp.path().to_path_buf());
        fs::write(temp.path().join("gone.pica"), RECORD).unwrap();

        files.remove("gone.pica").unwrap();
        assert!(!temp.path().join("gone.pica").exists());
        assert!(files.remove("gone.pica").is_err());
        assert!(files.remove("-").is_ok());
    }
}
