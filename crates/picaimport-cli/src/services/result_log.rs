// crates/picaimport-cli/src/services/result_log.rs - Result log writer
//
// Appends one line per outcome and flushes it right away, so a run that is
// killed leaves a log ending at the last finished record. Files are opened
// for append; "-" writes to standard output.

use anyhow::{Context as AnyhowContext, Result};
use std::fs::OpenOptions;
use std::io::{self, Write};

use picaimport_core::{OperationOutcome, STDIO};

/// Append-only result log
pub struct ResultLog {
    writer: Box<dyn Write>,
}

impl ResultLog {
    /// Open the log target; files are created if needed and appended to
    pub fn open(target: &str) -> Result<Self> {
        if target == STDIO {
            return Ok(Self::from_writer(Box::new(io::stdout())));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)
            .with_context(|| format!("Failed to open log file: {}", target))?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn from_writer(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    /// Append one outcome line
    pub fn record(&mut self, outcome: &OperationOutcome) -> io::Result<()> {
        writeln!(self.writer, "{}", outcome)?;
        self.writer.flush()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    /// In-memory writer whose contents stay readable after it is boxed
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
