// crates/picaimport-cli/src/stdin.rs - Input line sources
//
// A batch reads its lines from exactly one source, chosen once at startup:
//
//   1. record references given as arguments
//   2. a control file named with -from FILE
//   3. standard input (-from -, the default)
//
// All three become the same InputLines sequence. Blank lines are skipped in
// arguments and files; on standard input the first blank line ends the
// batch, so an interactive session can be closed without EOF.
//
// A control file is read completely before the batch starts. The result log
// may be the very file being retried (-from run.log -log run.log), and lines
// appended during the run must not come back as input.
//
// Lines are split on raw bytes. A line that is not UTF-8 (a Latin-1 file name,
// say) comes out as an InvalidData error for that line alone; the lines after
// it are still read.

use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::io::{self, BufRead, Cursor, IsTerminal};
use std::path::{Path, PathBuf};

use picaimport_core::STDIO;

/// Where the batch reads its lines from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Arguments(Vec<String>),
    ControlFile(PathBuf),
    Interactive,
}

impl InputSource {
    /// Pick the source from the positional arguments and -from
    pub fn select(references: Vec<String>, from: Option<&str>) -> Self {
        if !references.is_empty() {
            return Self::Arguments(references);
        }

        match from {
            Some(path) if path != STDIO => Self::ControlFile(PathBuf::from(path)),
            _ => Self::Interactive,
        }
    }

    /// Whether record files named "-" would compete with the input lines
    pub fn uses_stdin(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Number of non-blank lines, when it can be known before the batch starts
    pub fn count_lines(&self) -> Result<Option<usize>> {
        match self {
            Self::Arguments(args) => Ok(Some(
                args.iter().filter(|arg| !arg.trim().is_empty()).count(),
            )),
            Self::ControlFile(path) => {
                let content = read_control_file(path)?;
                let count = content
                    .split(|&byte| byte == b'\n')
                    .filter(|line| !line.trim_ascii().is_empty())
                    .count();
                Ok(Some(count))
            }
            Self::Interactive => Ok(None),
        }
    }

    /// Open the source as a line sequence
    pub fn open(&self) -> Result<InputLines> {
        match self {
            Self::Arguments(args) => Ok(InputLines::from_args(args.clone())),
            Self::ControlFile(path) => {
                let content = read_control_file(path)?;
                Ok(InputLines::from_reader(Cursor::new(content), false))
            }
            Self::Interactive => Ok(InputLines::from_reader(io::stdin().lock(), true)),
        }
    }
}

fn read_control_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
}

/// Whether standard input is attached to a terminal
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Lazy sequence of input lines
pub struct InputLines {
    inner: Box<dyn Iterator<Item = io::Result<String>>>,
    stop_at_blank: bool,
    finished: bool,
}

impl InputLines {
    /// Lines from command-line arguments; blank arguments are skipped
    pub fn from_args(args: Vec<String>) -> Self {
        Self {
            inner: Box::new(args.into_iter().map(Ok)),
            stop_at_blank: false,
            finished: false,
        }
    }

    /// Lines from a reader; with `stop_at_blank` the first blank line ends the input
    pub fn from_reader<R: BufRead + 'static>(reader: R, stop_at_blank: bool) -> Self {
        Self {
            inner: Box::new(reader.split(b'\n').map(|line| line.and_then(decode_line))),
            stop_at_blank,
            finished: false,
        }
    }
}

/// One raw line as text, without its line terminator
fn decode_line(mut bytes: Vec<u8>) -> io::Result<String> {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Line is not valid UTF-8: {}",
                String::from_utf8_lossy(e.as_bytes())
            ),
        )
    })
}

/// Whether a read error concerns a single undecodable line
pub fn is_undecodable_line(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::InvalidData
}

impl Iterator for InputLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.inner.next() {
                Some(Ok(line)) if line.trim().is_empty() => {
                    if self.stop_at_blank {
                        self.finished = true;
                        return None;
                    }
                }
                Some(item) => return Some(item),
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn collect(lines: InputLines) -> Vec<String> {
        lines.map(|line| line.unwrap()).collect()
    }

    #[test]
    fn test_select_source() {
        assert_eq!(
            InputSource::select(vec!["a.pica".to_string()], None),
            InputSource::Arguments(vec!["a.pica".to_string()])
        );
        assert_eq!(
            InputSource::select(vec![], Some("list.txt")),
            InputSource::ControlFile(PathBuf::from("list.txt"))
        );
        assert_eq!(InputSource::select(vec![], Some("-")), InputSource::Interactive);
        assert_eq!(InputSource::select(vec![], None), InputSource::Interactive);
    }

    #[test]
    fn test_interactive_stops_at_blank_line() {
        let input = Cursor::new("a.pica\n000073067\n\nnever.pica\n");
        let lines = InputLines::from_reader(input, true);
        assert_eq!(collect(lines), vec!["a.pica", "000073067"]);
    }

    #[test]
    fn test_file_skips_blank_lines() {
        let input = Cursor::new("a.pica\n\n   \n000073067\n");
        let lines = InputLines::from_reader(input, false);
        assert_eq!(collect(lines), vec!["a.pica", "000073067"]);
    }

    #[test]
    fn test_arguments_skip_blank() {
        let lines = InputLines::from_args(vec!["a.pica".into(), "".into(), "b.pica".into()]);
        assert_eq!(collect(lines), vec!["a.pica", "b.pica"]);
    }

    #[test]
    fn test_count_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("list.txt");
        std::fs::write(&path, "000073067\n\n12345678X\n").unwrap();

        let source = InputSource::ControlFile(path);
        assert_eq!(source.count_lines().unwrap(), Some(2));
        assert_eq!(collect(source.open().unwrap()).len(), 2);

        let args = InputSource::Arguments(vec!["1".into(), " ".into()]);
        assert_eq!(args.count_lines().unwrap(), Some(1));
        assert_eq!(InputSource::Interactive.count_lines().unwrap(), None);
    }

    #[test]
    fn test_undecodable_line_does_not_end_input() {
        let input = Cursor::new(b"a.pica\r\n\xe9t\xe9.pica\nb.pica\n".to_vec());
        let lines: Vec<io::Result<String>> = InputLines::from_reader(input, false).collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_ref().unwrap(), "a.pica");
        let err = lines[1].as_ref().unwrap_err();
        assert!(is_undecodable_line(err));
        assert!(err.to_string().contains("\u{FFFD}t\u{FFFD}.pica"));
        assert_eq!(lines[2].as_ref().unwrap(), "b.pica");
    }

    #[test]
    fn test_control_file_is_read_before_the_batch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        std::fs::write(&path, "000073067 a.pica 2024-01-01T00:00:00\n").unwrap();

        let lines = InputSource::ControlFile(path.clone()).open().unwrap();
        // Appending to the same file afterwards must not grow the input
        std::fs::write(&path, "000073067 a.pica 2024-01-01T00:00:00\nmore.pica\n").unwrap();
        assert_eq!(collect(lines), vec!["000073067 a.pica 2024-01-01T00:00:00"]);
    }

    #[test]
    fn test_count_lines_with_latin1() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("list.txt");
        std::fs::write(&path, b"000073067\n\n\xe9t\xe9.pica\n".to_vec()).unwrap();

        assert_eq!(InputSource::ControlFile(path).count_lines().unwrap(), Some(2));
    }

    #[test]
    fn test_missing_control_file() {
        let source = InputSource::ControlFile(PathBuf::from("/nonexistent/list.txt"));
        assert!(source.open().is_err());
        assert!(source.count_lines().is_err());
    }
}
