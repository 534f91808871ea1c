// crates/picaimport-cli/src/cli.rs - Command-line definitions
//
// picaimport keeps the classic single-dash long options (-get, -from FILE).
// clap wants long options with two dashes, so the raw arguments go through
// normalize_args first; both spellings work.

use clap::{CommandFactory, Parser};
use picaimport_core::ModeFlags;
use std::ffi::OsString;
use std::path::PathBuf;

/// Long option names accepted with a single dash
const LONG_OPTIONS: &[&str] = &[
    "config", "delete", "force", "from", "get", "move", "log", "quiet", "ppn", "write", "help",
    "man", "version",
];

const MANUAL: &str = "\
INPUT LINES:
  Each argument or input line names a record file, a PPN, or both:

    myrecord.pica              create a record (update it with -ppn if it has a PPN)
    000073067=title1.pica      update record 000073067 from title1.pica
    000073067 title1.pica      same, whitespace separator
    000073067                  with -delete: delete it; with -get: print it

  A file name of '-' stands for standard input or standard output.

  Without arguments lines are read from -from FILE, or typed on standard
  input; an empty line ends interactive input.

RESULT LOG:
  One line per record: PPN (or '-'), file name, timestamp, and a 'failed' or
  'deleted' tag. A log can be passed back with -from to retry a batch.

    000073067 title1.pica 2024-01-01T12:00:00
    - broken.pica 2024-01-01T12:00:01 failed

CONFIGURATION:
  The store is configured in picastore.conf (or the file named by the
  PICASTORE environment variable, or -config FILE):

    [store]
    backend = \"sqlite\"
    path = \"picastore.db\"

EXAMPLES:
  picaimport *.pica -log import.log          import files, log results
  picaimport -from import.log -write         retry and rewrite local files
  picaimport -get 000073067=down.pica        download one record
  picaimport -delete -force 000073067        delete without asking
";

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "picaimport")]
#[command(about = "Import, update, download or delete PICA+ records in a record store")]
#[command(version)]
#[command(after_long_help = MANUAL)]
pub struct Cli {
    /// Store configuration file [default: $PICASTORE or picastore.conf]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Delete the named records
    #[arg(long)]
    pub delete: bool,

    /// Do not ask before deleting
    #[arg(long)]
    pub force: bool,

    /// Read input lines from FILE ('-' for standard input)
    #[arg(long, value_name = "FILE", conflicts_with = "references")]
    pub from: Option<String>,

    /// Download records (writes each record to its file or standard output)
    #[arg(long)]
    pub get: bool,

    /// Remove local files after a successful import
    #[arg(long = "move")]
    pub move_source: bool,

    /// Append the result log to FILE ('-' for standard output)
    #[arg(long, value_name = "FILE", default_value = "-")]
    pub log: String,

    /// Suppress informational messages
    #[arg(long)]
    pub quiet: bool,

    /// Take the PPN from the record content when the line has none
    #[arg(long)]
    pub ppn: bool,

    /// Write the stored record back to its local file
    #[arg(long)]
    pub write: bool,

    /// Show the full manual
    #[arg(long)]
    pub man: bool,

    /// Record files and/or PPNs ("PPN", "FILE", "PPN=FILE")
    #[arg(value_name = "REFERENCE")]
    pub references: Vec<String>,
}

impl Cli {
    /// Parse the process arguments, accepting single-dash long options
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Mode-related flags for validation in the core
    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            get: self.get,
            delete: self.delete,
            write: self.write,
            move_source: self.move_source,
            derive_ppn: self.ppn,
            force: self.force,
        }
    }
}

/// The long help followed by the manual section
pub fn manual() -> String {
    Cli::command().render_long_help().to_string()
}

/// Rewrite `-name` and `-name=value` to `--name` forms for known options
///
/// Positional arguments (including "-" and anything after "--") are kept.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for (idx, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();

        if idx == 0 || passthrough {
            normalized.push(arg);
            continue;
        }

        if arg == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let rewritten = arg.to_str().and_then(|text| {
            let rest = text.strip_prefix('-')?;
            if rest.starts_with('-') {
                return None;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            LONG_OPTIONS
                .contains(&name)
                .then(|| OsString::from(format!("-{}", text)))
        });

        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_normalize_single_dash_options() {
        let args = normalize_args([
            "picaimport",
            "-get",
            "-log=out.log",
            "--quiet",
            "-",
            "-x",
            "000073067=down.pica",
        ]);
        assert_eq!(
            args,
            vec![
                "picaimport",
                "--get",
                "--log=out.log",
                "--quiet",
                "-",
                "-x",
                "000073067=down.pica"
            ]
        );
    }

    #[test]
    fn test_normalize_stops_after_double_dash() {
        let args = normalize_args(["picaimport", "--", "-get"]);
        assert_eq!(args, vec!["picaimport", "--", "-get"]);
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse(&["picaimport"]);
        assert_eq!(cli.log, "-");
        assert_eq!(cli.from, None);
        assert_eq!(cli.config, None);
        assert!(cli.references.is_empty());
        assert_eq!(cli.mode_flags(), ModeFlags::default());
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&[
            "picaimport",
            "-config",
            "my.conf",
            "-get",
            "-ppn",
            "-quiet",
            "-log",
            "run.log",
            "000073067=down.pica",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("my.conf")));
        assert_eq!(cli.log, "run.log");
        assert!(cli.quiet);
        assert_eq!(cli.references, vec!["000073067=down.pica"]);

        let flags = cli.mode_flags();
        assert!(flags.get && flags.derive_ppn);
        assert!(!flags.delete);
    }

    #[test]
    fn test_move_flag() {
        let cli = parse(&["picaimport", "-move", "a.pica"]);
        assert!(cli.mode_flags().move_source);
    }

    #[test]
    fn test_from_conflicts_with_references() {
        let result = Cli::try_parse_from(normalize_args([
            "picaimport",
            "-from",
            "list.txt",
            "a.pica",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_manual_mentions_result_log() {
        assert!(manual().contains("RESULT LOG"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
