// crates/picaimport-cli/src/main.rs - picaimport entry point
//
// Batch import, update, download and deletion of PICA+ records. One run does
// one kind of work (import, -get or -delete) over a list of input lines, and
// writes one result log line per record.
//
// RUN SEQUENCE:
// ┌──────────────┐   ┌────────────────┐   ┌───────────────┐   ┌──────────────┐
// │ flags + mode │──▶│ config + store │──▶│ delete gate   │──▶│ input + log  │
// └──────────────┘   └────────────────┘   └───────────────┘   └──────────────┘
//                                                                    │
//                                                                    ▼
//                                              ┌──────────────────────────────┐
//                                              │ batch: line -> store -> log  │
//                                              └──────────────────────────────┘
//
// Anything that goes wrong before the batch starts ends the run with a
// non-zero exit. Once the batch runs, per-line failures are reported and
// logged, and the run still exits with zero.
//
// EXAMPLE USAGE:
// ```bash
// picaimport *.pica -log import.log                 # create or update records
// picaimport -from import.log -write                # retry, write PPNs back
// picaimport -get 000073067=down.pica               # download one record
// ls *.pica | picaimport -move                      # import and remove files
// picaimport -delete -force -from gone.txt          # delete without asking
// ```

use anyhow::{Context as AnyhowContext, Result};
use console::style;
use std::env;
use std::io;
use tracing_subscriber::EnvFilter;

mod cli; // Command-line definitions and single-dash option handling
mod commands; // Dispatcher and batch driver
mod context; // Configuration and the open store session
mod services; // Record files, result log, confirmation prompt
mod stdin; // Input line sources

use cli::Cli;
use commands::batch;
use commands::dispatch::Dispatcher;
use context::Context;
use picaimport_core::SystemClock;
use services::{RecordFiles, ResultLog, TerminalPrompt};
use stdin::InputSource;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    if cli.man {
        println!("{}", cli::manual());
        return Ok(());
    }

    init_tracing(cli.quiet);

    let options = cli.mode_flags().resolve()?;
    let source = InputSource::select(cli.references.clone(), cli.from.as_deref());
    let mut ctx = Context::new(cli.config.clone(), options)?;

    batch::confirm_deletion(&source, &ctx.options(), &mut TerminalPrompt::new())?;

    // Input first: a control file may be the log this run appends to
    let lines = source.open()?;
    let mut log = ResultLog::open(&cli.log)?;

    let cwd = env::current_dir().context("Failed to determine the working directory")?;
    let mut files = RecordFiles::new(cwd);
    if source.uses_stdin() {
        files.reserve_stdin();
    }

    if !cli.quiet {
        eprintln!(
            "{} {} with {} ({})",
            style("picaimport:").bold(),
            options.mode,
            ctx.store.describe(),
            ctx.config_path().display()
        );
    }

    let check_ppn = ctx.check_ppn();
    let clock = SystemClock;
    let mut dispatcher =
        Dispatcher::new(ctx.store.as_mut(), &mut files, &clock, options).check_ppn(check_ppn);
    let summary = batch::run(lines, &mut dispatcher, &mut log, &mut io::stderr())?;

    if !cli.quiet {
        let banner = summary.banner();
        if summary.failed + summary.invalid > 0 {
            eprintln!("{}", style(banner).yellow());
        } else {
            eprintln!("{}", style(banner).green());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; RUST_LOG overrides the default level
///
/// Per-line failures are already reported on the error channel, so their
/// warn events only show with RUST_LOG=warn or lower.
fn init_tracing(quiet: bool) {
    let default_level = if quiet { "off" } else { "error" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
