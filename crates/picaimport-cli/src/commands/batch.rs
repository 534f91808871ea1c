// crates/picaimport-cli/src/commands/batch.rs - Batch driver
//
// Walks the input lines one at a time, strictly in order:
//
//   line -> ParsedReference -> Action -> Dispatcher -> error channel
//                                                   -> result log
//                                                   -> remove (-move)
//
// A bad line or a failed record never stops the batch. Only problems with the
// run itself are fatal: unreadable input, an unwritable result log, or an
// unwritable error channel.
//
// The delete confirmation is a separate step that runs before the log is
// opened, so a declined batch leaves no trace anywhere.

use anyhow::{Context as AnyhowContext, Result, bail};
use std::io::{self, Write};
use tracing::{info, warn};

use picaimport_core::{ParsedReference, ReferenceError, RunOptions};

use crate::commands::dispatch::Dispatcher;
use crate::services::{Confirm, ResultLog};
use crate::stdin::{InputSource, is_undecodable_line};

/// Counters for the end-of-run banner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Lines that reached the dispatcher
    pub processed: usize,
    /// Lines whose store call went through
    pub stored: usize,
    /// Lines logged with the failed tag
    pub failed: usize,
    /// Lines rejected before dispatch
    pub invalid: usize,
}

impl BatchSummary {
    pub fn banner(&self) -> String {
        format!(
            "{} processed, {} stored, {} failed, {} invalid",
            self.processed, self.stored, self.failed, self.invalid
        )
    }
}

/// Ask before a delete run unless -force was given
///
/// Fails with "deletion not confirmed" when the answer is no.
pub fn confirm_deletion(
    source: &InputSource,
    options: &RunOptions,
    prompt: &mut dyn Confirm,
) -> Result<()> {
    if !options.needs_confirmation() {
        return Ok(());
    }

    let question = match source.count_lines()? {
        Some(1) => "Delete 1 record from the store?".to_string(),
        Some(count) => format!("Delete {} records from the store?", count),
        None => "Delete every record named on standard input?".to_string(),
    };

    if !prompt.confirm(&question)? {
        bail!("deletion not confirmed (use -force to skip the question)");
    }
    Ok(())
}

/// Process every line, logging one outcome per dispatched line
pub fn run<I>(
    lines: I,
    dispatcher: &mut Dispatcher<'_>,
    log: &mut ResultLog,
    errors: &mut dyn Write,
) -> Result<BatchSummary>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut summary = BatchSummary::default();
    info!(mode = %dispatcher.options().mode, "batch started");

    for line in lines {
        let line = match line {
            Ok(line) => line,
            Err(e) if is_undecodable_line(&e) => {
                warn!("undecodable line");
                summary.invalid += 1;
                writeln!(errors, "{}", e).context("Failed to write error message")?;
                continue;
            }
            Err(e) => return Err(e).context("Failed to read input line"),
        };

        let action = match ParsedReference::parse(&line)
            .and_then(|reference| reference.resolve(dispatcher.options()))
        {
            Ok(action) => action,
            Err(ReferenceError::Blank) => continue,
            Err(e) => {
                warn!(line = %line.trim(), "invalid line");
                summary.invalid += 1;
                writeln!(errors, "{}", e).context("Failed to write error message")?;
                continue;
            }
        };

        let dispatched = dispatcher.dispatch(action);
        summary.processed += 1;

        if let Some(message) = &dispatched.error {
            warn!(file = %dispatched.outcome.filename(), "{}", message);
            writeln!(errors, "{}", message).context("Failed to write error message")?;
        }

        log.record(&dispatched.outcome)
            .context("Failed to write result log")?;

        if dispatched.outcome.is_stored() {
            summary.stored += 1;
        }
        if !dispatched.outcome.is_clean_success() {
            summary.failed += 1;
        }

        if let Some(file) = dispatched.remove_after_log {
            if let Err(e) = dispatcher.remove_source(&file) {
                writeln!(errors, "{:#}", e).context("Failed to write error message")?;
            }
        }
    }

    info!(
        processed = summary.processed,
        failed = summary.failed,
        invalid = summary.invalid,
        "batch finished"
    );
    Ok(summary)
}
