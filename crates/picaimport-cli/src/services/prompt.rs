// crates/picaimport-cli/src/services/prompt.rs - Confirmation before deleting
//
// The question is written to stderr and the answer read from standard input.
// Both must be a terminal; otherwise nobody can answer (and piped input lines
// would be eaten as the answer), which counts as "no". Unattended deletions
// need -force.

use anyhow::Result;
use console::Term;

use crate::stdin::stdin_is_terminal;

/// Asks the user to confirm an action
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Confirmation on the controlling terminal
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        if !self.term.is_term() || !stdin_is_terminal() {
            return Ok(false);
        }

        self.term.write_str(&format!("{} [y/N] ", question))?;
        let answer = self.term.read_line()?;
        Ok(is_yes(&answer))
    }
}

/// Accept "y" and "yes" in any case
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
