//! The operator confirmation gate.
//!
//! Nothing destructive happens before a [`Confirm`] implementation says yes.

use std::io::{self, BufRead, Write};

/// Asks the operator a yes/no question.
pub trait Confirm {
    /// Returns `Ok(true)` only on an explicit affirmative answer.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Whether a typed answer counts as "yes". Only the full word does.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Prompts on a writer and reads one line of response.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on stdout, answer on stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "\n{question} Type 'yes' to proceed: ")?;
        self.output.flush()?;

        let mut answer = String::new();
        // EOF reads as an empty answer, which declines
        self.input.read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

/// Answers every question the same way without asking.
///
/// `AssumeYes(true)` is what `--yes` installs.
pub struct AssumeYes(pub bool);

impl Confirm for AssumeYes {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        tracing::info!(question, answer = self.0, "confirmation skipped");
        Ok(self.0)
    }
}
