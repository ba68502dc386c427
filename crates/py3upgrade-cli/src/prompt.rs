use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::render::TerminalRenderer;

/// Blocking line input. `Ok(None)` means the input stream ended.
pub(crate) trait Prompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
pub(crate) struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}").context("failed to write prompt")?;
        stdout.flush().context("failed to flush prompt")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read operator input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}

/// The operator closed the input stream at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OperatorCancelled;

impl fmt::Display for OperatorCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled by operator")
    }
}

impl std::error::Error for OperatorCancelled {}

pub(crate) fn acknowledge(prompter: &mut dyn Prompter, prompt: &str, auto_yes: bool) -> Result<()> {
    if auto_yes {
        return Ok(());
    }
    match prompter.read_line(prompt)? {
        Some(_) => Ok(()),
        None => Err(OperatorCancelled.into()),
    }
}

/// Prompts until `accept` yields a value, printing `invalid` after each
/// rejected answer.
pub(crate) fn prompt_until<T, F>(
    prompter: &mut dyn Prompter,
    renderer: TerminalRenderer,
    prompt: &str,
    invalid: &str,
    mut accept: F,
) -> Result<T>
where
    F: FnMut(&str) -> Option<T>,
{
    loop {
        let Some(answer) = prompter.read_line(prompt)? else {
            return Err(OperatorCancelled.into());
        };
        if let Some(value) = accept(answer.trim()) {
            return Ok(value);
        }
        renderer.print_status("warn", invalid);
    }
}

pub(crate) fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<OperatorCancelled>())
}
